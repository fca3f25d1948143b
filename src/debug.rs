// Cross-handle debug toggle: publish on write, subscribe on every handle.
use crate::{
    persist::DEBUG_KEY,
    store::{
        SaveStore,
        StoreEvent,
    },
};
use color_eyre::eyre::Result;
use tokio::sync::broadcast;

/// A process-wide boolean gating developer-only controls, persisted under
/// its own key as `"0"`/`"1"`. Handles built over clones of one store all
/// observe each other's writes through the store's event bus; a handle also
/// hears its own write back, so listeners must tolerate duplicates.
pub struct DebugChannel<S> {
    store: S,
    value: bool,
}

impl<S: SaveStore> DebugChannel<S> {
    /// Reads the persisted flag once; `initial_override` stands in when
    /// nothing was stored yet.
    pub fn new(store: S, initial_override: Option<bool>) -> Result<Self> {
        let stored = store.read(DEBUG_KEY)?.map(|bytes| bytes == b"1");
        let value = stored.or(initial_override).unwrap_or(false);
        Ok(Self { store, value })
    }

    pub fn get(&self) -> bool {
        self.value
    }

    /// Updates the in-memory value, persists it, and (through the store)
    /// broadcasts the change to every subscriber.
    pub fn set(&mut self, on: bool) -> Result<()> {
        self.value = on;
        self.store.write(DEBUG_KEY, if on { b"1" } else { b"0" })
    }

    /// Apply a change observed from another handle's broadcast. Idempotent.
    pub fn sync(&mut self, on: bool) {
        self.value = on;
    }

    pub fn subscribe(&self) -> DebugEvents {
        DebugEvents {
            rx: self.store.subscribe(),
        }
    }
}

pub struct DebugEvents {
    rx: broadcast::Receiver<StoreEvent>,
}

impl DebugEvents {
    /// Next observed flag value, or `None` when every store handle is gone.
    /// Writes to other keys are skipped; lagged receivers resubscribe to
    /// the live stream.
    pub async fn next(&mut self) -> Option<bool> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.key == DEBUG_KEY => {
                    return Some(event.value == b"1");
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
