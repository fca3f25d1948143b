// Key-value save stores with publish-on-write change notifications.
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use sled::{
    Config,
    Db,
    Tree,
};
use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;
const SAVE_TREE: &str = "gacha_save";

/// Emitted to every subscriber after a write lands, including the handle
/// that wrote it. Subscribers filter by key.
#[derive(Clone, Debug)]
pub struct StoreEvent {
    pub key: String,
    pub value: Vec<u8>,
}

pub trait SaveStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Persist the value, then publish a `StoreEvent` to all subscribers.
    fn write(&mut self, key: &str, value: &[u8]) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

#[derive(Clone)]
pub struct SledSaveStore {
    tree: Tree,
    events: broadcast::Sender<StoreEvent>,
}

impl SledSaveStore {
    pub fn new(db: &Db) -> Result<Self> {
        let tree = db.open_tree(SAVE_TREE).wrap_err("open gacha save tree")?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self { tree, events })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Config::default()
            .path(path)
            .open()
            .wrap_err("open sled database")?;
        Self::new(&db)
    }
}

impl SaveStore for SledSaveStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.tree.get(key).wrap_err("read save entry")?;
        Ok(value.map(|bytes| bytes.to_vec()))
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.tree.insert(key, value).wrap_err("persist save entry")?;
        self.tree.flush().wrap_err("flush save entry")?;
        let _ = self.events.send(StoreEvent {
            key: key.to_string(),
            value: value.to_vec(),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[derive(Clone)]
pub struct InMemorySaveStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl InMemorySaveStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }
}

impl Default for InMemorySaveStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveStore for InMemorySaveStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let guard = self.entries.lock().unwrap();
        Ok(guard.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let mut guard = self.entries.lock().unwrap();
        guard.insert(key.to_string(), value.to_vec());
        drop(guard);
        let _ = self.events.send(StoreEvent {
            key: key.to_string(),
            value: value.to_vec(),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use tempdir::TempDir;

    #[test]
    fn sut__when_writing_then_reading_returns_the_value() {
        // given
        let temp_dir = TempDir::new("sled_save_store").unwrap();
        let mut store = SledSaveStore::open(temp_dir.path()).unwrap();

        // when
        store.write("some-key", b"some value").unwrap();

        // then
        let loaded = store.read("some-key").unwrap();
        assert_eq!(loaded.as_deref(), Some(&b"some value"[..]));
    }

    #[test]
    fn sut__when_key_is_absent_then_read_returns_none() {
        let temp_dir = TempDir::new("sled_save_store_absent").unwrap();
        let store = SledSaveStore::open(temp_dir.path()).unwrap();

        assert!(store.read("missing").unwrap().is_none());
    }

    #[test]
    fn sut__when_reopened_then_values_survive() {
        // given
        let temp_dir = TempDir::new("sled_save_store_reopen").unwrap();
        {
            let mut store = SledSaveStore::open(temp_dir.path()).unwrap();
            store.write("durable", b"1").unwrap();
        }

        // when
        let store = SledSaveStore::open(temp_dir.path()).unwrap();

        // then
        assert_eq!(store.read("durable").unwrap().as_deref(), Some(&b"1"[..]));
    }

    #[tokio::test]
    async fn sut__when_one_clone_writes_then_other_subscribers_are_notified() {
        // given
        let mut writer = InMemorySaveStore::new();
        let reader = writer.clone();
        let mut events = reader.subscribe();

        // when
        writer.write("flag", b"1").unwrap();

        // then
        let event = events.recv().await.unwrap();
        assert_eq!(event.key, "flag");
        assert_eq!(event.value, b"1");
        assert_eq!(reader.read("flag").unwrap().as_deref(), Some(&b"1"[..]));
    }
}
