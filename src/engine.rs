use crate::{
    debug::{
        DebugChannel,
        DebugEvents,
    },
    error::GachaError,
    ledger::{
        Inventory,
        Ledger,
        Stats,
    },
    persist,
    pool::{
        self,
        Pool,
        PoolItem,
        PoolSource,
        Rarity,
    },
    roll::{
        RollOrchestrator,
        RollOutcome,
        SkipHandle,
        Step,
    },
    sampler::{
        self,
        WeightTable,
    },
    store::SaveStore,
};
use color_eyre::eyre::Result;
use rand::{
    SeedableRng,
    rngs::StdRng,
    seq::IndexedRandom,
};
use tokio::sync::watch;
use tracing::{
    debug,
    info,
};

/// What a click on the roll trigger should do, given the current phase.
#[derive(Debug, PartialEq, Eq)]
pub enum ClickAction {
    /// A settled result was dismissed; no draws were performed.
    Dismissed,
    /// The caller should drive a new roll via `run_roll`.
    StartRequested,
    /// Mid-animation clicks start nothing.
    Ignored,
    /// The pool never loaded; the trigger is disabled outright.
    Disabled,
}

/// The whole engine state in one injectable container: pool, weights,
/// ledger, save store, roll state machine, and debug channel. Loads from
/// the store on construction and saves after every mutation.
pub struct GachaEngine<S> {
    pool: Pool,
    weights: WeightTable,
    ledger: Ledger,
    store: S,
    orchestrator: RollOrchestrator,
    debug: DebugChannel<S>,
    preview_tx: watch::Sender<Option<PoolItem>>,
    rng: StdRng,
}

impl<S: SaveStore + Clone> GachaEngine<S> {
    /// Fetch the pool (falling back when the source is down), load the
    /// persisted ledger, and read the debug flag.
    pub async fn new(
        source: &impl PoolSource,
        store: S,
        debug_override: Option<bool>,
    ) -> Result<Self> {
        let pool = pool::load_pool(source).await;
        Self::assemble(pool, store, debug_override, StdRng::from_os_rng())
    }

    /// Build an engine over an already-materialized pool. Used by tests and
    /// by callers that manage fetching themselves.
    pub fn with_pool(pool: Pool, store: S, rng: StdRng) -> Result<Self> {
        Self::assemble(pool, store, None, rng)
    }

    fn assemble(
        pool: Pool,
        store: S,
        debug_override: Option<bool>,
        rng: StdRng,
    ) -> Result<Self> {
        let ledger = persist::load_or_default(&store).into_ledger();
        let debug = DebugChannel::new(store.clone(), debug_override)?;
        info!(
            pool_len = pool.len(),
            degraded = pool.degraded(),
            total_rolls = ledger.stats().total_rolls,
            "gacha engine ready"
        );
        let (preview_tx, _) = watch::channel(None);
        Ok(Self {
            pool,
            weights: WeightTable::default(),
            ledger,
            store,
            orchestrator: RollOrchestrator::new(),
            debug,
            preview_tx,
            rng,
        })
    }

    pub fn visible_pool(&self) -> &[PoolItem] {
        self.pool.items()
    }

    pub fn pool_degraded(&self) -> bool {
        self.pool.degraded()
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// The trigger precondition: a loaded pool and no roll in flight.
    pub fn can_roll(&self) -> bool {
        !self.pool.is_empty() && self.orchestrator.is_idle()
    }

    pub fn is_rolling(&self) -> bool {
        self.orchestrator.is_animating()
    }

    pub fn settled(&self) -> Option<&RollOutcome> {
        self.orchestrator.settled()
    }

    /// Route a click according to the current phase. Dismissing and
    /// starting never happen on the same click.
    pub fn handle_click(&mut self) -> ClickAction {
        if self.orchestrator.acknowledge() {
            return ClickAction::Dismissed;
        }
        if self.orchestrator.is_animating() {
            return ClickAction::Ignored;
        }
        if self.pool.is_empty() {
            return ClickAction::Disabled;
        }
        ClickAction::StartRequested
    }

    /// Run one roll to completion: animate with cosmetic previews, then
    /// commit `count` draws (clamped) and settle. The preview watch channel
    /// carries frames for the caller to display; the committed outcome is
    /// computed only after the animation resolves.
    pub async fn run_roll(&mut self, count: u32) -> Result<RollOutcome> {
        if self.pool.is_empty() {
            return Err(GachaError::PoolUnavailable.into());
        }
        self.orchestrator.begin(count, &mut self.rng)?;
        loop {
            match self.orchestrator.step().await {
                Step::Preview => {
                    let item = self.pool.items().choose(&mut self.rng);
                    self.preview_tx.send_replace(item.cloned());
                }
                Step::Commit => break,
            }
        }
        let outcome = match self.commit_draws() {
            Ok(outcome) => outcome,
            Err(error) => {
                self.orchestrator.abort();
                return Err(error);
            }
        };
        self.preview_tx.send_replace(Some(outcome.first.clone()));
        self.orchestrator.settle(outcome.clone());
        Ok(outcome)
    }

    fn commit_draws(&mut self) -> Result<RollOutcome> {
        let requested = self.orchestrator.requested().unwrap_or(1);
        let mut first = None;
        for _ in 0..requested {
            let rarity = sampler::sample_rarity(&mut self.rng, &self.weights)?;
            let item = sampler::sample_item(&mut self.rng, &self.pool, rarity)?.clone();
            self.ledger.record(&item);
            persist::persist(&mut self.store, &self.ledger)?;
            first.get_or_insert(item);
        }
        let first = first.ok_or(GachaError::PoolUnavailable)?;
        debug!(total = requested, first = %first.name, "roll committed");
        Ok(RollOutcome {
            first,
            total: requested,
        })
    }

    /// Dismiss a settled result. Performs no draws.
    pub fn acknowledge_result(&mut self) -> bool {
        self.orchestrator.acknowledge()
    }

    pub fn skip_handle(&self) -> SkipHandle {
        self.orchestrator.skip_handle()
    }

    pub fn preview_watch(&self) -> watch::Receiver<Option<PoolItem>> {
        self.preview_tx.subscribe()
    }

    pub fn inventory(&self) -> &Inventory {
        self.ledger.inventory()
    }

    pub fn stats(&self) -> &Stats {
        self.ledger.stats()
    }

    pub fn adjust_inventory(&mut self, name: &str, delta: i64) -> Result<()> {
        self.ledger.adjust(name, delta);
        persist::persist(&mut self.store, &self.ledger)
    }

    pub fn remove_from_inventory(&mut self, name: &str) -> Result<()> {
        self.ledger.remove(name);
        persist::persist(&mut self.store, &self.ledger)
    }

    /// Irreversibly zero inventory and stats. The caller is responsible
    /// for confirming with the user first.
    pub fn reset_all(&mut self) -> Result<()> {
        self.ledger.reset();
        persist::persist(&mut self.store, &self.ledger)
    }

    pub fn debug_flag(&self) -> bool {
        self.debug.get()
    }

    pub fn set_debug_flag(&mut self, on: bool) -> Result<()> {
        self.debug.set(on)
    }

    /// Fold in a flag change observed from another handle.
    pub fn sync_debug_flag(&mut self, on: bool) {
        self.debug.sync(on);
    }

    pub fn subscribe_debug(&self) -> DebugEvents {
        self.debug.subscribe()
    }

    /// Display snapshot for the presentation layer.
    pub fn snapshot(&self) -> EngineSnapshot {
        let mut rows: Vec<InventoryRow> = self
            .ledger
            .inventory()
            .iter()
            .map(|(name, count)| InventoryRow {
                name: name.clone(),
                count: *count,
                rarity: self
                    .pool
                    .items()
                    .iter()
                    .find(|item| item.name.eq_ignore_ascii_case(name))
                    .map(|item| item.rarity),
            })
            .collect();
        rows.sort_by(|a, b| {
            let left = a.rarity.map_or(u8::MAX, |r| r as u8);
            let right = b.rarity.map_or(u8::MAX, |r| r as u8);
            left.cmp(&right).then_with(|| a.name.cmp(&b.name))
        });
        EngineSnapshot {
            pool_len: self.pool.len(),
            degraded: self.pool.degraded(),
            total_rolls: self.ledger.stats().total_rolls,
            total_items: self.ledger.inventory().values().sum(),
            rows,
            by_rarity: Rarity::ALL
                .into_iter()
                .map(|r| {
                    (r, self.ledger.stats().by_rarity.get(&r).copied().unwrap_or(0))
                })
                .collect(),
            weights: self.weights.entries().collect(),
            debug: self.debug.get(),
            rolling: self.orchestrator.is_animating(),
            settled: self.orchestrator.settled().cloned(),
            preview: self.preview_tx.borrow().clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct InventoryRow {
    pub name: String,
    pub count: u64,
    /// Resolved from the current pool; historical names no longer in the
    /// pool have none.
    pub rarity: Option<Rarity>,
}

#[derive(Clone, Debug)]
pub struct EngineSnapshot {
    pub pool_len: usize,
    pub degraded: bool,
    pub total_rolls: u64,
    pub total_items: u64,
    pub rows: Vec<InventoryRow>,
    pub by_rarity: Vec<(Rarity, u64)>,
    pub weights: Vec<(Rarity, u32)>,
    pub debug: bool,
    pub rolling: bool,
    pub settled: Option<RollOutcome>,
    pub preview: Option<PoolItem>,
}
