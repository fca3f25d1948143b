use crate::pool::{
    PoolItem,
    Rarity,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;

/// Count of owned items by canonical name. Names outlive pool membership:
/// an item dropped upstream keeps its historical count here.
pub type Inventory = BTreeMap<String, u64>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_rolls: u64,
    pub by_rarity: BTreeMap<Rarity, u64>,
}

impl Stats {
    pub fn rarity_total(&self) -> u64 {
        self.by_rarity.values().sum()
    }
}

/// Running inventory and roll statistics. All mutation of either map goes
/// through this type; `total_rolls == sum(by_rarity)` at every exit point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    inventory: Inventory,
    stats: Stats,
}

impl Ledger {
    pub fn new(inventory: Inventory, stats: Stats) -> Self {
        Self { inventory, stats }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Merge one committed draw: bumps the item count and both stat
    /// counters as a single atomic pair.
    pub fn record(&mut self, item: &PoolItem) {
        *self.inventory.entry(item.name.clone()).or_insert(0) += 1;
        self.stats.total_rolls += 1;
        *self.stats.by_rarity.entry(item.rarity).or_insert(0) += 1;
    }

    /// Manual inventory edit. Counts floor at zero and the entry survives
    /// at zero; stats are roll history and stay untouched.
    pub fn adjust(&mut self, name: &str, delta: i64) {
        let count = self.inventory.entry(name.to_string()).or_insert(0);
        *count = count.saturating_add_signed(delta);
    }

    pub fn remove(&mut self, name: &str) {
        self.inventory.remove(name);
    }

    /// Destructive full reset of inventory and stats. Callers must confirm
    /// with the user before invoking.
    pub fn reset(&mut self) {
        self.inventory.clear();
        self.stats = Stats::default();
    }
}
