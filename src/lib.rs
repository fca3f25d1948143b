pub mod debug;

pub mod engine;

pub mod error;

pub mod ledger;

pub mod persist;

pub mod pool;

pub mod roll;

pub mod sampler;

pub mod store;

pub use engine::{
    ClickAction,
    EngineSnapshot,
    GachaEngine,
    InventoryRow,
};
pub use error::GachaError;
pub use pool::{
    HttpPoolSource,
    Pool,
    PoolItem,
    PoolSource,
    Rarity,
};
pub use roll::{
    RollOutcome,
    SkipHandle,
};
pub use sampler::WeightTable;
pub use store::{
    InMemorySaveStore,
    SaveStore,
    SledSaveStore,
};
