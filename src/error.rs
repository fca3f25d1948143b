use thiserror::Error;

/// Failure taxonomy for the gacha engine.
///
/// `StorageCorrupt` is recovered internally by discarding the saved record;
/// it never reaches the caller through the load path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GachaError {
    #[error("no items available to sample from")]
    PoolUnavailable,

    #[error("weight table has no positive weight")]
    DegenerateWeights,

    #[error("saved state is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("a roll is already in progress")]
    RollInProgress,
}
