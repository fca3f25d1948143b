// Roll animation state machine: Idle -> Animating -> Settled -> Idle.
use crate::{
    error::GachaError,
    pool::PoolItem,
};
use rand::Rng;
use std::{
    future::pending,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::Notify,
    time::{
        self,
        Instant,
        Interval,
    },
};

pub const MIN_ANIMATION_MS: u64 = 5_000;
pub const MAX_ANIMATION_MS: u64 = 7_000;
pub const PREVIEW_FRAME_MS: u64 = 120;
pub const MIN_ROLL_COUNT: u32 = 1;
pub const MAX_ROLL_COUNT: u32 = 10_000;

pub fn clamp_roll_count(requested: u32) -> u32 {
    requested.clamp(MIN_ROLL_COUNT, MAX_ROLL_COUNT)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollOutcome {
    pub first: PoolItem,
    pub total: u32,
}

enum Phase {
    Idle,
    Animating {
        requested: u32,
        deadline: Instant,
        // Owned by the phase so dropping the variant always clears the
        // recurring preview timer.
        frames: Interval,
    },
    Settled(RollOutcome),
}

/// What the animation wait resolved to.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Time for the next cosmetic preview frame.
    Preview,
    /// The animation window elapsed (or was skipped); commit the draws now.
    Commit,
}

pub struct RollOrchestrator {
    phase: Phase,
    skip: Arc<Notify>,
}

impl RollOrchestrator {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            skip: Arc::new(Notify::new()),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Animating { .. })
    }

    pub fn settled(&self) -> Option<&RollOutcome> {
        match &self.phase {
            Phase::Settled(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn requested(&self) -> Option<u32> {
        match &self.phase {
            Phase::Animating { requested, .. } => Some(*requested),
            _ => None,
        }
    }

    /// Arm the animation: one duration drawn per roll from the bounded
    /// range, preview frames on a short fixed interval. Re-entrant starts
    /// are refused; a settled result must be acknowledged first.
    pub fn begin<R: Rng + ?Sized>(
        &mut self,
        requested: u32,
        rng: &mut R,
    ) -> Result<(), GachaError> {
        if !self.is_idle() {
            return Err(GachaError::RollInProgress);
        }
        let duration =
            Duration::from_millis(rng.random_range(MIN_ANIMATION_MS..=MAX_ANIMATION_MS));
        self.phase = Phase::Animating {
            requested: clamp_roll_count(requested),
            deadline: Instant::now() + duration,
            frames: time::interval(Duration::from_millis(PREVIEW_FRAME_MS)),
        };
        Ok(())
    }

    /// Wait for the next animation event. Pends forever outside of
    /// `Animating`, so this is safe to park in a `select!` arm. The
    /// deadline and the skip token both win over a due preview frame.
    pub async fn step(&mut self) -> Step {
        let Phase::Animating {
            deadline, frames, ..
        } = &mut self.phase
        else {
            return pending().await;
        };
        tokio::select! {
            biased;
            _ = time::sleep_until(*deadline) => Step::Commit,
            _ = self.skip.notified() => Step::Commit,
            _ = frames.tick() => Step::Preview,
        }
    }

    /// Transition to `Settled`, dropping the preview timer with the old
    /// phase.
    pub fn settle(&mut self, outcome: RollOutcome) {
        self.phase = Phase::Settled(outcome);
    }

    /// Back to `Idle` without settling, clearing any armed timers. Used
    /// when a roll cannot commit.
    pub fn abort(&mut self) {
        self.phase = Phase::Idle;
    }

    /// A click on a settled result only dismisses it. Returns whether a
    /// result was dismissed.
    pub fn acknowledge(&mut self) -> bool {
        if matches!(self.phase, Phase::Settled(_)) {
            self.phase = Phase::Idle;
            true
        } else {
            false
        }
    }

    pub fn skip_handle(&self) -> SkipHandle {
        SkipHandle(Arc::clone(&self.skip))
    }
}

impl Default for RollOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation token for the animation phase only: cutting the wait short
/// never cancels the committed outcome.
#[derive(Clone)]
pub struct SkipHandle(Arc<Notify>);

impl SkipHandle {
    pub fn skip(&self) {
        self.0.notify_waiters();
    }
}
