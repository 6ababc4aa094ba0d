//! Per-instance spawn/despawn lifecycle.
//!
//! ```text
//! Inactive -> SpawningIn -> Active -> DespawningOut -> Inactive
//!                 \________________________^
//! ```
//!
//! Interaction surfaces (colliders) are only enabled while `Active`. Each
//! transition start hands out a fresh [`TransitionToken`]; only the token
//! currently pending on the element can complete it.

use crate::scheduler::{TransitionPhase, TransitionToken};

/// Lifecycle state of a pooled instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Parked in the pool's free queue.
    Inactive,
    /// Playing the enter transition; colliders off.
    SpawningIn,
    /// Fully in the world; colliders on.
    Active,
    /// Playing the exit transition; colliders off.
    DespawningOut,
}

impl LifecycleState {
    /// Whether a caller currently holds this instance.
    pub fn is_on_loan(self) -> bool {
        matches!(self, Self::SpawningIn | Self::Active)
    }
}

/// The lifecycle refused to start a transition from its current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot start {requested:?} transition from {from:?}")]
pub struct InvalidTransition {
    /// State the element was in.
    pub from: LifecycleState,
    /// Transition that was requested.
    pub requested: TransitionPhase,
}

/// Outcome of delivering a token back to an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Enter finished; the element is now `Active`.
    Activated,
    /// Exit finished; the element is now `Inactive` and may be requeued.
    Returned,
    /// The token is not the pending one (cancelled, superseded, or reused).
    Stale,
}

/// Lifecycle wrapper carried by every pooled instance.
#[derive(Clone, Debug)]
pub struct SpawnableElement {
    state: LifecycleState,
    generation: u32,
    next_serial: u64,
    colliders_enabled: bool,
    pending: Option<TransitionToken>,
}

impl SpawnableElement {
    /// A fresh, inactive element.
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Inactive,
            generation: 0,
            next_serial: 0,
            colliders_enabled: false,
            pending: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Reuse counter; bumped on every spawn.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn colliders_enabled(&self) -> bool {
        self.colliders_enabled
    }

    /// The token that will complete the running transition, if any.
    pub fn pending(&self) -> Option<TransitionToken> {
        self.pending
    }

    fn issue(&mut self, slot: u32, phase: TransitionPhase) -> TransitionToken {
        let token = TransitionToken {
            slot,
            generation: self.generation,
            serial: self.next_serial,
            phase,
        };
        self.next_serial += 1;
        self.pending = Some(token);
        token
    }

    /// `Inactive -> SpawningIn`. Starts a new loan generation.
    pub fn begin_spawn(&mut self, slot: u32) -> Result<TransitionToken, InvalidTransition> {
        if self.state != LifecycleState::Inactive {
            return Err(InvalidTransition {
                from: self.state,
                requested: TransitionPhase::Enter,
            });
        }
        self.generation = self.generation.wrapping_add(1);
        self.state = LifecycleState::SpawningIn;
        self.colliders_enabled = false;
        Ok(self.issue(slot, TransitionPhase::Enter))
    }

    /// `SpawningIn | Active -> DespawningOut`.
    ///
    /// Returns the new exit token and the enter token it superseded, which the
    /// caller must cancel with its scheduler.
    pub fn begin_despawn(
        &mut self,
        slot: u32,
    ) -> Result<(TransitionToken, Option<TransitionToken>), InvalidTransition> {
        if !self.state.is_on_loan() {
            return Err(InvalidTransition {
                from: self.state,
                requested: TransitionPhase::Exit,
            });
        }
        let superseded = self.pending.take();
        self.state = LifecycleState::DespawningOut;
        self.colliders_enabled = false;
        Ok((self.issue(slot, TransitionPhase::Exit), superseded))
    }

    /// Deliver a transition completion.
    pub fn complete(&mut self, token: TransitionToken) -> Completion {
        if self.pending != Some(token) {
            return Completion::Stale;
        }
        self.pending = None;
        match token.phase {
            TransitionPhase::Enter => {
                self.state = LifecycleState::Active;
                self.colliders_enabled = true;
                Completion::Activated
            }
            TransitionPhase::Exit => {
                self.state = LifecycleState::Inactive;
                self.colliders_enabled = false;
                Completion::Returned
            }
        }
    }

    /// Abort whatever is running and park the element as `Inactive`.
    ///
    /// Returns the token that was pending so the scheduler can drop it.
    pub fn cancel(&mut self) -> Option<TransitionToken> {
        self.state = LifecycleState::Inactive;
        self.colliders_enabled = false;
        self.pending.take()
    }
}

impl Default for SpawnableElement {
    fn default() -> Self {
        Self::new()
    }
}
