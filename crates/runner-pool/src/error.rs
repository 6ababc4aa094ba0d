//! Pool error types.

use crate::{InstanceId, LifecycleState, PrefabKind, lifecycle::InvalidTransition};

/// Errors returned by [`Pool`](crate::Pool) operations.
///
/// None of these leave the pool in a changed state.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoolError {
    /// The prefab kind was never registered.
    #[error("prefab kind {0:?} was never registered")]
    UnknownKind(PrefabKind),

    /// The handle points at a slot that does not exist or was destroyed.
    #[error("instance {0:?} does not exist")]
    UnknownInstance(InstanceId),

    /// The slot was reused since this handle was issued.
    #[error("instance {0:?} is a stale handle")]
    StaleHandle(InstanceId),

    /// Release of an instance that is not currently on loan.
    #[error("instance {id:?} is not on loan (state {state:?})")]
    NotOnLoan {
        /// The offending handle.
        id: InstanceId,
        /// The state the instance was found in.
        state: LifecycleState,
    },

    /// The lifecycle state machine refused a transition.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}
