//! # accrue-accum
//!
//! Share-based lazy reward accumulator.
//!
//! An [`AccumulatorObject`] tracks the cumulative reward value credited per
//! unit share and the total number of outstanding shares. Injecting rewards
//! touches only that one record. Each [`Position`] remembers the per-share
//! value it last synchronized against, so its entitlement is computed on
//! demand as `(current - snapshot) * shares + unclaimed`.
//!
//! ## Modules
//!
//! - [`accumulator`]: accumulator record, reward injection, share totals
//! - [`position`]: position records and the pure reward query
//! - [`lifecycle`]: open / adjust / claim / close operations that keep
//!   positions and the share total in step
//! - [`keys`]: storage key layout

pub mod accumulator;
pub mod keys;
pub mod lifecycle;
pub mod position;

pub use accumulator::{
    add_to_accumulator, create_accumulator, get_accumulator, get_accumulator_value,
    list_accumulators, set_total_shares, AccumulatorObject,
};
pub use lifecycle::ClaimedRewards;
pub use position::{
    get_position, get_total_rewards, init_or_update_position, Position, PositionOptions,
};

use accrue_store::StoreError;
use accrue_types::{Decimal, TypesError};

/// Broken accumulator invariants.
///
/// These indicate a bypassed settlement path, a corrupted store or a caller
/// bug. The enclosing transaction must be aborted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// A position snapshot is ahead of the accumulator's value.
    #[error("snapshot ahead of {name} for {denom}: {snapshot} > {global}")]
    SnapshotAhead {
        /// Accumulator name.
        name: String,
        /// Denomination where the snapshot is ahead.
        denom: String,
        /// Accumulator value per share for `denom`.
        global: Decimal,
        /// Position snapshot for `denom`.
        snapshot: Decimal,
    },

    /// A share adjustment would make the total negative.
    #[error("total shares of {name} would become negative: {total} + {delta}")]
    NegativeTotalShares {
        /// Accumulator name.
        name: String,
        /// Total before the adjustment.
        total: Decimal,
        /// Requested adjustment.
        delta: Decimal,
    },
}

/// Error types for accumulator operations.
#[derive(Debug, thiserror::Error)]
pub enum AccumError {
    /// Storage backend failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reward vector arithmetic failure.
    #[error(transparent)]
    Types(#[from] TypesError),

    /// An accumulator with this name already exists.
    #[error("accumulator already exists: {name}")]
    AccumulatorExists {
        /// The duplicate name.
        name: String,
    },

    /// No accumulator with this name.
    #[error("accumulator not found: {name}")]
    AccumulatorNotFound {
        /// The missing name.
        name: String,
    },

    /// No position at this index.
    #[error("no position {index} in accumulator {name}")]
    PositionNotFound {
        /// Accumulator name.
        name: String,
        /// Owner index.
        index: String,
    },

    /// A position already exists at this index.
    #[error("position {index} already exists in accumulator {name}")]
    PositionExists {
        /// Accumulator name.
        name: String,
        /// Owner index.
        index: String,
    },

    /// Accumulator name or owner index is not usable as a key component.
    #[error("invalid key component: {0:?}")]
    InvalidName(String),

    /// Share amounts must be strictly positive.
    #[error("share amount must be positive, got {0}")]
    NonPositiveShares(Decimal),

    /// Removing more shares than the position holds.
    #[error("cannot remove {requested} shares from {index} holding {held}")]
    InsufficientShares {
        /// Owner index.
        index: String,
        /// Shares currently held.
        held: Decimal,
        /// Shares requested for removal.
        requested: Decimal,
    },

    /// Deleting a position that still holds shares or owed rewards.
    #[error("position {index} still holds shares or unclaimed rewards")]
    PositionNotEmpty {
        /// Owner index.
        index: String,
    },

    /// An accumulator invariant does not hold.
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] Violation),
}

impl AccumError {
    /// Whether the error must abort the enclosing transaction.
    ///
    /// Not-found, duplicate and argument errors are recoverable; callers may
    /// probe and retry with different input.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AccumError::InvariantViolation(_)
                | AccumError::Store(_)
                | AccumError::Types(TypesError::Overflow)
        )
    }
}

/// Convenience result type for accumulator operations.
pub type Result<T> = std::result::Result<T, AccumError>;
