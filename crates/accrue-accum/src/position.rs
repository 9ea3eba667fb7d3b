//! Position records and the reward query.
//!
//! A position stores its share count, the accumulator value it last
//! synchronized against, rewards already owed but not paid, and an opaque
//! options blob. Entitlement is never pushed to positions; it is computed on
//! demand:
//!
//! ```text
//! owed = unclaimed + (value_per_share - snapshot) * num_shares
//! ```
//!
//! The primitives here do not touch the accumulator's share total. Use the
//! operations in [`crate::lifecycle`] unless you pair every share change with
//! [`AccumulatorObject::set_total_shares`] yourself.

use accrue_store::{codec, KvStore, StoreError};
use accrue_types::{Decimal, RewardVector, TypesError};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::accumulator::AccumulatorObject;
use crate::{keys, AccumError, Result, Violation};

/// Opaque caller configuration attached to a position at creation.
///
/// The accumulator stores and returns it unchanged and never reads it.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOptions {
    #[serde_as(as = "serde_with::hex::Hex")]
    payload: Vec<u8>,
}

impl PositionOptions {
    /// Wrap an opaque caller payload.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The payload exactly as it was stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }
}

/// One owner's stake in an accumulator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Shares held.
    pub num_shares: Decimal,
    /// Accumulator value per share at the last synchronization point.
    pub accum_value_per_share: RewardVector,
    /// Rewards computed as owed but not yet paid out.
    pub unclaimed_rewards_total: RewardVector,
    /// Caller options, immutable for the position's lifetime.
    #[serde(default)]
    pub options: Option<PositionOptions>,
}

impl AccumulatorObject {
    /// Write the position at `index`, overwriting any existing record.
    ///
    /// # Errors
    ///
    /// - [`AccumError::InvalidName`] if `index` is empty
    /// - [`AccumError::NonPositiveShares`] if `num_shares` is negative
    /// - [`AccumError::InvariantViolation`] if `snapshot` is ahead of the
    ///   accumulator value in any denomination
    pub fn init_or_update_position<S: KvStore + ?Sized>(
        &self,
        store: &mut S,
        index: &str,
        num_shares: Decimal,
        snapshot: &RewardVector,
        unclaimed_rewards_total: &RewardVector,
        options: Option<PositionOptions>,
    ) -> Result<()> {
        keys::validate_index(index)?;
        if num_shares < Decimal::ZERO {
            return Err(AccumError::NonPositiveShares(num_shares));
        }
        self.accrued_per_share(snapshot)?;

        let position = Position {
            num_shares,
            accum_value_per_share: snapshot.clone(),
            unclaimed_rewards_total: unclaimed_rewards_total.clone(),
            options,
        };
        codec::set_record(store, &keys::position_key(self.name(), index), &position)?;

        tracing::debug!(
            accumulator = %self.name(),
            index,
            num_shares = %num_shares,
            "position written"
        );
        Ok(())
    }

    /// Fetch the position at `index`.
    ///
    /// # Errors
    ///
    /// - [`AccumError::PositionNotFound`] if absent; this is an expected
    ///   outcome when probing
    pub fn get_position<S: KvStore + ?Sized>(&self, store: &S, index: &str) -> Result<Position> {
        let position: Option<Position> =
            codec::get_record(store, &keys::position_key(self.name(), index))?;
        position.ok_or_else(|| AccumError::PositionNotFound {
            name: self.name().to_string(),
            index: index.to_string(),
        })
    }

    /// Whether a position exists at `index`.
    pub fn has_position<S: KvStore + ?Sized>(&self, store: &S, index: &str) -> Result<bool> {
        Ok(store.has(&keys::position_key(self.name(), index))?)
    }

    /// Shares held by the position at `index`.
    pub fn get_position_size<S: KvStore + ?Sized>(
        &self,
        store: &S,
        index: &str,
    ) -> Result<Decimal> {
        Ok(self.get_position(store, index)?.num_shares)
    }

    /// Total rewards owed to `position`: its unclaimed rewards plus
    /// everything accrued since its snapshot.
    ///
    /// Pure: nothing is written, and calling it twice without an
    /// intervening change returns the same vector.
    ///
    /// # Errors
    ///
    /// - [`AccumError::InvariantViolation`] if the snapshot is ahead of the
    ///   accumulator value
    /// - [`AccumError::Types`] on decimal overflow
    pub fn get_total_rewards(&self, position: &Position) -> Result<RewardVector> {
        let diff = self.accrued_per_share(&position.accum_value_per_share)?;
        let accrued = diff.mul_dec(position.num_shares)?;
        Ok(position.unclaimed_rewards_total.add(&accrued)?)
    }

    /// All positions of this accumulator, in index order.
    ///
    /// Scans the accumulator's whole position range; meant for debugging
    /// and migrations.
    pub fn positions<S: KvStore + ?Sized>(&self, store: &S) -> Result<Vec<(String, Position)>> {
        store
            .scan_prefix(&keys::position_prefix(self.name()))?
            .into_iter()
            .map(|(key, value)| -> Result<(String, Position)> {
                let index = keys::position_index_from_key(self.name(), &key).ok_or_else(|| {
                    StoreError::Deserialization(format!("malformed position key {key:?}"))
                })?;
                Ok((index.to_string(), codec::from_slice(&value)?))
            })
            .collect()
    }

    /// `value_per_share - snapshot`, refusing snapshots from the future.
    pub(crate) fn accrued_per_share(&self, snapshot: &RewardVector) -> Result<RewardVector> {
        match self.value().safe_sub(snapshot) {
            Ok(diff) => Ok(diff),
            Err(TypesError::NegativeComponent {
                denom,
                available,
                requested,
            }) => {
                let violation = Violation::SnapshotAhead {
                    name: self.name().to_string(),
                    denom,
                    global: available,
                    snapshot: requested,
                };
                tracing::error!(%violation, "accumulator invariant violated");
                Err(violation.into())
            }
            Err(other) => Err(other.into()),
        }
    }
}

/// Fetch the position `(name, index)`.
pub fn get_position<S: KvStore + ?Sized>(store: &S, name: &str, index: &str) -> Result<Position> {
    AccumulatorObject::load(store, name)?.get_position(store, index)
}

/// Write the position `(name, index)`; see
/// [`AccumulatorObject::init_or_update_position`].
pub fn init_or_update_position<S: KvStore + ?Sized>(
    store: &mut S,
    name: &str,
    index: &str,
    num_shares: Decimal,
    snapshot: &RewardVector,
    unclaimed_rewards_total: &RewardVector,
    options: Option<PositionOptions>,
) -> Result<()> {
    let accum = AccumulatorObject::load(store, name)?;
    accum.init_or_update_position(
        store,
        index,
        num_shares,
        snapshot,
        unclaimed_rewards_total,
        options,
    )
}

/// Total rewards owed to `position` under `accum`.
pub fn get_total_rewards(accum: &AccumulatorObject, position: &Position) -> Result<RewardVector> {
    accum.get_total_rewards(position)
}
