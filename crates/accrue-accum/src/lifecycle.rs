//! Position lifecycle.
//!
//! Each operation here changes a position and the accumulator's share total
//! together, so the two cannot drift apart. Every share change settles the
//! position first: rewards accrued under the old share count move into
//! `unclaimed_rewards_total` and the snapshot advances to the current value.
//!
//! ```text
//! Absent --new_position--> Open --add/remove/claim--> Open
//! Open --close_position / delete_position--> Absent
//! ```
//!
//! Claims pay out the integer part of what is owed. The fractional dust stays
//! on the position until it either grows into a whole unit or the position is
//! closed, at which point the dust is handed back to the caller as well.

use accrue_store::KvStore;
use accrue_types::{Decimal, RewardVector};
use serde::{Deserialize, Serialize};

use crate::accumulator::AccumulatorObject;
use crate::position::{Position, PositionOptions};
use crate::{keys, AccumError, Result};

/// Outcome of a claim or close.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedRewards {
    /// Whole units to transfer to the owner.
    pub paid: RewardVector,
    /// Fractional remainder. Kept on the position unless `closed`, in which
    /// case the caller now owns it.
    pub dust: RewardVector,
    /// Whether the position record was removed.
    pub closed: bool,
}

fn ensure_positive(shares: Decimal) -> Result<()> {
    if shares <= Decimal::ZERO {
        return Err(AccumError::NonPositiveShares(shares));
    }
    Ok(())
}

impl AccumulatorObject {
    /// Open a position at the current accumulator value.
    ///
    /// # Errors
    ///
    /// - [`AccumError::NonPositiveShares`] if `num_shares <= 0`
    /// - [`AccumError::PositionExists`] if `index` is already open
    pub fn new_position<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: &str,
        num_shares: Decimal,
        options: Option<PositionOptions>,
    ) -> Result<()> {
        let snapshot = self.value().clone();
        self.new_position_interval_accumulation(store, index, num_shares, &snapshot, options)
    }

    /// Open a position whose snapshot is `snapshot` rather than the current
    /// value. Rewards between `snapshot` and the current value are owed to
    /// the position immediately.
    ///
    /// # Errors
    ///
    /// - [`AccumError::NonPositiveShares`] if `num_shares <= 0`
    /// - [`AccumError::PositionExists`] if `index` is already open
    /// - [`AccumError::InvariantViolation`] if `snapshot` is ahead of the
    ///   accumulator value
    pub fn new_position_interval_accumulation<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: &str,
        num_shares: Decimal,
        snapshot: &RewardVector,
        options: Option<PositionOptions>,
    ) -> Result<()> {
        keys::validate_index(index)?;
        ensure_positive(num_shares)?;
        if self.has_position(store, index)? {
            return Err(AccumError::PositionExists {
                name: self.name().to_string(),
                index: index.to_string(),
            });
        }
        self.next_total_shares(num_shares)?;

        self.init_or_update_position(
            store,
            index,
            num_shares,
            snapshot,
            &RewardVector::new(),
            options,
        )?;
        self.set_total_shares(store, num_shares)?;

        tracing::debug!(
            accumulator = %self.name(),
            index,
            num_shares = %num_shares,
            "position opened"
        );
        Ok(())
    }

    /// Add `shares` to an open position.
    ///
    /// # Errors
    ///
    /// - [`AccumError::NonPositiveShares`] if `shares <= 0`
    /// - [`AccumError::PositionNotFound`] if `index` is not open
    pub fn add_to_position<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: &str,
        shares: Decimal,
    ) -> Result<()> {
        ensure_positive(shares)?;
        let position = self.get_position(store, index)?;
        let num_shares = position
            .num_shares
            .checked_add(shares)
            .ok_or(accrue_types::TypesError::Overflow)?;
        self.resize_position(store, index, position, num_shares, shares)
    }

    /// Remove `shares` from an open position. The position stays open, even
    /// at zero shares, until it is claimed, closed or deleted.
    ///
    /// # Errors
    ///
    /// - [`AccumError::NonPositiveShares`] if `shares <= 0`
    /// - [`AccumError::PositionNotFound`] if `index` is not open
    /// - [`AccumError::InsufficientShares`] if `shares` exceeds the holding
    pub fn remove_from_position<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: &str,
        shares: Decimal,
    ) -> Result<()> {
        ensure_positive(shares)?;
        let position = self.get_position(store, index)?;
        if shares > position.num_shares {
            return Err(AccumError::InsufficientShares {
                index: index.to_string(),
                held: position.num_shares,
                requested: shares,
            });
        }
        let num_shares = position.num_shares - shares;
        self.resize_position(store, index, position, num_shares, -shares)
    }

    /// Settle `position`, store it with `num_shares`, and move the share
    /// total by `delta`.
    fn resize_position<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: &str,
        position: Position,
        num_shares: Decimal,
        delta: Decimal,
    ) -> Result<()> {
        let unclaimed = self.get_total_rewards(&position)?;
        self.next_total_shares(delta)?;

        let snapshot = self.value().clone();
        self.init_or_update_position(
            store,
            index,
            num_shares,
            &snapshot,
            &unclaimed,
            position.options,
        )?;
        self.set_total_shares(store, delta)?;

        tracing::debug!(
            accumulator = %self.name(),
            index,
            delta = %delta,
            num_shares = %num_shares,
            unclaimed = %unclaimed,
            "position resized"
        );
        Ok(())
    }

    /// Pay out the whole units owed to `index` and re-snapshot it.
    ///
    /// A position already at zero shares is removed, and its dust is
    /// returned with `closed = true`.
    ///
    /// # Errors
    ///
    /// - [`AccumError::PositionNotFound`] if `index` is not open
    /// - [`AccumError::InvariantViolation`] on a corrupted snapshot
    pub fn claim_rewards<S: KvStore + ?Sized>(
        &self,
        store: &mut S,
        index: &str,
    ) -> Result<ClaimedRewards> {
        let position = self.get_position(store, index)?;
        let owed = self.get_total_rewards(&position)?;
        let (paid, dust) = owed.truncate();

        let closed = position.num_shares.is_zero();
        if closed {
            store.delete(&keys::position_key(self.name(), index))?;
        } else {
            let snapshot = self.value().clone();
            self.init_or_update_position(
                store,
                index,
                position.num_shares,
                &snapshot,
                &dust,
                position.options,
            )?;
        }

        tracing::debug!(
            accumulator = %self.name(),
            index,
            paid = %paid,
            dust = %dust,
            closed,
            "rewards claimed"
        );
        Ok(ClaimedRewards { paid, dust, closed })
    }

    /// Move the snapshot of `index` to `snapshot` without settling.
    ///
    /// Rewards between the old and new snapshot are not credited; this is
    /// for callers that track interval accumulation themselves.
    ///
    /// # Errors
    ///
    /// - [`AccumError::PositionNotFound`] if `index` is not open
    /// - [`AccumError::InvariantViolation`] if `snapshot` is ahead of the
    ///   accumulator value
    pub fn set_position_interval_accumulation<S: KvStore + ?Sized>(
        &self,
        store: &mut S,
        index: &str,
        snapshot: &RewardVector,
    ) -> Result<()> {
        let position = self.get_position(store, index)?;
        self.init_or_update_position(
            store,
            index,
            position.num_shares,
            snapshot,
            &position.unclaimed_rewards_total,
            position.options,
        )
    }

    /// Remove a position that holds no shares and is owed nothing.
    ///
    /// # Errors
    ///
    /// - [`AccumError::PositionNotFound`] if `index` is not open
    /// - [`AccumError::PositionNotEmpty`] if it still holds shares or owed
    ///   rewards
    pub fn delete_position<S: KvStore + ?Sized>(&self, store: &mut S, index: &str) -> Result<()> {
        let position = self.get_position(store, index)?;
        let owed = self.get_total_rewards(&position)?;
        if !position.num_shares.is_zero() || !owed.is_zero() {
            return Err(AccumError::PositionNotEmpty {
                index: index.to_string(),
            });
        }
        store.delete(&keys::position_key(self.name(), index))?;

        tracing::debug!(accumulator = %self.name(), index, "position deleted");
        Ok(())
    }

    /// Remove all shares of `index`, pay out everything owed and delete the
    /// record. Both whole units and dust are returned.
    ///
    /// # Errors
    ///
    /// - [`AccumError::PositionNotFound`] if `index` is not open
    /// - [`AccumError::InvariantViolation`] on a corrupted snapshot
    pub fn close_position<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: &str,
    ) -> Result<ClaimedRewards> {
        let position = self.get_position(store, index)?;
        let owed = self.get_total_rewards(&position)?;
        let delta = -position.num_shares;
        self.next_total_shares(delta)?;

        store.delete(&keys::position_key(self.name(), index))?;
        self.set_total_shares(store, delta)?;

        let (paid, dust) = owed.truncate();
        tracing::debug!(
            accumulator = %self.name(),
            index,
            paid = %paid,
            dust = %dust,
            "position closed"
        );
        Ok(ClaimedRewards {
            paid,
            dust,
            closed: true,
        })
    }
}
