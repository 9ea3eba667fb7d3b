//! Accumulator record and reward injection.
//!
//! The accumulator stores two values under `accum/acc/{name}`:
//!
//! ```text
//! value_per_share  cumulative reward per unit share since creation
//! total_shares     sum of num_shares over all open positions
//! ```
//!
//! Injecting `amount` while `total_shares > 0` adds `amount / total_shares`
//! to `value_per_share`, rounded down so positions can never be owed more
//! than was injected. This is O(1) in the number of positions.
//!
//! An [`AccumulatorObject`] is a handle over the loaded record. Every
//! mutating method writes through to the store before updating the handle,
//! so a failed write leaves the handle unchanged. Load one handle per
//! accumulator per transaction; two live handles for the same name would
//! overwrite each other.

use accrue_store::{codec, KvStore, StoreError};
use accrue_types::{Decimal, RewardVector, TypesError};
use serde::{Deserialize, Serialize};

use crate::{keys, AccumError, Result, Violation};

/// Persisted accumulator state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct AccumulatorState {
    value_per_share: RewardVector,
    total_shares: Decimal,
}

/// Handle over one persisted accumulator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccumulatorObject {
    name: String,
    #[serde(flatten)]
    state: AccumulatorState,
}

impl AccumulatorObject {
    /// Create a new accumulator with zero value and zero shares.
    ///
    /// # Errors
    ///
    /// - [`AccumError::InvalidName`] if `name` is not a valid key component
    /// - [`AccumError::AccumulatorExists`] if `name` is taken
    pub fn create<S: KvStore + ?Sized>(store: &mut S, name: &str) -> Result<Self> {
        keys::validate_name(name)?;
        let key = keys::accumulator_key(name);
        if store.has(&key)? {
            return Err(AccumError::AccumulatorExists {
                name: name.to_string(),
            });
        }

        let accum = Self {
            name: name.to_string(),
            state: AccumulatorState::default(),
        };
        codec::set_record(store, &key, &accum.state)?;

        tracing::info!(accumulator = name, "accumulator created");
        Ok(accum)
    }

    /// Load an existing accumulator.
    ///
    /// # Errors
    ///
    /// - [`AccumError::AccumulatorNotFound`] if no record exists
    pub fn load<S: KvStore + ?Sized>(store: &S, name: &str) -> Result<Self> {
        keys::validate_name(name)?;
        let state: Option<AccumulatorState> =
            codec::get_record(store, &keys::accumulator_key(name))?;
        match state {
            Some(state) => Ok(Self {
                name: name.to_string(),
                state,
            }),
            None => Err(AccumError::AccumulatorNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Whether an accumulator named `name` exists.
    pub fn exists<S: KvStore + ?Sized>(store: &S, name: &str) -> Result<bool> {
        keys::validate_name(name)?;
        Ok(store.has(&keys::accumulator_key(name))?)
    }

    /// Accumulator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cumulative reward value per unit share.
    pub fn value(&self) -> &RewardVector {
        &self.state.value_per_share
    }

    /// Sum of shares across all open positions.
    pub fn total_shares(&self) -> Decimal {
        self.state.total_shares
    }

    /// Distribute `amount` across all outstanding shares.
    ///
    /// Returns the per-share increment that was applied. When there are no
    /// outstanding shares the amount is discarded and the returned vector is
    /// empty; callers that must not lose value should hold it until shares
    /// exist.
    ///
    /// # Errors
    ///
    /// - [`AccumError::Types`] on decimal overflow
    pub fn add_to_accumulator<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        amount: &RewardVector,
    ) -> Result<RewardVector> {
        if amount.is_zero() {
            return Ok(RewardVector::new());
        }
        if self.state.total_shares.is_zero() {
            tracing::warn!(
                accumulator = %self.name,
                amount = %amount,
                "no outstanding shares, injected rewards discarded"
            );
            return Ok(RewardVector::new());
        }

        let per_share = amount.quo_dec_truncate(self.state.total_shares)?;
        self.update_accumulator(store, &per_share)?;

        tracing::debug!(
            accumulator = %self.name,
            amount = %amount,
            per_share = %per_share,
            total_shares = %self.state.total_shares,
            "rewards injected"
        );
        Ok(per_share)
    }

    /// Add an already-divided per-share amount to the accumulator value.
    ///
    /// # Errors
    ///
    /// - [`AccumError::Types`] on decimal overflow
    pub fn update_accumulator<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        per_share: &RewardVector,
    ) -> Result<()> {
        let next = AccumulatorState {
            value_per_share: self.state.value_per_share.add(per_share)?,
            total_shares: self.state.total_shares,
        };
        self.commit(store, next)
    }

    /// Adjust the outstanding share total by a signed `delta`.
    ///
    /// Callers using the two-step position primitives must pair every
    /// position share change with a call here. The lifecycle operations in
    /// [`crate::lifecycle`] do this themselves.
    ///
    /// # Errors
    ///
    /// - [`AccumError::InvariantViolation`] if the total would go negative;
    ///   nothing is written
    pub fn set_total_shares<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        delta: Decimal,
    ) -> Result<()> {
        let total_shares = self.next_total_shares(delta)?;
        let next = AccumulatorState {
            value_per_share: self.state.value_per_share.clone(),
            total_shares,
        };
        self.commit(store, next)
    }

    /// Total shares after applying `delta`, without writing anything.
    pub(crate) fn next_total_shares(&self, delta: Decimal) -> Result<Decimal> {
        let total = self
            .state
            .total_shares
            .checked_add(delta)
            .ok_or(TypesError::Overflow)?;
        if total < Decimal::ZERO {
            let violation = Violation::NegativeTotalShares {
                name: self.name.clone(),
                total: self.state.total_shares,
                delta,
            };
            tracing::error!(%violation, "accumulator invariant violated");
            return Err(violation.into());
        }
        Ok(total)
    }

    fn commit<S: KvStore + ?Sized>(&mut self, store: &mut S, next: AccumulatorState) -> Result<()> {
        codec::set_record(store, &keys::accumulator_key(&self.name), &next)?;
        self.state = next;
        Ok(())
    }
}

/// Create the accumulator `name`.
pub fn create_accumulator<S: KvStore + ?Sized>(store: &mut S, name: &str) -> Result<()> {
    AccumulatorObject::create(store, name).map(|_| ())
}

/// Load the accumulator `name`.
pub fn get_accumulator<S: KvStore + ?Sized>(store: &S, name: &str) -> Result<AccumulatorObject> {
    AccumulatorObject::load(store, name)
}

/// Inject `amount` into the accumulator `name`.
pub fn add_to_accumulator<S: KvStore + ?Sized>(
    store: &mut S,
    name: &str,
    amount: &RewardVector,
) -> Result<RewardVector> {
    let mut accum = AccumulatorObject::load(store, name)?;
    accum.add_to_accumulator(store, amount)
}

/// Current value per share of the accumulator `name`.
pub fn get_accumulator_value<S: KvStore + ?Sized>(store: &S, name: &str) -> Result<RewardVector> {
    Ok(AccumulatorObject::load(store, name)?.value().clone())
}

/// Adjust the share total of the accumulator `name` by `delta`.
pub fn set_total_shares<S: KvStore + ?Sized>(
    store: &mut S,
    name: &str,
    delta: Decimal,
) -> Result<()> {
    let mut accum = AccumulatorObject::load(store, name)?;
    accum.set_total_shares(store, delta)
}

/// Every accumulator in the store, in name order.
///
/// Scans the whole accumulator key range; meant for debugging and
/// migrations, not for steady-state operation.
pub fn list_accumulators<S: KvStore + ?Sized>(store: &S) -> Result<Vec<AccumulatorObject>> {
    store
        .scan_prefix(keys::ACCUMULATOR_PREFIX.as_bytes())?
        .into_iter()
        .map(|(key, value)| -> Result<AccumulatorObject> {
            let name = keys::accumulator_name_from_key(&key).ok_or_else(|| {
                StoreError::Deserialization(format!("malformed accumulator key {key:?}"))
            })?;
            Ok(AccumulatorObject {
                name: name.to_string(),
                state: codec::from_slice(&value)?,
            })
        })
        .collect()
}
