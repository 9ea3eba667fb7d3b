//! # accrue-types
//!
//! Shared value types for the accrue workspace.
//!
//! The central type is [`RewardVector`], a multi-denomination collection of
//! non-negative decimal amounts. Accumulator values, position snapshots and
//! owed rewards are all expressed as reward vectors.
//!
//! ## Modules
//!
//! - [`denom`]: denomination validation
//! - [`reward`]: `RewardVector` arithmetic

pub mod denom;
pub mod reward;

pub use reward::RewardVector;
pub use rust_decimal::Decimal;

/// Decimal places kept by per-share quotients.
///
/// Matches the 18-place fixed-point decimals common on ledgers, leaving
/// headroom in the 28-digit [`Decimal`] mantissa for share multiplication.
pub const DEC_PRECISION: u32 = 18;

/// Error types for reward vector arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// The denomination does not match the allowed format.
    #[error("invalid denomination: {0:?}")]
    InvalidDenom(String),

    /// A stored amount would be negative.
    #[error("negative amount {amount} for {denom}")]
    NegativeAmount {
        /// The offending denomination.
        denom: String,
        /// The rejected amount.
        amount: Decimal,
    },

    /// Subtraction would drive a component below zero.
    #[error("negative component for {denom}: {available} - {requested}")]
    NegativeComponent {
        /// The offending denomination.
        denom: String,
        /// Amount present on the left-hand side.
        available: Decimal,
        /// Amount subtracted.
        requested: Decimal,
    },

    /// Decimal arithmetic overflowed.
    #[error("decimal overflow")]
    Overflow,

    /// Division by a zero scalar.
    #[error("division by zero")]
    DivisionByZero,
}

/// Convenience result type for reward vector operations.
pub type Result<T> = std::result::Result<T, TypesError>;
