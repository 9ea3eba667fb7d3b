//! CBOR record encoding.
//!
//! Wraps [`ciborium`] so typed records can be read from and written to any
//! [`KvStore`]. `get_record` mirrors the store's `(found, value)` contract:
//! a missing key is `Ok(None)`.

use serde::{de::DeserializeOwned, Serialize};

use crate::{KvStore, Result, StoreError};

/// Serialize a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if the value cannot be serialized.
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| {
        StoreError::Serialization(format!(
            "CBOR serialization of {} failed: {e}",
            std::any::type_name::<T>()
        ))
    })?;
    Ok(buf)
}

/// Deserialize a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`StoreError::Deserialization`] if the bytes cannot be decoded
/// into the target type.
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| {
        StoreError::Deserialization(format!(
            "CBOR deserialization of {} failed: {e}",
            std::any::type_name::<T>()
        ))
    })
}

/// Read and decode the record at `key`.
pub fn get_record<T, S>(store: &S, key: &[u8]) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    match store.get(key)? {
        Some(bytes) => Ok(Some(from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and upsert `value` at `key`.
pub fn set_record<T, S>(store: &mut S, key: &[u8], value: &T) -> Result<()>
where
    T: Serialize,
    S: KvStore + ?Sized,
{
    let bytes = to_vec(value)?;
    store.set(key, &bytes)
}
