//! Core domain types
//!
//! These types mirror the entities served by the Woodpecker CI API. Only the
//! fields the tool server reasons about are typed; everything else the backend
//! sends is kept verbatim so responses can be relayed without loss.

pub mod log;
pub mod pipeline;
pub mod repo;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as the type's default, like a missing key
///
/// The backend encodes an unset byte slice or string as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
