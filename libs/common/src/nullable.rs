//! Serde helpers for PATCH payloads
//!
//! A PATCH body distinguishes "field absent" (leave unchanged) from
//! "field is null" (clear it). Declare such fields as `Option<Option<T>>`
//! with `#[serde(default, deserialize_with = "common::nullable::deserialize")]`.

use serde::{Deserialize, Deserializer};

/// Deserialize a present field into `Some(value)`, where `value` may itself be `None`.
pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
