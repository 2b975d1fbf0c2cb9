//! Identifier types for Cambio entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const ORDER_PREFIX: &str = "ORD-";
const ORDER_SUFFIX_LEN: usize = 8;

/// Identifier assigned to a submitted exchange order.
///
/// Format is `ORD-` followed by eight upper-case hex digits taken from the
/// random tail of a UUID v7.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Generate a new order ID.
    pub fn generate() -> Self {
        let simple = Uuid::now_v7().simple().to_string().to_uppercase();
        let suffix = &simple[simple.len() - ORDER_SUFFIX_LEN..];
        Self(format!("{ORDER_PREFIX}{suffix}"))
    }

    /// Parse from string, checking the prefix and suffix shape.
    pub fn parse(s: &str) -> Option<Self> {
        let suffix = s.strip_prefix(ORDER_PREFIX)?;
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(s.to_string()))
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
