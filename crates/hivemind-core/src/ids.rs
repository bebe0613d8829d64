//! Correlation identifier newtype.
//!
//! The bridge protocol correlates responses to commands with a plain integer.
//! Wrapping it keeps ids from being mixed up with ports, sizes, or counts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to an outbound command.
///
/// Serialized as a bare JSON integer. Ids start at zero for every connection
/// and only ever increase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// The first id handed out on a fresh connection.
    pub const FIRST: Self = Self(0);

    /// Wrap a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RequestId> for u64 {
    fn from(id: RequestId) -> Self {
        id.0
    }
}
