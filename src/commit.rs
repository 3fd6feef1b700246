//! Opaque commit tokens tagging an override-set state.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Token that changes on every mutating operation against an app's overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commit(Uuid);

impl Commit {
    /// The nil UUID, used for apps whose overrides have never been mutated.
    pub const INITIAL: Commit = Commit(Uuid::nil());

    /// Mint a fresh, random commit.
    #[must_use]
    pub fn generate() -> Self {
        Commit(Uuid::new_v4())
    }

    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.0.is_nil()
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for Commit {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Commit {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Commit)
            .map_err(|_| crate::error::Error::InvalidCommit(s.to_string()))
    }
}
