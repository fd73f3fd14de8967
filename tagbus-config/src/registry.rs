//! Handler registry behaviour.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// What happens when a handler is registered under a name that already
/// has one.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The new handler replaces the old one.
    #[default]
    Replace,
    /// Registration fails and the existing handler stays.
    Reject,
}

#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RegistryConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}
