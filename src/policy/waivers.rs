//! Waiver type shared between the Policy Engine and config parsing.

use serde::{Deserialize, Serialize};

/// A single waiver entry (§3 `Policy.waivers`): marks violations of
/// `rule_id` under `path_pattern` as waived until `expires_on`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waiver {
    pub rule_id: String,
    pub path_pattern: String,
    #[serde(default)]
    pub expires_on: Option<chrono::NaiveDate>,
    pub justification: String,
}
