use serde::{Deserialize, Serialize};

/// One category in a day's plan, with the hours the user intends to spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedCategory {
    pub name: String,
    pub target_hours: f64,
}
