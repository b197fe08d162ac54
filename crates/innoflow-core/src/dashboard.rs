use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_ideas: i64,
    pub ideas_in_progress: i64,
    pub ideas_realisee: i64,
    pub ideas_ajournee: i64,
    pub priority_stats: PriorityStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityStats {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub unassigned: i64,
}

impl PriorityStats {
    pub fn total(&self) -> i64 {
        self.high + self.medium + self.low + self.unassigned
    }

    /// Label/count pairs in display order.
    pub fn rows(&self) -> [(&'static str, i64); 4] {
        [
            ("High", self.high),
            ("Medium", self.medium),
            ("Low", self.low),
            ("Unassigned", self.unassigned),
        ]
    }
}
