//! Run summary.

use crate::checkpoint::IssuedCheckpoint;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of one completed run, serializable for logging or archival.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps_executed: usize,
    pub tips_consumed: usize,
    pub checkpoints: Vec<IssuedCheckpoint>,
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes() {
        let report = RunReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            steps_executed: 3,
            tips_consumed: 2,
            checkpoints: Vec::new(),
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"steps_executed\": 3"));
    }
}
