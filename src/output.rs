use catsync::SyncStatistics;
use serde::Serialize;
use std::path::PathBuf;

/// JSON output mode for machine-readable sync events
/// Uses NDJSON format (newline-delimited JSON)
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Start {
        drafts: PathBuf,
        catalog: PathBuf,
        total_drafts: usize,
    },
    Error {
        message: String,
    },
    Warning {
        message: String,
    },
    Summary {
        processed: usize,
        created: usize,
        updated: usize,
        failed: usize,
        unchanged: usize,
        duration_secs: f64,
    },
}

impl SyncEvent {
    pub fn summary(stats: &SyncStatistics) -> Self {
        SyncEvent::Summary {
            processed: stats.processed(),
            created: stats.created(),
            updated: stats.updated(),
            failed: stats.failed(),
            unchanged: stats.unchanged(),
            duration_secs: stats.processing_time().as_secs_f64(),
        }
    }

    /// Emit this event as JSON to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_serialize_start_event() {
        let event = SyncEvent::Start {
            drafts: PathBuf::from("drafts.json"),
            catalog: PathBuf::from("catalog.json"),
            total_drafts: 100,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"start"#));
        assert!(json.contains(r#""total_drafts":100"#));
    }

    #[test]
    fn test_serialize_error_event() {
        let event = SyncEvent::Error {
            message: "Draft is null.".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"error","message":"Draft is null."}"#);
    }

    #[test]
    fn test_summary_from_statistics() {
        let stats = SyncStatistics::new("products");
        stats.increment_processed(4);
        stats.increment_created();
        stats.increment_failed();
        stats.add_processing_time(Duration::from_millis(1500));

        let json = serde_json::to_string(&SyncEvent::summary(&stats)).unwrap();
        assert!(json.contains(r#""type":"summary"#));
        assert!(json.contains(r#""created":1"#));
        assert!(json.contains(r#""unchanged":2"#));
        assert!(json.contains(r#""duration_secs":1.5"#));
    }
}
