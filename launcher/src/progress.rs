//! `$/customProgress` forwarding.
//!
//! The server reports long-running work (library indexing, suite collection)
//! through a custom notification rather than standard LSP progress. Reports
//! are keyed by id and arrive as begin / report / end; the tracker keeps the
//! live ids so stray reports for unknown or already-ended work never reach
//! the host.

use std::collections::HashSet;

use serde::Deserialize;

use crate::host::ProgressReporter;

/// Notification method carrying [`ProgressReport`] payloads.
pub const CUSTOM_PROGRESS: &str = "$/customProgress";

/// Payload of one `$/customProgress` notification.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressReport {
    pub id: String,
    pub kind: ProgressKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub increment: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Begin,
    Report,
    End,
}

/// Live progress ids, fed from the session's notification stream.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    active: HashSet<String>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward one report to the host, honoring begin/report/end ordering.
    pub fn handle(&mut self, report: ProgressReport, reporter: &dyn ProgressReporter) {
        match report.kind {
            ProgressKind::Begin => {
                self.active.insert(report.id.clone());
                reporter.begin(&report.id, report.title.as_deref().unwrap_or(""));
            }
            ProgressKind::Report => {
                if self.active.contains(&report.id) {
                    reporter.report(&report.id, report.message.as_deref(), report.increment);
                } else {
                    tracing::trace!(id = %report.id, "progress report for an unknown id");
                }
            }
            ProgressKind::End => {
                if self.active.remove(&report.id) {
                    reporter.end(&report.id);
                } else {
                    tracing::trace!(id = %report.id, "progress end for an unknown id");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    enum Seen {
        Begin(String, String),
        Report(String, Option<String>, Option<f64>),
        End(String),
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<Seen>>);

    impl ProgressReporter for Recording {
        fn begin(&self, id: &str, title: &str) {
            self.0
                .lock()
                .unwrap()
                .push(Seen::Begin(id.to_string(), title.to_string()));
        }
        fn report(&self, id: &str, message: Option<&str>, increment: Option<f64>) {
            self.0.lock().unwrap().push(Seen::Report(
                id.to_string(),
                message.map(str::to_string),
                increment,
            ));
        }
        fn end(&self, id: &str) {
            self.0.lock().unwrap().push(Seen::End(id.to_string()));
        }
    }

    fn report(id: &str, kind: ProgressKind) -> ProgressReport {
        ProgressReport {
            id: id.to_string(),
            kind,
            title: None,
            message: None,
            increment: None,
        }
    }

    #[test]
    fn begin_report_end_are_forwarded_in_order() {
        let reporter = Recording::default();
        let mut tracker = ProgressTracker::new();

        tracker.handle(
            ProgressReport {
                title: Some("Collecting keywords".to_string()),
                ..report("7", ProgressKind::Begin)
            },
            &reporter,
        );
        tracker.handle(
            ProgressReport {
                message: Some("BuiltIn".to_string()),
                increment: Some(25.0),
                ..report("7", ProgressKind::Report)
            },
            &reporter,
        );
        tracker.handle(report("7", ProgressKind::End), &reporter);

        let seen = reporter.0.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                Seen::Begin("7".to_string(), "Collecting keywords".to_string()),
                Seen::Report("7".to_string(), Some("BuiltIn".to_string()), Some(25.0)),
                Seen::End("7".to_string()),
            ]
        );
    }

    #[test]
    fn reports_for_unknown_ids_are_dropped() {
        let reporter = Recording::default();
        let mut tracker = ProgressTracker::new();

        tracker.handle(report("ghost", ProgressKind::Report), &reporter);
        tracker.handle(report("ghost", ProgressKind::End), &reporter);

        assert!(reporter.0.into_inner().unwrap().is_empty());
    }

    #[test]
    fn reports_after_end_are_dropped() {
        let reporter = Recording::default();
        let mut tracker = ProgressTracker::new();

        tracker.handle(report("1", ProgressKind::Begin), &reporter);
        tracker.handle(report("1", ProgressKind::End), &reporter);
        tracker.handle(report("1", ProgressKind::Report), &reporter);

        let seen = reporter.0.into_inner().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.last(), Some(&Seen::End("1".to_string())));
    }

    #[test]
    fn payload_deserializes_from_the_wire_shape() {
        let value = serde_json::json!({
            "id": "12",
            "kind": "report",
            "message": "Loading library: Selenium",
            "increment": 12.5
        });
        let parsed: ProgressReport = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.id, "12");
        assert_eq!(parsed.kind, ProgressKind::Report);
        assert_eq!(parsed.message.as_deref(), Some("Loading library: Selenium"));
        assert_eq!(parsed.increment, Some(12.5));
        assert!(parsed.title.is_none());
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let value = serde_json::json!({"id": "1", "kind": "pause"});
        assert!(serde_json::from_value::<ProgressReport>(value).is_err());
    }
}
