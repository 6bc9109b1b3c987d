//! Results of a sync run.

use std::time::Duration;

use serde::Serialize;

use crate::db::PushFailure;
use crate::models::{EntityKind, LocalId};

/// What happened to one dirty record during the push phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed,
    /// Deleted before it ever reached the remote store.
    SkippedTombstone,
    /// Transient failure (transport, 5xx, throttling). Left dirty; retried
    /// on the next sync.
    Failed(String),
    /// The remote store refused the record itself. Still left dirty and
    /// retried, but it will keep failing until the record or server changes.
    Rejected(String),
}

impl PushOutcome {
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Rejected(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPush {
    pub kind: EntityKind,
    pub id: LocalId,
    pub outcome: PushOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub records: Vec<RecordPush>,
    /// Records whose consecutive failures reached the warning threshold.
    pub stuck: Vec<PushFailure>,
}

impl PushReport {
    fn count(&self, matches: impl Fn(&PushOutcome) -> bool) -> usize {
        self.records
            .iter()
            .filter(|record| matches(&record.outcome))
            .count()
    }

    pub fn pushed(&self) -> usize {
        self.count(|outcome| matches!(outcome, PushOutcome::Pushed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, PushOutcome::SkippedTombstone))
    }

    /// Records left dirty by a failed push, rejected ones included.
    pub fn failed(&self) -> usize {
        self.count(PushOutcome::is_failure)
    }

    pub fn rejected(&self) -> usize {
        self.count(|outcome| matches!(outcome, PushOutcome::Rejected(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&RecordPush, &str)> {
        self.records.iter().filter_map(|record| match &record.outcome {
            PushOutcome::Failed(reason) | PushOutcome::Rejected(reason) => {
                Some((record, reason.as_str()))
            }
            PushOutcome::Pushed | PushOutcome::SkippedTombstone => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    /// Cursor the pull was requested with.
    pub since: i64,
    pub received: usize,
    pub created: usize,
    pub linked: usize,
    /// Matched records whose pending local edit was newer than the remote copy.
    pub kept_local: usize,
    pub unchanged: usize,
    /// Stored cursor after the pull, if any.
    pub cursor: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub push: PushReport,
    pub pull: PullReport,
    pub duration: Duration,
}

/// Result of a call to `SyncEngine::sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another sync was in progress; this call did nothing.
    AlreadyRunning,
}

impl SyncOutcome {
    pub const fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::AlreadyRunning => None,
        }
    }

    pub const fn is_already_running(&self) -> bool {
        matches!(self, Self::AlreadyRunning)
    }
}
