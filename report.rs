//! Per-file outcomes and the aggregated run report.

use crate::error::FailureReason;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "failure", rename_all = "snake_case")]
pub enum FinalState {
    Deleted,
    /// Content destroyed but the directory entry could not be removed
    RenamedButNotDeleted,
    Failed(FailureReason),
}

/// Result of shredding one target. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct ShredOutcome {
    pub path: PathBuf,
    pub bytes_processed: u64,
    pub passes_completed: usize,
    pub final_state: FinalState,
    /// Set when the pre-deletion rename failed and the entry was removed
    /// under its original name
    pub rename_skipped: bool,
    /// Where the entry still lives for `RenamedButNotDeleted`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual_path: Option<PathBuf>,
}

impl ShredOutcome {
    pub(crate) fn failed(path: impl Into<PathBuf>, reason: FailureReason) -> Self {
        Self {
            path: path.into(),
            bytes_processed: 0,
            passes_completed: 0,
            final_state: FinalState::Failed(reason),
            rename_skipped: false,
            residual_path: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.final_state == FinalState::Deleted
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.final_state, FinalState::Failed(_))
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.final_state {
            FinalState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Informational record of removing a directory after recursive shredding
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryOutcome {
    pub path: PathBuf,
    pub removed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub deleted: usize,
    pub renamed_not_deleted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Success,
    PartialFailure,
    TotalFailure,
}

/// Outcomes for an entire invocation, in discovery order
#[derive(Debug, Default, Clone, Serialize)]
pub struct ShredReport {
    outcomes: Vec<ShredOutcome>,
    directories: Vec<DirectoryOutcome>,
}

impl ShredReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, outcome: ShredOutcome) {
        self.outcomes.push(outcome);
    }

    pub(crate) fn push_directory(&mut self, outcome: DirectoryOutcome) {
        self.directories.push(outcome);
    }

    pub fn outcomes(&self) -> &[ShredOutcome] {
        &self.outcomes
    }

    /// Directory removals; these never affect [`Self::summarize`] or
    /// [`Self::exit_status`]
    pub fn directories(&self) -> &[DirectoryOutcome] {
        &self.directories
    }

    pub fn summarize(&self) -> Summary {
        self.outcomes.iter().fold(
            Summary {
                total: self.outcomes.len(),
                ..Summary::default()
            },
            |mut s, o| {
                match o.final_state {
                    FinalState::Deleted => s.deleted += 1,
                    FinalState::RenamedButNotDeleted => s.renamed_not_deleted += 1,
                    FinalState::Failed(_) => s.failed += 1,
                }
                s
            },
        )
    }

    /// An empty report counts as success: nothing was asked to be shredded
    /// that could not be.
    pub fn exit_status(&self) -> ExitStatus {
        let s = self.summarize();
        if s.deleted == s.total {
            ExitStatus::Success
        } else if s.failed == s.total {
            ExitStatus::TotalFailure
        } else {
            ExitStatus::PartialFailure
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes_processed).sum()
    }
}
