//! State machine for tracking a publishing run
//!
//! A run moves `Idle → Validating → Archiving → Uploading → Done`, with
//! `ArchiveMissing` as a non-fatal end and `NoBuildPath`, `ArchiverError` and
//! `UploadError` as failures. State lives in memory for the duration of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::PublishError;

/// Run state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Idle,
    Validating,
    Archiving,
    ArchiveMissing,
    Uploading,
    Done,
    NoBuildPath,
    ArchiverError,
    UploadError,
}

impl RunState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ArchiveMissing
                | Self::Done
                | Self::NoBuildPath
                | Self::ArchiverError
                | Self::UploadError
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::NoBuildPath | Self::ArchiverError | Self::UploadError
        )
    }

    fn can_transition_to(self, to: RunState) -> bool {
        use RunState::*;

        matches!(
            (self, to),
            // Nothing to publish ends the run before any work
            (Idle, Validating | Done)
                | (Validating, Archiving | NoBuildPath)
                | (Archiving, ArchiveMissing | Uploading | ArchiverError | Done)
                | (Uploading, Done | UploadError)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Validating => "VALIDATING",
            Self::Archiving => "ARCHIVING",
            Self::ArchiveMissing => "ARCHIVE_MISSING",
            Self::Uploading => "UPLOADING",
            Self::Done => "DONE",
            Self::NoBuildPath => "NO_BUILD_PATH",
            Self::ArchiverError => "ARCHIVER_ERROR",
            Self::UploadError => "UPLOAD_ERROR",
        };
        f.write_str(name)
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    /// From state
    pub from: RunState,

    /// To state
    pub to: RunState,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

/// State machine for tracking the run
#[derive(Debug)]
pub struct RunStateMachine {
    current_state: RunState,
    transitions: Vec<StateTransition>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: RunState::Idle,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new state
    ///
    /// Edges outside the run lifecycle are rejected and leave the state
    /// unchanged.
    pub fn transition(&mut self, to: RunState) -> Result<(), PublishError> {
        if !self.current_state.can_transition_to(to) {
            return Err(PublishError::InvalidTransition {
                from: self.current_state.to_string(),
                to: to.to_string(),
            });
        }

        tracing::debug!(from = %self.current_state, to = %to, "run state changed");

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
        });
        self.current_state = to;

        Ok(())
    }

    /// Get current state
    pub fn state(&self) -> RunState {
        self.current_state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn into_history(self) -> Vec<StateTransition> {
        self.transitions
    }

    pub fn is_terminal(&self) -> bool {
        self.current_state.is_terminal()
    }
}
