use super::accumulator::{Modality, PredictionFrame, Session};
use crate::analysis::AnalysisResult;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Authoritative lifecycle state of a client session
///
/// Transitions gate every write to the accumulated [`Session`]: appends are
/// accepted only while `Collecting`, and exactly one analysis may be in
/// flight at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session allocated
    Idle,
    /// Writers active, frames accumulate
    Collecting,
    /// Writers paused, data retained
    Stopped,
    /// Analysis request outstanding, writers paused
    Analyzing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} while {state:?}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error("an analysis request is already in flight")]
    AnalysisInFlight,

    #[error("session has no data to analyze")]
    NoData,
}

/// State machine plus the session it guards
///
/// Owned behind a single lock by the orchestrator, so no two transitions
/// ever overlap. All methods are synchronous; the only discipline required
/// of callers is to route every mutation through here.
pub struct SessionController {
    state: SessionState,
    session: Option<Session>,
    last_result: Option<AnalysisResult>,
    last_error: Option<String>,
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            session: None,
            last_result: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    pub fn last_result(&self) -> Option<&AnalysisResult> {
        self.last_result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Idle -> Collecting. Allocates a fresh session and clears any prior
    /// analysis result.
    pub fn start(&mut self) -> Result<&Session, TransitionError> {
        if self.state != SessionState::Idle {
            return Err(TransitionError::InvalidState {
                action: "start",
                state: self.state,
            });
        }
        self.last_result = None;
        self.last_error = None;
        self.state = SessionState::Collecting;
        Ok(self.session.insert(Session::new()))
    }

    /// Collecting -> Stopped
    pub fn stop(&mut self) -> Result<(), TransitionError> {
        if self.state != SessionState::Collecting {
            return Err(TransitionError::InvalidState {
                action: "stop",
                state: self.state,
            });
        }
        self.state = SessionState::Stopped;
        Ok(())
    }

    /// Stopped -> Collecting, same session, no data loss
    pub fn resume(&mut self) -> Result<(), TransitionError> {
        if self.state != SessionState::Stopped {
            return Err(TransitionError::InvalidState {
                action: "resume",
                state: self.state,
            });
        }
        self.state = SessionState::Collecting;
        Ok(())
    }

    /// Stopped -> Collecting, discarding the old session
    pub fn start_new(&mut self) -> Result<&Session, TransitionError> {
        if self.state != SessionState::Stopped {
            return Err(TransitionError::InvalidState {
                action: "start a new session",
                state: self.state,
            });
        }
        self.last_result = None;
        self.last_error = None;
        self.state = SessionState::Collecting;
        Ok(self.session.insert(Session::new()))
    }

    /// {Collecting, Stopped} -> Analyzing
    ///
    /// Returns a snapshot of the session for the dispatcher. A second call
    /// while Analyzing is rejected rather than queued; the session is
    /// untouched either way.
    pub fn begin_analysis(&mut self) -> Result<Session, TransitionError> {
        match self.state {
            SessionState::Analyzing => return Err(TransitionError::AnalysisInFlight),
            SessionState::Collecting | SessionState::Stopped => {}
            state => {
                return Err(TransitionError::InvalidState {
                    action: "analyze",
                    state,
                })
            }
        }
        let session = self.session.as_ref().ok_or(TransitionError::NoData)?;
        if !session.has_data() {
            return Err(TransitionError::NoData);
        }
        let snapshot = session.clone();
        self.state = SessionState::Analyzing;
        Ok(snapshot)
    }

    /// Analyzing -> Stopped, attaching the result on success or surfacing
    /// the error on failure
    pub fn complete_analysis(
        &mut self,
        outcome: Result<AnalysisResult, String>,
    ) -> Result<(), TransitionError> {
        if self.state != SessionState::Analyzing {
            return Err(TransitionError::InvalidState {
                action: "complete analysis",
                state: self.state,
            });
        }
        match outcome {
            Ok(result) => {
                self.last_result = Some(result);
                self.last_error = None;
            }
            Err(message) => {
                self.last_error = Some(message);
            }
        }
        self.state = SessionState::Stopped;
        Ok(())
    }

    /// Append a frame to the current session. Silent no-op unless the state
    /// is Collecting; frames arriving after a stop are deliberately dropped
    /// (pause semantics). Returns whether the frame was recorded.
    pub fn append(&mut self, modality: Modality, frame: PredictionFrame) -> bool {
        if self.state != SessionState::Collecting {
            debug!(
                modality = modality.as_str(),
                state = ?self.state,
                "dropping frame outside collecting state"
            );
            return false;
        }
        match self.session.as_mut() {
            Some(session) => {
                session.append(modality, frame);
                true
            }
            None => false,
        }
    }

    /// Read-only view of the current aggregate
    pub fn snapshot(&self) -> Option<Session> {
        self.session.clone()
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}
