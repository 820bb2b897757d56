//! Display state machine for one upload session.
//!
//! The controller owns the active [`DisplayState`] and the error message shown
//! to the user. It never performs I/O: callers run the network work and feed
//! the outcome back in, together with the [`Ticket`] handed out when the
//! submission started. Paced transitions only happen in [`Controller::tick`].

use std::time::{Duration, Instant};

use log::debug;

use crate::models::ClassificationResult;

/// Identifies one submission. Completions for an older ticket are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMethod {
    File,
    Link,
}

/// Minimum time spent in the intermediate panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub uploaded: Duration,
    pub analyzing: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            uploaded: Duration::from_secs(2),
            analyzing: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
impl Pacing {
    pub const IMMEDIATE: Pacing = Pacing {
        uploaded: Duration::ZERO,
        analyzing: Duration::ZERO,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState {
    Initial,
    ChoosingMethod,
    FileUpload,
    LinkUpload,
    Uploading {
        ticket: Ticket,
    },
    Uploaded {
        ticket: Ticket,
        result: ClassificationResult,
        since: Instant,
        prepared: bool,
    },
    Analyzing {
        ticket: Ticket,
        result: ClassificationResult,
        since: Instant,
        prepared: bool,
    },
    Results {
        result: ClassificationResult,
    },
}

/// Payload-free view of [`DisplayState`], handy for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Initial,
    ChoosingMethod,
    FileUpload,
    LinkUpload,
    Uploading,
    Uploaded,
    Analyzing,
    Results,
}

impl DisplayState {
    pub fn kind(&self) -> StateKind {
        match self {
            DisplayState::Initial => StateKind::Initial,
            DisplayState::ChoosingMethod => StateKind::ChoosingMethod,
            DisplayState::FileUpload => StateKind::FileUpload,
            DisplayState::LinkUpload => StateKind::LinkUpload,
            DisplayState::Uploading { .. } => StateKind::Uploading,
            DisplayState::Uploaded { .. } => StateKind::Uploaded,
            DisplayState::Analyzing { .. } => StateKind::Analyzing,
            DisplayState::Results { .. } => StateKind::Results,
        }
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            DisplayState::Uploaded { result, .. }
            | DisplayState::Analyzing { result, .. }
            | DisplayState::Results { result } => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Controller {
    state: DisplayState,
    error: Option<String>,
    pacing: Pacing,
    next_ticket: u64,
    cleanup_pending: bool,
}

impl Controller {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            state: DisplayState::Initial,
            error: None,
            pacing,
            next_ticket: 0,
            cleanup_pending: false,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        self.state.result()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Ticket of the submission currently in flight or being paced.
    pub fn active_ticket(&self) -> Option<Ticket> {
        match &self.state {
            DisplayState::Uploading { ticket }
            | DisplayState::Uploaded { ticket, .. }
            | DisplayState::Analyzing { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    pub fn cleanup_pending(&self) -> bool {
        self.cleanup_pending
    }

    /// 입력 폼에서 검증 오류를 표시할 때 사용한다.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn transition(&mut self, next: DisplayState) {
        debug!("display state {:?} -> {:?}", self.state.kind(), next.kind());
        self.state = next;
    }

    /// Landing page -> method picker.
    pub fn start(&mut self) {
        if self.state == DisplayState::Initial {
            self.transition(DisplayState::ChoosingMethod);
        }
    }

    pub fn choose(&mut self, method: UploadMethod) {
        if !matches!(
            self.state,
            DisplayState::Initial | DisplayState::ChoosingMethod
        ) {
            return;
        }
        self.error = None;
        let next = match method {
            UploadMethod::File => DisplayState::FileUpload,
            UploadMethod::Link => DisplayState::LinkUpload,
        };
        self.transition(next);
    }

    /// Starts a submission from one of the upload forms.
    ///
    /// Returns `None` when no form is active, which is how a second
    /// submission is refused while one is in flight.
    pub fn begin_upload(&mut self) -> Option<Ticket> {
        if !matches!(
            self.state,
            DisplayState::FileUpload | DisplayState::LinkUpload
        ) {
            return None;
        }
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.error = None;
        self.transition(DisplayState::Uploading { ticket });
        Some(ticket)
    }

    fn is_current_upload(&self, ticket: Ticket) -> bool {
        matches!(self.state, DisplayState::Uploading { ticket: t } if t == ticket)
    }

    /// Hands a successful upload to the controller.
    ///
    /// A stale ticket leaves the state untouched and returns the filename of
    /// the artifact nobody will display, so the caller can delete it.
    pub fn upload_succeeded(
        &mut self,
        ticket: Ticket,
        result: ClassificationResult,
        now: Instant,
    ) -> Option<String> {
        if !self.is_current_upload(ticket) {
            debug!("ignoring stale upload result {:?}", ticket);
            return Some(result.filename).filter(|f| !f.is_empty());
        }
        self.transition(DisplayState::Uploaded {
            ticket,
            result,
            since: now,
            prepared: false,
        });
        None
    }

    pub fn upload_failed(&mut self, ticket: Ticket, message: impl Into<String>) {
        if !self.is_current_upload(ticket) {
            debug!("ignoring stale upload failure {:?}", ticket);
            return;
        }
        self.error = Some(message.into());
        self.transition(DisplayState::Initial);
    }

    /// Marks the post-upload work (artwork prefetch) as finished.
    pub fn mark_prepared(&mut self, ticket: Ticket) {
        match &mut self.state {
            DisplayState::Uploaded {
                ticket: t,
                prepared,
                ..
            }
            | DisplayState::Analyzing {
                ticket: t,
                prepared,
                ..
            } if *t == ticket => *prepared = true,
            _ => {}
        }
    }

    /// Advances paced transitions that are due at `now`.
    /// Returns true when the state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.cleanup_pending {
            return false;
        }
        let mut changed = false;
        loop {
            let next = match &self.state {
                DisplayState::Uploaded {
                    ticket,
                    result,
                    since,
                    prepared,
                } if now.saturating_duration_since(*since) >= self.pacing.uploaded => {
                    DisplayState::Analyzing {
                        ticket: *ticket,
                        result: result.clone(),
                        since: now,
                        prepared: *prepared,
                    }
                }
                DisplayState::Analyzing {
                    result,
                    since,
                    prepared: true,
                    ..
                } if now.saturating_duration_since(*since) >= self.pacing.analyzing => {
                    DisplayState::Results {
                        result: result.clone(),
                    }
                }
                _ => return changed,
            };
            self.transition(next);
            changed = true;
        }
    }

    /// Time until the next paced transition could fire, if one is pending.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        if self.cleanup_pending {
            return None;
        }
        let (since, delay) = match &self.state {
            DisplayState::Uploaded { since, .. } => (*since, self.pacing.uploaded),
            DisplayState::Analyzing {
                since,
                prepared: true,
                ..
            } => (*since, self.pacing.analyzing),
            _ => return None,
        };
        Some(delay.saturating_sub(now.saturating_duration_since(since)))
    }

    /// User pressed "Start Over" on the results panel.
    ///
    /// When a result is held, returns its filename and freezes the state until
    /// [`Controller::cleanup_finished`] is called. Otherwise returns to
    /// `Initial` immediately.
    pub fn request_reset(&mut self) -> Option<String> {
        if self.cleanup_pending {
            return None;
        }
        match self.state.result() {
            Some(result) if !result.filename.is_empty() => {
                let filename = result.filename.clone();
                self.cleanup_pending = true;
                Some(filename)
            }
            _ => {
                self.error = None;
                self.transition(DisplayState::Initial);
                None
            }
        }
    }

    /// Whether a Back button should be offered. Every state except the landing
    /// panel has one, including the progress panels, and it is disabled while
    /// a delete is in flight.
    pub fn can_go_back(&self) -> bool {
        !self.cleanup_pending && self.state != DisplayState::Initial
    }

    /// Back button. Same as a reset, from any state.
    pub fn back(&mut self) -> Option<String> {
        self.request_reset()
    }

    /// Finishes a reset started by [`Controller::request_reset`].
    /// A failed delete is reported but never keeps the user on the results.
    pub fn cleanup_finished(&mut self, outcome: Result<(), String>) {
        self.cleanup_pending = false;
        self.error = outcome.err();
        self.transition(DisplayState::Initial);
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Pacing::default())
    }
}
