//! # Review Session
//!
//! Tracks per-change status and the navigation cursor for one review of
//! proposed edits, and orchestrates when reconstruction and preview rendering
//! happen.
//!
//! A session is an explicit value owned by the caller; there is no ambient
//! singleton state. It owns the immutable baseline snapshot and the change
//! list, and nothing node-shaped: every accept/reject rebuilds the document
//! from the baseline string, which is what makes repeated rebuilds idempotent
//! and order-independent with respect to prior reconstructions.
//!
//! Status transitions are `pending → accepted` and `pending → rejected`, both
//! terminal; the only way back is whole-session rollback via
//! [`ReviewSession::exit_review`].

use tracing::debug;

use crate::changes::{ChangeRecord, ChangeStatus};
use crate::errors::EngineError;
use crate::pipeline::{reconstruct, ReconstructOptions, ReconstructionReport};
use crate::preview::{render_preview, PreviewOutcome};

/// Cursor movement over pending changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Result of a single accept/reject transition.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// Pending changes remain; the cursor now points at `current_change`.
    Updated {
        report: ReconstructionReport,
        current_change: String,
    },

    /// Nothing left to review; the session has exited.
    Completed { report: ReconstructionReport },
}

impl SessionOutcome {
    pub fn report(&self) -> &ReconstructionReport {
        match self {
            SessionOutcome::Updated { report, .. } => report,
            SessionOutcome::Completed { report } => report,
        }
    }

    pub fn html(&self) -> &str {
        &self.report().html
    }
}

/// One review of a batch of proposed changes against a document.
pub struct ReviewSession {
    document_id: String,
    /// Clean markup captured at session start, before any preview wrappers.
    /// Reconstruction always starts from here, never from the live document.
    baseline: String,
    changes: Vec<ChangeRecord>,
    cursor: usize,
    options: ReconstructOptions,
    active: bool,
}

impl ReviewSession {
    /// Begin a review session. All incoming changes are forced to pending.
    pub fn new(
        document_id: impl Into<String>,
        baseline: impl Into<String>,
        mut changes: Vec<ChangeRecord>,
    ) -> Self {
        for change in &mut changes {
            change.status = ChangeStatus::Pending;
        }
        Self {
            document_id: document_id.into(),
            baseline: baseline.into(),
            changes,
            cursor: 0,
            options: ReconstructOptions::default(),
            active: true,
        }
    }

    pub fn with_options(mut self, options: ReconstructOptions) -> Self {
        self.options = options;
        self
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pending_count(&self) -> usize {
        self.changes.iter().filter(|c| c.is_pending()).count()
    }

    /// The change the navigation cursor points at.
    pub fn current(&self) -> Option<&ChangeRecord> {
        self.changes.get(self.cursor)
    }

    /// Render the decorated preview of all pending changes, capturing cached
    /// signatures as a side effect.
    pub fn preview(&mut self) -> Result<PreviewOutcome, EngineError> {
        if !self.active {
            return Err(EngineError::NoActiveSession);
        }
        render_preview(&self.baseline, &mut self.changes)
    }

    pub fn accept_one(&mut self, change_id: &str) -> Result<SessionOutcome, EngineError> {
        self.resolve_one(change_id, ChangeStatus::Accepted)
    }

    pub fn reject_one(&mut self, change_id: &str) -> Result<SessionOutcome, EngineError> {
        self.resolve_one(change_id, ChangeStatus::Rejected)
    }

    fn resolve_one(
        &mut self,
        change_id: &str,
        status: ChangeStatus,
    ) -> Result<SessionOutcome, EngineError> {
        if !self.active {
            return Err(EngineError::NoActiveSession);
        }
        let position = self
            .changes
            .iter()
            .position(|c| c.id == change_id)
            .ok_or_else(|| EngineError::UnknownChange(change_id.to_string()))?;
        if !self.changes[position].is_pending() {
            return Err(EngineError::ChangeAlreadyResolved(change_id.to_string()));
        }

        self.changes[position].status = status;
        debug!(document_id = %self.document_id, change_id, ?status, "change resolved");
        let report = self.reconstruct_now()?;

        if self.pending_count() == 0 {
            self.active = false;
            return Ok(SessionOutcome::Completed { report });
        }

        self.cursor = position;
        self.advance_to_pending();
        let current_change = self.changes[self.cursor].id.clone();
        Ok(SessionOutcome::Updated {
            report,
            current_change,
        })
    }

    /// Accept every pending change, reconstructing exactly once for the whole
    /// batch. Exits the session.
    pub fn accept_all(&mut self) -> Result<SessionOutcome, EngineError> {
        self.resolve_all(ChangeStatus::Accepted)
    }

    /// Reject every pending change, reconstructing exactly once. Exits the
    /// session.
    pub fn reject_all(&mut self) -> Result<SessionOutcome, EngineError> {
        self.resolve_all(ChangeStatus::Rejected)
    }

    fn resolve_all(&mut self, status: ChangeStatus) -> Result<SessionOutcome, EngineError> {
        if !self.active {
            return Err(EngineError::NoActiveSession);
        }
        for change in self.changes.iter_mut().filter(|c| c.is_pending()) {
            change.status = status;
        }
        let report = self.reconstruct_now()?;
        self.active = false;
        Ok(SessionOutcome::Completed { report })
    }

    /// Leave review. With `revert_all`, still-pending changes are rejected in
    /// batch and the document is reconstructed one final time. Idempotent:
    /// calling it on an inactive session returns `None`.
    pub fn exit_review(
        &mut self,
        revert_all: bool,
    ) -> Result<Option<ReconstructionReport>, EngineError> {
        if !self.active {
            return Ok(None);
        }
        if revert_all {
            for change in self.changes.iter_mut().filter(|c| c.is_pending()) {
                change.status = ChangeStatus::Rejected;
            }
        }
        let report = self.reconstruct_now()?;
        self.active = false;
        Ok(Some(report))
    }

    /// Move the cursor to the next/previous pending change, wrapping
    /// circularly. Returns `None` (and exits review) when nothing is pending.
    pub fn navigate(&mut self, direction: Direction) -> Option<&ChangeRecord> {
        if self.pending_count() == 0 {
            self.active = false;
            return None;
        }
        let len = self.changes.len();
        let step = |i: usize| match direction {
            Direction::Next => (i + 1) % len,
            Direction::Prev => (i + len - 1) % len,
        };
        let mut i = step(self.cursor);
        while !self.changes[i].is_pending() {
            i = step(i);
        }
        self.cursor = i;
        self.changes.get(i)
    }

    /// Full rebuild from the baseline plus the current accepted set, followed
    /// by the single-use signature strip on accepted changes.
    fn reconstruct_now(&mut self) -> Result<ReconstructionReport, EngineError> {
        let report = reconstruct(&self.baseline, &self.changes, &self.options)?;
        for change in self.changes.iter_mut().filter(|c| c.is_accepted()) {
            change.cached_signature = None;
        }
        Ok(report)
    }

    /// Park the cursor on the nearest pending change at or after its current
    /// position, wrapping.
    fn advance_to_pending(&mut self) {
        let len = self.changes.len();
        for offset in 0..len {
            let i = (self.cursor + offset) % len;
            if self.changes[i].is_pending() {
                self.cursor = i;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeRecord;

    fn three_change_session() -> ReviewSession {
        ReviewSession::new(
            "doc_1",
            "<p>A</p><p>B</p><p>C</p>",
            vec![
                ChangeRecord::delete("c1", "<p>A</p>"),
                ChangeRecord::modify("c2", "<p>B</p>", "<p>B2</p>"),
                ChangeRecord::delete("c3", "<p>C</p>"),
            ],
        )
    }

    #[test]
    fn test_accept_one_advances_cursor() {
        let mut session = three_change_session();
        let outcome = session.accept_one("c1").unwrap();
        match outcome {
            SessionOutcome::Updated {
                report,
                current_change,
            } => {
                assert_eq!(report.html, "<p>B</p><p>C</p>");
                assert_eq!(current_change, "c2");
            }
            other => panic!("expected Updated, got {:?}", other),
        }
    }

    #[test]
    fn test_last_resolution_completes_session() {
        let mut session = three_change_session();
        session.accept_one("c1").unwrap();
        session.reject_one("c2").unwrap();
        let outcome = session.accept_one("c3").unwrap();
        assert!(matches!(outcome, SessionOutcome::Completed { .. }));
        assert!(!session.is_active());
        assert_eq!(outcome.html(), "<p>B</p>");
    }

    #[test]
    fn test_terminal_status_never_reverts() {
        let mut session = three_change_session();
        session.accept_one("c1").unwrap();
        assert!(matches!(
            session.reject_one("c1"),
            Err(EngineError::ChangeAlreadyResolved(_))
        ));
    }

    #[test]
    fn test_unknown_change_rejected() {
        let mut session = three_change_session();
        assert!(matches!(
            session.accept_one("nope"),
            Err(EngineError::UnknownChange(_))
        ));
    }

    #[test]
    fn test_navigation_wraps_over_pending_only() {
        let mut session = three_change_session();
        session.accept_one("c2").unwrap();

        assert_eq!(session.navigate(Direction::Next).unwrap().id, "c1");
        assert_eq!(session.navigate(Direction::Next).unwrap().id, "c3");
        // c2 is terminal, so wrapping skips it.
        assert_eq!(session.navigate(Direction::Next).unwrap().id, "c1");
        assert_eq!(session.navigate(Direction::Prev).unwrap().id, "c3");
    }

    #[test]
    fn test_exit_review_is_idempotent() {
        let mut session = three_change_session();
        let first = session.exit_review(true).unwrap();
        assert!(first.is_some());
        assert_eq!(first.unwrap().html, "<p>A</p><p>B</p><p>C</p>");

        let second = session.exit_review(true).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn test_accept_all_exits_session() {
        let mut session = three_change_session();
        let outcome = session.accept_all().unwrap();
        assert_eq!(outcome.html(), "<p>B2</p>");
        assert!(!session.is_active());
        assert!(matches!(session.preview(), Err(EngineError::NoActiveSession)));
    }
}
