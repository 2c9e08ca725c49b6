//! Error types for the reconciliation engine.
//!
//! [`ReconcileError`] is the per-change failure taxonomy: every variant is
//! recoverable at the level of a single change record, and the pipeline's
//! default policy is skip-and-report, never aborting a batch over one bad
//! proposal. [`EngineError`] covers caller mistakes and markup-level failures.

use serde::Serialize;
use thiserror::Error;

/// Why a single change could not be applied.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ReconcileError {
    /// `delete`/`modify` whose original content cannot be matched.
    #[error("target not found")]
    TargetNotFound,

    /// `add` whose insertion point cannot be matched.
    #[error("anchor not found")]
    AnchorNotFound,

    /// Insertion-sequence member whose predecessor never resolved.
    #[error("chained anchor not found (predecessor {predecessor})")]
    ChainedAnchorNotFound { predecessor: String },

    /// Text-only fallback match with multiple equally valid candidates.
    /// Treated as no match, never guessed.
    #[error("ambiguous match ({candidates} candidates)")]
    AmbiguousMatch { candidates: usize },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Markup error: {0}")]
    Markup(#[from] plaud_markup::ParseError),

    #[error("Unknown change: {0}")]
    UnknownChange(String),

    #[error("Change already resolved: {0}")]
    ChangeAlreadyResolved(String),

    #[error("Unknown pattern: {0}")]
    UnknownPattern(String),

    #[error("Pattern '{pattern}' cannot produce '{change_type}' changes")]
    PatternChangeUnsupported {
        pattern: String,
        change_type: String,
    },

    #[error("No active review session")]
    NoActiveSession,
}
