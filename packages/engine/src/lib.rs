//! # Plaud Engine
//!
//! Change reconciliation engine for AI-assisted document editing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ protocol: agent output → ChangeRecords      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: review state machine               │
//! │  - pending/accepted/rejected per change     │
//! │  - navigation cursor, preview rendering     │
//! │  - triggers reconstruction on transitions   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ pipeline: baseline + accepted set → markup  │
//! │  - index: per-pass content lookup           │
//! │  - resolver: recursive fallback search      │
//! │  - modify → add → delete ordering           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Baseline is source of truth**: every accept/reject rebuilds the
//!    whole document from the immutable baseline plus the accepted set; the
//!    live, preview-decorated document is never read back.
//! 2. **No live node references**: change records carry markup-level
//!    signatures only, so nothing dangles when the tree is rebuilt.
//! 3. **Degrade gracefully**: an unresolvable change is skipped with a
//!    diagnostic, never guessed at, and never aborts the batch.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plaud_engine::{parse_proposals, ReviewSession};
//! use plaud_markup::IdGenerator;
//!
//! let mut ids = IdGenerator::new(document_id);
//! let changes = parse_proposals(&agent_output, &mut ids);
//!
//! let mut session = ReviewSession::new(document_id, baseline_html, changes);
//! let preview = session.preview()?;          // decorated markup for the UI
//! let outcome = session.accept_one("id-1")?; // rebuilt document + diagnostics
//! ```

mod changes;
mod errors;
mod index;
mod patterns;
mod pipeline;
mod preview;
mod protocol;
mod resolver;
mod session;

pub use changes::{
    AnchorDirection, CachedSignature, ChangeRecord, ChangeStatus, ChangeType, PatternGroup,
};
pub use errors::{EngineError, ReconcileError};
pub use index::{ContentIndex, Resolution, ResolutionMethod, NODE_ID_ATTR, PREVIEW_ATTR};
pub use patterns::{Pattern, PatternRegistry};
pub use pipeline::{
    reconstruct, Disposition, FailurePolicy, ReconstructOptions, ReconstructionReport,
    UnresolvedChange,
};
pub use preview::{render_preview, PreviewOutcome, PREVIEW_KIND_ATTR};
pub use protocol::parse_proposals;
pub use resolver::{find_node_recursive, FallbackOutcome};
pub use session::{Direction, ReviewSession, SessionOutcome};

// Re-export the markup tree for callers that build changes programmatically.
pub use plaud_markup::{Dom, IdGenerator, NodeId};
