//! # Plaud Markup
//!
//! Generic markup tree for the Plaud editing engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ tokenizer: HTML text → Token stream         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ parser: Token stream → Dom arena            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ dom: mutable, traversable node arena        │
//! │  - index-based child references             │
//! │  - insert/replace/detach operations         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ serializer: Dom arena → HTML text           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The tree is deliberately not a browser DOM: the reconciliation engine only
//! needs a mutable, traversable, serializable markup tree, so nodes live in a
//! flat arena addressed by [`NodeId`] indices. No node ever hands out a live
//! pointer; callers hold ids that are valid for the lifetime of one `Dom`.

pub mod dom;
pub mod error;
pub mod id_generator;
pub mod normalize;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use dom::{Dom, Node, NodeData, NodeId};
pub use error::{ParseError, ParseResult};
pub use id_generator::{document_seed, IdGenerator};
pub use normalize::{normalize_markup, text_of_markup};
pub use serializer::Serializer;
pub use tokenizer::{tokenize, Token};
