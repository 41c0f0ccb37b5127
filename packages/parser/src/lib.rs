//! # Vellum Parser
//!
//! Turns raw template markup into the structures the editor works on.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ tokenizer: markup → events (logos)          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ parser: events → Dom (tolerant tree build)  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ template: Dom → Template                    │
//! │  - scoped style text + color variables      │
//! │  - body fragment + body class               │
//! │  - stylesheet links + head scripts          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The tolerant entry points (`parse_fragment`, `parse_template`) never
//! fail; `parse_fragment_strict` exists for tooling that wants to report
//! malformed markup.

pub mod css;
pub mod dom;
pub mod entities;
pub mod error;
pub mod identity;
pub mod parser;
pub mod serializer;
pub mod tags;
pub mod template;
pub mod tokenizer;

pub use css::{ColorVariable, SCOPE_CLASS, SCOPE_SELECTOR};
pub use dom::{Dom, Element, NodeData, NodeId};
pub use error::{ParseError, ParseResult};
pub use identity::document_id;
pub use parser::{parse_fragment, parse_fragment_strict, TreeBuilder};
pub use serializer::{serialize_children, serialize_node, SerializeOptions};
pub use template::{parse_template, Template, DEFAULT_BODY_CLASS};
pub use tokenizer::{tokenize, MarkupEvent};
