//! Builder-document model shared by conversion, validation and site lookup.

pub mod document;
pub mod ids;

pub use document::{DocumentNode, NodeId, NodeKind, PropValue};
pub use ids::{IdGenerator, IdStrategy};
