//! HTML ⇄ builder-document conversion engine.
//!
//! [`html_to_document`] turns arbitrary (possibly malformed) markup into a
//! typed tree a visual editor can manipulate, sealing anything it cannot
//! represent as OpaqueHTML. [`document_to_html`] renders a tree back.

pub mod css;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod html;
pub mod schema;
pub mod site;

use sha2::{Digest, Sha256};

pub use css::{BreakpointTable, StyleRecord, StyleValues};
pub use data::{DocumentNode, IdStrategy, NodeId, NodeKind, PropValue};
pub use error::{ConvertError, Result};
pub use html::{
    DemotedSubtree, Diagnostics, DocumentTreeResult, HtmlOptions, UnsupportedStructure,
    document_to_html, document_to_html_with, html_bytes_to_document, html_equivalent,
    html_to_document, html_to_document_with, node_to_html,
};
pub use schema::{document_from_json, document_to_json, json_to_html};
pub use site::{PageLookup, Site};

/// Hex sha256 of serialized markup, for caching and deduplication.
pub fn content_hash(html: &str) -> String {
    let digest = Sha256::digest(html.as_bytes());
    hex::encode(digest)
}
