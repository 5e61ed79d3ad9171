//! HTML ⇄ builder-document conversion.
//!
//! Forward: normalize → classify/build/extract → fallback guard.
//! Backward: the serializer, which the guard also uses to check its work.

mod builder;
pub mod classify;
pub mod equiv;
mod guard;
mod markup;
pub mod normalize;
pub mod serialize;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::css::BreakpointTable;
use crate::data::{DocumentNode, IdStrategy, NodeId};
use crate::error::{ConvertError, Result};

pub use classify::{Classification, classify};
pub use equiv::{documents_equivalent, html_equivalent, visible_text_signature};
pub use normalize::{NormElement, NormNode, NormalizedBody, NormalizedDocument, normalize};
pub use serialize::{document_to_html_with, node_to_html};

/// Elements removed during normalization unless configured otherwise.
pub const DEFAULT_DENIED_TAGS: &[&str] = &[
    "script", "iframe", "object", "embed", "frame", "frameset", "applet", "base",
];

pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlOptions {
    pub denied_tags: Vec<String>,
    /// Attribute-name prefixes to strip; `on` removes every event handler.
    pub denied_attribute_prefixes: Vec<String>,
    pub strip_javascript_urls: bool,
    /// Deeper bodies are kept as one sanitized opaque block.
    pub max_depth: usize,
    pub base_url: Option<Url>,
    pub breakpoints: BreakpointTable,
    pub id_strategy: IdStrategy,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            denied_tags: DEFAULT_DENIED_TAGS.iter().map(|tag| tag.to_string()).collect(),
            denied_attribute_prefixes: vec!["on".to_string()],
            strip_javascript_urls: true,
            max_depth: DEFAULT_MAX_DEPTH,
            base_url: None,
            breakpoints: BreakpointTable::default(),
            id_strategy: IdStrategy::Random,
        }
    }
}

/// An element the classifier could not map, kept as OpaqueHTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedStructure {
    pub node_id: NodeId,
    pub tag: String,
    pub reason: String,
}

/// A classified subtree the fallback guard sealed after a failed round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemotedSubtree {
    pub node_id: NodeId,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub reason: String,
}

/// Everything recovered from rather than failed on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// The parser had to repair the input.
    pub malformed_input_recovered: bool,
    pub parse_errors: Vec<String>,
    pub unsupported: Vec<UnsupportedStructure>,
    pub demoted: Vec<DemotedSubtree>,
    pub stripped_elements: usize,
    pub stripped_attributes: usize,
    /// Nesting exceeded the depth limit and the body was sealed wholesale.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTreeResult {
    pub root: DocumentNode,
    /// Whether the tree holds any OpaqueHTML node.
    pub demoted: bool,
    pub diagnostics: Diagnostics,
}

pub fn html_to_document(html: &str) -> Result<DocumentTreeResult> {
    html_to_document_with(html, &HtmlOptions::default())
}

/// Converts markup to a builder tree. Only empty input is an error;
/// whitespace-only input yields a Root without children.
pub fn html_to_document_with(html: &str, options: &HtmlOptions) -> Result<DocumentTreeResult> {
    if html.is_empty() {
        return Err(ConvertError::InvalidInput("input is empty".into()));
    }
    let document = normalize(html, options);
    debug!(
        parse_errors = document.parse_errors.len(),
        stripped_elements = document.stripped_elements,
        stripped_attributes = document.stripped_attributes,
        degraded = document.is_degraded(),
        "normalized input"
    );
    if document.is_degraded() {
        info!(limit = options.max_depth, "input nesting exceeds depth limit; body kept opaque");
    }

    let built = builder::build_document(&document, options, options.id_strategy);
    debug!(nodes = built.root.node_count(), "built document tree");
    let mut guard = guard::Guard {
        document: &document,
        options,
        sources: built.sources,
        ids: built.ids,
        demoted: Vec::new(),
    };
    let root = guard.run(built.root);

    let live: HashSet<&str> = root.descendants().map(|node| node.id.as_str()).collect();
    let unsupported = built
        .unsupported
        .into_iter()
        .filter(|entry| live.contains(entry.node_id.as_str()))
        .collect();
    let diagnostics = Diagnostics {
        malformed_input_recovered: !document.parse_errors.is_empty(),
        parse_errors: document.parse_errors.clone(),
        unsupported,
        demoted: guard.demoted,
        stripped_elements: document.stripped_elements,
        stripped_attributes: document.stripped_attributes,
        degraded: document.is_degraded(),
    };
    let demoted = root.descendants().any(DocumentNode::is_opaque);
    Ok(DocumentTreeResult {
        root,
        demoted,
        diagnostics,
    })
}

/// Like [`html_to_document_with`] for raw bytes, which must be UTF-8.
pub fn html_bytes_to_document(bytes: &[u8], options: &HtmlOptions) -> Result<DocumentTreeResult> {
    let html = std::str::from_utf8(bytes)
        .map_err(|err| ConvertError::InvalidInput(format!("input is not UTF-8 text: {err}")))?;
    html_to_document_with(html, options)
}

/// Serializes a tree with the default breakpoint table.
pub fn document_to_html(node: &DocumentNode) -> Result<String> {
    document_to_html_with(node, &BreakpointTable::default())
}
