//! Node equivalence and the visible-text signature.
//!
//! Two trees are equivalent when every position holds the same kind with the
//! same number of children, the same props (text-bearing ones compared after
//! whitespace collapsing) and the same effective style. Opaque nodes make no
//! structural claim: they match whatever sits at their position as long as the
//! visible text is the same.

use std::collections::BTreeMap;

use ego_tree::iter::Edge;
use scraper::{Html, Node};

use crate::css::{Display, FlexDirection, StyleRecord, StyleValues};
use crate::data::{DocumentNode, IdStrategy, NodeId, NodeKind, PropValue};
use crate::error::Result;

use super::markup::{collapse_whitespace, is_html_space};
use super::normalize::{NormNode, NormalizedBody, NormalizedDocument};
use super::{HtmlOptions, html_to_document_with};

/// Props whose values are prose and ignore whitespace differences.
const TEXTUAL_PROPS: &[&str] = &["text", "html", "label", "title", "head"];

/// Elements whose content is not visible text.
const INVISIBLE_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Whether two trees are equivalent. Ids never participate.
pub fn documents_equivalent(a: &DocumentNode, b: &DocumentNode) -> bool {
    mismatches(a, b).is_empty()
}

/// Converts both HTML strings and compares the resulting trees.
pub fn html_equivalent(a: &str, b: &str, options: &HtmlOptions) -> Result<bool> {
    let options = HtmlOptions {
        id_strategy: IdStrategy::Sequential,
        ..options.clone()
    };
    let left = html_to_document_with(a, &options)?;
    let right = html_to_document_with(b, &options)?;
    Ok(documents_equivalent(&left.root, &right.root))
}

/// Ids (from `a`) of the topmost nodes that differ from their counterpart in
/// `b`. Subtrees below a mismatch are not inspected.
pub(crate) fn mismatches(a: &DocumentNode, b: &DocumentNode) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![(a, b)];
    while let Some((left, right)) = stack.pop() {
        if !shallow_equivalent(left, right) {
            out.push(left.id.clone());
            continue;
        }
        if left.is_opaque() || right.is_opaque() {
            continue;
        }
        if left.children.len() != right.children.len() {
            if !sealed_children_match(&left.children, &right.children) {
                out.push(left.id.clone());
            }
            continue;
        }
        stack.extend(left.children.iter().zip(right.children.iter()));
    }
    out
}

/// A child list that is a single opaque node stands for any sibling list
/// with the same visible text. This is how a sealed body compares with the
/// structure its markup parses back into.
fn sealed_children_match(a: &[DocumentNode], b: &[DocumentNode]) -> bool {
    let (sealed, other) = match (a, b) {
        ([only], other) | (other, [only]) if only.is_opaque() => (only, other),
        _ => return false,
    };
    let mut text = String::new();
    for node in other {
        text.push_str(&visible_text_signature(node));
    }
    visible_text_signature(sealed) == text
}

fn shallow_equivalent(a: &DocumentNode, b: &DocumentNode) -> bool {
    if a.is_opaque() || b.is_opaque() {
        if let (Some(x), Some(y)) = (&a.raw_content, &b.raw_content) {
            if collapse_whitespace(x) == collapse_whitespace(y) {
                return true;
            }
        }
        return visible_text_signature(a) == visible_text_signature(b);
    }
    a.kind == b.kind
        && props_equivalent(&a.props, &b.props)
        && styles_equivalent(&effective_style(a), &effective_style(b))
}

/// Record equality plus the order of verbatim declarations, which decides
/// the winner between overlapping ones.
fn styles_equivalent(a: &StyleRecord, b: &StyleRecord) -> bool {
    fn same_order(x: &StyleValues, y: &StyleValues) -> bool {
        x.extra.iter().eq(y.extra.iter())
    }
    a == b
        && same_order(&a.base, &b.base)
        && a
            .breakpoints
            .values()
            .zip(b.breakpoints.values())
            .all(|(x, y)| same_order(x, y))
}

fn props_equivalent(a: &BTreeMap<String, PropValue>, b: &BTreeMap<String, PropValue>) -> bool {
    a.len() == b.len()
        && a.iter().all(|(key, left)| {
            let Some(right) = b.get(key) else {
                return false;
            };
            if TEXTUAL_PROPS.contains(&key.as_str()) {
                if let (Some(x), Some(y)) = (left.as_str(), right.as_str()) {
                    return collapse_whitespace(x) == collapse_whitespace(y);
                }
            }
            left == right
        })
}

/// Style with the layout a kind implies made explicit.
fn effective_style(node: &DocumentNode) -> StyleRecord {
    let mut style = node.style.clone();
    let base = &mut style.base;
    match node.kind {
        NodeKind::Row => {
            base.display.get_or_insert(Display::Flex);
            base.flex_direction.get_or_insert(FlexDirection::Row);
        }
        NodeKind::Column => {
            base.display.get_or_insert(Display::Flex);
            base.flex_direction.get_or_insert(FlexDirection::Column);
        }
        NodeKind::Grid => {
            base.display.get_or_insert(Display::Grid);
        }
        _ => {}
    }
    style
}

/// All visible characters of a subtree in document order, HTML whitespace
/// excluded. Non-breaking spaces count.
pub fn visible_text_signature(node: &DocumentNode) -> String {
    let mut out = String::new();
    for current in node.descendants() {
        match current.kind {
            NodeKind::Text | NodeKind::Link => {
                push_visible(&mut out, current.prop_str("text").unwrap_or_default())
            }
            NodeKind::Button => push_visible(&mut out, current.prop_str("label").unwrap_or_default()),
            NodeKind::OpaqueHtml => {
                if let Some(raw) = &current.raw_content {
                    push_visible(&mut out, &markup_text(raw));
                }
            }
            _ => {}
        }
    }
    out
}

/// Signature of the normalized source, comparable with [`visible_text_signature`].
pub(crate) fn source_signature(document: &NormalizedDocument) -> String {
    let mut out = String::new();
    match &document.body {
        NormalizedBody::Tree(nodes) => {
            let mut stack: Vec<&NormNode> = nodes.iter().rev().collect();
            while let Some(node) = stack.pop() {
                match node {
                    NormNode::Text(text) => push_visible(&mut out, text),
                    NormNode::Element(element) => {
                        if !INVISIBLE_TEXT_ELEMENTS.contains(&element.tag.as_str()) {
                            stack.extend(element.children.iter().rev());
                        }
                    }
                }
            }
        }
        NormalizedBody::Degraded(markup) => push_visible(&mut out, &markup_text(markup)),
    }
    out
}

fn push_visible(out: &mut String, text: &str) {
    out.extend(text.chars().filter(|c| !is_html_space(*c)));
}

/// Text content of a markup fragment, skipping non-rendered elements.
fn markup_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut out = String::new();
    let mut hidden = 0usize;
    for edge in fragment.tree.root().traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(element) if INVISIBLE_TEXT_ELEMENTS.contains(&element.name()) => {
                    hidden += 1
                }
                Node::Text(text) if hidden == 0 => out.push_str(text),
                _ => {}
            },
            Edge::Close(node) => {
                if let Node::Element(element) = node.value() {
                    if INVISIBLE_TEXT_ELEMENTS.contains(&element.name()) {
                        hidden -= 1;
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(id: &str, value: &str) -> DocumentNode {
        DocumentNode::new(id, NodeKind::Text)
            .with_prop("tag", "p")
            .with_prop("text", value)
    }

    #[test]
    fn ids_and_whitespace_do_not_matter() {
        let a = DocumentNode::new("a", NodeKind::Container).with_child(text("x", "Hello   world"));
        let b = DocumentNode::new("b", NodeKind::Container).with_child(text("y", " Hello world\n"));
        assert!(documents_equivalent(&a, &b));
    }

    #[test]
    fn kind_and_child_count_matter() {
        let a = DocumentNode::new("a", NodeKind::Container).with_child(text("x", "Hi"));
        let b = DocumentNode::new("b", NodeKind::Row).with_child(text("y", "Hi"));
        assert_eq!(mismatches(&a, &b), vec!["a".to_string()]);
        let c = DocumentNode::new("c", NodeKind::Container);
        assert!(!documents_equivalent(&a, &c));
    }

    #[test]
    fn verbatim_declaration_order_matters() {
        let mut first = DocumentNode::new("a", NodeKind::Container);
        first.style.base.extra.insert("transition".into(), "all 2s".into());
        first.style.base.extra.insert("transition-duration".into(), "1s".into());
        let mut swapped = DocumentNode::new("b", NodeKind::Container);
        swapped.style.base.extra.insert("transition-duration".into(), "1s".into());
        swapped.style.base.extra.insert("transition".into(), "all 2s".into());
        assert!(!documents_equivalent(&first, &swapped));
        assert!(documents_equivalent(&first, &first.clone()));
    }

    #[test]
    fn non_breaking_spaces_are_visible() {
        assert!(!documents_equivalent(&text("x", "a\u{a0}b"), &text("y", "a b")));
        assert_eq!(visible_text_signature(&text("x", " a\u{a0}b ")), "a\u{a0}b");
    }

    #[test]
    fn implied_layout_equals_explicit_style() {
        let implicit = DocumentNode::new("a", NodeKind::Row);
        let mut explicit = DocumentNode::new("b", NodeKind::Row);
        explicit.style.base.display = Some(Display::Flex);
        explicit.style.base.flex_direction = Some(FlexDirection::Row);
        assert!(documents_equivalent(&implicit, &explicit));
    }

    #[test]
    fn opaque_nodes_match_by_visible_text() {
        let sealed = DocumentNode::opaque("o", "<p class=\"x\">Hello <b>you</b></p>");
        let structured = DocumentNode::new("t", NodeKind::Text)
            .with_prop("tag", "p")
            .with_prop("text", "Hello you");
        assert!(documents_equivalent(&sealed, &structured));
        let other = text("t", "Goodbye");
        assert!(!documents_equivalent(&sealed, &other));
    }

    #[test]
    fn sealed_child_lists_match_their_parsed_structure() {
        let sealed = DocumentNode::new("r", NodeKind::Root)
            .with_child(DocumentNode::opaque("o", "<p>One</p><p>Two</p>"));
        let parsed = DocumentNode::new("s", NodeKind::Root)
            .with_child(text("a", "One"))
            .with_child(text("b", "Two"));
        assert!(documents_equivalent(&sealed, &parsed));
        assert!(documents_equivalent(&parsed, &sealed));
        let shorter = DocumentNode::new("s", NodeKind::Root).with_child(text("a", "One"));
        assert!(!documents_equivalent(&sealed, &shorter));
    }

    #[test]
    fn signatures_skip_scripts_and_styles() {
        let node = DocumentNode::opaque("o", "<div><style>p{}</style>A b<script>x()</script></div>");
        assert_eq!(visible_text_signature(&node), "Ab");
    }

    #[test]
    fn html_strings_compare_through_conversion() -> Result<()> {
        let options = HtmlOptions::default();
        assert!(html_equivalent(
            "<div class=\"p-4\"><p>Hello</p></div>",
            "<div style=\"padding: 1rem\">\n  <p>Hello</p>\n</div>",
            &options,
        )?);
        assert!(!html_equivalent("<p>Hello</p>", "<h1>Hello</h1>", &options)?);
        Ok(())
    }
}
