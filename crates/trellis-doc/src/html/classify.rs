//! Element classification.
//!
//! A pure function of one element and its base style: the same input always
//! produces the same kind. Rules live in static tables so the mapping can be
//! read top to bottom.

use crate::css::StyleValues;
use crate::data::NodeKind;

use super::normalize::{NormElement, NormNode};

/// Phrasing elements that may appear inside a rich-text run.
pub const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "br", "cite", "code", "del", "em", "i", "ins", "kbd", "mark", "q", "s",
    "small", "span", "strong", "sub", "sup", "time", "u",
];

/// Elements that become a Text node when their content is phrasing-only.
pub const TEXT_TAGS: &[&str] = &[
    "abbr", "address", "b", "blockquote", "cite", "code", "dd", "del", "dt", "em", "figcaption",
    "h1", "h2", "h3", "h4", "h5", "h6", "i", "ins", "kbd", "label", "li", "mark", "p", "pre", "q",
    "s", "small", "span", "strong", "sub", "sup", "time", "u",
];

/// Block elements that map onto the layout kinds.
pub const BLOCK_CONTAINER_TAGS: &[&str] = &[
    "article", "aside", "blockquote", "dd", "div", "dl", "figure", "footer", "header", "li",
    "main", "nav", "ol", "p", "section", "ul",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub kind: NodeKind,
    /// Name of the rule that fired, for diagnostics.
    pub rule: &'static str,
    pub confidence: f32,
}

impl Classification {
    fn exact(kind: NodeKind, rule: &'static str) -> Self {
        Self {
            kind,
            rule,
            confidence: 1.0,
        }
    }

    fn heuristic(kind: NodeKind, rule: &'static str) -> Self {
        Self {
            kind,
            rule,
            confidence: 0.6,
        }
    }

    fn opaque(rule: &'static str) -> Self {
        Self {
            kind: NodeKind::OpaqueHtml,
            rule,
            confidence: 0.0,
        }
    }
}

pub fn is_inline_node(node: &NormNode) -> bool {
    match node {
        NormNode::Text(_) => true,
        NormNode::Element(element) => {
            INLINE_TAGS.contains(&element.tag.as_str()) && is_inline_content(&element.children)
        }
    }
}

/// Whether every node is text or phrasing markup.
pub fn is_inline_content(nodes: &[NormNode]) -> bool {
    nodes.iter().all(is_inline_node)
}

fn is_button_like(element: &NormElement) -> bool {
    let role_button = element
        .attr("role")
        .is_some_and(|role| role.trim().eq_ignore_ascii_case("button"));
    let class_button = element.attr("class").is_some_and(|classes| {
        classes
            .split_whitespace()
            .any(|class| class == "btn" || class == "button" || class.starts_with("btn-"))
    });
    role_button || class_button
}

/// Picks the builder kind for `element`, given its base style values.
pub fn classify(element: &NormElement, style: &StyleValues) -> Classification {
    let tag = element.tag.as_str();
    if tag.contains('-') {
        return Classification::opaque("custom-element");
    }
    let inline = is_inline_content(&element.children);
    match tag {
        "img" => return Classification::exact(NodeKind::Image, "img"),
        "hr" => return Classification::exact(NodeKind::Divider, "hr"),
        "br" => return Classification::exact(NodeKind::Spacer, "br"),
        "button" if inline => return Classification::exact(NodeKind::Button, "button"),
        "button" => return Classification::opaque("button-with-block-content"),
        "a" if inline && is_button_like(element) => {
            return Classification::heuristic(NodeKind::Button, "button-like-link");
        }
        "a" if inline => return Classification::exact(NodeKind::Link, "inline-link"),
        "a" => return Classification::exact(NodeKind::Link, "block-link"),
        _ => {}
    }
    if TEXT_TAGS.contains(&tag) && inline {
        return if tag == "span" || tag == "li" {
            Classification::heuristic(NodeKind::Text, "phrasing-element")
        } else {
            Classification::exact(NodeKind::Text, "text-element")
        };
    }
    if BLOCK_CONTAINER_TAGS.contains(&tag) {
        return classify_block(element, style, inline);
    }
    Classification::opaque("unsupported-element")
}

fn classify_block(element: &NormElement, style: &StyleValues, inline: bool) -> Classification {
    let element_children = element.element_children().count();
    if let Some(display) = style.display {
        if display.is_grid() {
            return Classification::exact(NodeKind::Grid, "display-grid");
        }
        if display.is_flex() {
            return match style.flex_direction {
                Some(direction) if direction.is_column() => {
                    Classification::exact(NodeKind::Column, "flex-column")
                }
                Some(_) => Classification::exact(NodeKind::Row, "flex-row"),
                // Implicit direction only reads as a row when there is something to lay out.
                None if element_children >= 2 => {
                    Classification::heuristic(NodeKind::Row, "flex-implicit-row")
                }
                None => Classification::heuristic(NodeKind::Container, "flex-single-child"),
            };
        }
    }
    if element_children == 0 {
        if element.has_direct_text() {
            return Classification::heuristic(NodeKind::Text, "text-only-block");
        }
        if style.height.is_some() {
            return Classification::heuristic(NodeKind::Spacer, "empty-with-height");
        }
        return Classification::exact(NodeKind::Container, "empty-block");
    }
    if inline && element.has_direct_text() {
        return Classification::heuristic(NodeKind::Text, "rich-text-block");
    }
    Classification::exact(NodeKind::Container, "block")
}
