//! Builder tree back to HTML.
//!
//! The writer walks with an explicit stack, so arbitrarily deep trees render
//! without growing the call stack. Anything the builder could not have
//! produced is rejected as a serialization failure instead of being guessed at.

use crate::css::{BreakpointTable, StyleRecord, format_number, responsive_classes, to_inline_css};
use crate::data::{DocumentNode, NodeKind, PropValue};
use crate::error::{ConvertError, Result};

use super::classify::{BLOCK_CONTAINER_TAGS, TEXT_TAGS};
use super::markup::{is_void, write_end_tag, write_start_tag, write_text};

/// Serializes a full document (`Root` at the top) or a fragment for any other kind.
pub fn document_to_html_with(node: &DocumentNode, breakpoints: &BreakpointTable) -> Result<String> {
    let mut writer = HtmlWriter {
        breakpoints,
        out: String::new(),
    };
    if node.kind == NodeKind::Root {
        writer.document(node)?;
    } else {
        writer.nodes(std::slice::from_ref(node))?;
    }
    Ok(writer.out)
}

/// Serializes one node and its subtree as a fragment.
pub fn node_to_html(node: &DocumentNode, breakpoints: &BreakpointTable) -> Result<String> {
    if node.kind == NodeKind::Root {
        return Err(ConvertError::corrupted(format!(
            "node {}: Root cannot be rendered as a fragment",
            node.id
        )));
    }
    document_to_html_with(node, breakpoints)
}

fn corrupt(node: &DocumentNode, message: impl std::fmt::Display) -> ConvertError {
    ConvertError::corrupted(format!("node {}: {message}", node.id))
}

fn allowed_tag(kind: NodeKind, tag: &str) -> bool {
    match kind {
        NodeKind::Text => TEXT_TAGS.contains(&tag) || BLOCK_CONTAINER_TAGS.contains(&tag),
        NodeKind::Container | NodeKind::Row | NodeKind::Column | NodeKind::Grid => {
            BLOCK_CONTAINER_TAGS.contains(&tag)
        }
        NodeKind::Divider => tag == "hr",
        NodeKind::Spacer => tag == "br" || BLOCK_CONTAINER_TAGS.contains(&tag),
        NodeKind::Button => tag == "button" || tag == "a",
        NodeKind::Root | NodeKind::Image | NodeKind::Link | NodeKind::OpaqueHtml => false,
    }
}

fn valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            !c.is_whitespace()
                && !c.is_control()
                && !matches!(c, '"' | '\'' | '>' | '/' | '=' | '<')
        })
}

/// Checks one node against the shapes the builder emits. Children are not visited.
pub(crate) fn check_node_shape(node: &DocumentNode, is_top: bool) -> Result<()> {
    if node.kind == NodeKind::Root && !is_top {
        return Err(corrupt(node, "Root may only appear at the top of a document"));
    }
    if node.kind == NodeKind::OpaqueHtml {
        if node.raw_content.is_none() {
            return Err(corrupt(node, "OpaqueHTML without raw content"));
        }
        if !node.props.is_empty() || !node.style.is_empty() || !node.children.is_empty() {
            return Err(corrupt(node, "OpaqueHTML must not carry props, style or children"));
        }
        return Ok(());
    }
    if node.raw_content.is_some() {
        return Err(corrupt(node, format!("{} cannot carry raw content", node.kind)));
    }
    if node.kind.is_leaf() && !node.children.is_empty() {
        return Err(corrupt(node, format!("{} is a leaf but has children", node.kind)));
    }
    let allowed = node.kind.allowed_props();
    for (key, value) in &node.props {
        if !allowed.contains(&key.as_str()) {
            return Err(corrupt(node, format!("unexpected property '{key}' on {}", node.kind)));
        }
        let shape_ok = match key.as_str() {
            "class" => value
                .as_list()
                .is_some_and(|classes| classes.iter().all(|c| !c.is_empty() && !c.contains(char::is_whitespace))),
            "html_attrs" => value.as_map().is_some_and(|attrs| {
                attrs
                    .keys()
                    .all(|name| valid_attribute_name(name) && !name.eq_ignore_ascii_case("lang"))
            }),
            "attrs" => value.as_map().is_some_and(|attrs| {
                attrs.keys().all(|name| {
                    valid_attribute_name(name)
                        && !name.eq_ignore_ascii_case("class")
                        && !name.eq_ignore_ascii_case("style")
                })
            }),
            "width" | "height" => value.as_number().is_some_and(f64::is_finite),
            _ => value.as_str().is_some(),
        };
        if !shape_ok {
            return Err(corrupt(node, format!("property '{key}' has the wrong shape")));
        }
    }
    if let Some(tag) = node.prop_str("tag") {
        if !allowed_tag(node.kind, tag) {
            return Err(corrupt(node, format!("tag '{tag}' is not valid for {}", node.kind)));
        }
    }
    Ok(())
}

enum Step<'n> {
    Enter(&'n DocumentNode),
    Exit(&'n str),
}

struct HtmlWriter<'b> {
    breakpoints: &'b BreakpointTable,
    out: String,
}

impl<'b> HtmlWriter<'b> {
    fn document(&mut self, root: &DocumentNode) -> Result<()> {
        check_node_shape(root, true)?;
        self.out.push_str("<!DOCTYPE html>");
        let mut html_attrs: Vec<(&str, &str)> = Vec::new();
        if let Some(lang) = root.prop_str("lang") {
            html_attrs.push(("lang", lang));
        }
        if let Some(attrs) = root.prop_map("html_attrs") {
            html_attrs.extend(attrs.iter().map(|(name, value)| (name.as_str(), value.as_str())));
        }
        write_start_tag(&mut self.out, "html", html_attrs);
        self.out.push_str("<head>");
        if let Some(title) = root.prop_str("title") {
            self.out.push_str("<title>");
            write_text(&mut self.out, Some("title"), title, true);
            self.out.push_str("</title>");
        }
        if let Some(head) = root.prop_str("head") {
            self.out.push_str(head);
        }
        self.out.push_str("</head>");
        self.open_tag(root, "body", &[])?;
        self.nodes(&root.children)?;
        self.out.push_str("</body></html>");
        Ok(())
    }

    fn nodes(&mut self, nodes: &[DocumentNode]) -> Result<()> {
        let mut stack: Vec<Step<'_>> = nodes.iter().rev().map(Step::Enter).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Exit(tag) => write_end_tag(&mut self.out, tag),
                Step::Enter(node) => {
                    check_node_shape(node, false)?;
                    if let Some(tag) = self.enter(node)? {
                        stack.push(Step::Exit(tag));
                        stack.extend(node.children.iter().rev().map(Step::Enter));
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes a node's start tag and leaf content. Returns the tag to close
    /// once the node's children are written, if it has a child list.
    fn enter<'n>(&mut self, node: &'n DocumentNode) -> Result<Option<&'n str>> {
        match node.kind {
            NodeKind::Root => Err(corrupt(node, "Root may only appear at the top of a document")),
            NodeKind::OpaqueHtml => {
                self.out.push_str(node.raw_content.as_deref().unwrap_or_default());
                Ok(None)
            }
            NodeKind::Container | NodeKind::Row | NodeKind::Column | NodeKind::Grid => {
                let tag = node.prop_str("tag").unwrap_or("div");
                self.open_tag(node, tag, &[])?;
                Ok(Some(tag))
            }
            NodeKind::Text => {
                match node.prop_str("tag") {
                    Some(tag) => {
                        self.open_tag(node, tag, &[])?;
                        self.rich_content(node, tag, "text");
                        write_end_tag(&mut self.out, tag);
                    }
                    None => {
                        if !node.style.is_empty() || node.props.contains_key("class") || node.props.contains_key("attrs") {
                            return Err(corrupt(node, "anonymous text cannot carry style or attributes"));
                        }
                        match node.prop_str("html") {
                            Some(html) => self.out.push_str(html),
                            None => write_text(&mut self.out, None, node.prop_str("text").unwrap_or_default(), false),
                        }
                    }
                }
                Ok(None)
            }
            NodeKind::Image => {
                let mut specific: Vec<(&str, String)> = Vec::new();
                if let Some(src) = node.prop_str("src") {
                    specific.push(("src", src.to_string()));
                }
                if let Some(alt) = node.prop_str("alt") {
                    specific.push(("alt", alt.to_string()));
                }
                for dimension in ["width", "height"] {
                    if let Some(value) = node.prop_number(dimension) {
                        specific.push((dimension, format_number(value)));
                    }
                }
                self.open_tag(node, "img", &specific)?;
                Ok(None)
            }
            NodeKind::Link => {
                let mut specific: Vec<(&str, String)> = Vec::new();
                if let Some(href) = node.prop_str("href") {
                    specific.push(("href", href.to_string()));
                }
                self.open_tag(node, "a", &specific)?;
                if node.children.is_empty() {
                    self.rich_content(node, "a", "text");
                    write_end_tag(&mut self.out, "a");
                    return Ok(None);
                }
                if node.props.contains_key("text") || node.props.contains_key("html") {
                    return Err(corrupt(node, "Link has both text and children"));
                }
                Ok(Some("a"))
            }
            NodeKind::Button => {
                let tag = node.prop_str("tag").unwrap_or("button");
                let mut specific: Vec<(&str, String)> = Vec::new();
                if let Some(href) = node.prop_str("href") {
                    if tag != "a" {
                        return Err(corrupt(node, "only anchor buttons carry href"));
                    }
                    specific.push(("href", href.to_string()));
                }
                self.open_tag(node, tag, &specific)?;
                self.rich_content(node, tag, "label");
                write_end_tag(&mut self.out, tag);
                Ok(None)
            }
            NodeKind::Divider => {
                self.open_tag(node, "hr", &[])?;
                Ok(None)
            }
            NodeKind::Spacer => {
                let tag = node.prop_str("tag").unwrap_or("br");
                self.open_tag(node, tag, &[])?;
                write_end_tag(&mut self.out, tag);
                Ok(None)
            }
        }
    }

    /// `html` when present, otherwise the escaped plain-text prop.
    fn rich_content(&mut self, node: &DocumentNode, tag: &str, text_key: &str) {
        match node.prop_str("html") {
            Some(html) => self.out.push_str(html),
            None => write_text(
                &mut self.out,
                Some(tag),
                node.prop_str(text_key).unwrap_or_default(),
                true,
            ),
        }
    }

    /// Attribute order: class, style, kind-specific, then the `attrs` map by name.
    fn open_tag(&mut self, node: &DocumentNode, tag: &str, specific: &[(&str, String)]) -> Result<()> {
        if is_void(tag) && !node.children.is_empty() {
            return Err(corrupt(node, format!("<{tag}> cannot have children")));
        }
        let mut attrs: Vec<(&str, String)> = Vec::new();
        let classes = class_list(node, &node.style, self.breakpoints);
        if !classes.is_empty() {
            attrs.push(("class", classes));
        }
        let css = to_inline_css(&node.style.base);
        if !css.is_empty() {
            attrs.push(("style", css));
        }
        attrs.extend(specific.iter().map(|(name, value)| (*name, value.clone())));
        if let Some(PropValue::Map(extra)) = node.props.get("attrs") {
            for (name, value) in extra {
                if attrs.iter().any(|(existing, _)| existing.eq_ignore_ascii_case(name)) {
                    return Err(corrupt(node, format!("attribute '{name}' is set twice")));
                }
                attrs.push((name.as_str(), value.clone()));
            }
        }
        write_start_tag(
            &mut self.out,
            tag,
            attrs.iter().map(|(name, value)| (*name, value.as_str())),
        );
        Ok(())
    }
}

fn class_list(node: &DocumentNode, style: &StyleRecord, breakpoints: &BreakpointTable) -> String {
    let mut classes: Vec<String> = node
        .prop_list("class")
        .map(|kept| kept.to_vec())
        .unwrap_or_default();
    classes.extend(responsive_classes(style, breakpoints));
    classes.join(" ")
}
