//! Parse, repair and sanitize raw markup into an owned element tree.
//!
//! Parsing follows the browser algorithm (html5ever through `scraper`), so any
//! input yields a tree. Comments and doctypes are dropped here; denied elements
//! and attributes are removed before anything downstream sees them.

use ego_tree::NodeRef;
use ego_tree::iter::Edge;
use scraper::{Html, Node};
use tracing::debug;

use super::HtmlOptions;
use super::markup::{collapse_whitespace, is_blank, write_end_tag, write_start_tag, write_text};

/// Attributes that carry a navigable URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "poster", "srcset"];

/// SVG animation elements and the attributes that can animate another
/// attribute (such as `href`) to a `;`-separated list of values.
const ANIMATION_ELEMENTS: &[&str] = &["animate", "set", "animatemotion", "animatetransform"];
const ANIMATION_VALUE_ATTRIBUTES: &[&str] = &["values", "from", "to", "by"];

#[derive(Debug, Clone, PartialEq)]
pub enum NormNode {
    Element(NormElement),
    Text(String),
}

impl NormNode {
    pub fn as_element(&self) -> Option<&NormElement> {
        match self {
            NormNode::Element(element) => Some(element),
            NormNode::Text(_) => None,
        }
    }

    pub fn is_blank_text(&self) -> bool {
        matches!(self, NormNode::Text(text) if is_blank(text))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<NormNode>,
}

impl NormElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn element_children(&self) -> impl Iterator<Item = &NormElement> {
        self.children.iter().filter_map(NormNode::as_element)
    }

    /// Whether any direct text child has visible characters.
    pub fn has_direct_text(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, NormNode::Text(text) if !is_blank(text)))
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        append_text(&self.children, &mut out);
        out
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        write_nodes(&self.children, Some(&self.tag), &mut out);
        out
    }
}

pub(crate) fn append_text(nodes: &[NormNode], out: &mut String) {
    for node in nodes {
        match node {
            NormNode::Text(text) => out.push_str(text),
            NormNode::Element(element) => append_text(&element.children, out),
        }
    }
}

pub(crate) fn write_nodes(nodes: &[NormNode], parent: Option<&str>, out: &mut String) {
    for (idx, node) in nodes.iter().enumerate() {
        match node {
            NormNode::Text(text) => write_text(out, parent, text, idx == 0),
            NormNode::Element(element) => write_element(element, out),
        }
    }
}

fn write_element(element: &NormElement, out: &mut String) {
    write_start_tag(
        out,
        &element.tag,
        element
            .attrs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    );
    write_nodes(&element.children, Some(&element.tag), out);
    write_end_tag(out, &element.tag);
}

/// Body content after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedBody {
    Tree(Vec<NormNode>),
    /// Nesting exceeded the configured depth; the body is kept as sanitized
    /// markup and never walked structurally.
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDocument {
    pub lang: Option<String>,
    /// Sanitized `<html>` attributes other than `lang`.
    pub html_attrs: Vec<(String, String)>,
    pub title: Option<String>,
    /// Sanitized markup of everything in `<head>` except the title.
    pub head: Option<String>,
    pub body_attrs: Vec<(String, String)>,
    pub body: NormalizedBody,
    pub parse_errors: Vec<String>,
    pub stripped_elements: usize,
    pub stripped_attributes: usize,
}

impl NormalizedDocument {
    pub fn is_degraded(&self) -> bool {
        matches!(self.body, NormalizedBody::Degraded(_))
    }

    pub fn body_html(&self) -> String {
        match &self.body {
            NormalizedBody::Tree(nodes) => {
                let mut out = String::new();
                write_nodes(nodes, Some("body"), &mut out);
                out
            }
            NormalizedBody::Degraded(markup) => markup.clone(),
        }
    }
}

#[derive(Default)]
struct Stats {
    stripped_elements: usize,
    stripped_attributes: usize,
}

struct Sanitizer<'a> {
    options: &'a HtmlOptions,
}

impl<'a> Sanitizer<'a> {
    fn denies_tag(&self, tag: &str) -> bool {
        self.options
            .denied_tags
            .iter()
            .any(|denied| denied.eq_ignore_ascii_case(tag))
    }

    fn filter_attrs(&self, element: &scraper::node::Element, stats: &mut Stats) -> Vec<(String, String)> {
        let mut kept = Vec::new();
        let animates = ANIMATION_ELEMENTS.contains(&element.name().to_ascii_lowercase().as_str());
        for (name, value) in element.attrs() {
            let lower = name.to_ascii_lowercase();
            let denied_prefix = self
                .options
                .denied_attribute_prefixes
                .iter()
                .any(|prefix| !prefix.is_empty() && lower.starts_with(&prefix.to_ascii_lowercase()));
            let script_url = self.options.strip_javascript_urls
                && ((URL_ATTRIBUTES.contains(&lower.as_str()) && is_script_url(value))
                    || (animates
                        && ANIMATION_VALUE_ATTRIBUTES.contains(&lower.as_str())
                        && value.split(';').any(is_script_url)));
            if denied_prefix || script_url {
                stats.stripped_attributes += 1;
                continue;
            }
            kept.push((name.to_string(), value.to_string()));
        }
        kept
    }
}

fn has_doctype(html: &str) -> bool {
    let start = html.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    start
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<!doctype"))
}

fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}

/// Parses `html` as a full document and produces the sanitized tree.
///
/// Input without a doctype is parsed as if it had `<!DOCTYPE html>`, so
/// fragments get standards-mode tree construction and a missing doctype is not
/// reported as damage.
pub fn normalize(html: &str, options: &HtmlOptions) -> NormalizedDocument {
    let document = if has_doctype(html) {
        Html::parse_document(html)
    } else {
        Html::parse_document(&format!("<!DOCTYPE html>{html}"))
    };
    let sanitizer = Sanitizer { options };
    let mut stats = Stats::default();
    let root = document.root_element();

    let lang = root
        .value()
        .attr("lang")
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string);
    let html_attrs: Vec<(String, String)> = sanitizer
        .filter_attrs(root.value(), &mut stats)
        .into_iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("lang"))
        .collect();
    let mut title = None;
    let mut head = String::new();
    let mut body_attrs = Vec::new();
    let mut body = NormalizedBody::Tree(Vec::new());

    for child in root.children() {
        let Node::Element(element) = child.value() else {
            continue;
        };
        match element.name() {
            "head" => read_head(child, &sanitizer, &mut title, &mut head, &mut stats),
            "body" => {
                body_attrs = sanitizer.filter_attrs(element, &mut stats);
                body = read_body(child, &sanitizer, &mut stats);
            }
            other if sanitizer.denies_tag(other) => stats.stripped_elements += 1,
            other => debug!(tag = %other, "ignoring element outside head and body"),
        }
    }

    NormalizedDocument {
        lang,
        html_attrs,
        title,
        head: (!head.is_empty()).then_some(head),
        body_attrs,
        body,
        parse_errors: document.errors.iter().map(|err| err.to_string()).collect(),
        stripped_elements: stats.stripped_elements,
        stripped_attributes: stats.stripped_attributes,
    }
}

fn read_head(
    head: NodeRef<'_, Node>,
    sanitizer: &Sanitizer<'_>,
    title: &mut Option<String>,
    out: &mut String,
    stats: &mut Stats,
) {
    for child in head.children() {
        let Node::Element(element) = child.value() else {
            continue;
        };
        let tag = element.name();
        if tag == "title" && title.is_none() {
            let text: String = child
                .children()
                .filter_map(|node| node.value().as_text().map(|t| t.text.to_string()))
                .collect();
            *title = Some(collapse_whitespace(&text));
        } else if sanitizer.denies_tag(tag) {
            stats.stripped_elements += 1;
        } else {
            write_sanitized(child, sanitizer, out, stats);
        }
    }
}

fn read_body(body: NodeRef<'_, Node>, sanitizer: &Sanitizer<'_>, stats: &mut Stats) -> NormalizedBody {
    let depth = element_depth(body);
    if depth > sanitizer.options.max_depth {
        debug!(depth, limit = sanitizer.options.max_depth, "nesting too deep, degrading body");
        let mut markup = String::new();
        for child in body.children() {
            write_sanitized(child, sanitizer, &mut markup, stats);
        }
        return NormalizedBody::Degraded(markup);
    }
    NormalizedBody::Tree(convert_children(body, sanitizer, stats))
}

/// Deepest element nesting below `node`, not counting `node` itself.
fn element_depth(node: NodeRef<'_, Node>) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for edge in node.traverse() {
        match edge {
            Edge::Open(current) if current.value().is_element() => {
                depth += 1;
                max = max.max(depth);
            }
            Edge::Close(current) if current.value().is_element() => depth -= 1,
            _ => {}
        }
    }
    max.saturating_sub(1)
}

fn convert_children(node: NodeRef<'_, Node>, sanitizer: &Sanitizer<'_>, stats: &mut Stats) -> Vec<NormNode> {
    let mut out = Vec::new();
    append_converted(node, sanitizer, stats, &mut out);
    out
}

fn append_converted(
    node: NodeRef<'_, Node>,
    sanitizer: &Sanitizer<'_>,
    stats: &mut Stats,
    out: &mut Vec<NormNode>,
) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => push_text(out, text),
            Node::Element(element) => {
                if sanitizer.denies_tag(element.name()) {
                    stats.stripped_elements += 1;
                    continue;
                }
                out.push(NormNode::Element(NormElement {
                    tag: element.name().to_string(),
                    attrs: sanitizer.filter_attrs(element, stats),
                    children: convert_children(child, sanitizer, stats),
                }));
            }
            // Template contents hang off a fragment node.
            Node::Fragment => append_converted(child, sanitizer, stats, out),
            _ => {}
        }
    }
}

fn push_text(out: &mut Vec<NormNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(NormNode::Text(previous)) = out.last_mut() {
        previous.push_str(text);
        return;
    }
    out.push(NormNode::Text(text.to_string()));
}

/// Writes `node` and its subtree without recursion, applying the denylist.
fn write_sanitized(node: NodeRef<'_, Node>, sanitizer: &Sanitizer<'_>, out: &mut String, stats: &mut Stats) {
    let mut skipping: Option<ego_tree::NodeId> = None;
    for edge in node.traverse() {
        match edge {
            Edge::Open(current) => {
                if skipping.is_some() {
                    continue;
                }
                match current.value() {
                    Node::Element(element) => {
                        let tag = element.name();
                        if sanitizer.denies_tag(tag) {
                            stats.stripped_elements += 1;
                            skipping = Some(current.id());
                            continue;
                        }
                        let attrs = sanitizer.filter_attrs(element, stats);
                        write_start_tag(
                            out,
                            tag,
                            attrs.iter().map(|(name, value)| (name.as_str(), value.as_str())),
                        );
                    }
                    Node::Text(text) => {
                        let parent = current
                            .parent()
                            .and_then(|parent| parent.value().as_element())
                            .map(|element| element.name());
                        write_text(out, parent, text, current.prev_sibling().is_none());
                    }
                    _ => {}
                }
            }
            Edge::Close(current) => {
                if let Some(id) = skipping {
                    if id == current.id() {
                        skipping = None;
                    }
                    continue;
                }
                if let Node::Element(element) = current.value() {
                    write_end_tag(out, element.name());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_nodes(doc: &NormalizedDocument) -> &[NormNode] {
        match &doc.body {
            NormalizedBody::Tree(nodes) => nodes,
            NormalizedBody::Degraded(_) => panic!("unexpected degraded body"),
        }
    }

    #[test]
    fn strips_denied_elements_and_event_handlers() {
        let options = HtmlOptions::default();
        let doc = normalize(
            "<div onclick=\"x()\"><p>A<script>alert(1)</script></p><a href=\"javascript:go()\">b</a></div>",
            &options,
        );
        let div = body_nodes(&doc)[0].as_element().unwrap();
        assert!(div.attrs.is_empty());
        assert_eq!(div.outer_html(), "<div><p>A</p><a>b</a></div>");
        assert_eq!(doc.stripped_elements, 1);
        assert_eq!(doc.stripped_attributes, 2);
    }

    #[test]
    fn repairs_unclosed_markup_and_reports_it() {
        let doc = normalize("<div><p>Unclosed", &HtmlOptions::default());
        let div = body_nodes(&doc)[0].as_element().unwrap();
        assert_eq!(div.tag, "div");
        assert_eq!(div.text_content(), "Unclosed");
        assert!(!doc.parse_errors.is_empty());
    }

    #[test]
    fn head_parts_are_split_out() {
        let doc = normalize(
            "<html lang=\"en\"><head><title> My  Page </title><meta charset=\"utf-8\"><script src=\"a.js\"></script></head><body class=\"page\"><!-- note --><p>x</p></body></html>",
            &HtmlOptions::default(),
        );
        assert_eq!(doc.lang.as_deref(), Some("en"));
        assert!(doc.html_attrs.is_empty());
        assert_eq!(doc.title.as_deref(), Some("My Page"));
        assert_eq!(doc.head.as_deref(), Some("<meta charset=\"utf-8\">"));
        assert_eq!(doc.body_attrs, vec![("class".to_string(), "page".to_string())]);
        assert_eq!(body_nodes(&doc).len(), 1);
    }

    #[test]
    fn deep_nesting_degrades_to_markup() {
        let options = HtmlOptions {
            max_depth: 8,
            ..HtmlOptions::default()
        };
        let html = format!("{}deep<script>x</script>{}", "<div>".repeat(20), "</div>".repeat(20));
        let doc = normalize(&html, &options);
        assert!(doc.is_degraded());
        let markup = doc.body_html();
        assert!(markup.contains("deep"));
        assert!(!markup.contains("script"));
    }

    #[test]
    fn well_formed_fragments_report_no_errors() {
        let doc = normalize("<div class=\"flex\"><p>Hello</p></div>", &HtmlOptions::default());
        assert!(doc.parse_errors.is_empty(), "{:?}", doc.parse_errors);
        assert!(has_doctype("\n<!doctype html><p>x"));
    }

    #[test]
    fn svg_animations_cannot_set_script_urls() {
        let doc = normalize(
            r#"<svg><a><animate attributeName="href" values="https://a.test;javascript:alert(1)"/><set attributeName="href" to=" javascript:alert(2)"/><animate attributeName="x" from="0" to="10"/><text>go</text></a></svg>"#,
            &HtmlOptions::default(),
        );
        let svg = body_nodes(&doc)[0].as_element().unwrap();
        let markup = svg.outer_html();
        assert!(!markup.contains("javascript"), "{markup}");
        assert!(markup.contains(r#"from="0" to="10""#), "{markup}");
        assert_eq!(doc.stripped_attributes, 2);
    }

    #[test]
    fn script_urls_are_detected_through_obfuscation() {
        assert!(is_script_url(" JaVa\tScript:alert(1)"));
        assert!(is_script_url("vbscript:msgbox"));
        assert!(!is_script_url("/javascript:guide"));
        assert!(!is_script_url("https://example.com"));
    }
}
