//! Walks a normalized document and emits the builder tree.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;
use url::Url;

use crate::css::{Display, ExtractedStyle, FlexDirection, extract_style};
use crate::data::{DocumentNode, IdGenerator, IdStrategy, NodeId, NodeKind, PropValue};
use crate::diagnostics::{diagnostics_enabled, log_fallback_tag_once};

use super::classify::{classify, is_inline_node};
use super::markup::{collapse_whitespace, is_blank, is_html_space};
use super::normalize::{NormElement, NormNode, NormalizedBody, NormalizedDocument, append_text, write_nodes};
use super::{HtmlOptions, UnsupportedStructure};

/// Where a built node came from, kept so the fallback guard can seal it.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Source<'a> {
    Element(&'a NormElement),
    /// An anonymous text run made of several sibling nodes.
    Run(&'a [NormNode]),
    Body,
}

impl Source<'_> {
    pub(crate) fn markup(&self, document: &NormalizedDocument) -> String {
        match self {
            Source::Element(element) => element.outer_html(),
            Source::Run(nodes) => {
                let mut out = String::new();
                write_nodes(nodes, None, &mut out);
                out
            }
            Source::Body => document.body_html(),
        }
    }

    pub(crate) fn tag(&self) -> Option<&str> {
        match self {
            Source::Element(element) => Some(&element.tag),
            Source::Run(_) => None,
            Source::Body => Some("body"),
        }
    }
}

pub(crate) struct BuildOutput<'a> {
    pub root: DocumentNode,
    pub sources: HashMap<NodeId, Source<'a>>,
    pub unsupported: Vec<UnsupportedStructure>,
    /// The generator, so later passes keep minting unique ids.
    pub ids: IdGenerator,
}

pub(crate) fn build_document<'a>(
    document: &'a NormalizedDocument,
    options: &HtmlOptions,
    strategy: IdStrategy,
) -> BuildOutput<'a> {
    let mut builder = TreeBuilder {
        options,
        ids: IdGenerator::new(strategy),
        resolver: ResourceResolver::new(options.base_url.as_ref()),
        sources: HashMap::new(),
        unsupported: Vec::new(),
    };
    let root = builder.build_root(document);
    BuildOutput {
        root,
        sources: builder.sources,
        unsupported: builder.unsupported,
        ids: builder.ids,
    }
}

struct TreeBuilder<'a, 'o> {
    options: &'o HtmlOptions,
    ids: IdGenerator,
    resolver: ResourceResolver<'o>,
    sources: HashMap<NodeId, Source<'a>>,
    unsupported: Vec<UnsupportedStructure>,
}

impl<'a, 'o> TreeBuilder<'a, 'o> {
    fn build_root(&mut self, document: &'a NormalizedDocument) -> DocumentNode {
        let mut root = DocumentNode::new(self.ids.next_id(), NodeKind::Root);
        if let Some(title) = &document.title {
            root.props.insert("title".into(), title.clone().into());
        }
        if let Some(lang) = &document.lang {
            root.props.insert("lang".into(), lang.clone().into());
        }
        if !document.html_attrs.is_empty() {
            let attrs: BTreeMap<String, String> = document.html_attrs.iter().cloned().collect();
            root.props.insert("html_attrs".into(), PropValue::Map(attrs));
        }
        if let Some(head) = &document.head {
            root.props.insert("head".into(), head.clone().into());
        }
        let class = attr_value(&document.body_attrs, "class");
        let style = attr_value(&document.body_attrs, "style");
        let extracted = extract_style(class, style, &self.options.breakpoints);
        self.apply_common(&mut root, extracted, &document.body_attrs, &[]);
        self.sources.insert(root.id.clone(), Source::Body);

        match &document.body {
            NormalizedBody::Tree(nodes) => root.children = self.build_children(nodes),
            NormalizedBody::Degraded(markup) => {
                if !is_blank(markup) {
                    let node = DocumentNode::opaque(self.ids.next_id(), markup.clone());
                    self.unsupported.push(UnsupportedStructure {
                        node_id: node.id.clone(),
                        tag: "body".into(),
                        reason: "nesting-depth-exceeded".into(),
                    });
                    self.sources.insert(node.id.clone(), Source::Body);
                    root.children.push(node);
                }
            }
        }
        root
    }

    /// Block children are built one by one; maximal runs of phrasing content
    /// become a single anonymous Text node when they carry visible text.
    fn build_children(&mut self, nodes: &'a [NormNode]) -> Vec<DocumentNode> {
        let mut out = Vec::new();
        let mut idx = 0;
        while idx < nodes.len() {
            if let NormNode::Element(element) = &nodes[idx] {
                if !is_inline_node(&nodes[idx]) {
                    out.push(self.build_element(element));
                    idx += 1;
                    continue;
                }
            }
            let start = idx;
            while idx < nodes.len() && is_inline_node(&nodes[idx]) {
                idx += 1;
            }
            self.build_run(&nodes[start..idx], &mut out);
        }
        out
    }

    fn build_run(&mut self, run: &'a [NormNode], out: &mut Vec<DocumentNode>) {
        let has_text = run
            .iter()
            .any(|node| matches!(node, NormNode::Text(text) if !is_blank(text)));
        if !has_text {
            for node in run {
                if let NormNode::Element(element) = node {
                    out.push(self.build_element(element));
                }
            }
            return;
        }
        let mut node = DocumentNode::new(self.ids.next_id(), NodeKind::Text);
        node.props.insert("text".into(), run_text(run).into());
        if run.iter().any(|n| matches!(n, NormNode::Element(_))) {
            let mut html = String::new();
            write_nodes(run, None, &mut html);
            node.props.insert("html".into(), html.into());
        }
        self.sources.insert(node.id.clone(), Source::Run(run));
        out.push(node);
    }

    fn build_element(&mut self, element: &'a NormElement) -> DocumentNode {
        let extracted = extract_style(
            element.attr("class"),
            element.attr("style"),
            &self.options.breakpoints,
        );
        let classification = classify(element, &extracted.style.base);
        if diagnostics_enabled("html") {
            debug!(
                tag = %element.tag,
                kind = %classification.kind,
                rule = classification.rule,
                confidence = classification.confidence,
                "classified element"
            );
        }
        let node = match classification.kind {
            NodeKind::OpaqueHtml | NodeKind::Root => self.opaque(element, classification.rule),
            NodeKind::Image => self.image(element, extracted),
            NodeKind::Text => self.text(element, extracted),
            NodeKind::Link => self.link(element, extracted),
            NodeKind::Button => self.button(element, extracted),
            NodeKind::Divider | NodeKind::Spacer => {
                let mut node = DocumentNode::new(self.ids.next_id(), classification.kind);
                node.props.insert("tag".into(), element.tag.clone().into());
                self.apply_common(&mut node, extracted, &element.attrs, &[]);
                node
            }
            kind @ (NodeKind::Container | NodeKind::Row | NodeKind::Column | NodeKind::Grid) => {
                self.layout(kind, element, extracted)
            }
        };
        self.sources.insert(node.id.clone(), Source::Element(element));
        node
    }

    fn opaque(&mut self, element: &NormElement, rule: &'static str) -> DocumentNode {
        let node = DocumentNode::opaque(self.ids.next_id(), element.outer_html());
        log_fallback_tag_once(&element.tag, "OpaqueHTML");
        self.unsupported.push(UnsupportedStructure {
            node_id: node.id.clone(),
            tag: element.tag.clone(),
            reason: rule.to_string(),
        });
        node
    }

    fn image(&mut self, element: &NormElement, extracted: ExtractedStyle) -> DocumentNode {
        let mut node = DocumentNode::new(self.ids.next_id(), NodeKind::Image);
        let mut consumed = vec!["src", "alt"];
        if let Some(src) = element.attr("src") {
            node.props.insert("src".into(), self.resolver.resolve(src).into());
        }
        if let Some(alt) = element.attr("alt") {
            node.props.insert("alt".into(), alt.into());
        }
        for dimension in ["width", "height"] {
            if let Some(value) = element.attr(dimension).and_then(parse_dimension) {
                node.props.insert(dimension.into(), PropValue::Number(value));
                consumed.push(dimension);
            }
        }
        self.apply_common(&mut node, extracted, &element.attrs, &consumed);
        node
    }

    fn text(&mut self, element: &NormElement, extracted: ExtractedStyle) -> DocumentNode {
        let mut node = DocumentNode::new(self.ids.next_id(), NodeKind::Text);
        node.props.insert("tag".into(), element.tag.clone().into());
        let raw = element.text_content();
        let text = if element.tag == "pre" {
            raw
        } else {
            collapse_whitespace(&raw)
        };
        node.props.insert("text".into(), text.into());
        if element.element_children().next().is_some() {
            node.props.insert("html".into(), element.inner_html().into());
        }
        self.apply_common(&mut node, extracted, &element.attrs, &[]);
        node
    }

    fn link(&mut self, element: &'a NormElement, extracted: ExtractedStyle) -> DocumentNode {
        let mut node = DocumentNode::new(self.ids.next_id(), NodeKind::Link);
        if let Some(href) = element.attr("href") {
            node.props.insert("href".into(), self.resolver.resolve(href).into());
        }
        if element.children.iter().all(is_inline_node) {
            node.props.insert(
                "text".into(),
                collapse_whitespace(&element.text_content()).into(),
            );
            if element.element_children().next().is_some() {
                node.props.insert("html".into(), element.inner_html().into());
            }
        } else {
            node.children = self.build_children(&element.children);
        }
        self.apply_common(&mut node, extracted, &element.attrs, &["href"]);
        node
    }

    fn button(&mut self, element: &NormElement, extracted: ExtractedStyle) -> DocumentNode {
        let mut node = DocumentNode::new(self.ids.next_id(), NodeKind::Button);
        node.props.insert("tag".into(), element.tag.clone().into());
        node.props.insert(
            "label".into(),
            collapse_whitespace(&element.text_content()).into(),
        );
        if element.element_children().next().is_some() {
            node.props.insert("html".into(), element.inner_html().into());
        }
        let mut consumed = Vec::new();
        if element.tag == "a" {
            if let Some(href) = element.attr("href") {
                node.props.insert("href".into(), self.resolver.resolve(href).into());
            }
            consumed.push("href");
        }
        self.apply_common(&mut node, extracted, &element.attrs, &consumed);
        node
    }

    fn layout(
        &mut self,
        kind: NodeKind,
        element: &'a NormElement,
        extracted: ExtractedStyle,
    ) -> DocumentNode {
        let mut node = DocumentNode::new(self.ids.next_id(), kind);
        node.props.insert("tag".into(), element.tag.clone().into());
        self.apply_common(&mut node, extracted, &element.attrs, &[]);
        let base = &mut node.style.base;
        match kind {
            NodeKind::Row => {
                if !base.display.is_some_and(|d| d.is_flex()) {
                    base.display = Some(Display::Flex);
                }
                base.flex_direction.get_or_insert(FlexDirection::Row);
            }
            NodeKind::Column => {
                if !base.display.is_some_and(|d| d.is_flex()) {
                    base.display = Some(Display::Flex);
                }
                if !base.flex_direction.is_some_and(|d| d.is_column()) {
                    base.flex_direction = Some(FlexDirection::Column);
                }
            }
            NodeKind::Grid => {
                if !base.display.is_some_and(|d| d.is_grid()) {
                    base.display = Some(Display::Grid);
                }
            }
            _ => {}
        }
        node.children = self.build_children(&element.children);
        node
    }

    /// Style, kept classes and the remaining attributes. `class`, `style` and
    /// anything in `consumed` never reach the `attrs` map.
    fn apply_common(
        &self,
        node: &mut DocumentNode,
        extracted: ExtractedStyle,
        attrs: &[(String, String)],
        consumed: &[&str],
    ) {
        node.style = extracted.style;
        if !extracted.kept_classes.is_empty() {
            node.props
                .insert("class".into(), PropValue::List(extracted.kept_classes));
        }
        let rest: BTreeMap<String, String> = attrs
            .iter()
            .filter(|(name, _)| {
                let name = name.as_str();
                name != "class" && name != "style" && !consumed.contains(&name)
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        if !rest.is_empty() {
            node.props.insert("attrs".into(), PropValue::Map(rest));
        }
    }
}

fn attr_value<'v>(attrs: &'v [(String, String)], name: &str) -> Option<&'v str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Collapsed run text. A single space survives at either edge so text next to
/// a sibling element keeps its separation.
fn run_text(run: &[NormNode]) -> String {
    let mut raw = String::new();
    append_text(run, &mut raw);
    let collapsed = collapse_whitespace(&raw);
    let mut text = String::with_capacity(collapsed.len() + 2);
    if raw.starts_with(is_html_space) {
        text.push(' ');
    }
    text.push_str(&collapsed);
    if raw.ends_with(is_html_space) {
        text.push(' ');
    }
    text
}

fn parse_dimension(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Resolves relative `src`/`href` values against the configured base URL.
struct ResourceResolver<'o> {
    base_url: Option<&'o Url>,
}

impl<'o> ResourceResolver<'o> {
    fn new(base_url: Option<&'o Url>) -> Self {
        Self { base_url }
    }

    fn resolve(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with("data:")
            || Url::parse(trimmed).is_ok()
        {
            return trimmed.to_string();
        }
        match self.base_url.map(|base| base.join(trimmed)) {
            Some(Ok(joined)) => joined.to_string(),
            _ => trimmed.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::normalize::normalize;

    fn build(html: &str) -> DocumentNode {
        build_with(html, &HtmlOptions::default())
    }

    fn build_with(html: &str, options: &HtmlOptions) -> DocumentNode {
        let document = normalize(html, options);
        build_document(&document, options, IdStrategy::Sequential).root
    }

    #[test]
    fn mixed_content_forms_anonymous_runs() {
        let root = build("<div>Intro <b>bold</b><section><p>Body</p></section>tail</div>");
        let div = &root.children[0];
        assert_eq!(div.kind, NodeKind::Container);
        let kinds: Vec<NodeKind> = div.children.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![NodeKind::Text, NodeKind::Container, NodeKind::Text]);
        let intro = &div.children[0];
        assert_eq!(intro.prop_str("tag"), None);
        assert_eq!(intro.prop_str("text"), Some("Intro bold"));
        assert_eq!(intro.prop_str("html"), Some("Intro <b>bold</b>"));
        assert_eq!(div.children[2].prop_str("text"), Some("tail"));
    }

    #[test]
    fn images_resolve_against_base_url() {
        let options = HtmlOptions {
            base_url: Url::parse("https://cdn.example.com/assets/").ok(),
            ..HtmlOptions::default()
        };
        let root = build_with(
            "<img src=\"hero.png\" alt=\"Hero\" width=\"640\" height=\"auto\" loading=\"lazy\">",
            &options,
        );
        let image = &root.children[0];
        assert_eq!(image.kind, NodeKind::Image);
        assert_eq!(image.prop_str("src"), Some("https://cdn.example.com/assets/hero.png"));
        assert_eq!(image.prop_number("width"), Some(640.0));
        assert_eq!(image.prop_number("height"), None);
        let attrs = image.prop_map("attrs").unwrap();
        assert_eq!(attrs.get("height").map(String::as_str), Some("auto"));
        assert_eq!(attrs.get("loading").map(String::as_str), Some("lazy"));
    }

    #[test]
    fn rows_get_explicit_direction() {
        let root = build("<div class=\"flex gap-4 card\"><p>a</p><p>b</p></div>");
        let row = &root.children[0];
        assert_eq!(row.kind, NodeKind::Row);
        assert_eq!(row.style.base.flex_direction, Some(FlexDirection::Row));
        assert_eq!(row.prop_list("class").map(|c| c.to_vec()), Some(vec!["card".to_string()]));
    }

    #[test]
    fn links_and_buttons() {
        let root = build(
            "<nav><a href=\"/docs\">Docs</a><a class=\"btn\" href=\"/buy\">Buy <em>now</em></a><a href=\"/card\"><div>Card</div></a></nav>",
        );
        let nav = &root.children[0];
        let docs = &nav.children[0];
        assert_eq!((docs.kind, docs.prop_str("text")), (NodeKind::Link, Some("Docs")));
        let buy = &nav.children[1];
        assert_eq!(buy.kind, NodeKind::Button);
        assert_eq!(buy.prop_str("label"), Some("Buy now"));
        assert_eq!(buy.prop_str("href"), Some("/buy"));
        let card = &nav.children[2];
        assert_eq!(card.kind, NodeKind::Link);
        assert_eq!(card.children.len(), 1);
        assert_eq!(card.prop_str("text"), None);
    }

    #[test]
    fn opaque_nodes_keep_sanitized_markup() {
        let root = build("<canvas id=\"chart\" onclick=\"draw()\"></canvas>");
        assert_eq!(root.children.len(), 1);
        let canvas = &root.children[0];
        assert!(canvas.is_opaque());
        assert_eq!(canvas.raw_content.as_deref(), Some("<canvas id=\"chart\"></canvas>"));
        assert!(canvas.props.is_empty());
    }
}
