//! Multi-page sites: request paths mapped to stored documents.

use std::collections::BTreeMap;

use tracing::debug;

use crate::css::BreakpointTable;
use crate::data::DocumentNode;
use crate::error::Result;
use crate::html::document_to_html_with;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLookup {
    Found(String),
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct Site {
    pages: BTreeMap<String, DocumentNode>,
    breakpoints: BreakpointTable,
}

impl Site {
    pub fn new(breakpoints: BreakpointTable) -> Self {
        Self {
            pages: BTreeMap::new(),
            breakpoints,
        }
    }

    pub fn from_documents<I, P>(breakpoints: BreakpointTable, pages: I) -> Self
    where
        I: IntoIterator<Item = (P, DocumentNode)>,
        P: AsRef<str>,
    {
        let mut site = Self::new(breakpoints);
        for (path, document) in pages {
            site.insert(path.as_ref(), document);
        }
        site
    }

    /// Stores `document` under the normalized form of `path`, replacing any
    /// page already there.
    pub fn insert(&mut self, path: &str, document: DocumentNode) -> Option<DocumentNode> {
        self.pages.insert(normalize_path(path), document)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn document(&self, path: &str) -> Option<&DocumentNode> {
        self.pages.get(&normalize_path(path))
    }

    /// Renders the page stored at `path`. A stored tree that cannot be
    /// serialized is an error, not a missing page.
    pub fn page_body(&self, path: &str) -> Result<PageLookup> {
        let key = normalize_path(path);
        let Some(document) = self.pages.get(&key) else {
            debug!(path = %key, "no page for path");
            return Ok(PageLookup::NotFound);
        };
        let html = document_to_html_with(document, &self.breakpoints)?;
        Ok(PageLookup::Found(html))
    }
}

/// Canonical page key: no query or fragment, one leading slash, no empty
/// segments, and no trailing slash, `.html` or `index` suffix. The site root
/// is `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    if let Some(last) = segments.pop() {
        let last = last.strip_suffix(".html").unwrap_or(last);
        if last != "index" && !last.is_empty() {
            segments.push(last);
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeKind;

    fn page(text: &str) -> DocumentNode {
        DocumentNode::new("r", NodeKind::Root).with_child(
            DocumentNode::new("t", NodeKind::Text)
                .with_prop("tag", "p")
                .with_prop("text", text),
        )
    }

    #[test]
    fn paths_normalize_to_one_key() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/index.html"), "/");
        assert_eq!(normalize_path("about"), "/about");
        assert_eq!(normalize_path("/about/"), "/about");
        assert_eq!(normalize_path("/about.html?ref=nav#team"), "/about");
        assert_eq!(normalize_path("//blog//index"), "/blog");
    }

    #[test]
    fn lookups_render_or_report_missing() {
        let site = Site::from_documents(
            BreakpointTable::default(),
            [("/", page("Home")), ("/about.html", page("About"))],
        );
        assert_eq!(site.len(), 2);
        match site.page_body("/about/").unwrap() {
            PageLookup::Found(html) => assert!(html.contains("<p>About</p>")),
            PageLookup::NotFound => panic!("expected the about page"),
        }
        assert_eq!(site.page_body("/missing").unwrap(), PageLookup::NotFound);
    }
}
