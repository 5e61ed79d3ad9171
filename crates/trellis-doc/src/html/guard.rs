//! Fallback guard: demote whatever does not survive a round trip.
//!
//! Each round serializes the tree, re-normalizes and rebuilds it, and diffs the
//! two. Mismatching subtrees become OpaqueHTML holding their normalized source
//! markup. A round that cannot demote anything ends the loop, and the number
//! of rounds is capped by the classified-node count, which every demotion
//! strictly reduces.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::data::{DocumentNode, IdGenerator, IdStrategy, NodeId};

use super::builder::{Source, build_document};
use super::equiv::{mismatches, source_signature, visible_text_signature};
use super::markup::is_blank;
use super::normalize::{NormalizedDocument, normalize};
use super::serialize::document_to_html_with;
use super::{DemotedSubtree, HtmlOptions};

pub(crate) struct Guard<'a, 'o> {
    pub document: &'a NormalizedDocument,
    pub options: &'o HtmlOptions,
    pub sources: HashMap<NodeId, Source<'a>>,
    pub ids: IdGenerator,
    pub demoted: Vec<DemotedSubtree>,
}

impl<'a, 'o> Guard<'a, 'o> {
    pub fn run(&mut self, mut root: DocumentNode) -> DocumentNode {
        let classified = root.descendants().filter(|node| !node.is_opaque()).count();
        for round in 0..=classified {
            let mismatched = self.reparse_mismatches(&root);
            if mismatched.is_empty() {
                debug!(round, "round trip stable");
                break;
            }
            debug!(round, count = mismatched.len(), "round trip mismatches");
            if !self.demote(&mut root, &mismatched) {
                warn!(round, "fallback guard could not isolate remaining mismatches");
                break;
            }
        }
        if visible_text_signature(&root) != source_signature(self.document) {
            warn!("visible text changed across the round trip; sealing the body");
            self.collapse_body(&mut root, "visible-text-mismatch");
        }
        root
    }

    fn reparse_mismatches(&self, root: &DocumentNode) -> Vec<NodeId> {
        let html = match document_to_html_with(root, &self.options.breakpoints) {
            Ok(html) => html,
            Err(err) => {
                warn!(error = %err, "built tree failed to serialize");
                return vec![root.id.clone()];
            }
        };
        let reparsed = normalize(&html, self.options);
        let rebuilt = build_document(&reparsed, self.options, IdStrategy::Sequential);
        mismatches(root, &rebuilt.root)
    }

    /// Demotes every mismatching node in one pass. A mismatch on a node that is
    /// already opaque moves up to its parent; one that reaches the root seals
    /// the whole body. Returns whether anything changed.
    fn demote(&mut self, root: &mut DocumentNode, mismatched: &[NodeId]) -> bool {
        let mut parents: HashMap<&str, &str> = HashMap::new();
        let mut opaque: HashSet<&str> = HashSet::new();
        for node in root.descendants() {
            if node.is_opaque() {
                opaque.insert(node.id.as_str());
            }
            for child in &node.children {
                parents.insert(child.id.as_str(), node.id.as_str());
            }
        }
        let mut targets: HashSet<NodeId> = HashSet::new();
        let mut seal_body = false;
        for id in mismatched {
            let target = if opaque.contains(id.as_str()) {
                parents.get(id.as_str()).copied()
            } else {
                Some(id.as_str())
            };
            match target {
                Some(target) if target != root.id => {
                    targets.insert(target.to_string());
                }
                _ => seal_body = true,
            }
        }

        if seal_body {
            return self.collapse_body(root, "root-mismatch");
        }

        let mut changed = false;
        let mut stack: Vec<&mut DocumentNode> = root.children.iter_mut().collect();
        while let Some(node) = stack.pop() {
            if !targets.contains(&node.id) {
                stack.extend(node.children.iter_mut());
                continue;
            }
            let Some(source) = self.sources.get(&node.id).copied() else {
                debug!(node_id = %node.id, "no source recorded, leaving node as is");
                continue;
            };
            info!(node_id = %node.id, kind = %node.kind, "demoting subtree to OpaqueHTML");
            self.demoted.push(DemotedSubtree {
                node_id: node.id.clone(),
                tag: source.tag().map(str::to_string),
                reason: "round-trip-mismatch".into(),
            });
            *node = DocumentNode::opaque(node.id.clone(), source.markup(self.document));
            changed = true;
        }
        changed
    }

    /// Replaces the body with one opaque node holding the normalized body
    /// markup. Returns `false` when the body is already sealed.
    fn collapse_body(&mut self, root: &mut DocumentNode, reason: &str) -> bool {
        let raw = self.document.body_html();
        let already_sealed = match root.children.as_slice() {
            [] => is_blank(&raw),
            [only] => only.raw_content.as_deref() == Some(raw.as_str()),
            _ => false,
        };
        if already_sealed {
            return false;
        }
        let id = self.ids.next_id();
        info!(node_id = %id, reason, "sealing body as a single OpaqueHTML node");
        self.sources.insert(id.clone(), Source::Body);
        self.demoted.push(DemotedSubtree {
            node_id: id.clone(),
            tag: Some("body".into()),
            reason: reason.to_string(),
        });
        root.children = vec![DocumentNode::opaque(id, raw)];
        true
    }
}
