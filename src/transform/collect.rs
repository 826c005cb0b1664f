use std::collections::{BTreeSet, HashMap, HashSet};

use markdown::mdast::Node;
use markdown::unist::Position;

use crate::output::inlines_to_string;
use crate::tree::NodePath;

/// Collapses a string into a whitespace-concise form, for use as a canonical identifier.
pub(crate) fn normalize_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }
    result
}

/// Renders a link's display text back to literal Markdown (inline formatting preserved) and
/// normalizes it into the link's identity string.
pub(crate) fn link_name(children: &[Node]) -> String {
    normalize_text(&inlines_to_string(children))
}

/// How a link carries its URL: directly, or through a definition's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LinkKind {
    Inline { url: String },
    Reference { identifier: String },
}

/// One link or link-reference occurrence found during collection.
///
/// The `path` is the occurrence's handle on its node: the rewrite pass replaces nodes at the exact
/// child slot the path addresses, so the path keeps pointing at whatever currently occupies the
/// slot.
#[derive(Debug, Clone)]
pub(crate) struct LinkOccurrence {
    /// sequential id shared by all occurrences with the same name
    pub id: usize,
    /// the heading section this occurrence falls under; `None` means the preamble
    pub heading_id: Option<usize>,
    pub path: NodePath,
    /// the normalized identity string; never empty
    pub name: String,
    pub kind: LinkKind,
    pub position: Option<Position>,
}

/// A link definition (`[identifier]: url "title"`), indexed by normalized identifier.
/// Later definitions with the same identifier are ignored, never overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefinitionRecord {
    pub url: String,
    pub title: Option<String>,
}

/// Everything the transform passes need to know about a document, gathered in a single pre-order
/// traversal. Collection performs no mutation.
#[derive(Debug, Default)]
pub(crate) struct DocInfo {
    id_seq: usize,
    heading_seq: usize,
    /// all occurrences, in traversal order
    pub links: Vec<LinkOccurrence>,
    pub link_ids_by_name: HashMap<String, usize>,
    pub definitions: HashMap<String, DefinitionRecord>,
}

impl DocInfo {
    pub fn collect(root: &Node) -> Self {
        let mut info = Self::default();
        let mut path = NodePath::new();
        info.visit(root, &mut path);
        info
    }

    fn visit(&mut self, node: &Node, path: &mut NodePath) {
        self.ingest(node, path);
        let Some(children) = node.children() else { return };
        for (idx, child) in children.iter().enumerate() {
            path.push(idx);
            self.visit(child, path);
            path.pop();
        }
    }

    fn ingest(&mut self, node: &Node, path: &NodePath) {
        match node {
            Node::Link(link) => {
                let kind = LinkKind::Inline { url: link.url.clone() };
                self.ingest_link_node(&link.children, kind, link.position.clone(), path);
            }
            Node::LinkReference(link_ref) => {
                let kind = LinkKind::Reference {
                    identifier: normalize_text(&link_ref.identifier),
                };
                self.ingest_link_node(&link_ref.children, kind, link_ref.position.clone(), path);
            }
            Node::Definition(def) => {
                let identifier = normalize_text(&def.identifier);
                self.definitions.entry(identifier).or_insert_with(|| DefinitionRecord {
                    url: def.url.clone(),
                    title: def.title.clone(),
                });
            }
            Node::Heading(_) => {
                self.heading_seq += 1;
            }
            _ => {}
        }
    }

    fn ingest_link_node(&mut self, children: &[Node], kind: LinkKind, position: Option<Position>, path: &NodePath) {
        let name = link_name(children);
        if name.is_empty() {
            // a link with no text can't be matched against anything; it neither blocks nor
            // participates in conflict analysis
            return;
        }

        let id = match self.link_ids_by_name.get(&name) {
            Some(&id) => id,
            None => {
                self.id_seq += 1;
                self.link_ids_by_name.insert(name.clone(), self.id_seq);
                self.id_seq
            }
        };

        let heading_id = (self.heading_seq > 0).then_some(self.heading_seq);
        self.links.push(LinkOccurrence {
            id,
            heading_id,
            path: path.clone(),
            name,
            kind,
            position,
        });
    }

    /// The set of distinct URLs each link identity resolves to: an inline occurrence contributes
    /// its own URL, a reference occurrence the URL of its matching definition. Empty URLs count as
    /// no URL at all.
    pub fn resolved_urls(&self) -> HashMap<usize, BTreeSet<String>> {
        let mut by_id: HashMap<usize, BTreeSet<String>> = HashMap::with_capacity(self.link_ids_by_name.len());
        for occurrence in &self.links {
            let urls = by_id.entry(occurrence.id).or_default();
            let url = match &occurrence.kind {
                LinkKind::Inline { url } => Some(url),
                LinkKind::Reference { identifier } => self.definitions.get(identifier).map(|def| &def.url),
            };
            match url {
                Some(url) if !url.is_empty() => {
                    urls.insert(url.clone());
                }
                _ => {}
            }
        }
        by_id
    }
}

/// An identity is conflicting iff its occurrences resolve to two or more distinct URLs.
pub(crate) fn conflicting_ids(resolved_urls: &HashMap<usize, BTreeSet<String>>) -> HashSet<usize> {
    resolved_urls
        .iter()
        .filter(|(_, urls)| urls.len() > 1)
        .map(|(&id, _)| id)
        .collect()
}
