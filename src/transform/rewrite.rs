use std::collections::{BTreeSet, HashMap, HashSet};
use std::mem;

use markdown::mdast::{Link, LinkReference, Node, ReferenceKind};

use crate::transform::collect::{normalize_text, DocInfo};
use crate::transform::TransformStats;
use crate::tree::node_at_mut;

/// Rewrites every collected link occurrence into its final form, in place:
///
/// - a non-conflicting inline link whose identity resolves to exactly one URL becomes a shortcut
///   reference (counted as converted);
/// - a non-conflicting link-reference gets its identifier/label normalized to the identity string
///   and its reference style forced to shortcut;
/// - a conflicting link-reference is rewritten back to an inline link carrying its matched
///   definition's URL, if one resolves;
/// - a conflicting inline link is already in the unambiguous form and stays as it is.
///
/// Each replacement happens at the exact child slot the occurrence's path addresses, so sibling
/// order is preserved and the occurrence keeps pointing at the current node. Occurrences whose
/// path no longer addresses a link node are skipped.
pub(crate) fn rewrite_links(
    root: &mut Node,
    info: &DocInfo,
    conflicting: &HashSet<usize>,
    resolved_urls: &HashMap<usize, BTreeSet<String>>,
    stats: &mut TransformStats,
) {
    for occurrence in &info.links {
        let Some(node) = node_at_mut(root, &occurrence.path) else {
            continue;
        };
        let is_conflicting = conflicting.contains(&occurrence.id);

        match node {
            Node::Link(link) => {
                if is_conflicting {
                    continue;
                }
                let has_single_url = resolved_urls.get(&occurrence.id).is_some_and(|urls| urls.len() == 1);
                if !has_single_url {
                    // nothing could ever define this link's URL; a shortcut reference would
                    // dangle, so keep the inline form
                    continue;
                }
                let children = mem::take(&mut link.children);
                *node = Node::LinkReference(LinkReference {
                    children,
                    position: None,
                    reference_kind: ReferenceKind::Shortcut,
                    identifier: occurrence.name.clone(),
                    label: Some(occurrence.name.clone()),
                });
                stats.links_converted += 1;
            }
            Node::LinkReference(link_ref) => {
                if is_conflicting {
                    let identifier = normalize_text(&link_ref.identifier);
                    let Some(def) = info.definitions.get(&identifier) else {
                        continue;
                    };
                    if def.url.is_empty() {
                        continue;
                    }
                    let children = mem::take(&mut link_ref.children);
                    *node = Node::Link(Link {
                        children,
                        position: None,
                        url: def.url.clone(),
                        title: None,
                    });
                    continue;
                }
                if link_ref.identifier != occurrence.name {
                    link_ref.identifier = occurrence.name.clone();
                    link_ref.label = Some(occurrence.name.clone());
                }
                link_ref.reference_kind = ReferenceKind::Shortcut;
            }
            _ => {
                // the slot no longer holds a link; nothing to rewrite
            }
        }
    }
}
