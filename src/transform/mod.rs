//! The link-reference transformation engine.
//!
//! [`transform`] rewrites a parsed document in place: inline links whose text resolves
//! unambiguously become shortcut references (`[text]`), link definitions are regenerated once per
//! unique link text and placed at the end of the section that first uses them, and links whose
//! text maps to more than one URL are forced to (or kept in) explicit inline form.

mod collect;
mod place;
mod reflow;
mod rewrite;

use markdown::mdast::Node;
use serde::Serialize;

use collect::{conflicting_ids, DocInfo};
use place::place_definitions;
use reflow::reflow_links;
use rewrite::rewrite_links;

/// Options for [`transform`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// When set, link text gets reflowed so that transformed `[text]` forms try to stay within
    /// this many columns. When unset, link text is never rewrapped.
    pub column_width: Option<usize>,
}

/// What a [`transform`] run did.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformStats {
    /// inline links that became shortcut references
    pub links_converted: usize,
    /// link texts that resolve to more than one URL
    pub conflicts_found: usize,
    /// definitions written back into the document
    pub definitions_added: usize,
}

/// Converts a document's inline links to shortcut references, in place.
///
/// The pipeline is collect → detect conflicts → reflow (optional) → rewrite links → place
/// definitions. Collection happens once, up front; the later passes only mutate through the
/// collected records or rebuild the root's child list, so no traversal ever observes its own
/// edits. The operation is total: malformed or unresolvable pieces of the document are skipped,
/// never an error.
pub fn transform(root: &mut Node, options: &TransformOptions) -> TransformStats {
    let info = DocInfo::collect(root);
    let resolved_urls = info.resolved_urls();
    let conflicting = conflicting_ids(&resolved_urls);

    let mut stats = TransformStats {
        conflicts_found: conflicting.len(),
        ..TransformStats::default()
    };

    if let Some(column_width) = options.column_width {
        reflow_links(root, &info, &conflicting, &resolved_urls, column_width);
    }
    rewrite_links(root, &info, &conflicting, &resolved_urls, &mut stats);
    place_definitions(root, &info, &conflicting, &resolved_urls, &mut stats);

    stats
}
