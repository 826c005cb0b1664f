use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::mem;

use markdown::mdast::{Definition, Node};

use crate::transform::collect::{link_name, normalize_text, DocInfo};
use crate::transform::TransformStats;

/// Re-creates link definitions, one per unique non-conflicting identity, as close to first use as
/// the document structure allows:
///
/// 1. every original definition node is deleted, wherever it sits in the tree;
/// 2. the top-level children split into sections, one per heading, with anything before the first
///    heading forming an initial heading-less section;
/// 3. each section's link-reference descendants (in their post-rewrite state) stage a definition
///    for their identifier, provided the identity isn't conflicting, resolves to exactly one URL,
///    and no earlier section already owns it;
/// 4. staged definitions flush at the end of their section, sorted lexicographically by
///    identifier.
///
/// Identities with zero or ambiguous URLs never get a definition; their shortcut references stay
/// dangling by design, mirroring the conflict policy.
pub(crate) fn place_definitions(
    root: &mut Node,
    info: &DocInfo,
    conflicting: &HashSet<usize>,
    resolved_urls: &HashMap<usize, BTreeSet<String>>,
    stats: &mut TransformStats,
) {
    remove_definitions(root);

    let Node::Root(top) = root else {
        return;
    };
    let children = mem::take(&mut top.children);

    let mut sections: Vec<Vec<Node>> = Vec::new();
    let mut current_section: Vec<Node> = Vec::new();
    for node in children {
        if matches!(node, Node::Heading(_)) && !current_section.is_empty() {
            sections.push(mem::take(&mut current_section));
        }
        current_section.push(node);
    }
    if !current_section.is_empty() {
        sections.push(current_section);
    }

    let mut new_children: Vec<Node> = Vec::new();
    let mut satisfied: HashSet<String> = HashSet::new();

    for section in sections {
        let mut staged: BTreeMap<String, Definition> = BTreeMap::new();
        for node in &section {
            stage_definitions_from(node, info, conflicting, resolved_urls, &satisfied, &mut staged);
        }

        new_children.extend(section);
        for (identifier, definition) in staged {
            new_children.push(Node::Definition(definition));
            satisfied.insert(identifier);
            stats.definitions_added += 1;
        }
    }

    top.children = new_children;
}

/// Deletes every definition node from its parent's child list, at any depth.
fn remove_definitions(node: &mut Node) {
    let Some(children) = node.children_mut() else { return };
    children.retain(|child| !matches!(child, Node::Definition(_)));
    for child in children {
        remove_definitions(child);
    }
}

fn stage_definitions_from(
    node: &Node,
    info: &DocInfo,
    conflicting: &HashSet<usize>,
    resolved_urls: &HashMap<usize, BTreeSet<String>>,
    satisfied: &HashSet<String>,
    staged: &mut BTreeMap<String, Definition>,
) {
    if let Node::LinkReference(link_ref) = node {
        let name = link_name(&link_ref.children);
        if !name.is_empty() {
            let identifier = normalize_text(&link_ref.identifier);
            let id = info.link_ids_by_name.get(&name);
            let is_conflicting = id.is_some_and(|id| conflicting.contains(id));
            if !is_conflicting && !satisfied.contains(&identifier) && !staged.contains_key(&identifier) {
                let single_url = id
                    .and_then(|id| resolved_urls.get(id))
                    .filter(|urls| urls.len() == 1)
                    .and_then(|urls| urls.iter().next());
                if let Some(url) = single_url {
                    staged.insert(
                        identifier.clone(),
                        Definition {
                            position: None,
                            url: url.clone(),
                            title: None,
                            label: Some(identifier.clone()),
                            identifier,
                        },
                    );
                }
            }
        }
    }
    let Some(children) = node.children() else { return };
    for child in children {
        stage_definitions_from(child, info, conflicting, resolved_urls, satisfied, staged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::collect::conflicting_ids;
    use crate::transform::rewrite::rewrite_links;
    use crate::tree::{parse, ParseOptions};
    use crate::util::utils_for_test::*;
    use indoc::indoc;

    #[test]
    fn definition_lands_after_section_content() {
        let (root, stats) = run(indoc! {r#"
            # Title

            [hello](https://example.com)

            trailing paragraph
        "#});
        let kinds = top_level_kinds(&root);
        assert_eq!(kinds, vec!["heading", "paragraph", "paragraph", "definition"]);
        assert_eq!(stats.definitions_added, 1);
    }

    #[test]
    fn preamble_section_gets_definitions_before_first_heading() {
        let (root, _) = run(indoc! {r#"
            [early](https://example.com/early)

            # First heading

            body
        "#});
        let kinds = top_level_kinds(&root);
        assert_eq!(kinds, vec!["paragraph", "definition", "heading", "paragraph"]);
    }

    #[test]
    fn definitions_sort_lexicographically_within_a_section() {
        let (root, _) = run(indoc! {r#"
            [zeta](https://example.com/z) [alpha](https://example.com/a) [Mid](https://example.com/m)
        "#});
        unwrap!(&root, Node::Root(top));
        let identifiers: Vec<&str> = top
            .children
            .iter()
            .filter_map(|node| match node {
                Node::Definition(def) => Some(def.identifier.as_str()),
                _ => None,
            })
            .collect();
        // byte order: uppercase sorts before lowercase
        assert_eq!(identifiers, vec!["Mid", "alpha", "zeta"]);
    }

    #[test]
    fn earlier_section_owns_the_definition() {
        let (root, stats) = run(indoc! {r#"
            # One

            [shared](https://example.com)

            # Two

            [shared](https://example.com)
        "#});
        let kinds = top_level_kinds(&root);
        assert_eq!(
            kinds,
            vec!["heading", "paragraph", "definition", "heading", "paragraph"]
        );
        assert_eq!(stats.definitions_added, 1);
    }

    #[test]
    fn original_definitions_are_removed_even_when_duplicated() {
        let (root, stats) = run(indoc! {r#"
            [hello][hi]

            [hi]: https://example.com
            [hi]: https://example.com
        "#});
        unwrap!(&root, Node::Root(top));
        let def_count = top
            .children
            .iter()
            .filter(|node| matches!(node, Node::Definition(_)))
            .count();
        // the two originals are gone; one fresh definition (for "hello") replaces them
        assert_eq!(def_count, 1);
        unwrap!(top.children.last().unwrap(), Node::Definition(def));
        assert_eq!(def.identifier, "hello");
        assert_eq!(stats.definitions_added, 1);
    }

    #[test]
    fn conflicting_identity_gets_no_definition() {
        let (root, stats) = run("[x](https://example.com/a) and [x](https://example.com/b)");
        unwrap!(&root, Node::Root(top));
        assert!(!top.children.iter().any(|node| matches!(node, Node::Definition(_))));
        assert_eq!(stats.definitions_added, 0);
    }

    #[test]
    fn references_inside_containers_are_found() {
        let (root, stats) = run(indoc! {r#"
            > quoted [deep](https://example.com)
        "#});
        let kinds = top_level_kinds(&root);
        assert_eq!(kinds, vec!["blockquote", "definition"]);
        assert_eq!(stats.definitions_added, 1);
    }

    #[test]
    fn generated_definitions_carry_no_title() {
        let (root, _) = run("[hello](https://example.com)");
        unwrap!(&root, Node::Root(top));
        unwrap!(top.children.last().unwrap(), Node::Definition(def));
        assert_eq!(def.title, None);
        assert_eq!(def.url, "https://example.com");
    }

    fn top_level_kinds(root: &Node) -> Vec<&'static str> {
        let Node::Root(top) = root else { panic!("not a root") };
        top.children
            .iter()
            .map(|node| match node {
                Node::Heading(_) => "heading",
                Node::Paragraph(_) => "paragraph",
                Node::Definition(_) => "definition",
                Node::Blockquote(_) => "blockquote",
                _ => "other",
            })
            .collect()
    }

    fn run(md: &str) -> (Node, TransformStats) {
        let mut root = parse(md, &ParseOptions::gfm()).unwrap();
        let info = DocInfo::collect(&root);
        let urls = info.resolved_urls();
        let conflicting = conflicting_ids(&urls);
        let mut stats = TransformStats::default();
        rewrite_links(&mut root, &info, &conflicting, &urls, &mut stats);
        place_definitions(&mut root, &info, &conflicting, &urls, &mut stats);
        (root, stats)
    }
}
