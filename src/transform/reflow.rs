use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use markdown::mdast::{Link, Node, Text};

use crate::output::inlines_to_string;
use crate::transform::collect::{DocInfo, LinkKind, LinkOccurrence};
use crate::tree::{node_at, node_at_mut};
use crate::util::words_buffer::WordsBuffer;

/// Below this many available columns, wrapping would produce confetti; leave the link alone.
const MIN_REFLOW_WIDTH: isize = 10;

/// Wraps long link text before the rewrite pass, so that converted `[text]` forms stay within the
/// configured column budget.
///
/// Links are grouped by the source line they start on and walked left to right, tracking an output
/// column estimate: the gap between consecutive link start columns approximates the unchanged
/// surrounding text, and each processed link advances the estimate by its transformed `[text]`
/// length. The estimate uses pre-rewrite source columns, so it is best-effort, not exact.
pub(crate) fn reflow_links(
    root: &mut Node,
    info: &DocInfo,
    conflicting: &HashSet<usize>,
    resolved_urls: &HashMap<usize, BTreeSet<String>>,
    column_width: usize,
) {
    let mut links_by_line: BTreeMap<usize, Vec<&LinkOccurrence>> = BTreeMap::new();
    for occurrence in &info.links {
        let Some(position) = &occurrence.position else {
            continue;
        };
        links_by_line.entry(position.start.line).or_default().push(occurrence);
    }

    for (_, mut links) in links_by_line {
        links.sort_by_key(|occurrence| {
            occurrence
                .position
                .as_ref()
                .map(|position| position.start.column)
                .unwrap_or(0)
        });

        let mut current_column: usize = 0;
        let mut last_end_col: usize = 1;

        for occurrence in links {
            let Some(position) = &occurrence.position else {
                continue;
            };
            let convertible = !conflicting.contains(&occurrence.id)
                && matches!(occurrence.kind, LinkKind::Inline { .. })
                && resolved_urls.get(&occurrence.id).is_some_and(|urls| urls.len() == 1);
            if !convertible {
                continue;
            }

            let link_start_col = position.start.column;
            current_column += link_start_col.saturating_sub(last_end_col);

            let transformed_link_length = occurrence.name.chars().count() + "[]".len();
            if current_column + transformed_link_length > column_width {
                let available_width = column_width as isize - current_column as isize - "[]".len() as isize;
                if let Some(Node::Link(link)) = node_at_mut(root, &occurrence.path) {
                    reflow_link_node(link, available_width);
                }
            }

            // re-read the (possibly reflowed) text; only its last line occupies this line now
            let Some(Node::Link(link)) = node_at(root, &occurrence.path) else {
                continue;
            };
            let new_link_text = inlines_to_string(&link.children);
            let new_link_text = new_link_text.trim();
            let last_line = match memchr::memrchr(b'\n', new_link_text.as_bytes()) {
                Some(idx) => &new_link_text[idx + 1..],
                None => new_link_text,
            };
            current_column += last_line.chars().count() + "[]".len();
            last_end_col = position.end.column;
        }
    }
}

/// Word-wraps a link's plain-text content to the available width, replacing its children with a
/// single multi-line text node. Links with non-text children or too little text are left alone.
fn reflow_link_node(link: &mut Link, available_width: isize) {
    if !link.children.iter().all(|child| matches!(child, Node::Text(_))) {
        return;
    }
    if available_width < MIN_REFLOW_WIDTH {
        return;
    }

    let mut original_text = String::new();
    for child in &link.children {
        if let Node::Text(text) = child {
            original_text.push_str(&text.value);
        }
    }
    if original_text.split_whitespace().count() < 2 {
        return;
    }

    let mut reflowed = String::with_capacity(original_text.len());
    let mut buffer = WordsBuffer::new(available_width as usize);
    for ch in original_text.chars() {
        buffer.push(ch, |ch| reflowed.push(ch));
    }
    buffer.drain(|ch| reflowed.push(ch));

    if reflowed.contains('\n') {
        link.children = vec![Node::Text(Text {
            value: reflowed,
            position: None,
        })];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::collect::conflicting_ids;
    use crate::tree::{node_at, parse, ParseOptions};
    use crate::util::utils_for_test::*;

    #[test]
    fn long_link_text_wraps() {
        let root = reflow(
            "[this is some very long link text that needs wrapping](https://example.com)",
            30,
        );
        let node = node_at(&root, &[0, 0]).unwrap();
        unwrap!(node, Node::Link(link));
        unwrap!(get_only(&link.children), Node::Text(text));
        assert_eq!(text.value, "this is some very long link\ntext that needs wrapping");
    }

    #[test]
    fn short_link_text_is_untouched() {
        let root = reflow("[hi](https://example.com)", 30);
        let node = node_at(&root, &[0, 0]).unwrap();
        unwrap!(node, Node::Link(link));
        unwrap!(get_only(&link.children), Node::Text(text));
        assert_eq!(text.value, "hi");
    }

    #[test]
    fn single_word_never_wraps() {
        let root = reflow(
            "[extraordinarily-long-single-word-link-text](https://example.com)",
            20,
        );
        let node = node_at(&root, &[0, 0]).unwrap();
        unwrap!(node, Node::Link(link));
        unwrap!(get_only(&link.children), Node::Text(text));
        assert_eq!(text.value, "extraordinarily-long-single-word-link-text");
    }

    #[test]
    fn formatted_link_text_is_untouched() {
        let md = "[some *formatted* link text that would otherwise wrap around](https://example.com)";
        let root = reflow(md, 30);
        let node = node_at(&root, &[0, 0]).unwrap();
        unwrap!(node, Node::Link(link));
        assert_eq!(link.children.len(), 3); // text, emphasis, text
    }

    #[test]
    fn too_narrow_a_budget_is_left_alone() {
        // the budget leaves fewer than MIN_REFLOW_WIDTH columns for the text, so wrapping would
        // be useless; the link stays on one long line instead
        let md = "some leading text that uses up the budget [and a link at the end](https://example.com)";
        let root = reflow(md, 50);
        let node = node_at(&root, &[0, 1]).unwrap();
        unwrap!(node, Node::Link(link));
        unwrap!(get_only(&link.children), Node::Text(text));
        assert!(!text.value.contains('\n'));
    }

    #[test]
    fn conflicting_links_are_not_reflowed() {
        let md = "[a very long conflicted link text here indeed](https://example.com/1) [a very long conflicted link text here indeed](https://example.com/2)";
        let root = reflow(md, 30);
        let node = node_at(&root, &[0, 0]).unwrap();
        unwrap!(node, Node::Link(link));
        unwrap!(get_only(&link.children), Node::Text(text));
        assert!(!text.value.contains('\n'));
    }

    #[test]
    fn second_link_on_a_line_sees_advanced_columns() {
        // the first link fits; the second one starts past the budget and wraps
        let md = "[first link](https://example.com/1) and [second link with quite long text](https://example.com/2)";
        let root = reflow(md, 40);
        unwrap!(node_at(&root, &[0, 0]).unwrap(), Node::Link(first));
        unwrap!(get_only(&first.children), Node::Text(first_text));
        assert!(!first_text.value.contains('\n'));

        unwrap!(node_at(&root, &[0, 2]).unwrap(), Node::Link(second));
        unwrap!(get_only(&second.children), Node::Text(second_text));
        assert!(second_text.value.contains('\n'));
    }

    fn reflow(md: &str, column_width: usize) -> Node {
        let mut root = parse(md, &ParseOptions::gfm()).unwrap();
        let info = DocInfo::collect(&root);
        let urls = info.resolved_urls();
        let conflicting = conflicting_ids(&urls);
        reflow_links(&mut root, &info, &conflicting, &urls, column_width);
        root
    }
}
