use std::cmp::max;
use std::fmt::Alignment;

use markdown::mdast::{Definition, Node};

use crate::output::fmt_md_inlines::{
    line_to_string, write_inline_element, write_line, write_url, write_url_title, InlineContext,
};
use crate::util::output::{Block, Output, SimpleWrite};
use crate::util::str_utils::{pad_to, standard_align};

/// Writes a Markdown tree to the given output.
pub fn write_md<W>(out: &mut Output<W>, node: &Node)
where
    W: SimpleWrite,
{
    match node {
        Node::Root(root) => write_blocks(out, &root.children),
        _ => write_block(out, node),
    }
}

/// Renders a whole document to a string. Nonempty documents end with exactly one newline.
pub fn doc_to_string(node: &Node) -> String {
    let mut out = Output::new(String::with_capacity(256)); // just a guess
    write_md(&mut out, node);
    let mut rendered = out.take_underlying().expect("writing to a string is infallible");
    if !rendered.is_empty() && !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    rendered
}

fn write_blocks<W>(out: &mut Output<W>, nodes: &[Node])
where
    W: SimpleWrite,
{
    let mut iter = nodes.iter().peekable();
    while let Some(node) = iter.next() {
        if let Node::Definition(def) = node {
            // Consecutive definitions render tight: one per line, in a single block.
            out.with_block(Block::Plain, |out| {
                write_definition(out, def);
                while let Some(Node::Definition(next)) = iter.peek() {
                    out.write_char('\n');
                    write_definition(out, next);
                    iter.next();
                }
            });
        } else {
            write_block(out, node);
        }
    }
}

fn write_block<W>(out: &mut Output<W>, node: &Node)
where
    W: SimpleWrite,
{
    match node {
        Node::Root(root) => write_blocks(out, &root.children),
        Node::Heading(heading) => {
            out.with_block(Block::Plain, |out| {
                for _ in 0..heading.depth {
                    out.write_char('#');
                }
                if !heading.children.is_empty() {
                    out.write_char(' ');
                    write_line(out, &heading.children, InlineContext::Plain);
                }
            });
        }
        Node::Paragraph(paragraph) => {
            out.with_block(Block::Plain, |out| {
                write_line(out, &paragraph.children, InlineContext::Plain);
            });
        }
        Node::Blockquote(quote) => {
            out.with_block(Block::Quote, |out| {
                write_blocks(out, &quote.children);
            });
        }
        Node::List(list) => {
            out.with_block(Block::Plain, |out| {
                let mut index = if list.ordered { Some(list.start.unwrap_or(1)) } else { None };
                let mut prefix = String::with_capacity(8); // enough for "12. [ ] "
                for item_node in &list.children {
                    let Node::ListItem(item) = item_node else {
                        continue; // only list items can appear directly under a list
                    };
                    prefix.clear();
                    match &mut index {
                        None => prefix.push_str("- "),
                        Some(i) => {
                            std::fmt::Write::write_fmt(&mut prefix, format_args!("{}. ", &i))
                                .expect("writing to a string is infallible");
                            *i += 1;
                        }
                    };
                    if let Some(checked) = &item.checked {
                        prefix.push('[');
                        prefix.push(if *checked { 'x' } else { ' ' });
                        prefix.push_str("] ");
                    }
                    out.write_str(&prefix);
                    out.with_block(Block::Inlined(prefix.len()), |out| {
                        write_blocks(out, &item.children);
                    });
                }
            });
        }
        Node::Table(table) => write_table(out, table),
        Node::ThematicBreak(_) => {
            out.with_block(Block::Plain, |out| out.write_str("***"));
        }
        Node::Code(code) => {
            out.with_pre_block(|out| {
                out.write_str("```");
                if let Some(lang) = &code.lang {
                    out.write_str(lang);
                    if let Some(meta) = &code.meta {
                        out.write_char(' ');
                        out.write_str(meta);
                    }
                }
                out.write_char('\n');
                out.write_str(&code.value);
                out.write_str("\n```");
            });
        }
        Node::Math(math) => {
            out.with_pre_block(|out| {
                out.write_str("$$");
                if let Some(meta) = &math.meta {
                    out.write_str(meta);
                }
                out.write_char('\n');
                out.write_str(&math.value);
                out.write_str("\n$$");
            });
        }
        Node::Yaml(yaml) => {
            out.with_pre_block(|out| {
                out.write_str("---\n");
                out.write_str(&yaml.value);
                out.write_str("\n---");
            });
        }
        Node::Toml(toml) => {
            out.with_pre_block(|out| {
                out.write_str("+++\n");
                out.write_str(&toml.value);
                out.write_str("\n+++");
            });
        }
        Node::Html(html) => {
            out.with_pre_block(|out| {
                out.write_str(&html.value);
            });
        }
        Node::Definition(def) => {
            out.with_block(Block::Plain, |out| {
                write_definition(out, def);
            });
        }
        Node::FootnoteDefinition(footnote) => {
            out.with_block(Block::Plain, |out| {
                out.write_str("[^");
                out.write_str(footnote.label.as_ref().unwrap_or(&footnote.identifier));
                out.write_str("]: ");
                out.with_block(Block::Inlined(4), |out| {
                    write_blocks(out, &footnote.children);
                });
            });
        }
        Node::ListItem(_) | Node::TableRow(_) | Node::TableCell(_) => {
            // handled by their containers; nothing sensible to do with a stray one
        }
        Node::MdxJsxFlowElement(_)
        | Node::MdxjsEsm(_)
        | Node::MdxTextExpression(_)
        | Node::MdxJsxTextElement(_)
        | Node::MdxFlowExpression(_) => {
            // MDX constructs are never enabled in our parse options
        }
        inline => {
            // an inline node at block level gets its own paragraph-like block
            out.with_block(Block::Plain, |out| {
                write_inline_element(out, inline, InlineContext::Plain);
            });
        }
    }
}

fn write_definition<W>(out: &mut Output<W>, def: &Definition)
where
    W: SimpleWrite,
{
    out.write_char('[');
    out.write_str(def.label.as_deref().unwrap_or(&def.identifier));
    out.write_str("]: ");
    if def.url.is_empty() {
        out.write_str("<>");
    } else {
        write_url(out, &def.url);
    }
    write_url_title(out, &def.title);
}

fn write_table<W>(out: &mut Output<W>, table: &markdown::mdast::Table)
where
    W: SimpleWrite,
{
    let alignments = &table.align;
    let mut row_strs = Vec::with_capacity(table.children.len());

    let mut column_widths = vec![0; alignments.len()];
    for (idx, alignment) in alignments.iter().enumerate() {
        let width = match standard_align(alignment) {
            Some(Alignment::Center) => 3,
            _ => 2,
        };
        column_widths[idx] = width;
    }

    // Pre-calculate all the cells, and also how wide each column needs to be
    for row_node in &table.children {
        let Node::TableRow(row) = row_node else {
            continue;
        };
        let mut col_strs = Vec::with_capacity(row.children.len());
        for (idx, cell_node) in row.children.iter().enumerate() {
            let Node::TableCell(cell) = cell_node else {
                continue;
            };
            let col_str = line_to_string(&cell.children, InlineContext::Plain);
            // Extend column_widths if we had fewer alignments than columns in any row.
            while column_widths.len() <= idx {
                column_widths.push(0);
            }
            column_widths[idx] = max(column_widths[idx], col_str.len());
            col_strs.push(col_str);
        }
        row_strs.push(col_strs);
    }

    out.with_block(Block::Plain, |out| {
        let write_row = |out: &mut Output<W>, row: Vec<String>| {
            if row.is_empty() {
                out.write_str("||\n");
                return;
            }
            out.write_char('|');
            for (idx, col) in row.iter().enumerate() {
                out.write_char(' ');
                pad_to(out, col, *column_widths.get(idx).unwrap_or(&0), alignments.get(idx));
                out.write_str(" |");
            }
            out.write_char('\n');
        };

        let mut rows_iter = row_strs.into_iter();

        // First row
        let Some(first_row) = rows_iter.next() else {
            return; // unexpected!
        };
        write_row(out, first_row);

        // Headers
        if !alignments.is_empty() {
            out.write_char('|');
            for (idx, align) in alignments.iter().enumerate() {
                let width = column_widths
                    .get(idx)
                    .unwrap_or(match standard_align(align) {
                        Some(Alignment::Center) => &3,
                        _ => &2,
                    })
                    .to_owned()
                    + 2; // +2 for the ' ' padding on either side
                match standard_align(align) {
                    Some(Alignment::Left) => {
                        out.write_char(':');
                        out.write_str(&"-".repeat(width - 1));
                    }
                    Some(Alignment::Right) => {
                        out.write_str(&"-".repeat(width - 1));
                        out.write_char(':');
                    }
                    Some(Alignment::Center) => {
                        out.write_char(':');
                        out.write_str(&"-".repeat(width - 2));
                        out.write_char(':');
                    }
                    None => {
                        out.write_str(&"-".repeat(width));
                    }
                };
                out.write_char('|');
            }
            out.write_char('\n');
        }

        // And finally, the rows
        for row in rows_iter {
            write_row(out, row);
        }
    });
}
