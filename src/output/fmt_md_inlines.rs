use std::cmp::max;
use std::sync::OnceLock;

use fancy_regex::Regex;
use markdown::mdast::Node;

use crate::util::output::{Output, SimpleWrite};

/// How text gets escaped, depending on where it appears.
///
/// Text inside link, reference, and definition contexts only needs its square brackets escaped;
/// everywhere else, the usual inline-formatting characters need escaping, while square brackets are
/// left alone so that shortcode-heavy prose (Hugo and friends) survives round trips.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum InlineContext {
    Plain,
    LinkText,
}

pub(crate) fn write_line<W>(out: &mut Output<W>, elems: &[Node], ctx: InlineContext)
where
    W: SimpleWrite,
{
    for elem in elems {
        write_inline_element(out, elem, ctx);
    }
}

pub(crate) fn write_inline_element<W>(out: &mut Output<W>, elem: &Node, ctx: InlineContext)
where
    W: SimpleWrite,
{
    match elem {
        Node::Text(text) => write_text(out, &text.value, ctx),
        Node::Emphasis(span) => {
            out.write_char('*');
            write_line(out, &span.children, ctx);
            out.write_char('*');
        }
        Node::Strong(span) => {
            out.write_str("**");
            write_line(out, &span.children, ctx);
            out.write_str("**");
        }
        Node::Delete(span) => {
            out.write_str("~~");
            write_line(out, &span.children, ctx);
            out.write_str("~~");
        }
        Node::InlineCode(code) => {
            let backticks = BackticksInfo::from(code.value.as_str());
            let surround = if backticks.count == 0 {
                "`".to_string()
            } else {
                "`".repeat(backticks.count + 1)
            };
            out.write_str(&surround);
            if backticks.at_either_end {
                out.write_char(' ');
            }
            out.write_str(&code.value);
            if backticks.at_either_end {
                out.write_char(' ');
            }
            out.write_str(&surround);
        }
        Node::InlineMath(math) => {
            out.write_char('$');
            out.write_str(&math.value);
            out.write_char('$');
        }
        Node::Html(html) => out.write_str(&html.value),
        Node::Break(_) => out.write_str("\\\n"),
        Node::Link(link) => {
            out.write_char('[');
            write_line(out, &link.children, InlineContext::LinkText);
            out.write_str("](");
            if !link.url.is_empty() {
                write_url(out, &link.url);
            }
            write_url_title(out, &link.title);
            out.write_char(')');
        }
        Node::LinkReference(link_ref) => {
            out.write_char('[');
            write_line(out, &link_ref.children, InlineContext::LinkText);
            out.write_char(']');
            write_reference_suffix(out, &link_ref.reference_kind, &link_ref.identifier, &link_ref.label);
        }
        Node::Image(image) => {
            out.write_str("![");
            write_text(out, &image.alt, InlineContext::LinkText);
            out.write_str("](");
            if !image.url.is_empty() {
                write_url(out, &image.url);
            }
            write_url_title(out, &image.title);
            out.write_char(')');
        }
        Node::ImageReference(image_ref) => {
            out.write_str("![");
            write_text(out, &image_ref.alt, InlineContext::LinkText);
            out.write_char(']');
            write_reference_suffix(out, &image_ref.reference_kind, &image_ref.identifier, &image_ref.label);
        }
        Node::FootnoteReference(footnote) => {
            out.write_str("[^");
            out.write_str(footnote.label.as_ref().unwrap_or(&footnote.identifier));
            out.write_char(']');
        }
        _ => {
            // not an inline node; nothing to write
        }
    }
}

fn write_reference_suffix<W>(
    out: &mut Output<W>,
    kind: &markdown::mdast::ReferenceKind,
    identifier: &str,
    label: &Option<String>,
) where
    W: SimpleWrite,
{
    use markdown::mdast::ReferenceKind;
    match kind {
        ReferenceKind::Shortcut => {}
        ReferenceKind::Collapsed => out.write_str("[]"),
        ReferenceKind::Full => {
            out.write_char('[');
            out.write_str(label.as_deref().unwrap_or(identifier));
            out.write_char(']');
        }
    }
}

fn write_text<W>(out: &mut Output<W>, value: &str, ctx: InlineContext)
where
    W: SimpleWrite,
{
    let needs_escaping = match ctx {
        InlineContext::Plain => {
            let bytes = value.as_bytes();
            memchr::memchr3(b'\\', b'`', b'*', bytes).is_some() || memchr::memchr(b'_', bytes).is_some()
        }
        InlineContext::LinkText => memchr::memchr3(b'\\', b'[', b']', value.as_bytes()).is_some(),
    };
    if !needs_escaping {
        return out.write_str(value);
    }
    for ch in value.chars() {
        let escape = match ctx {
            InlineContext::Plain => matches!(ch, '\\' | '`' | '*' | '_'),
            InlineContext::LinkText => matches!(ch, '\\' | '[' | ']'),
        };
        if escape {
            out.write_char('\\');
        }
        out.write_char(ch);
    }
}

/// Writes a nonempty URL, wrapping it in angle brackets when it couldn't otherwise round-trip.
///
/// Shortcode-style URLs (`{{<ref "page">}}`, `{{% ref %}}`) are written verbatim: wrapping or
/// escaping them would keep the templating engine from ever seeing them.
pub(crate) fn write_url<W>(out: &mut Output<W>, url: &str)
where
    W: SimpleWrite,
{
    if contains_shortcode(url) {
        return out.write_str(url);
    }
    if url.chars().any(|ch| ch.is_whitespace()) || url.contains('(') || url.contains(')') {
        out.write_char('<');
        for ch in url.chars() {
            if matches!(ch, '<' | '>') {
                out.write_char('\\');
            }
            out.write_char(ch);
        }
        out.write_char('>');
    } else {
        out.write_str(url);
    }
}

pub(crate) fn contains_shortcode(text: &str) -> bool {
    if memchr::memchr(b'{', text.as_bytes()).is_none() {
        return false;
    }
    static SHORTCODE: OnceLock<Regex> = OnceLock::new();
    let re = SHORTCODE.get_or_init(|| Regex::new(r"\{\{[<%].*?[%>]\}\}").expect("invalid shortcode pattern"));
    re.is_match(text).unwrap_or(false)
}

pub(crate) fn write_url_title<W>(out: &mut Output<W>, title: &Option<String>)
where
    W: SimpleWrite,
{
    let Some(title) = title else { return };
    out.write_char(' ');
    TitleQuote::find_best_strategy(title).escape_to(title, out);
}

/// Renders a span of inline nodes back to literal Markdown text, preserving inline formatting.
pub(crate) fn line_to_string(elems: &[Node], ctx: InlineContext) -> String {
    let mut out = Output::new(String::with_capacity(elems.len() * 10)); // rough guess
    write_line(&mut out, elems, ctx);
    out.take_underlying().expect("writing to a string is infallible")
}

/// Renders a link's display text the way it appears between the square brackets.
pub(crate) fn inlines_to_string(elems: &[Node]) -> String {
    line_to_string(elems, InlineContext::LinkText)
}

struct BackticksInfo {
    count: usize,
    at_either_end: bool,
}

impl From<&str> for BackticksInfo {
    fn from(s: &str) -> Self {
        let mut overall_max = 0;
        let mut current_stretch = 0;
        for c in s.chars() {
            match c {
                '`' => current_stretch += 1,
                _ => {
                    if current_stretch > 0 {
                        overall_max = max(current_stretch, overall_max);
                        current_stretch = 0;
                    }
                }
            }
        }
        let count = max(current_stretch, overall_max);
        let at_either_end = s.starts_with('`') || s.ends_with('`');
        Self { count, at_either_end }
    }
}

enum TitleQuote {
    Double,
    Single,
    Paren,
}

impl TitleQuote {
    fn find_best_strategy(text: &str) -> Self {
        [Self::Double, Self::Single, Self::Paren]
            .into_iter()
            .find(|strategy| !strategy.has_conflicts(text))
            .unwrap_or(TitleQuote::Double)
    }

    fn get_surround_chars(&self) -> (char, char) {
        match self {
            TitleQuote::Double => ('"', '"'),
            TitleQuote::Single => ('\'', '\''),
            TitleQuote::Paren => ('(', ')'),
        }
    }

    fn get_conflict_char_fn(surrounds: (char, char)) -> impl Fn(char) -> bool {
        let (open, close) = surrounds;
        move |ch| ch == open || ch == close
    }

    fn has_conflicts(&self, text: &str) -> bool {
        text.chars().any(Self::get_conflict_char_fn(self.get_surround_chars()))
    }

    fn escape_to<W: SimpleWrite>(&self, text: &str, out: &mut Output<W>) {
        let surrounds = self.get_surround_chars();
        let conflict_char_fn = Self::get_conflict_char_fn(surrounds);
        let (open, close) = surrounds;

        out.write_char(open);
        for ch in text.chars() {
            if conflict_char_fn(ch) {
                out.write_char('\\');
            }
            out.write_char(ch);
        }
        out.write_char(close);
    }
}
