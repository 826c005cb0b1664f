use markdown::mdast::Node;

/// Options for parsing Markdown text into a tree.
///
/// This is a thin wrapper around the underlying parser's options, so that callers don't need to
/// depend on the `markdown` crate's option types directly.
pub struct ParseOptions {
    pub(crate) mdast_options: markdown::ParseOptions,
}

impl ParseOptions {
    /// GFM parsing, plus YAML (`---`) and TOML (`+++`) front matter.
    ///
    /// Front matter blocks are kept as opaque nodes, so they round-trip unmodified.
    pub fn gfm() -> Self {
        let mut mdast_options = markdown::ParseOptions::gfm();
        mdast_options.constructs.frontmatter = true;
        Self { mdast_options }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::gfm()
    }
}

/// The Markdown text couldn't be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMd {
    message: String,
}

impl std::fmt::Display for InvalidMd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for InvalidMd {}

/// Parse Markdown text into an mdast tree.
pub fn parse(text: &str, options: &ParseOptions) -> Result<Node, InvalidMd> {
    markdown::to_mdast(text, &options.mdast_options).map_err(|e| InvalidMd {
        message: format!("{e}"),
    })
}

/// A node's address within the tree: the child indexes to follow from the root.
///
/// Paths are how the transform passes refer back to nodes they found during collection: a path
/// stays valid across in-place replacement of the node it addresses, since the replacement sits in
/// the same child slot.
pub(crate) type NodePath = Vec<usize>;

pub(crate) fn node_at<'md>(root: &'md Node, path: &[usize]) -> Option<&'md Node> {
    let mut current = root;
    for &idx in path {
        current = current.children()?.get(idx)?;
    }
    Some(current)
}

pub(crate) fn node_at_mut<'md>(root: &'md mut Node, path: &[usize]) -> Option<&'md mut Node> {
    let mut current = root;
    for &idx in path {
        current = current.children_mut()?.get_mut(idx)?;
    }
    Some(current)
}
