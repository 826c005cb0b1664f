use std::ops::Range;

pub trait SimpleWrite {
    fn write_char(&mut self, ch: char) -> std::io::Result<()>;
    fn flush(&mut self) -> std::io::Result<()>;
}

impl SimpleWrite for String {
    fn write_char(&mut self, ch: char) -> std::io::Result<()> {
        self.push(ch);
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct Output<W: SimpleWrite> {
    stream: W,
    pre_mode: bool,
    blocks: Vec<Block>,
    pending_blocks: Vec<Block>,
    pending_newlines: usize,
    pending_padding_after_indent: usize,
    writing_state: WritingState,
}

pub struct PreWriter<'a, W: SimpleWrite> {
    output: &'a mut Output<W>,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Block {
    /// A plain block; just paragraph text.
    Plain,
    /// A quoted block (`> `)
    Quote,
    /// A block that does *not* start with newlines, but does add indentation. It ends in a single newline.
    /// **This block affects its first child block**, in that it suppresses that block's newlines.
    ///
    /// This is useful for lists:
    ///
    /// ```text
    /// 1. §Paragraph starts here.§
    /// 2. §Paragraph starts here, and
    ///    indentation continues.§
    /// ```
    ///
    /// (where `§` signifies the start and end of an inlined paragraph)
    Inlined(usize),
}

impl<W: SimpleWrite> Output<W> {
    pub fn new(to: W) -> Self {
        Self {
            stream: to,
            pre_mode: false,
            blocks: Vec::default(),
            pending_blocks: Vec::default(),
            pending_newlines: 0,
            pending_padding_after_indent: 0,
            writing_state: WritingState::HaveNotWrittenAnything,
        }
    }

    pub fn with_block<F>(&mut self, block: Block, action: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_block(block);
        action(self);
        self.pop_block();
    }

    /// Creates a new block within which newlines are honored literally. When newlines are entered,
    /// you'll still get any quotes from previous blocks.
    ///
    /// Because you have to call this on `&mut self`, you can't access that `self` within the
    /// block. This is by design, since it doesn't make sense to add blocks within a `pre`. Instead,
    /// use the provided writer's `write_str` to write the literal text for this block.
    pub fn with_pre_block<F>(&mut self, action: F)
    where
        F: for<'a> FnOnce(&mut PreWriter<W>),
    {
        self.push_block(Block::Plain);
        self.pre_mode = true;
        action(&mut PreWriter { output: self });
        self.pre_mode = false;
        self.pop_block();
    }

    pub fn push_block(&mut self, block: Block) {
        self.pending_blocks.push(block);
    }

    pub fn pop_block(&mut self) {
        if !self.pending_blocks.is_empty() {
            self.write_str(""); // write a blank line for whatever blocks had been enqueued
        }
        let newlines = match self.blocks.pop() {
            None => 0,
            Some(closing_block) => match closing_block {
                Block::Plain => 2,
                Block::Quote => 2,
                Block::Inlined(_) => 1,
            },
        };
        // set, don't raise: closing an Inlined block must override the larger count its inner
        // blocks just requested, so that sibling list items stay on consecutive lines
        match self.writing_state {
            WritingState::Normal => self.pending_newlines = newlines,
            WritingState::HaveNotWrittenAnything | WritingState::Error => {}
        }
    }

    pub fn write_str(&mut self, text: &str) {
        let mut lines = split_lines(text, self.pre_mode).into_iter().peekable();
        while let Some(line) = lines.next() {
            self.write_line(line);
            if lines.peek().is_some() {
                self.ensure_newlines(1);
            }
        }
    }

    pub fn write_char(&mut self, ch: char) {
        self.write_str(ch.encode_utf8(&mut [0u8; 4]));
    }

    // Writes text which is assumed to not have any newlines
    fn write_line(&mut self, text: &str) {
        // If we have any pending blocks, handle those first. We need to add a paragraph break, unless the first block
        // is an Inlined.
        match self.pending_blocks.first() {
            None | Some(Block::Inlined(_)) => {}
            Some(_) => {
                self.ensure_newlines(2);
            }
        }

        // print the newlines before we append the new blocks
        let need_indent = if self.pending_newlines > 0 {
            for _ in 0..(self.pending_newlines - 1) {
                self.write_raw("\n");
                self.write_indent(None);
            }
            self.write_raw("\n"); // we'll do this indent after we add the pending blocks
            self.pending_newlines = 0;
            true
        } else if matches!(self.writing_state, WritingState::HaveNotWrittenAnything) {
            self.set_writing_state(WritingState::Normal);
            true
        } else {
            false
        };

        // Append the new blocks, and then write the indent if we need it
        // When we write that indent, though, only write it until the first new Inlined (exclusive).
        let indent_end_idx = self.blocks.len()
            + self
                .pending_blocks
                .iter()
                .position(|b| matches!(b, Block::Inlined(_)))
                .unwrap_or(self.pending_blocks.len());
        self.blocks.append(&mut self.pending_blocks);
        if need_indent {
            self.write_indent(Some(0..indent_end_idx));
        }

        // Finally, write the text
        if !text.is_empty() {
            self.write_padding_after_indent();
        }
        self.write_raw(text);
    }

    fn write_indent(&mut self, range: Option<Range<usize>>) {
        self.pending_padding_after_indent = 0;
        for idx in range.unwrap_or(0..self.blocks.len()) {
            match &self.blocks[idx] {
                Block::Plain => {}
                Block::Quote => {
                    self.write_padding_after_indent();
                    self.write_raw(">");
                    self.pending_padding_after_indent += 1;
                }
                Block::Inlined(size) => {
                    self.pending_padding_after_indent += size;
                }
            }
        }
        self.set_writing_state(WritingState::Normal);
    }

    fn write_padding_after_indent(&mut self) {
        (0..self.pending_padding_after_indent).for_each(|_| self.write_raw(" "));
        self.pending_padding_after_indent = 0;
    }

    fn ensure_newlines(&mut self, count: usize) {
        match self.writing_state {
            WritingState::Normal => {
                if self.pending_newlines < count {
                    self.pending_newlines = count;
                }
            }
            WritingState::HaveNotWrittenAnything | WritingState::Error => {}
        }
    }

    fn set_writing_state(&mut self, state: WritingState) {
        if matches!(self.writing_state, WritingState::Error) {
            return;
        }
        self.writing_state = state;
    }

    fn write_raw(&mut self, text: &str) {
        if matches!(self.writing_state, WritingState::Error) {
            return;
        }
        for ch in text.chars() {
            if let Err(e) = self.stream.write_char(ch) {
                eprintln!("error while writing output: {e}");
                self.writing_state = WritingState::Error;
                return;
            }
        }
    }
}

/// Splits text into its lines. In pre mode, every newline is significant; otherwise, runs of
/// newlines collapse into a single break, with empty leading/trailing entries kept so that
/// boundary newlines still get written.
fn split_lines(text: &str, pre_mode: bool) -> Vec<&str> {
    if pre_mode {
        return text.split('\n').collect();
    }
    let mut lines = Vec::new();
    if text.is_empty() || text.starts_with('\n') {
        lines.push("");
    }
    lines.extend(text.split('\n').filter(|line| !line.is_empty()));
    if !text.is_empty() && text.ends_with('\n') {
        lines.push("");
    }
    lines
}

impl<W: SimpleWrite + Default> Output<W> {
    pub fn take_underlying(&mut self) -> std::io::Result<W> {
        self.stream.flush()?;
        Ok(std::mem::take(&mut self.stream))
    }
}

impl<W: SimpleWrite> Drop for Output<W> {
    fn drop(&mut self) {
        if let Err(e) = self.stream.flush() {
            if WritingState::Error != self.writing_state {
                eprintln!("error while writing output: {e}");
                self.writing_state = WritingState::Error;
            }
        }
    }
}

impl<W: SimpleWrite> PreWriter<'_, W> {
    pub fn write_str(&mut self, text: &str) {
        self.output.write_str(text)
    }

    pub fn write_char(&mut self, ch: char) {
        self.output.write_char(ch);
    }
}

#[derive(PartialEq, Copy, Clone)]
enum WritingState {
    /// We haven't written any text; that is, there hasn't been any invocation of [Output::write_str] or
    /// [Output::write_char]. We may have queued up some blocks.
    HaveNotWrittenAnything,

    /// No special state. Just write the chars!
    Normal,

    /// There's been an error in writing. From here on in, everything will be a noop.
    Error,
}
