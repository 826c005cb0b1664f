use std::fmt::{Display, Formatter};
use std::io::Write;
use std::{env, io};

use crate::output::doc_to_string;
use crate::run::cli::{RunOptions, StatsFormat};
use crate::transform::{transform, TransformOptions, TransformStats};
use crate::tree::{parse, InvalidMd, ParseOptions};

/// The run's overall possible error.
#[derive(Debug)]
pub enum Error {
    /// The Markdown file failed to parse.
    MarkdownParse(InvalidMd),

    /// Couldn't read an input file.
    FileReadError(Input, io::Error),

    /// Couldn't write the file back in place.
    FileWriteError(String, io::Error),
}

impl std::error::Error for Error {}

/// Stdin or an input file by path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Input {
    Stdin,
    FilePath(String),
}

impl Error {
    pub(crate) fn from_io_error(error: io::Error, file: Input) -> Self {
        Error::FileReadError(file, error)
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Stdin => f.write_str("stdin"),
            Input::FilePath(file) => write!(f, "file {file:?}"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MarkdownParse(err) => {
                writeln!(f, "Markdown parse error:")?;
                writeln!(f, "{err}")
            }
            Error::FileReadError(file, err) => {
                if env::var("MDREFLINK_PORTABLE_ERRORS").unwrap_or_default().is_empty() {
                    writeln!(f, "{err} while reading {file}")
                } else {
                    writeln!(f, "{} while reading {file}", err.kind())
                }
            }
            Error::FileWriteError(file, err) => {
                if env::var("MDREFLINK_PORTABLE_ERRORS").unwrap_or_default().is_empty() {
                    writeln!(f, "{err} while writing file {file:?}")
                } else {
                    writeln!(f, "{} while writing file {file:?}", err.kind())
                }
            }
        }
    }
}

/// A simple facade for handling I/O.
///
/// This trait lets you do "I/O-y stuff" like mocking out stdin or reading files. The [`run`]
/// method uses it.
pub trait OsFacade {
    /// Read stdin (or your mock of it) to a `String`.
    fn read_stdin(&self) -> io::Result<String>;

    /// Read a file path (or your mock of one) to a `String`.
    fn read_file(&self, path: &str) -> io::Result<String>;

    /// Write a file path (or your mock of one) back out; used by in-place mode.
    fn write_file(&mut self, path: &str, contents: &str) -> io::Result<()>;

    /// Get a writer for stdout (or your mock of it).
    fn stdout(&mut self) -> impl Write;

    /// Get a writer for stderr (or your mock of it).
    fn stderr(&mut self) -> impl Write;

    /// Handle an error.
    fn write_error(&mut self, err: Error);

    /// Read the input file into a `String`, treating `None` or `"-"` as stdin.
    fn read_input(&self, file: Option<&str>) -> Result<String, Error> {
        match file {
            None | Some("-") => self.read_stdin().map_err(|err| Error::from_io_error(err, Input::Stdin)),
            Some(path) => self
                .read_file(path)
                .map_err(|err| Error::from_io_error(err, Input::FilePath(path.to_string()))),
        }
    }
}

/// Runs mdreflink end to end.
///
/// This uses the provided [RunOptions] and [OsFacade] to read the input, convert its inline links
/// to shortcut references, and write the result to stdout or back to the file (for
/// [`RunOptions::write_in_place`]). Returns `true` if everything worked.
pub fn run(options: &RunOptions, os: &mut impl OsFacade) -> bool {
    match run_or_error(options, os) {
        Ok(()) => true,
        Err(err) => {
            os.write_error(err);
            false
        }
    }
}

fn run_or_error(options: &RunOptions, os: &mut impl OsFacade) -> Result<(), Error> {
    let input = os.read_input(options.file.as_deref())?;
    let mut tree = parse(&input, &ParseOptions::gfm()).map_err(Error::MarkdownParse)?;

    let transform_options = TransformOptions {
        column_width: options.column_width,
    };
    let stats = transform(&mut tree, &transform_options);
    let output = doc_to_string(&tree);

    if options.stats {
        write_stats(&stats, options.stats_format, &mut os.stderr());
    }

    if options.write_in_place && !options.reads_stdin() {
        let path = options.file.as_deref().unwrap_or_default();
        if input != output {
            os.write_file(path, &output)
                .map_err(|err| Error::FileWriteError(path.to_string(), err))?;
        }
    } else {
        let mut stdout = os.stdout();
        let _ = stdout.write_all(output.as_bytes());
        let _ = stdout.flush();
    }

    Ok(())
}

fn write_stats(stats: &TransformStats, format: StatsFormat, to: &mut impl Write) {
    match format {
        StatsFormat::Text => {
            let _ = writeln!(to, "Links converted: {}", stats.links_converted);
            let _ = writeln!(to, "Conflicts found: {}", stats.conflicts_found);
            let _ = writeln!(to, "Definitions added: {}", stats.definitions_added);
        }
        StatsFormat::Json => {
            let _ = serde_json::to_writer(&mut *to, stats);
            let _ = writeln!(to);
        }
    }
}
