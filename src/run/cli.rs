use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use derive_builder::Builder;
use std::fmt::{Display, Formatter};

/// The CLI arguments.
#[derive(Clone, Default, Debug, PartialEq, Eq, Parser)]
#[command(version, about, long_about = None)]
pub struct CliOptions {
    /// Modify the file in place instead of writing to stdout.
    ///
    /// The file is only rewritten when the output actually differs from the input. This can't be
    /// used when reading from standard input.
    #[arg(long, short = 'w')]
    pub(crate) write_in_place: bool,

    /// Print transformation statistics to stderr.
    #[arg(long)]
    pub(crate) stats: bool,

    /// The format for --stats output.
    #[arg(long, value_enum, default_value_t = StatsFormat::Text)]
    pub(crate) stats_format: StatsFormat,

    /// Reflow long link text so that converted links try to stay within this column width.
    #[arg(long, value_name = "COLUMNS")]
    pub(crate) column_width: Option<usize>,

    /// The Markdown file to process. If this is "-" or not provided, standard input will be used.
    #[arg()]
    pub(crate) file: Option<String>,
}

/// Options analogous to the mdreflink CLI's switches.
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
pub struct RunOptions {
    /// Whether to modify the file in place. This is analogous to the `-w` CLI option.
    pub write_in_place: bool,

    /// Whether to print statistics to stderr. This is analogous to the `--stats` CLI option.
    pub stats: bool,

    /// The format for statistics output.
    pub stats_format: StatsFormat,

    /// The column width for link-text reflow, if any.
    pub column_width: Option<usize>,

    /// The file to read, or stdin if `None` (or `"-"`).
    pub file: Option<String>,
}

impl From<CliOptions> for RunOptions {
    fn from(value: CliOptions) -> Self {
        Self {
            write_in_place: value.write_in_place,
            stats: value.stats,
            stats_format: value.stats_format,
            column_width: value.column_width,
            file: value.file,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            write_in_place: false,
            stats: false,
            stats_format: StatsFormat::Text,
            column_width: None,
            file: None,
        }
    }
}

impl RunOptions {
    pub(crate) fn reads_stdin(&self) -> bool {
        match &self.file {
            None => true,
            Some(path) => path == "-",
        }
    }
}

impl CliOptions {
    /// Validation beyond what clap's derive can express. Prints a clap-style error and returns
    /// `false` if the options are inconsistent.
    pub fn extra_validation(&self) -> bool {
        let stdin = match &self.file {
            None => true,
            Some(path) => path == "-",
        };
        if self.write_in_place && stdin {
            let _ = CliOptions::command()
                .error(
                    ErrorKind::ArgumentConflict,
                    "the -w flag cannot be used with standard input",
                )
                .print();
            return false;
        }
        if self.column_width == Some(0) {
            let _ = CliOptions::command()
                .error(ErrorKind::InvalidValue, "--column-width must be positive")
                .print();
            return false;
        }
        true
    }
}

/// Statistics output formats, analogous to `--stats-format` in the CLI.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, ValueEnum)]
pub enum StatsFormat {
    /// One "Label: count" line per statistic.
    #[default]
    Text,

    /// A single JSON object.
    Json,
}

impl Display for StatsFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let self_str = match self {
            StatsFormat::Text => "text",
            StatsFormat::Json => "json",
        };
        f.write_str(self_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::utils_for_test::*;

    #[test]
    fn verify_cli() {
        CliOptions::command().debug_assert();
    }

    #[test]
    fn no_args() {
        let result = CliOptions::try_parse_from(["mdreflink"]);
        unwrap!(result, Ok(cli));
        assert_eq!(cli.file, None);
        assert!(!cli.write_in_place);
        assert!(cli.extra_validation());
    }

    #[test]
    fn no_args_equals_default() {
        let result = CliOptions::try_parse_from(["mdreflink"]);
        unwrap!(result, Ok(cli));
        let default_run_options = RunOptions::default();
        let from_cli: RunOptions = cli.into();
        assert_eq!(from_cli, default_run_options);
    }

    #[test]
    fn file_and_flags() {
        let result = CliOptions::try_parse_from(["mdreflink", "-w", "--stats", "doc.md"]);
        unwrap!(result, Ok(cli));
        assert_eq!(cli.file.as_deref(), Some("doc.md"));
        assert!(cli.write_in_place);
        assert!(cli.stats);
        assert!(cli.extra_validation());
    }

    #[test]
    fn write_in_place_requires_a_file() {
        let result = CliOptions::try_parse_from(["mdreflink", "-w"]);
        unwrap!(result, Ok(cli));
        assert!(!cli.extra_validation());
    }

    #[test]
    fn write_in_place_conflicts_with_stdin_dash() {
        let result = CliOptions::try_parse_from(["mdreflink", "-w", "-"]);
        unwrap!(result, Ok(cli));
        assert!(!cli.extra_validation());
    }

    #[test]
    fn column_width_zero_is_rejected() {
        let result = CliOptions::try_parse_from(["mdreflink", "--column-width", "0"]);
        unwrap!(result, Ok(cli));
        assert!(!cli.extra_validation());
    }

    #[test]
    fn column_width_parses() {
        let result = CliOptions::try_parse_from(["mdreflink", "--column-width", "80", "doc.md"]);
        unwrap!(result, Ok(cli));
        assert_eq!(cli.column_width, Some(80));
        assert!(cli.extra_validation());
    }

    #[test]
    fn stats_format_values() {
        let result = CliOptions::try_parse_from(["mdreflink", "--stats", "--stats-format", "json"]);
        unwrap!(result, Ok(cli));
        assert_eq!(cli.stats_format, StatsFormat::Json);
    }

    #[test]
    fn run_options_builder() {
        let built = RunOptionsBuilder::default()
            .write_in_place(false)
            .stats(true)
            .stats_format(StatsFormat::Text)
            .column_width(Some(100))
            .file(Some("doc.md".to_string()))
            .build()
            .unwrap();
        assert_eq!(built.column_width, Some(100));
        assert!(!built.reads_stdin());
    }
}
