use clap::Parser;
use mdreflink::run::{CliOptions, Error, OsFacade};
use std::io;
use std::io::ErrorKind;

#[derive(Debug)]
struct Case<const N: usize> {
    cli_args: [&'static str; N],
    expect_output: &'static str,
    expect_error: &'static str,
    md: &'static str,
    files: &'static [(&'static str, &'static str)],
    expect_success: bool,
}

struct CaseOs<'a, const N: usize> {
    case: &'a Case<N>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl<const N: usize> OsFacade for CaseOs<'_, N> {
    fn read_stdin(&self) -> io::Result<String> {
        Ok(self.case.md.to_string())
    }

    fn read_file(&self, path: &str) -> io::Result<String> {
        for (name, content) in self.case.files {
            if path == *name {
                return Ok(content.to_string());
            }
        }
        Err(io::Error::new(ErrorKind::NotFound, format!("File not found: {path}")))
    }

    fn write_file(&mut self, _path: &str, _contents: &str) -> io::Result<()> {
        Ok(())
    }

    fn stdout(&mut self) -> impl io::Write {
        &mut self.stdout
    }

    fn stderr(&mut self) -> impl io::Write {
        &mut self.stderr
    }

    fn write_error(&mut self, err: Error) {
        self.stderr.extend_from_slice(err.to_string().as_bytes());
    }
}

impl<const N: usize> Case<N> {
    fn check(&self) {
        let (actual_success, actual_out, actual_err) = self.run();
        assert_eq!(actual_out, self.expect_output);
        assert_eq!(actual_err, self.expect_error);
        assert_eq!(actual_success, self.expect_success);
    }

    fn run(&self) -> (bool, String, String) {
        let all_cli_args = ["mdreflink"].iter().chain(&self.cli_args);
        let cli = CliOptions::try_parse_from(all_cli_args).unwrap();
        assert!(cli.extra_validation(), "invalid cli args in test case: {:?}", self.cli_args);
        let mut os = CaseOs {
            case: self,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let success = mdreflink::run::run(&cli.into(), &mut os);
        (
            success,
            String::from_utf8(os.stdout).unwrap(),
            String::from_utf8(os.stderr).unwrap(),
        )
    }
}

include!(concat!(env!("OUT_DIR"), "/tests/integ_test_cases.rs"));
