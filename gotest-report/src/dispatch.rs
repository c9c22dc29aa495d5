// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, OutputWriter,
    errors::Result,
    output::{OutputContext, OutputOpts},
    version::{TOOL_NAME, VersionInfo},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use gotest_report_metadata::ReportExitCode;
use gotest_report_runner::{
    errors::ReportKind,
    ingest::ingest_events,
    report::ReportAssembler,
    resolve::{GoListQuery, PositionResolver, ResolvedPositions, resolve_from_listing},
};
use std::{
    io::{BufRead, IsTerminal, Write},
    time::Instant,
};
use tracing::{debug, info};

/// Generates test discovery and execution reports from `go test -json` output.
///
/// Pipe the output of `go test -json` into this command. Test positions are resolved by running
/// `go list -json` for each package, or from a listing file passed in with `--list`.
#[derive(Debug, Parser)]
#[command(
    name = "gotest-report",
    version,
    styles = crate::output::clap_styles::style(),
    args_conflicts_with_subcommands = true
)]
pub struct GotestReportApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    report: ReportOpts,

    #[command(subcommand)]
    command: Option<Command>,
}

impl GotestReportApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Some(Command::Version) => {
                let mut stdout = output_writer.stdout_writer();
                writeln!(stdout, "{}", VersionInfo::new().to_version_line())
                    .and_then(|()| stdout.flush())
                    .map_err(|err| ExpectedError::WriteStdoutFailed { err })?;
            }
            None => {
                if std::io::stdin().is_terminal() {
                    return Err(ExpectedError::StdinIsTerminal);
                }
                let cwd = current_dir()?;
                self.report.exec(
                    &cwd,
                    std::io::stdin().lock(),
                    output.verbose,
                    output_writer,
                )?;
            }
        }
        Ok(ReportExitCode::OK)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print version information
    Version,
}

#[derive(Debug, Args)]
struct ReportOpts {
    /// Title of the report
    #[arg(short = 't', long, default_value = "test-runner", value_name = "TITLE")]
    title: String,

    /// Size of status indicators, in pixels
    #[arg(short = 's', long, default_value_t = 24, value_name = "PIXELS")]
    size: u32,

    /// Number of tests per group
    #[arg(short = 'g', long = "groupSize", default_value_t = 20, value_name = "N")]
    group_size: usize,

    /// Path to write the execution report to
    #[arg(
        short = 'e',
        long = "exec",
        default_value = "exec.report.json",
        value_name = "PATH"
    )]
    exec: Utf8PathBuf,

    /// Path to write the discovery report to
    #[arg(
        short = 'd',
        long = "discovery",
        default_value = "discovery.report.json",
        value_name = "PATH"
    )]
    discovery: Utf8PathBuf,

    /// Package listing to read positions from, as produced by `go list -json ./...`
    ///
    /// If not specified, each package is queried with `<GO> list -json <package>`.
    #[arg(short = 'l', long, value_name = "PATH")]
    list: Option<Utf8PathBuf>,

    /// Program used to query packages
    #[arg(
        long,
        default_value = "go",
        value_name = "GO",
        env = "GOTEST_REPORT_GO"
    )]
    go: String,
}

/// Presentation settings for the report.
///
/// These are carried through for consumers that render reports. They do not change the contents
/// of either document.
#[derive(Clone, Debug, Eq, PartialEq)]
struct ReportSettings {
    title: String,
    size: u32,
    group_size: usize,
}

impl ReportOpts {
    fn settings(&self) -> ReportSettings {
        ReportSettings {
            title: self.title.clone(),
            size: self.size,
            group_size: self.group_size,
        }
    }

    /// Reads events from `input`, resolves positions and writes both reports. Relative paths are
    /// resolved against `cwd`.
    fn exec(
        &self,
        cwd: &Utf8Path,
        input: impl BufRead,
        verbose: bool,
        output_writer: &mut OutputWriter,
    ) -> Result<()> {
        let start = Instant::now();
        debug!("report settings: {:?}", self.settings());

        let discovery_path = cwd.join(&self.discovery);
        let execution_path = cwd.join(&self.exec);
        for (kind, path) in [
            (ReportKind::Discovery, &discovery_path),
            (ReportKind::Execution, &execution_path),
        ] {
            if path.exists() {
                return Err(ExpectedError::OutputExists {
                    kind,
                    path: path.clone(),
                });
            }
        }

        let tests = {
            let mut stdout = output_writer.stdout_writer();
            let tests = ingest_events(input, |line| {
                if verbose {
                    writeln!(stdout, "{}", line.text)?;
                }
                Ok(())
            })?;
            stdout
                .flush()
                .map_err(|err| ExpectedError::WriteStdoutFailed { err })?;
            tests
        };

        let positions = self.resolve(cwd, tests.packages().iter().map(String::as_str))?;
        let package_count = tests.packages().len();
        let reports = ReportAssembler::new(tests, &positions).assemble();
        reports.write_to_paths(&discovery_path, &execution_path)?;

        info!(
            "wrote {} tests in {} file groups across {} packages",
            reports.execution.test_cases.len(),
            reports.execution.test_suites.len(),
            package_count,
        );

        let mut stdout = output_writer.stdout_writer();
        writeln!(
            stdout,
            "[{TOOL_NAME}] finished in {:?}",
            start.elapsed()
        )
        .and_then(|()| stdout.flush())
        .map_err(|err| ExpectedError::WriteStdoutFailed { err })
    }

    fn resolve<'a>(
        &self,
        cwd: &Utf8Path,
        packages: impl IntoIterator<Item = &'a str>,
    ) -> Result<ResolvedPositions> {
        let positions = match &self.list {
            Some(list) => resolve_from_listing(&cwd.join(list))?,
            None => PositionResolver::new(GoListQuery::new(&self.go)).resolve_packages(packages)?,
        };
        Ok(positions)
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|path| ExpectedError::CurrentDirInvalidUtf8 { path })
}
