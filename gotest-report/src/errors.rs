// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use gotest_report_metadata::ReportExitCode;
use gotest_report_runner::errors::{IngestError, ReportKind, ResolveError, WriteReportError};
use owo_colors::OwoColorize;
use std::{error::Error, path::PathBuf};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that is reported to the user, with an exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("standard input is a terminal")]
    StdinIsTerminal,
    #[error("could not determine current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: PathBuf },
    #[error("output file already exists")]
    OutputExists {
        kind: ReportKind,
        path: Utf8PathBuf,
    },
    #[error("failed to read test events")]
    IngestFailed {
        #[from]
        err: IngestError,
    },
    #[error("failed to resolve test positions")]
    ResolveFailed {
        #[from]
        err: ResolveError,
    },
    #[error("failed to write reports")]
    WriteReportFailed {
        #[from]
        err: WriteReportError,
    },
    #[error("failed to write to stdout")]
    WriteStdoutFailed {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::StdinIsTerminal
            | Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::OutputExists { .. } => ReportExitCode::SETUP_ERROR,
            Self::IngestFailed { .. } => ReportExitCode::INGEST_FAILED,
            Self::ResolveFailed { .. } => ReportExitCode::RESOLVE_FAILED,
            Self::WriteReportFailed { .. } | Self::WriteStdoutFailed { .. } => {
                ReportExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::StdinIsTerminal => {
                error!(
                    "standard input is a terminal: pipe in the output of `{}`",
                    "go test -json".style(styles.bold)
                );
                None
            }
            Self::CurrentDirFailed { err } => {
                error!("could not determine current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::OutputExists { kind, path } => {
                error!(
                    "{kind} report `{}` already exists, refusing to overwrite it",
                    path.style(styles.bold)
                );
                None
            }
            Self::IngestFailed { err } => {
                error!("failed to read test events");
                Some(err as &dyn Error)
            }
            Self::ResolveFailed { err } => {
                match err.package() {
                    Some(package) => error!(
                        "failed to resolve test positions for package `{}`",
                        package.style(styles.bold)
                    ),
                    None => error!("failed to resolve test positions"),
                }
                Some(err as &dyn Error)
            }
            Self::WriteReportFailed { err } => {
                error!("failed to write reports");
                Some(err as &dyn Error)
            }
            Self::WriteStdoutFailed { err } => {
                error!("failed to write to stdout");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
