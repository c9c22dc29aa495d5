// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by gotest-report.

use camino::Utf8PathBuf;
use std::{fmt, process::ExitStatus};
use thiserror::Error;

/// An error that occurred while ingesting the test event stream.
///
/// Ingestion stops at the first error and no partial results are returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// Reading a line from the input failed.
    #[error("error reading line {line_number} of test events")]
    Read {
        /// The 1-based line number that could not be read.
        line_number: usize,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A line could not be decoded as a test event.
    #[error("line {line_number} is not a valid test event: {line}")]
    Decode {
        /// The 1-based line number of the bad line.
        line_number: usize,

        /// The contents of the line.
        line: String,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The callback invoked for each line returned an error.
    #[error("error echoing line {line_number} of test events")]
    Echo {
        /// The 1-based line number being echoed.
        line_number: usize,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while inspecting a Go source file for function declarations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceInspectError {
    /// The source file could not be read.
    #[error("error reading source file `{path}`")]
    Read {
        /// The path to the file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The Go grammar could not be loaded into the parser.
    #[error("error loading the Go grammar")]
    Grammar(#[source] tree_sitter::LanguageError),

    /// The source file could not be parsed.
    #[error("{path}:{}:{}: {}", .error.line, .error.column, .error.message)]
    Parse {
        /// The path to the file.
        path: Utf8PathBuf,

        /// Where and why parsing failed.
        error: SourceParseError,
    },
}

/// A failure to parse Go source, with its 1-based position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceParseError {
    /// The line on which the error was detected.
    pub line: usize,

    /// The byte column on which the error was detected.
    pub column: usize,

    /// A description of the problem.
    pub message: String,
}

impl SourceParseError {
    pub(crate) fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for SourceParseError {}

/// An error that occurred while resolving test positions.
///
/// Resolution is all-or-nothing: any of these errors aborts the whole step.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// The listing file could not be opened.
    #[error("error opening package listing `{path}`")]
    ListingOpen {
        /// The path to the listing file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A record in the listing file could not be decoded.
    #[error("error decoding package record {index} in listing `{path}`")]
    ListingDecode {
        /// The path to the listing file.
        path: Utf8PathBuf,

        /// The 0-based index of the record that could not be decoded.
        index: usize,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The package query command could not be executed.
    #[error("for package `{package}`, executing `{}` failed", shell_words::join(.command))]
    QueryExec {
        /// The package being queried.
        package: String,

        /// The command that was run.
        command: Vec<String>,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The package query command exited unsuccessfully.
    #[error(
        "for package `{package}`, command `{}` {exit_status}\n--- stderr:\n{}",
        shell_words::join(.command),
        String::from_utf8_lossy(.stderr).trim_end(),
    )]
    QueryFailed {
        /// The package being queried.
        package: String,

        /// The command that was run.
        command: Vec<String>,

        /// The exit status of the command.
        exit_status: ExitStatus,

        /// Standard error produced by the command.
        stderr: Vec<u8>,
    },

    /// The package query command produced output that isn't a package record.
    #[error("for package `{package}`, error decoding package record")]
    QueryDecode {
        /// The package being queried.
        package: String,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// A test source file of the package could not be inspected.
    #[error("for package `{package}`, error inspecting test sources")]
    SourceInspect {
        /// The package whose sources were being inspected.
        package: String,

        /// The underlying error.
        #[source]
        error: SourceInspectError,
    },

    /// Creating the async runtime failed.
    #[error("error creating Tokio runtime")]
    RuntimeCreate(#[source] std::io::Error),
}

impl ResolveError {
    pub(crate) fn query_exec(
        package: impl Into<String>,
        command: impl IntoIterator<Item = impl Into<String>>,
        error: std::io::Error,
    ) -> Self {
        Self::QueryExec {
            package: package.into(),
            command: command.into_iter().map(Into::into).collect(),
            error,
        }
    }

    pub(crate) fn query_failed(
        package: impl Into<String>,
        command: impl IntoIterator<Item = impl Into<String>>,
        exit_status: ExitStatus,
        stderr: Vec<u8>,
    ) -> Self {
        Self::QueryFailed {
            package: package.into(),
            command: command.into_iter().map(Into::into).collect(),
            exit_status,
            stderr,
        }
    }

    /// Returns the package this error is attributed to, if any.
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::QueryExec { package, .. }
            | Self::QueryFailed { package, .. }
            | Self::QueryDecode { package, .. }
            | Self::SourceInspect { package, .. } => Some(package),
            Self::ListingOpen { .. } | Self::ListingDecode { .. } | Self::RuntimeCreate(_) => {
                None
            }
        }
    }
}

/// An error that occurred while writing the report documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// A document could not be serialized.
    #[error("error serializing {kind} report")]
    Serialize {
        /// Which document failed.
        kind: ReportKind,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// A destination already exists.
    #[error("{kind} report `{path}` already exists")]
    AlreadyExists {
        /// Which document was being written.
        kind: ReportKind,

        /// The destination path.
        path: Utf8PathBuf,
    },

    /// A document could not be written.
    #[error("error writing {kind} report to `{path}`")]
    Write {
        /// Which document failed.
        kind: ReportKind,

        /// The destination path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<std::io::Error>,
    },
}

/// Identifies one of the two report documents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportKind {
    /// The discovery document.
    Discovery,

    /// The execution document.
    Execution,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Execution => write!(f, "execution"),
        }
    }
}
