// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `gotest-report` failures.
///
/// Report generation may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum ReportExitCode {}

impl ReportExitCode {
    /// No errors occurred and both reports were written.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up an invocation, for example standard input not being
    /// a pipe or an output file already existing.
    pub const SETUP_ERROR: i32 = 96;

    /// Resolving test positions failed, either through the listing file or through a package
    /// query.
    pub const RESOLVE_FAILED: i32 = 102;

    /// Reading or decoding the test event stream failed.
    pub const INGEST_FAILED: i32 = 104;

    /// Writing a report, or echoing input to stdout, produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
