// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::ReportId;
use serde::{Deserialize, Serialize};
use std::{fmt, io};

/// Catalog of the tests and test files seen in a run, independent of their outcome.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// One entry per test file within a package.
    #[serde(rename = "testCases")]
    pub test_cases: Vec<DiscoveryTestCase>,

    /// One entry per test.
    ///
    /// These are called "suites" in the document format even though each one is a single test.
    #[serde(rename = "testSuites")]
    pub test_suites: Vec<DiscoveryTestSuite>,
}

/// A test file entry in a [`DiscoveryDocument`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryTestCase {
    /// The identifier of the file, derived from the file name.
    pub id: ReportId,

    /// The file name.
    pub label: String,

    /// The package the file belongs to.
    #[serde(rename = "pkg")]
    pub package: String,

    /// Identifiers of every test in the same package.
    #[serde(rename = "test-suites")]
    pub test_suites: Vec<ReportId>,
}

/// A single test entry in a [`DiscoveryDocument`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryTestSuite {
    /// The identifier of the test, derived from the test name.
    pub id: ReportId,

    /// The test name.
    pub label: String,

    /// The package the test belongs to.
    #[serde(rename = "pkg")]
    pub package: String,
}

/// Outcomes for the tests and file/package groups of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDocument {
    /// One entry per test.
    #[serde(rename = "testCase")]
    pub test_cases: Vec<TestCaseExecution>,

    /// One entry per file/package group.
    #[serde(rename = "testSuite")]
    pub test_suites: Vec<TestSuiteExecution>,
}

/// The outcome of a single test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCaseExecution {
    /// Matches [`DiscoveryTestSuite::id`].
    pub id: ReportId,

    /// The final status of the test.
    pub status: ExecutionStatus,

    /// The time taken, in seconds.
    pub duration: f64,

    /// The output of the test if it failed, otherwise empty.
    #[serde(rename = "failureMsg")]
    pub failure_message: String,
}

/// The aggregate outcome of a file/package group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestSuiteExecution {
    /// Matches [`DiscoveryTestCase::id`].
    pub id: ReportId,

    /// The status of the group, decided by majority over the tests in its package.
    pub status: ExecutionStatus,

    /// The sum of the durations of the tests in this group, in seconds.
    pub duration: f64,

    /// A summary of failures if the group failed, otherwise empty.
    #[serde(rename = "failureMsg")]
    pub failure_message: String,

    /// The package the group belongs to.
    #[serde(rename = "pkg")]
    pub package: String,

    /// The number of tests in this group.
    #[serde(rename = "numTests")]
    pub num_tests: usize,
}

/// The status of a test or group of tests.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The test passed.
    Passed,

    /// The test did not pass: it failed, was skipped, or never reported an outcome.
    Failed,
}

impl ExecutionStatus {
    /// Returns the status as it appears in the document.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializes `value` as JSON indented by four spaces, followed by a newline.
///
/// Both report documents are written in this format.
pub fn to_writer_pretty<W, T>(mut writer: W, value: &T) -> serde_json::Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut serializer)?;
    writer.write_all(b"\n").map_err(serde_json::Error::io)
}

/// Serializes `value` with [`to_writer_pretty`] into a byte buffer.
pub fn to_vec_pretty<T>(value: &T) -> serde_json::Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut buf = Vec::with_capacity(256);
    to_writer_pretty(&mut buf, value)?;
    Ok(buf)
}
