// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembly and writing of the discovery and execution documents.

use crate::{
    errors::{ReportKind, WriteReportError},
    ingest::{TestRecord, TestSet},
    resolve::ResolvedPositions,
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::Utf8Path;
use gotest_report_metadata::{
    DiscoveryDocument, DiscoveryTestCase, DiscoveryTestSuite, ExecutionDocument, ExecutionStatus,
    ReportId, TestCaseExecution, TestSuiteExecution, to_vec_pretty,
};
use std::{collections::BTreeMap, io::Write};
use tracing::{debug, warn};

/// Merges test records with their positions and builds the report documents.
#[derive(Clone, Debug)]
pub struct ReportAssembler {
    tests: TestSet,
}

impl ReportAssembler {
    /// Creates a new assembler, filling in each record's position from `positions`.
    ///
    /// Records without a resolved position are kept, and are grouped under an empty file name.
    pub fn new(mut tests: TestSet, positions: &ResolvedPositions) -> Self {
        for record in tests.records_mut() {
            record.position = positions.get(&record.package, &record.name).cloned();
            if record.position.is_none() {
                debug!(
                    "{}.{}: no declaration found, reporting without a file",
                    record.package, record.name,
                );
            }
        }
        Self { tests }
    }

    /// Returns the merged test records.
    pub fn tests(&self) -> &TestSet {
        &self.tests
    }

    /// Builds both documents.
    ///
    /// Output is ordered by package, then by file name or test name, so the same input always
    /// produces the same documents.
    pub fn assemble(&self) -> Reports {
        let mut counts: BTreeMap<&str, StatusCounts> = BTreeMap::new();
        let mut package_tests: BTreeMap<&str, Vec<ReportId>> = BTreeMap::new();
        let mut groups: BTreeMap<(&str, &str), Vec<&TestRecord>> = BTreeMap::new();

        for record in self.tests.records() {
            counts
                .entry(&record.package)
                .or_default()
                .add(record_status(record));
            package_tests
                .entry(&record.package)
                .or_default()
                .push(ReportId::from_content(&record.name));
            groups
                .entry((record.package.as_str(), record.file_name()))
                .or_default()
                .push(record);
        }

        let mut discovery = DiscoveryDocument::default();
        let mut execution = ExecutionDocument::default();

        for record in self.tests.records() {
            let id = ReportId::from_content(&record.name);
            let status = record_status(record);
            discovery.test_suites.push(DiscoveryTestSuite {
                id: id.clone(),
                label: record.name.clone(),
                package: record.package.clone(),
            });
            execution.test_cases.push(TestCaseExecution {
                id,
                status,
                duration: record.elapsed,
                failure_message: if status == ExecutionStatus::Failed {
                    record.output.concat()
                } else {
                    String::new()
                },
            });
        }

        for ((package, file_name), records) in &groups {
            let id = ReportId::from_content(file_name);
            let package_counts = &counts[package];
            let status = package_counts.package_status();

            discovery.test_cases.push(DiscoveryTestCase {
                id: id.clone(),
                label: (*file_name).to_owned(),
                package: (*package).to_owned(),
                test_suites: package_tests[package].clone(),
            });
            execution.test_suites.push(TestSuiteExecution {
                id,
                status,
                duration: records.iter().map(|record| record.elapsed).sum(),
                failure_message: if status == ExecutionStatus::Failed {
                    format!(
                        "{} of {} tests failed",
                        package_counts.failed,
                        package_counts.total(),
                    )
                } else {
                    String::new()
                },
                package: (*package).to_owned(),
                num_tests: records.len(),
            });
        }

        debug!(
            "assembled {} tests in {} file groups across {} packages",
            execution.test_cases.len(),
            execution.test_suites.len(),
            counts.len(),
        );

        Reports {
            discovery,
            execution,
        }
    }
}

/// A test that didn't pass, including a skipped one, counts as failed.
fn record_status(record: &TestRecord) -> ExecutionStatus {
    if record.passed {
        ExecutionStatus::Passed
    } else {
        ExecutionStatus::Failed
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct StatusCounts {
    passed: usize,
    failed: usize,
}

impl StatusCounts {
    fn add(&mut self, status: ExecutionStatus) {
        match status {
            ExecutionStatus::Passed => self.passed += 1,
            ExecutionStatus::Failed => self.failed += 1,
        }
    }

    fn total(&self) -> usize {
        self.passed + self.failed
    }

    /// A tie is a pass.
    fn package_status(&self) -> ExecutionStatus {
        if self.failed > self.passed {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Passed
        }
    }
}

/// The two report documents for a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reports {
    /// The catalog of tests and test files.
    pub discovery: DiscoveryDocument,

    /// The outcomes of tests and test file groups.
    pub execution: ExecutionDocument,
}

impl Reports {
    /// Writes both documents, refusing to overwrite existing files.
    ///
    /// Both documents are serialized before anything is written. If writing the execution
    /// document fails, the discovery document is removed again, so that on error neither file
    /// is left behind.
    pub fn write_to_paths(
        &self,
        discovery_path: &Utf8Path,
        execution_path: &Utf8Path,
    ) -> Result<(), WriteReportError> {
        let discovery =
            to_vec_pretty(&self.discovery).map_err(|error| WriteReportError::Serialize {
                kind: ReportKind::Discovery,
                error,
            })?;
        let execution =
            to_vec_pretty(&self.execution).map_err(|error| WriteReportError::Serialize {
                kind: ReportKind::Execution,
                error,
            })?;

        write_document(ReportKind::Discovery, discovery_path, &discovery)?;
        if let Err(error) = write_document(ReportKind::Execution, execution_path, &execution) {
            if let Err(remove_error) = std::fs::remove_file(discovery_path) {
                warn!("failed to remove {discovery_path} after error: {remove_error}");
            }
            return Err(error);
        }

        debug!(
            "wrote {} bytes to {discovery_path} and {} bytes to {execution_path}",
            discovery.len(),
            execution.len(),
        );
        Ok(())
    }
}

fn write_document(
    kind: ReportKind,
    path: &Utf8Path,
    contents: &[u8],
) -> Result<(), WriteReportError> {
    let file = AtomicFile::new(path, OverwriteBehavior::DisallowOverwrite);
    file.write(|f| f.write_all(contents)).map_err(|error| {
        let already_exists = matches!(
            &error,
            atomicwrites::Error::Internal(error) if error.kind() == std::io::ErrorKind::AlreadyExists
        );
        if already_exists {
            WriteReportError::AlreadyExists {
                kind,
                path: path.to_owned(),
            }
        } else {
            WriteReportError::Write {
                kind,
                path: path.to_owned(),
                error,
            }
        }
    })
}
