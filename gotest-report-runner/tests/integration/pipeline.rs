// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use gotest_report_metadata::{
    DiscoveryDocument, ExecutionDocument, ExecutionStatus, ReportId, TestSuiteExecution,
};
use gotest_report_runner::{
    errors::{IngestError, ResolveError},
    ingest::ingest_events,
    report::ReportAssembler,
    resolve::{PositionResolver, TestPosition, resolve_from_listing},
};
use pretty_assertions::assert_eq;

#[test]
fn listing_pipeline_writes_both_documents() -> Result<()> {
    let fixture = GoFixture::new();
    let tests = ingest_events(EVENTS.as_bytes(), |_| Ok(()))?;
    assert_eq!(tests.len(), 4);
    assert_eq!(tests.packages().len(), 2);

    let positions = resolve_from_listing(&fixture.listing_path())?;
    let assembler = ReportAssembler::new(tests, &positions);
    assert_eq!(
        assembler.tests().get("example.com/calc", "TestMul").unwrap().position,
        Some(TestPosition {
            file_name: "extra_test.go".to_owned(),
            line: 6,
            column: 1,
        })
    );

    let discovery_path = fixture.path().join("discovery.report.json");
    let execution_path = fixture.path().join("exec.report.json");
    assembler
        .assemble()
        .write_to_paths(&discovery_path, &execution_path)?;

    let discovery: DiscoveryDocument =
        serde_json::from_str(&std::fs::read_to_string(&discovery_path)?)?;
    let execution: ExecutionDocument =
        serde_json::from_str(&std::fs::read_to_string(&execution_path)?)?;

    let labels: Vec<_> = discovery
        .test_cases
        .iter()
        .map(|case| (case.package.as_str(), case.label.as_str()))
        .collect();
    assert_eq!(
        labels,
        vec![
            ("example.com/calc", "calc_test.go"),
            ("example.com/calc", "extra_test.go"),
            ("example.com/strs", "strs_test.go"),
        ]
    );
    assert_eq!(
        discovery.test_cases[1].test_suites,
        vec![
            ReportId::from_content("TestAdd"),
            ReportId::from_content("TestMul"),
            ReportId::from_content("TestSub"),
        ]
    );

    assert_eq!(
        execution.test_suites[0],
        TestSuiteExecution {
            id: ReportId::from_content("calc_test.go"),
            status: ExecutionStatus::Failed,
            duration: 0.75,
            failure_message: "2 of 3 tests failed".to_owned(),
            package: "example.com/calc".to_owned(),
            num_tests: 2,
        }
    );

    let sub = execution
        .test_cases
        .iter()
        .find(|case| case.id == ReportId::from_content("TestSub"))
        .unwrap();
    assert_eq!(sub.status, ExecutionStatus::Failed);
    let mul = execution
        .test_cases
        .iter()
        .find(|case| case.id == ReportId::from_content("TestMul"))
        .unwrap();
    assert_eq!(mul.status, ExecutionStatus::Failed, "skipped tests report as failed");
    assert_eq!(
        sub.failure_message,
        "    calc_test.go:12: sub is broken\n--- FAIL: TestSub (0.00s)\n"
    );

    for (case, suite) in discovery.test_cases.iter().zip(&execution.test_suites) {
        ensure!(case.id == suite.id, "file group ids must match");
    }
    for (suite, case) in discovery.test_suites.iter().zip(&execution.test_cases) {
        ensure!(suite.id == case.id, "test ids must match");
    }

    Ok(())
}

#[test]
fn query_mode_matches_listing_mode() -> Result<()> {
    let fixture = GoFixture::new();
    let tests = ingest_events(EVENTS.as_bytes(), |_| Ok(()))?;

    let from_listing = resolve_from_listing(&fixture.listing_path())?;
    let from_query = PositionResolver::new(fixture.query())
        .resolve_packages(tests.packages().iter().map(String::as_str))?;
    assert_eq!(from_query, from_listing);

    let listing_reports = ReportAssembler::new(tests.clone(), &from_listing).assemble();
    let query_reports = ReportAssembler::new(tests, &from_query).assemble();
    assert_eq!(listing_reports, query_reports);

    Ok(())
}

#[test]
fn unknown_package_fails_resolution() -> Result<()> {
    let fixture = GoFixture::new();
    let events = format!(
        "{EVENTS}{}\n",
        r#"{"Action":"pass","Package":"example.com/ghost","Test":"TestGhost"}"#
    );
    let tests = ingest_events(events.as_bytes(), |_| Ok(()))?;

    let error = PositionResolver::new(fixture.query())
        .resolve_packages(tests.packages().iter().map(String::as_str))
        .unwrap_err();
    assert_eq!(error.package(), Some("example.com/ghost"));
    assert!(matches!(error, ResolveError::QueryDecode { .. }), "{error}");

    Ok(())
}

#[test]
fn missing_listing_writes_nothing() -> Result<()> {
    let fixture = GoFixture::new();
    let tests = ingest_events(EVENTS.as_bytes(), |_| Ok(()))?;

    let error = resolve_from_listing(&fixture.path().join("missing.json")).unwrap_err();
    assert!(matches!(error, ResolveError::ListingOpen { .. }), "{error}");
    assert!(!tests.is_empty());
    assert!(!fixture.path().join("discovery.report.json").exists());
    assert!(!fixture.path().join("exec.report.json").exists());

    Ok(())
}

#[test]
fn malformed_event_discards_everything() {
    let events = format!("{EVENTS}{{\"Action\":\n");
    let error = ingest_events(events.as_bytes(), |_| Ok(())).unwrap_err();
    assert!(
        matches!(error, IngestError::Decode { line_number: 16, .. }),
        "{error}"
    );
}
