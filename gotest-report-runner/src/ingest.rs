// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion of `go test -json` event streams.
//!
//! Each input line is one JSON-encoded [`TestEvent`]. An [`EventStream`] decodes lines lazily,
//! and a [`TestAggregator`] folds the decoded events into one [`TestRecord`] per
//! `(package, test name)` key.

use crate::{errors::IngestError, resolve::TestPosition};
use serde::{Deserialize, Deserializer};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    io::{self, BufRead},
};

/// Output fragments containing this marker are trimmed of surrounding whitespace.
const PASS_MARKER: &str = "--- PASS:";

/// A single decoded line of test-execution telemetry.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TestEvent {
    /// The time the event was emitted, as reported by the producer.
    #[serde(rename = "Time", alias = "time", default)]
    pub time: Option<String>,

    /// The test this event refers to. Events without a test name are package-level.
    #[serde(rename = "Test", alias = "test", default)]
    pub test: Option<String>,

    /// What happened.
    #[serde(rename = "Action", alias = "action", default)]
    pub action: TestAction,

    /// The package the event belongs to.
    #[serde(rename = "Package", alias = "package", alias = "pkg", default)]
    pub package: String,

    /// Elapsed time in seconds, present on terminal actions.
    #[serde(rename = "Elapsed", alias = "elapsed", default)]
    pub elapsed: Option<f64>,

    /// A fragment of test output.
    #[serde(
        rename = "Output",
        alias = "output",
        default,
        deserialize_with = "null_as_default"
    )]
    pub output: String,
}

impl TestEvent {
    /// Returns the test name if this event refers to a specific test.
    pub fn test_name(&self) -> Option<&str> {
        self.test.as_deref().filter(|name| !name.is_empty())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The action recorded by a [`TestEvent`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum TestAction {
    /// The test passed.
    Pass,

    /// The test failed.
    Fail,

    /// The test was skipped.
    Skip,

    /// Any other action, such as `run`, `output` or `pause`.
    #[default]
    Other,
}

impl TestAction {
    fn parse(s: &str) -> Self {
        match s {
            "pass" => Self::Pass,
            "fail" => Self::Fail,
            "skip" => Self::Skip,
            _ => Self::Other,
        }
    }
}

impl<'de> Deserialize<'de> for TestAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let action = Option::<String>::deserialize(deserializer)?;
        Ok(action.map_or(Self::Other, |action| Self::parse(&action)))
    }
}

impl fmt::Display for TestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
            Self::Skip => write!(f, "skip"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A line of input along with the result of decoding it.
#[derive(Debug)]
pub struct EventLine {
    /// The 1-based line number.
    pub line_number: usize,

    /// The raw text of the line.
    pub text: String,

    /// The decoded event, or why the line could not be decoded.
    pub event: Result<TestEvent, serde_json::Error>,
}

impl EventLine {
    /// Returns the decoded event, or a decode error carrying this line.
    pub fn into_event(self) -> Result<TestEvent, IngestError> {
        self.event.map_err(|error| IngestError::Decode {
            line_number: self.line_number,
            line: self.text,
            error,
        })
    }
}

/// A lazy, finite, non-restartable sequence of events decoded from line-delimited JSON.
///
/// After a line fails to read, or is yielded with a decode error, the stream is fused and
/// returns `None`.
#[derive(Debug)]
pub struct EventStream<R> {
    lines: io::Lines<R>,
    line_number: usize,
    done: bool,
}

impl<R: BufRead> EventStream<R> {
    /// Creates a new stream over `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for EventStream<R> {
    type Item = Result<EventLine, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let line = self.lines.next()?;
        self.line_number += 1;
        let line_number = self.line_number;

        let result = line
            .map_err(|error| IngestError::Read { line_number, error })
            .map(|text| EventLine {
                line_number,
                event: serde_json::from_str(&text),
                text,
            });
        if !matches!(&result, Ok(line) if line.event.is_ok()) {
            self.done = true;
        }
        Some(result)
    }
}

/// Identifies a test within a run.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TestKey {
    /// The package the test belongs to.
    pub package: String,

    /// The name of the test.
    pub name: String,
}

impl TestKey {
    /// Creates a new key.
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// Aggregated state for a single test across every event that referred to it.
#[derive(Clone, Debug, PartialEq)]
pub struct TestRecord {
    /// The name of the test.
    pub name: String,

    /// The package the test belongs to.
    pub package: String,

    /// Elapsed time in seconds, from the last terminal event.
    pub elapsed: f64,

    /// Output fragments in arrival order.
    pub output: Vec<String>,

    /// Whether the last terminal event was a pass.
    pub passed: bool,

    /// Whether the last terminal event was a skip.
    pub skipped: bool,

    /// Where the test function is declared, once resolved.
    pub position: Option<TestPosition>,
}

impl TestRecord {
    fn new(key: &TestKey) -> Self {
        Self {
            name: key.name.clone(),
            package: key.package.clone(),
            elapsed: 0.0,
            output: Vec::new(),
            passed: false,
            skipped: false,
            position: None,
        }
    }

    /// Returns true if the test did not pass. Skipped tests count as failed.
    pub fn failed(&self) -> bool {
        !self.passed
    }

    /// Returns the name of the file declaring the test, or the empty string if unresolved.
    pub fn file_name(&self) -> &str {
        self.position
            .as_ref()
            .map_or("", |position| position.file_name.as_str())
    }

    fn apply(&mut self, event: TestEvent) {
        match event.action {
            TestAction::Pass => {
                self.passed = true;
                self.skipped = false;
                self.elapsed = event.elapsed.unwrap_or_default();
            }
            TestAction::Skip => {
                self.passed = false;
                self.skipped = true;
                self.elapsed = event.elapsed.unwrap_or_default();
            }
            TestAction::Fail => {
                self.passed = false;
                self.skipped = false;
                self.elapsed = event.elapsed.unwrap_or_default();
            }
            TestAction::Other => {}
        }

        let mut output = event.output;
        if output.contains(PASS_MARKER) {
            output = output.trim().to_owned();
        }
        self.output.push(output);
    }
}

/// Folds [`TestEvent`]s into [`TestRecord`]s.
#[derive(Debug, Default)]
pub struct TestAggregator {
    records: BTreeMap<TestKey, TestRecord>,
    packages: BTreeSet<String>,
}

impl TestAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a single event.
    ///
    /// Every package name is recorded. Events without a test name update nothing else.
    pub fn apply(&mut self, event: TestEvent) {
        self.packages.insert(event.package.clone());

        let Some(name) = event.test_name() else {
            return;
        };
        let key = TestKey::new(event.package.as_str(), name);
        self.records
            .entry(key)
            .or_insert_with_key(TestRecord::new)
            .apply(event);
    }

    /// Consumes every event from `stream`, invoking `callback` with each line as read, before
    /// its decoded event is applied. A line that fails to decode is still passed to `callback`.
    ///
    /// Stops at the first error; nothing ingested so far is returned in that case.
    pub fn ingest<R, F>(
        mut self,
        stream: EventStream<R>,
        mut callback: F,
    ) -> Result<TestSet, IngestError>
    where
        R: BufRead,
        F: FnMut(&EventLine) -> io::Result<()>,
    {
        for line in stream {
            let line = line?;
            callback(&line).map_err(|error| IngestError::Echo {
                line_number: line.line_number,
                error,
            })?;
            self.apply(line.into_event()?);
        }
        Ok(self.finish())
    }

    /// Finishes aggregation.
    pub fn finish(self) -> TestSet {
        tracing::debug!(
            "ingested {} tests across {} packages",
            self.records.len(),
            self.packages.len(),
        );
        TestSet {
            records: self.records,
            packages: self.packages,
        }
    }
}

/// Reads line-delimited test events from `reader` and aggregates them.
///
/// `callback` sees every line before it is decoded, including a malformed line that ends
/// ingestion, and can be used to echo input.
pub fn ingest_events<R, F>(reader: R, callback: F) -> Result<TestSet, IngestError>
where
    R: BufRead,
    F: FnMut(&EventLine) -> io::Result<()>,
{
    TestAggregator::new().ingest(EventStream::new(reader), callback)
}

/// The result of ingestion: every test record, plus every distinct package seen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestSet {
    records: BTreeMap<TestKey, TestRecord>,
    packages: BTreeSet<String>,
}

impl TestSet {
    /// Returns the number of test records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no tests were seen.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up the record for a test.
    pub fn get(&self, package: &str, name: &str) -> Option<&TestRecord> {
        self.records.get(&TestKey::new(package, name))
    }

    /// Iterates over records, ordered by package and then test name.
    pub fn records(&self) -> impl ExactSizeIterator<Item = &TestRecord> + '_ {
        self.records.values()
    }

    /// Returns every distinct package name seen, including those of events without a test name.
    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut TestRecord> + '_ {
        self.records.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;
    use test_strategy::proptest;

    fn ingest_str(input: &str) -> Result<TestSet, IngestError> {
        ingest_events(input.as_bytes(), |_| Ok(()))
    }

    #[test]
    fn decode_go_test_event() {
        let event: TestEvent = serde_json::from_str(
            r#"{"Time":"2023-05-01T10:00:00.1Z","Action":"pass","Package":"example.com/a","Test":"TestA","Elapsed":0.25}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            TestEvent {
                time: Some("2023-05-01T10:00:00.1Z".to_owned()),
                test: Some("TestA".to_owned()),
                action: TestAction::Pass,
                package: "example.com/a".to_owned(),
                elapsed: Some(0.25),
                output: String::new(),
            }
        );
    }

    #[test_case("pass", TestAction::Pass ; "pass")]
    #[test_case("fail", TestAction::Fail ; "fail")]
    #[test_case("skip", TestAction::Skip ; "skip")]
    #[test_case("run", TestAction::Other ; "run")]
    #[test_case("output", TestAction::Other ; "output")]
    fn decode_action(input: &str, expected: TestAction) {
        let event: TestEvent =
            serde_json::from_str(&format!(r#"{{"Action":"{input}","Package":"p"}}"#)).unwrap();
        assert_eq!(event.action, expected);
    }

    #[test]
    fn duplicate_pass_yields_one_record() {
        let tests = ingest_str(indoc! {r#"
            {"Package":"a","Test":"T1","Action":"pass","Elapsed":0.01}
            {"Package":"a","Test":"T1","Action":"pass","Elapsed":0.01}
        "#})
        .unwrap();

        assert_eq!(tests.len(), 1);
        let record = tests.get("a", "T1").unwrap();
        assert!(record.passed);
        assert!(!record.skipped);
        assert_eq!(record.elapsed, 0.01);
    }

    #[test]
    fn last_terminal_action_wins() {
        let tests = ingest_str(indoc! {r#"
            {"Package":"a","Test":"T1","Action":"run"}
            {"Package":"a","Test":"T1","Action":"pass","Elapsed":0.5}
            {"Package":"a","Test":"T1","Action":"fail","Elapsed":1.5}
            {"Package":"a","Test":"T2","Action":"fail","Elapsed":0.1}
            {"Package":"a","Test":"T2","Action":"skip","Elapsed":0.2}
        "#})
        .unwrap();

        let t1 = tests.get("a", "T1").unwrap();
        assert!(!t1.passed);
        assert!(t1.failed());
        assert_eq!(t1.elapsed, 1.5);

        let t2 = tests.get("a", "T2").unwrap();
        assert!(t2.skipped);
        assert!(t2.failed());
        assert_eq!(t2.elapsed, 0.2);
    }

    #[test]
    fn other_actions_only_update_output() {
        let tests = ingest_str(indoc! {r#"
            {"Package":"a","Test":"T1","Action":"pass","Elapsed":0.5}
            {"Package":"a","Test":"T1","Action":"output","Elapsed":9.0,"Output":"late\n"}
        "#})
        .unwrap();

        let t1 = tests.get("a", "T1").unwrap();
        assert!(t1.passed);
        assert_eq!(t1.elapsed, 0.5);
        assert_eq!(t1.output, vec!["".to_owned(), "late\n".to_owned()]);
    }

    #[test]
    fn output_trail_is_ordered_and_pass_lines_trimmed() {
        let tests = ingest_str(indoc! {r#"
            {"Package":"a","Test":"T1","Action":"run"}
            {"Package":"a","Test":"T1","Action":"output","Output":"=== RUN   T1\n"}
            {"Package":"a","Test":"T1","Action":"output","Output":"    --- PASS: T1 (0.00s)\n"}
            {"Package":"a","Test":"T1","Action":"pass","Elapsed":0}
        "#})
        .unwrap();

        assert_eq!(
            tests.get("a", "T1").unwrap().output,
            vec![
                "".to_owned(),
                "=== RUN   T1\n".to_owned(),
                "--- PASS: T1 (0.00s)".to_owned(),
                "".to_owned(),
            ]
        );
    }

    #[test]
    fn package_events_register_packages_only() {
        let tests = ingest_str(indoc! {r#"
            {"Package":"a","Action":"start"}
            {"Package":"b","Test":"","Action":"output","Output":"ok\n"}
            {"Package":"a","Action":"output","Output":"PASS\n"}
            {"Package":"c","Test":"T","Action":"pass"}
        "#})
        .unwrap();

        assert_eq!(tests.len(), 1);
        assert_eq!(
            tests.packages().iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn same_name_in_different_packages_is_distinct() {
        let tests = ingest_str(indoc! {r#"
            {"Package":"a","Test":"T","Action":"pass"}
            {"Package":"b","Test":"T","Action":"fail"}
        "#})
        .unwrap();
        assert_eq!(tests.len(), 2);
        assert!(tests.get("a", "T").unwrap().passed);
        assert!(tests.get("b", "T").unwrap().failed());
    }

    #[test]
    fn lowercase_field_names_accepted() {
        let tests =
            ingest_str(r#"{"pkg":"a","test":"T1","action":"pass","elapsed":0.01}"#).unwrap();
        assert!(tests.get("a", "T1").unwrap().passed);
    }

    #[test]
    fn malformed_line_fails_fast() {
        let err = ingest_str(indoc! {r#"
            {"Package":"a","Test":"T1","Action":"pass"}
            not json
            {"Package":"a","Test":"T2","Action":"pass"}
        "#})
        .unwrap_err();

        match err {
            IngestError::Decode {
                line_number, line, ..
            } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "not json");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stream_is_fused_after_error() {
        let mut stream = EventStream::new("{\n{\"Package\":\"a\"}\n".as_bytes());
        let line = stream.next().unwrap().unwrap();
        assert_eq!(line.text, "{");
        assert!(matches!(
            line.into_event(),
            Err(IngestError::Decode { line_number: 1, .. })
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn callback_sees_every_line() {
        let input = indoc! {r#"
            {"Package":"a","Action":"start"}
            {"Package":"a","Test":"T1","Action":"pass"}
        "#};
        let mut echoed = Vec::new();
        ingest_events(input.as_bytes(), |line| {
            echoed.push(line.text.clone());
            Ok(())
        })
        .unwrap();
        assert_eq!(echoed, input.lines().collect::<Vec<_>>());
    }

    #[test]
    fn callback_sees_malformed_line() {
        let input = indoc! {r#"
            {"Package":"a","Test":"T1","Action":"pass"}
            not json
            {"Package":"a","Test":"T2","Action":"pass"}
        "#};
        let mut echoed = Vec::new();
        let err = ingest_events(input.as_bytes(), |line| {
            echoed.push(line.text.clone());
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, IngestError::Decode { line_number: 2, .. }), "{err}");
        assert_eq!(echoed, vec![r#"{"Package":"a","Test":"T1","Action":"pass"}"#, "not json"]);
    }

    #[test]
    fn callback_error_aborts() {
        let err = ingest_events(r#"{"Package":"a"}"#.as_bytes(), |_| {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        })
        .unwrap_err();
        assert!(matches!(err, IngestError::Echo { line_number: 1, .. }));
    }

    const ACTIONS: [&str; 4] = ["pass", "fail", "skip", "output"];

    fn render_events(events: &[(usize, usize, u32)]) -> String {
        events
            .iter()
            .map(|(test, action, elapsed)| {
                format!(
                    r#"{{"Package":"p","Test":"T{test}","Action":"{}","Elapsed":{elapsed}}}"#,
                    ACTIONS[*action],
                ) + "\n"
            })
            .collect()
    }

    #[proptest]
    fn last_terminal_event_wins(
        #[strategy(proptest::collection::vec((0..3usize, 0..4usize, 0..1000u32), 0..32))]
        events: Vec<(usize, usize, u32)>,
    ) {
        let tests = ingest_str(&render_events(&events)).unwrap();

        for test in 0..3 {
            let last_terminal = events
                .iter()
                .rev()
                .find(|(t, action, _)| *t == test && *action < 3);
            match (tests.get("p", &format!("T{test}")), last_terminal) {
                (None, _) => proptest::prop_assert!(!events.iter().any(|(t, _, _)| *t == test)),
                (Some(record), Some((_, action, elapsed))) => {
                    proptest::prop_assert_eq!(record.passed, *action == 0);
                    proptest::prop_assert_eq!(record.skipped, *action == 2);
                    proptest::prop_assert_eq!(record.elapsed, f64::from(*elapsed));
                }
                (Some(record), None) => {
                    proptest::prop_assert!(record.failed());
                    proptest::prop_assert_eq!(record.elapsed, 0.0);
                }
            }
        }
    }

    #[proptest]
    fn reingesting_is_identical(
        #[strategy(proptest::collection::vec((0..3usize, 0..4usize, 0..1000u32), 0..32))]
        events: Vec<(usize, usize, u32)>,
    ) {
        let input = render_events(&events);
        proptest::prop_assert_eq!(ingest_str(&input).unwrap(), ingest_str(&input).unwrap());
    }
}
