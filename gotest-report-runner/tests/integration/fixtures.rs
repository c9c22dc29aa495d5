// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use gotest_report_runner::{
    errors::ResolveError,
    package::PackageMetadata,
    resolve::PackageQuery,
};
use indoc::indoc;
use std::collections::HashMap;

pub(crate) const CALC_TEST_GO: &str = indoc! {r#"
    package calc

    import "testing"

    func TestAdd(t *testing.T) {
    	if add(1, 2) != 3 {
    		t.Fatal("add")
    	}
    }

    func TestSub(t *testing.T) {
    	t.Error("sub is broken")
    }
"#};

pub(crate) const CALC_EXTRA_TEST_GO: &str = indoc! {r#"
    package calc

    import "testing"

    // Skipped on purpose.
    func TestMul(t *testing.T) { t.Skip("later") }
"#};

pub(crate) const STRINGS_TEST_GO: &str = indoc! {r#"
    package strs

    import "testing"

    type suite struct{}

    func (suite) helper() {}

    func TestUpper(t *testing.T) {
    	check := func(s string) {}
    	check("a")
    }
"#};

pub(crate) const EVENTS: &str = indoc! {r#"
    {"Time":"2024-01-01T00:00:00Z","Action":"start","Package":"example.com/calc"}
    {"Time":"2024-01-01T00:00:00Z","Action":"run","Package":"example.com/calc","Test":"TestAdd"}
    {"Time":"2024-01-01T00:00:00Z","Action":"output","Package":"example.com/calc","Test":"TestAdd","Output":"=== RUN   TestAdd\n"}
    {"Time":"2024-01-01T00:00:00Z","Action":"output","Package":"example.com/calc","Test":"TestAdd","Output":"--- PASS: TestAdd (0.00s)\n"}
    {"Time":"2024-01-01T00:00:00Z","Action":"pass","Package":"example.com/calc","Test":"TestAdd","Elapsed":0.25}
    {"Time":"2024-01-01T00:00:00Z","Action":"run","Package":"example.com/calc","Test":"TestSub"}
    {"Time":"2024-01-01T00:00:00Z","Action":"output","Package":"example.com/calc","Test":"TestSub","Output":"    calc_test.go:12: sub is broken\n"}
    {"Time":"2024-01-01T00:00:00Z","Action":"output","Package":"example.com/calc","Test":"TestSub","Output":"--- FAIL: TestSub (0.00s)\n"}
    {"Time":"2024-01-01T00:00:00Z","Action":"fail","Package":"example.com/calc","Test":"TestSub","Elapsed":0.5}
    {"Time":"2024-01-01T00:00:00Z","Action":"run","Package":"example.com/calc","Test":"TestMul"}
    {"Time":"2024-01-01T00:00:00Z","Action":"skip","Package":"example.com/calc","Test":"TestMul","Elapsed":0}
    {"Time":"2024-01-01T00:00:00Z","Action":"fail","Package":"example.com/calc","Elapsed":0.75}
    {"Time":"2024-01-01T00:00:00Z","Action":"run","Package":"example.com/strs","Test":"TestUpper"}
    {"Time":"2024-01-01T00:00:00Z","Action":"pass","Package":"example.com/strs","Test":"TestUpper","Elapsed":1}
    {"Time":"2024-01-01T00:00:00Z","Action":"pass","Package":"example.com/strs","Elapsed":1}
"#};

/// A temporary directory laid out as two Go packages, with a listing file describing them.
pub(crate) struct GoFixture {
    dir: Utf8TempDir,
    pub(crate) packages: Vec<PackageMetadata>,
}

impl GoFixture {
    pub(crate) fn new() -> Self {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let packages = vec![
            write_package(
                dir.path(),
                "calc",
                &[
                    ("calc_test.go", CALC_TEST_GO),
                    ("extra_test.go", CALC_EXTRA_TEST_GO),
                ],
            ),
            write_package(dir.path(), "strs", &[("strs_test.go", STRINGS_TEST_GO)]),
        ];

        let listing: String = packages
            .iter()
            .map(|metadata| {
                let record = serde_json::json!({
                    "Dir": metadata.dir,
                    "ImportPath": metadata.import_path,
                    "Name": metadata.name,
                    "TestGoFiles": metadata.test_go_files,
                    "Module": { "Path": "example.com", "Main": true },
                });
                serde_json::to_string_pretty(&record).expect("serialized record") + "\n"
            })
            .collect();
        std::fs::write(dir.path().join("listing.json"), listing).expect("wrote listing");

        Self { dir, packages }
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        self.dir.path()
    }

    pub(crate) fn listing_path(&self) -> Utf8PathBuf {
        self.dir.path().join("listing.json")
    }

    pub(crate) fn query(&self) -> FixtureQuery {
        FixtureQuery {
            packages: self
                .packages
                .iter()
                .map(|metadata| (metadata.import_path.clone(), metadata.clone()))
                .collect(),
        }
    }
}

fn write_package(root: &Utf8Path, name: &str, files: &[(&str, &str)]) -> PackageMetadata {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).expect("created package dir");
    for (file, contents) in files {
        std::fs::write(dir.join(file), contents).expect("wrote source file");
    }
    PackageMetadata {
        dir,
        import_path: format!("example.com/{name}"),
        name: name.to_owned(),
        go_files: Vec::new(),
        test_go_files: files.iter().map(|(file, _)| (*file).to_owned()).collect(),
        module: None,
    }
}

/// Answers package queries from a fixture. Unknown packages fail to decode.
pub(crate) struct FixtureQuery {
    packages: HashMap<String, PackageMetadata>,
}

impl PackageQuery for FixtureQuery {
    async fn query(&self, package: &str) -> Result<PackageMetadata, ResolveError> {
        match self.packages.get(package) {
            Some(metadata) => Ok(metadata.clone()),
            None => Err(ResolveError::QueryDecode {
                package: package.to_owned(),
                error: serde_json::from_str::<PackageMetadata>("null")
                    .expect_err("null is not a package"),
            }),
        }
    }
}
