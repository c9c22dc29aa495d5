// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of test function names to their declaring source positions.
//!
//! Positions come either from a pre-generated listing file ([`resolve_from_listing`]), or from
//! querying each package concurrently through a [`PackageQuery`] ([`PositionResolver`]).

use crate::{
    errors::ResolveError,
    package::{PackageMetadata, read_listing},
    source::GoSourceParser,
};
use camino::Utf8Path;
use futures::{StreamExt, TryStreamExt};
use std::{collections::BTreeMap, future::Future, process::Stdio};
use tokio::runtime::Runtime;
use tracing::{debug, trace};

/// Where a test function is declared.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestPosition {
    /// The base name of the declaring file.
    pub file_name: String,

    /// The 1-based line of the declaration.
    pub line: usize,

    /// The 1-based byte column of the declaration.
    pub column: usize,
}

/// Positions within a single package, keyed by function name.
pub type PositionsByTest = BTreeMap<String, TestPosition>;

/// Resolved positions for a set of packages.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolvedPositions {
    packages: BTreeMap<String, PositionsByTest>,
}

impl ResolvedPositions {
    /// Returns the number of packages resolved.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns true if no packages were resolved.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Returns the positions for a package.
    pub fn package(&self, package: &str) -> Option<&PositionsByTest> {
        self.packages.get(package)
    }

    /// Returns the position of a function in a package.
    pub fn get(&self, package: &str, name: &str) -> Option<&TestPosition> {
        self.packages.get(package)?.get(name)
    }

    /// Iterates over packages and their positions, ordered by package name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PositionsByTest)> + '_ {
        self.packages
            .iter()
            .map(|(package, positions)| (package.as_str(), positions))
    }
}

impl Extend<(String, PositionsByTest)> for ResolvedPositions {
    fn extend<T: IntoIterator<Item = (String, PositionsByTest)>>(&mut self, iter: T) {
        self.packages.extend(iter);
    }
}

impl FromIterator<(String, PositionsByTest)> for ResolvedPositions {
    fn from_iter<T: IntoIterator<Item = (String, PositionsByTest)>>(iter: T) -> Self {
        Self {
            packages: iter.into_iter().collect(),
        }
    }
}

/// Inspects every test source file of a package and collects its function positions.
///
/// If more than one file declares the same function name, the file listed last wins.
pub fn positions_for_package(metadata: &PackageMetadata) -> Result<PositionsByTest, ResolveError> {
    let source_error = |error| ResolveError::SourceInspect {
        package: metadata.import_path.clone(),
        error,
    };
    let mut parser = GoSourceParser::new().map_err(source_error)?;
    let mut positions = PositionsByTest::new();

    for path in metadata.test_source_paths() {
        let file_name = path.file_name().unwrap_or(path.as_str()).to_owned();
        let decls = parser.inspect_file(&path).map_err(source_error)?;
        debug!(
            "{}: found {} declarations in {}",
            metadata.import_path,
            decls.len(),
            file_name,
        );

        for decl in decls {
            trace!(
                "{}: {} at {}:{}:{}",
                metadata.import_path, decl.name, file_name, decl.line, decl.column,
            );
            let position = TestPosition {
                file_name: file_name.clone(),
                line: decl.line,
                column: decl.column,
            };
            if let Some(previous) = positions.insert(decl.name, position) {
                trace!(
                    "{}: declaration in {} replaced by a later one",
                    metadata.import_path, previous.file_name,
                );
            }
        }
    }

    Ok(positions)
}

/// Resolves positions for every package described in a listing file.
///
/// Packages are keyed by their import path.
pub fn resolve_from_listing(path: &Utf8Path) -> Result<ResolvedPositions, ResolveError> {
    let packages = read_listing(path)?;
    debug!("read {} package records from {path}", packages.len());

    packages
        .iter()
        .map(|metadata| {
            let positions = positions_for_package(metadata)?;
            Ok((metadata.import_path.clone(), positions))
        })
        .collect()
}

/// Obtains the description of a package by name.
pub trait PackageQuery {
    /// Queries a single package.
    fn query(
        &self,
        package: &str,
    ) -> impl Future<Output = Result<PackageMetadata, ResolveError>> + Send;
}

/// Queries packages by running `<program> list -json <package>`.
#[derive(Clone, Debug)]
pub struct GoListQuery {
    program: String,
}

impl GoListQuery {
    /// Creates a new query that runs `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the program that is run.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn argv<'a>(&'a self, package: &'a str) -> [&'a str; 4] {
        [&self.program, "list", "-json", package]
    }
}

impl Default for GoListQuery {
    fn default() -> Self {
        Self::new("go")
    }
}

impl PackageQuery for GoListQuery {
    async fn query(&self, package: &str) -> Result<PackageMetadata, ResolveError> {
        let argv = self.argv(package);
        let mut cmd = tokio::process::Command::new(argv[0]);
        // Capture stdout and stderr, and close stdin. Dropping the future (on cancellation)
        // kills the child.
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .map_err(|error| ResolveError::query_exec(package, argv, error))?;

        if !output.status.success() {
            return Err(ResolveError::query_failed(
                package,
                argv,
                output.status,
                output.stderr,
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|error| ResolveError::QueryDecode {
            package: package.to_owned(),
            error,
        })
    }
}

/// Resolves positions by querying each package concurrently.
#[derive(Clone, Debug)]
pub struct PositionResolver<Q> {
    query: Q,
}

impl<Q: PackageQuery + Sync> PositionResolver<Q> {
    /// Creates a new resolver using the given query.
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    /// Resolves positions for `packages` on a dedicated runtime, blocking until done.
    ///
    /// See [`Self::resolve_packages_async`].
    pub fn resolve_packages<'a>(
        &self,
        packages: impl IntoIterator<Item = &'a str>,
    ) -> Result<ResolvedPositions, ResolveError> {
        let runtime = Runtime::new().map_err(ResolveError::RuntimeCreate)?;
        let result = runtime.block_on(self.resolve_packages_async(packages));
        // Don't wait on tasks left behind by a cancelled query.
        runtime.shutdown_background();
        result
    }

    /// Resolves positions for `packages`, one concurrent task per package.
    ///
    /// The first failure cancels every other query, and no partial result is returned.
    pub async fn resolve_packages_async<'a>(
        &self,
        packages: impl IntoIterator<Item = &'a str>,
    ) -> Result<ResolvedPositions, ResolveError> {
        let packages: Vec<&str> = packages.into_iter().collect();
        let concurrency = packages.len().max(1);
        debug!("resolving positions for {} packages", packages.len());

        futures::stream::iter(packages)
            .map(|package| async move {
                let metadata = self.query.query(package).await?;
                let positions = positions_for_package(&metadata)?;
                debug!("{package}: resolved {} positions", positions.len());
                Ok::<_, ResolveError>((package.to_owned(), positions))
            })
            .buffer_unordered(concurrency)
            .try_collect()
            .await
    }
}
