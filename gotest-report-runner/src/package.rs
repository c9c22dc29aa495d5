// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Package description records, as produced by `go list -json`.

use crate::errors::ResolveError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::{fs::File, io::BufReader};

/// Describes a single Go package.
///
/// Only the fields needed to locate test sources are decoded. Unknown fields are ignored.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PackageMetadata {
    /// The directory containing the package sources.
    pub dir: Utf8PathBuf,

    /// The import path of the package. Test events refer to packages by this name.
    pub import_path: String,

    /// The package name as declared in its sources.
    #[serde(default)]
    pub name: String,

    /// Non-test source files, relative to [`Self::dir`].
    #[serde(default)]
    pub go_files: Vec<String>,

    /// Test source files in the package itself, relative to [`Self::dir`].
    #[serde(default)]
    pub test_go_files: Vec<String>,

    /// The module containing the package, if any.
    #[serde(default)]
    pub module: Option<ModuleMetadata>,
}

impl PackageMetadata {
    /// Returns the full paths of the package's test source files.
    pub fn test_source_paths(&self) -> impl ExactSizeIterator<Item = Utf8PathBuf> + '_ {
        self.test_go_files.iter().map(|file| self.dir.join(file))
    }
}

/// Describes the module a package belongs to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleMetadata {
    /// The module path.
    #[serde(default)]
    pub path: String,

    /// The directory holding the module, if it is available locally.
    #[serde(default)]
    pub dir: Option<Utf8PathBuf>,

    /// Whether this is the main module.
    #[serde(default)]
    pub main: bool,
}

/// Reads every package record from a listing file.
///
/// A listing file is the concatenated output of `go list -json`: a sequence of JSON objects,
/// optionally separated by whitespace.
pub fn read_listing(path: &Utf8Path) -> Result<Vec<PackageMetadata>, ResolveError> {
    let file = File::open(path).map_err(|error| ResolveError::ListingOpen {
        path: path.to_owned(),
        error,
    })?;

    serde_json::Deserializer::from_reader(BufReader::new(file))
        .into_iter::<PackageMetadata>()
        .enumerate()
        .map(|(index, record)| {
            record.map_err(|error| ResolveError::ListingDecode {
                path: path.to_owned(),
                index,
                error,
            })
        })
        .collect()
}
