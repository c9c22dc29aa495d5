// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// A content-derived identifier used to cross-reference report entries.
///
/// The identifier is the lowercase hex MD5 digest of its input, so the same input always maps to
/// the same identifier across runs. Test identifiers are derived from the test name alone and
/// file identifiers from the file name alone: same-named tests in different packages share an
/// identifier.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    /// Derives an identifier from the given content.
    pub fn from_content(content: &str) -> Self {
        Self(format!("{:x}", md5::compute(content.as_bytes())))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
