// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use swrite::{SWrite, swrite};

/// The name printed alongside the version and in run summaries.
pub(crate) const TOOL_NAME: &str = "test-runner";

pub(crate) struct VersionInfo {
    /// The crate version.
    version: &'static str,
}

impl VersionInfo {
    pub(crate) const fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Returns the line printed by the `version` subcommand.
    pub(crate) fn to_version_line(&self) -> String {
        let mut s = String::new();
        swrite!(s, "{TOOL_NAME}: v{}", self.version);
        s
    }
}
