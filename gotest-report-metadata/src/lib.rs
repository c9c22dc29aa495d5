// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Documents produced by gotest-report.
//!
//! A run produces two cross-referenced JSON documents:
//!
//! * a [`DiscoveryDocument`], cataloguing the tests and test files that were seen, and
//! * an [`ExecutionDocument`], recording the outcome of each test and each file/package group.
//!
//! Entries in the two documents are linked through [`ReportId`]s, which are derived from
//! content rather than generated randomly.

mod documents;
mod exit_codes;
mod id;

pub use documents::*;
pub use exit_codes::*;
pub use id::*;
