// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generates test discovery and execution reports from `go test -json` output.
//!
//! Pipe the output of `go test -json ./...` into `gotest-report`. It writes two documents: a
//! discovery report cataloguing each test and test file, and an execution report with the
//! outcome and duration of each. Entries in the two reports are linked by identifiers derived
//! from test and file names.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod version;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
