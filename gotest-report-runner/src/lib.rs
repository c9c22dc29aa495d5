// Copyright (c) The gotest-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for gotest-report.
//!
//! A run flows through three stages:
//!
//! 1. [`ingest`] reads `go test -json` events and aggregates them into one record per test.
//! 2. [`resolve`] finds the source position of every test function, either from a listing file
//!    or by querying each package concurrently.
//! 3. [`report`] merges the two and builds the discovery and execution documents.

pub mod errors;
pub mod ingest;
pub mod package;
pub mod report;
pub mod resolve;
pub mod source;
