#![warn(missing_docs)]
//! # epublint
//!
//! A native validation engine for EPUB publications (EPUB 2.0.1 and EPUB 3.x).
//!
//! Given the path to a packaged `.epub` file, [`validate`] opens the OCF
//! container, parses the package document and every referenced resource, and
//! returns a [`Report`]: a severity-stratified, deterministically ordered
//! list of [`Finding`]s plus an overall valid/invalid verdict.
//!
//! This crate is the validation *engine* only. Argument parsing, exit codes,
//! and report serialization (text/JSON) are expected to live in a thin
//! front-end that consumes [`Report`].
//!
//! # Example
//! ```no_run
//! use epublint::{ValidateOptions, validate};
//!
//! let report = validate("book.epub", &ValidateOptions::default()).unwrap();
//! if report.is_valid() {
//!     println!("valid: {} findings", report.findings().len());
//! } else {
//!     for finding in report.findings() {
//!         println!("[{}] {}: {}", finding.severity(), finding.check_id(), finding.message());
//!     }
//! }
//! ```

mod archive;
mod cancel;
mod catalog;
mod container_xml;
mod content;
mod cross;
mod engine;
mod graph;
mod nav;
mod options;
mod package;
mod report;
mod uri;
mod util;
mod xml;

pub use crate::cancel::CancellationToken;
pub use crate::catalog::{CheckEntry, Scope, catalog};
pub use crate::engine::error::EngineError;
pub use crate::options::{Profile, ReportingLevel, ValidateOptions};
pub use crate::report::{Finding, Location, Report, Severity};

use std::path::Path;

/// Validates a packaged EPUB at `path` and returns the resulting [`Report`].
///
/// Returns `Err` only when the archive itself cannot be opened or read as
/// bytes (see [`EngineError`]); every other defect, however severe, is
/// represented as a [`Finding`] inside a returned `Ok(Report)`.
pub fn validate(
    path: impl AsRef<Path>,
    options: &ValidateOptions,
) -> Result<Report, EngineError> {
    engine::run(path.as_ref(), options, &CancellationToken::new())
}

/// Validates a packaged EPUB, honoring `cancel` at stage boundaries.
///
/// See [`CancellationToken`] for cooperative-cancellation semantics.
pub fn validate_cancellable(
    path: impl AsRef<Path>,
    options: &ValidateOptions,
    cancel: &CancellationToken,
) -> Result<Report, EngineError> {
    engine::run(path.as_ref(), options, cancel)
}
