//! Findings and the validation report.

use std::cmp::Ordering;
use std::fmt;

/// Severity of a single [`Finding`].
///
/// Ordered from most to least severe so that `Severity::Fatal < Severity::Usage`
/// holds under [`Ord`], matching the precedence spec.md §6 `reporting-level`
/// relies on ("minimum severity retained").
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The run cannot meaningfully continue past this point.
    Fatal,
    /// A conformance violation; makes the publication invalid.
    Error,
    /// A likely defect that does not affect the validity verdict.
    Warning,
    /// Informational note (e.g. a deprecated-but-legal construct).
    Info,
    /// Usage/configuration note about how the engine itself was invoked.
    Usage,
}

impl Severity {
    /// The uppercase wire form used in the findings-file format (spec.md §6).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Usage => "USAGE",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location within the archive: a container-relative path plus an
/// optional line/column, or the synthetic `<archive>` sentinel (spec.md §8
/// invariant 4) for findings that are not attributable to any single entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    path: Option<String>,
    line: Option<u32>,
    column: Option<u32>,
}

impl Location {
    /// The synthetic sentinel location for archive-wide findings.
    pub const ARCHIVE: &'static str = "<archive>";

    /// A location naming only a container-relative `path`.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            line: None,
            column: None,
        }
    }

    /// A location naming a `path` plus a 1-based `line`/`column`.
    pub fn at(path: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            path: Some(path.into()),
            line: Some(line),
            column: Some(column),
        }
    }

    /// The synthetic archive-wide location (no entry in the container is responsible).
    pub fn archive() -> Self {
        Self {
            path: None,
            line: None,
            column: None,
        }
    }

    /// The container-relative path, or [`None`] for the archive sentinel.
    pub fn container_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// 1-based line number, if known.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// 1-based column number, if known.
    pub fn column(&self) -> Option<u32> {
        self.column
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.as_deref().unwrap_or(Self::ARCHIVE);
        f.write_str(path)?;
        if let Some(line) = self.line {
            write!(f, "#{line}")?;
            if let Some(column) = self.column {
                write!(f, ":{column}")?;
            }
        }
        Ok(())
    }
}

/// A single validation message (spec.md §3 "Finding").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    severity: Severity,
    check_id: &'static str,
    message: String,
    location: Option<Location>,
    /// Monotonic emission order, used to keep sorts stable (spec.md §4.8).
    pub(crate) sequence: u64,
}

impl Finding {
    pub(crate) fn new(
        severity: Severity,
        check_id: &'static str,
        message: impl Into<String>,
        location: Option<Location>,
    ) -> Self {
        Self {
            severity,
            check_id,
            message: message.into(),
            location,
            sequence: 0,
        }
    }

    /// The finding's severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The stable check identifier that produced this finding (e.g. `"RSC-005"`).
    pub fn check_id(&self) -> &'static str {
        self.check_id
    }

    /// Human-readable message text (plain UTF-8, no embedded newlines).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The location this finding is attributed to, if any.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Overrides this finding's severity (spec.md §4.8 downgrade table).
    pub(crate) fn downgraded(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Sort key used by the Report Collector (spec.md §4.8): `(stage-rank via
/// path presence, container-path, line, column, emission counter)`.
fn sort_key(finding: &Finding) -> (bool, &str, u32, u32, u64) {
    let (path, line, column) = match &finding.location {
        Some(loc) => (
            loc.path.as_deref().unwrap_or(Location::ARCHIVE),
            loc.line.unwrap_or(0),
            loc.column.unwrap_or(0),
        ),
        None => (Location::ARCHIVE, 0, 0),
    };
    (finding.location.is_none(), path, line, column, finding.sequence)
}

/// The ordered set of findings produced by a run, plus derived counts
/// (spec.md §3 "Report").
#[derive(Clone, Debug, Default)]
pub struct Report {
    findings: Vec<Finding>,
    next_sequence: u64,
}

impl Report {
    pub(crate) fn new() -> Self {
        Self {
            findings: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Appends `finding`, stamping it with the next emission sequence number
    /// regardless of whatever it carried before (spec.md §4.8: ordering is
    /// by emission order, which only the collector can assign truthfully).
    pub(crate) fn push(&mut self, mut finding: Finding) {
        finding.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.findings.push(finding);
    }

    /// Deterministically reorders findings by `(container-path, line, column,
    /// emission counter)` per spec.md §4.8, with archive-sentinel findings
    /// sorted after every path-attributed finding.
    pub(crate) fn finalize(mut self) -> Self {
        self.findings
            .sort_by(|a, b| sort_key(a).partial_cmp(&sort_key(b)).unwrap_or(Ordering::Equal));
        self
    }

    /// All findings in deterministic report order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Consumes the report, returning its findings (engine downgrade pass).
    pub(crate) fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    /// Number of [`Severity::Fatal`] findings.
    pub fn fatal_count(&self) -> usize {
        self.count(Severity::Fatal)
    }

    /// Number of [`Severity::Error`] findings.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of [`Severity::Warning`] findings.
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// `true` iff there are no fatal or error findings (spec.md §8 invariant 1).
    pub fn is_valid(&self) -> bool {
        self.fatal_count() == 0 && self.error_count() == 0
    }

    /// Drops findings below `minimum` severity, keeping report order intact.
    ///
    /// Implements the `reporting-level` option (spec.md §6). This does not
    /// affect [`Self::is_valid`], which always reflects the full run.
    pub fn filtered(&self, minimum: Severity) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity <= minimum)
            .collect()
    }
}
