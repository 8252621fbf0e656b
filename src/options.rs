//! Validation options (spec.md §6 "Configuration").

use std::collections::HashMap;

use crate::report::Severity;

/// Validation profile, selecting which accessibility/retailer-specific
/// checks run in addition to the baseline EPUB 2.0.1/3.x rule set
/// (spec.md §6 `profile`).
///
/// Every variant is accepted and threaded through to the engine and its
/// diagnostic log line, but none currently gates any extra check: the
/// baseline rule set runs the same way regardless of which profile is set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Baseline conformance only.
    #[default]
    Default,
    /// Adds the accessibility-focused checks used by library/distributor intake.
    Dict,
    /// Adds the IDPF EDUPUB structural-semantics checks.
    Edupub,
    /// Adds the indexing-specific checks (`epub:type="index"` structures).
    Idx,
    /// Adds the stricter subset retailers run ahead of a storefront preview.
    Preview,
}

/// Minimum severity a run should retain when a caller asks for a filtered
/// view of the report (spec.md §6 `reporting-level`).
///
/// This does not change which checks execute; it only changes what
/// [`crate::Report::filtered`] returns. The full [`crate::Report`] returned
/// by [`crate::validate`] always carries every finding regardless of this
/// setting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReportingLevel {
    /// Keep fatal findings only.
    Fatal,
    /// Keep fatal and error findings.
    Error,
    /// Keep fatal, error, and warning findings.
    Warning,
    /// Keep fatal, error, warning, and info findings.
    Info,
    /// Keep every finding, including usage notes.
    Usage,
}

impl Default for ReportingLevel {
    fn default() -> Self {
        Self::Usage
    }
}

impl ReportingLevel {
    pub(crate) fn as_severity(self) -> Severity {
        match self {
            Self::Fatal => Severity::Fatal,
            Self::Error => Severity::Error,
            Self::Warning => Severity::Warning,
            Self::Info => Severity::Info,
            Self::Usage => Severity::Usage,
        }
    }
}

/// Default per-entry decompressed-size cap: 256 MiB (spec.md §5).
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Options controlling a single [`crate::validate`] run.
///
/// Construct with [`ValidateOptions::default`] and adjust with the builder
/// methods, mirroring how the teacher's open-options type is assembled.
#[derive(Clone, Debug)]
pub struct ValidateOptions {
    profile: Profile,
    single_file_mode: bool,
    reporting_level: ReportingLevel,
    remote_fetch: bool,
    downgrade_table: HashMap<&'static str, Severity>,
    max_entry_bytes: u64,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            single_file_mode: false,
            reporting_level: ReportingLevel::default(),
            remote_fetch: false,
            downgrade_table: HashMap::new(),
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        }
    }
}

impl ValidateOptions {
    /// Sets the validation [`Profile`].
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Enables single-file mode: `path` may point directly at a standalone
    /// `.opf` or `.xhtml` file rather than a packaged `.epub` archive.
    pub fn single_file_mode(mut self, enabled: bool) -> Self {
        self.single_file_mode = enabled;
        self
    }

    /// Sets the minimum severity [`crate::Report::filtered`] retains.
    pub fn reporting_level(mut self, level: ReportingLevel) -> Self {
        self.reporting_level = level;
        self
    }

    /// Requests that remote resources be fetched during validation.
    ///
    /// Reserved: must remain `false`. Setting this to `true` produces a
    /// single usage-level finding and is otherwise ignored (spec.md §6).
    pub fn remote_fetch(mut self, enabled: bool) -> Self {
        self.remote_fetch = enabled;
        self
    }

    /// Overrides the default severity of `check_id` to `severity` for this run.
    pub fn downgrade(mut self, check_id: &'static str, severity: Severity) -> Self {
        self.downgrade_table.insert(check_id, severity);
        self
    }

    /// Sets the per-entry decompressed-size cap, in bytes.
    pub fn max_entry_bytes(mut self, max: u64) -> Self {
        self.max_entry_bytes = max;
        self
    }

    pub(crate) fn profile_value(&self) -> Profile {
        self.profile
    }

    pub(crate) fn is_single_file_mode(&self) -> bool {
        self.single_file_mode
    }

    pub(crate) fn reporting_level_value(&self) -> ReportingLevel {
        self.reporting_level
    }

    pub(crate) fn wants_remote_fetch(&self) -> bool {
        self.remote_fetch
    }

    pub(crate) fn max_entry_bytes_value(&self) -> u64 {
        self.max_entry_bytes
    }

    /// Resolves the effective severity for `check_id`: the configured
    /// downgrade if present, otherwise `default`.
    pub(crate) fn effective_severity(&self, check_id: &str, default: Severity) -> Severity {
        self.downgrade_table
            .get(check_id)
            .copied()
            .unwrap_or(default)
    }
}
