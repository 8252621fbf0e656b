//! The static check catalog (spec.md §4.9 "Check Catalog").
//!
//! Every check id any stage can emit is registered here exactly once, with
//! its default severity and the stage scope it belongs to. The catalog is
//! descriptive, not load-bearing for control flow: stages still decide for
//! themselves when to emit a finding, but they look up severity/scope here
//! so that a single table is the source of truth a `ValidateOptions`
//! downgrade can override.

use crate::report::Severity;

/// Which pipeline stage a check belongs to (spec.md §4 stage list).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Container Reader / Container Manifest Parser (§4.1-4.2).
    Container,
    /// Package Parser (§4.3).
    Package,
    /// Resource Resolver (§4.4).
    Resource,
    /// Navigation Parser (§4.5).
    Navigation,
    /// Content Scanner (§4.6).
    Content,
    /// Cross-Document Validator (§4.7).
    Cross,
}

/// One row of the check catalog.
#[derive(Copy, Clone, Debug)]
pub struct CheckEntry {
    /// Stable check identifier, e.g. `"RSC-005"`.
    pub id: &'static str,
    /// Default severity before any `ValidateOptions` downgrade is applied.
    pub default_severity: Severity,
    /// Stage that can emit this check.
    pub scope: Scope,
    /// Short human-readable description of what the check detects.
    pub description: &'static str,
}

macro_rules! entry {
    ($id:literal, $severity:expr, $scope:expr, $description:literal) => {
        CheckEntry {
            id: $id,
            default_severity: $severity,
            scope: $scope,
            description: $description,
        }
    };
}

/// The full check catalog, in check-id order within each scope.
pub fn catalog() -> &'static [CheckEntry] {
    use Scope::*;
    use Severity::*;
    &[
        entry!("PKG-003", Fatal, Container, "archive could not be opened, or has no <package> root element"),
        entry!("PKG-006", Error, Container, "mimetype is not the first entry at offset 0"),
        entry!("PKG-007", Error, Container, "mimetype entry is compressed, not stored"),
        entry!("PKG-008", Error, Container, "mimetype entry carries an extra field or a data descriptor"),
        entry!("PKG-009", Error, Container, "mimetype content is not exactly application/epub+zip"),
        entry!("PKG-014", Error, Container, "encrypted entry present without META-INF/encryption.xml"),
        entry!("PKG-025", Error, Container, "entry exceeds the configured decompressed-size cap"),
        entry!("OPF-002", Fatal, Container, "META-INF/container.xml is missing"),
        entry!("OPF-003", Fatal, Container, "container.xml has no usable rootfile"),
        entry!("RSC-001", Error, Resource, "referenced path does not exist in the container"),
        entry!("RSC-002", Error, Container, "rootfile path is malformed, or the file it names is empty"),
        entry!("RSC-004", Error, Container, "entry name is unsafe (absolute path, traversal, or control character)"),
        entry!("RSC-005", Error, Cross, "dangling reference to an id or path that does not resolve"),
        entry!("RSC-008", Error, Cross, "manifest entry is not reachable from any container rootfile"),
        entry!("RSC-016", Error, Content, "content document is not well-formed XML"),
        entry!("RSC-030", Error, Resource, "reference uses a file: URL"),
        entry!("RSC-031", Warning, Resource, "reference uses an http: URL instead of https:"),
        entry!("RSC-099", Fatal, Container, "run was cancelled before completion"),
        entry!("USG-001", Usage, Container, "remote-fetch was requested but is not supported; ignored"),
        entry!("OPF-014", Error, Cross, "remote resource referenced without the remote-resources manifest property"),
        entry!("OPF-030", Error, Package, "unique-identifier does not reference an existing dc:identifier"),
        entry!("OPF-033", Warning, Cross, "spine references the same manifest item more than once"),
        entry!("OPF-040", Error, Package, "more than one manifest item carries properties=nav"),
        entry!("OPF-043", Warning, Cross, "non-core-media-type resource has no usable fallback"),
        entry!("OPF-045", Error, Cross, "fallback chain contains a cycle"),
        entry!("OPF-049", Error, Cross, "spine itemref does not resolve to a manifest item"),
        entry!("OPF-053", Error, Package, "dcterms:modified is missing, duplicated, or not valid ISO 8601"),
        entry!("OPF-059", Error, Package, "package metadata is missing a required dc:title"),
        entry!("OPF-060", Error, Package, "duplicate id attribute within the package document"),
        entry!("OPF-092", Error, Package, "package metadata is missing a required dc:language"),
        entry!("OPF-061", Info, Package, "<guide> is deprecated in EPUB 3"),
        entry!("NAV-001", Error, Navigation, "EPUB 3 package has no navigation document"),
        entry!("NAV-002", Error, Navigation, "navigation document has no toc nav"),
        entry!("NAV-003", Error, Cross, "toc nav link is missing, empty, or does not resolve"),
        entry!("NAV-004", Warning, Cross, "toc nav link target is not part of the spine"),
        entry!("NCX-001", Error, Navigation, "NCX dtb:uid does not match the package unique-identifier"),
        entry!("NCX-002", Error, Package, "EPUB 2 spine has no toc attribute referencing the NCX document"),
        entry!("HTM-001", Warning, Content, "content document uses an obsolete element (center, font, marquee)"),
        entry!("HTM-002", Error, Content, "content document head has no non-empty title (severity depends on package version)"),
        entry!("HTM-003", Warning, Content, "anchor has an empty href"),
        entry!("HTM-004", Error, Content, "same-document fragment link does not resolve to an id in this file"),
        entry!("SVG-001", Warning, Content, "svg document has no title"),
        entry!("CSS-001", Error, Content, "stylesheet has unbalanced braces"),
        entry!("CSS-002", Warning, Content, "stylesheet sets direction or unicode-bidi directly"),
        entry!("CSS-003", Error, Content, "@charset is present but not utf-8 or utf-16"),
        entry!("CSS-004", Info, Content, "@import is discouraged in EPUB stylesheets"),
        entry!("CSS-005", Error, Cross, "@import target does not resolve"),
        entry!("CSS-006", Warning, Content, "@font-face has no src descriptor"),
        entry!("CSS-007", Error, Cross, "@font-face src target does not resolve"),
        entry!("CSS-008", Error, Cross, "background-image target does not resolve"),
        entry!("CSS-009", Error, Cross, "remote font referenced without the remote-resources manifest property"),
    ]
}

/// Looks up a check's catalog entry by id.
pub fn lookup(check_id: &str) -> Option<&'static CheckEntry> {
    catalog().iter().find(|entry| entry.id == check_id)
}
