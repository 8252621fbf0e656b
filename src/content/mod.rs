//! Content Scanner (spec.md §4.6): dispatches every manifest resource to a
//! per-media-type checker and collects the references each one discovers
//! for the Cross-Document Validator (§4.7) to resolve.

mod css;
mod svg;
mod xhtml;

use std::collections::HashSet;

use crate::package::EpubVersion;
use crate::report::Finding;

/// What kind of reference a discovered href is, so the Cross-Document
/// Validator can apply the right check id when it fails to resolve.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RefKind {
    /// `img@src`, `script@src`, `source@src`, `object@data`, svg `<image>`/`<use>`.
    Generic,
    /// `a@href` (not a same-document fragment).
    Anchor,
    /// `link[rel=stylesheet]@href`.
    Stylesheet,
    /// CSS `@import` target.
    Import,
    /// CSS `@font-face` `src` target.
    FontFaceSrc,
    /// CSS `background`/`background-image` target.
    BackgroundImage,
}

/// A reference discovered while scanning one resource, not yet resolved to
/// a container path.
#[derive(Clone, Debug)]
pub(crate) struct Reference {
    pub(crate) raw_href: String,
    pub(crate) kind: RefKind,
}

/// Media types a conforming reading system must support natively
/// (spec.md GLOSSARY "Core media type").
const CORE_MEDIA_TYPES: &[&str] = &[
    "application/xhtml+xml",
    "text/css",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/svg+xml",
    "image/webp",
    "font/otf",
    "font/ttf",
    "font/woff",
    "font/woff2",
    "application/font-sfnt",
    "application/vnd.ms-opentype",
    "application/x-font-truetype",
    "application/x-font-opentype",
    "application/font-woff",
    "audio/mpeg",
    "application/smil+xml",
    "application/x-dtbncx+xml",
    "application/javascript",
    "text/javascript",
];

/// `true` if `media_type` is one a reading system must support natively.
pub(crate) fn is_core_media_type(media_type: &str) -> bool {
    CORE_MEDIA_TYPES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(media_type))
}

/// Which per-media-type checker (if any) applies to `media_type`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum MediaClass {
    Xhtml,
    Svg,
    Css,
    Other,
}

fn classify(media_type: &str) -> MediaClass {
    match media_type {
        "application/xhtml+xml" => MediaClass::Xhtml,
        "image/svg+xml" => MediaClass::Svg,
        "text/css" => MediaClass::Css,
        _ => MediaClass::Other,
    }
}

/// Outcome of scanning one manifest resource.
pub(crate) struct ScanOutcome {
    pub(crate) findings: Vec<Finding>,
    pub(crate) references: Vec<Reference>,
    /// `id` attributes declared in this document, for RSC-005 duplicate
    /// detection scoped to a single file (spec.md §4.7).
    pub(crate) ids: HashSet<String>,
}

impl ScanOutcome {
    fn empty() -> Self {
        Self {
            findings: Vec::new(),
            references: Vec::new(),
            ids: HashSet::new(),
        }
    }
}

/// Scans `text` (the decoded content of the resource at `path`, declared
/// with `media_type`) and returns its findings plus discovered references.
///
/// Media types with no dedicated checker (images, fonts, audio, etc.) are
/// recorded for cross-reference purposes only; see [`is_core_media_type`]
/// and the Cross-Document Validator's fallback-chain walk.
pub(crate) fn scan(media_type: &str, text: &str, path: &str, version: EpubVersion) -> ScanOutcome {
    match classify(media_type) {
        MediaClass::Xhtml => {
            let result = xhtml::scan(text, path, version);
            ScanOutcome {
                findings: result.findings,
                references: result.references,
                ids: result.ids,
            }
        }
        MediaClass::Svg => {
            let result = svg::scan(text, path);
            ScanOutcome {
                findings: result.findings,
                references: result.references,
                ids: result.ids,
            }
        }
        MediaClass::Css => {
            let result = css::scan(text, path);
            ScanOutcome {
                findings: result.findings,
                references: result.references,
                ids: HashSet::new(),
            }
        }
        MediaClass::Other => ScanOutcome::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_core_media_types() {
        assert!(is_core_media_type("image/png"));
        assert!(is_core_media_type("application/xhtml+xml"));
        assert!(!is_core_media_type("application/x-font-ttf-legacy"));
    }
}
