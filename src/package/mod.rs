//! Package Parser (spec.md §4.3): the OPF `<package>` document.

mod guide;
mod manifest;
mod metadata;
mod spine;

pub(crate) use guide::GuideReference;
pub(crate) use manifest::ManifestItem;
pub(crate) use metadata::Metadata;
pub(crate) use spine::{Spine, SpineItemRef};

use indexmap::IndexMap;

use crate::report::{Finding, Location, Severity};
use crate::xml::{XmlEvent, XmlReader};

/// Which major EPUB version a package document declares.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum EpubVersion {
    Epub2,
    Epub3,
    Unknown,
}

impl EpubVersion {
    fn from_attr(raw: &str) -> Self {
        match raw.split('.').next() {
            Some("2") => Self::Epub2,
            Some("3") => Self::Epub3,
            _ => Self::Unknown,
        }
    }
}

/// The parsed package document plus every finding raised while parsing it.
pub(crate) struct PackageDocument {
    pub(crate) version: EpubVersion,
    pub(crate) unique_identifier_id: Option<String>,
    pub(crate) metadata: Metadata,
    pub(crate) manifest: IndexMap<String, ManifestItem>,
    pub(crate) spine: Spine,
    pub(crate) guide_references: Vec<GuideReference>,
}

/// Streams `xml` (the package document's bytes) once, dispatching each
/// top-level child to its own sub-parser, mirroring the teacher's
/// single-pass `package`/`metadata`/`manifest`/`spine`/`guide` split.
pub(crate) fn parse(xml: &str, path: &str) -> (PackageDocument, Vec<Finding>) {
    let mut findings = Vec::new();
    let mut reader = XmlReader::from_bytes(xml.as_bytes());

    let mut version = EpubVersion::Unknown;
    let mut unique_identifier_id = None;
    let mut metadata = Metadata::default();
    let mut manifest = IndexMap::new();
    let mut spine = Spine::default();
    let mut guide_references = Vec::new();
    let mut saw_package = false;

    while let Some(event) = reader.next() {
        let Ok(event) = event else { continue };
        let XmlEvent::Start(element) = event else {
            continue;
        };
        match element.local_name().as_ref() {
            "package" => {
                saw_package = true;
                if let Some(raw) = element.attribute("version") {
                    version = EpubVersion::from_attr(&raw);
                }
                unique_identifier_id = element.attribute("unique-identifier");
            }
            "metadata" => {
                metadata = metadata::parse(&mut reader, &element, version, path, &mut findings);
            }
            "manifest" => {
                manifest = manifest::parse(&mut reader, &element, &mut findings, path);
            }
            "spine" => {
                spine = spine::parse(&mut reader, &element, version, path, &mut findings);
            }
            "guide" => {
                guide_references = guide::parse(&mut reader, &mut findings, version, path);
            }
            _ => {}
        }
    }

    if !saw_package {
        findings.push(Finding::new(
            Severity::Fatal,
            "PKG-003",
            "package document has no <package> root element",
            Some(Location::path(path)),
        ));
    }

    check_unique_identifier(&unique_identifier_id, &metadata, path, &mut findings);
    check_duplicate_ids(&manifest, &metadata, path, &mut findings);
    check_single_nav_item(&manifest, version, path, &mut findings);
    check_epub2_toc(&manifest, &spine, version, path, &mut findings);

    (
        PackageDocument {
            version,
            unique_identifier_id,
            metadata,
            manifest,
            spine,
            guide_references,
        },
        findings,
    )
}

fn check_unique_identifier(
    unique_identifier_id: &Option<String>,
    metadata: &Metadata,
    path: &str,
    findings: &mut Vec<Finding>,
) {
    let Some(id) = unique_identifier_id else {
        findings.push(Finding::new(
            Severity::Error,
            "OPF-030",
            "package has no unique-identifier attribute",
            Some(Location::path(path)),
        ));
        return;
    };
    if !metadata.identifiers.iter().any(|(ident_id, _)| ident_id.as_deref() == Some(id.as_str())) {
        findings.push(Finding::new(
            Severity::Error,
            "OPF-030",
            format!("unique-identifier '{id}' does not reference any dc:identifier"),
            Some(Location::path(path)),
        ));
    }
}

/// EPUB 3 requires exactly one manifest item with `properties="nav"`
/// (spec.md §3 package-level invariants). Zero is reported downstream as
/// `NAV-001` once the Content Scanner confirms no nav document was parsed;
/// this check only catches the "more than one" case, which the scanner
/// cannot detect on its own (it would just keep the last one seen).
fn check_single_nav_item(
    manifest: &IndexMap<String, ManifestItem>,
    version: EpubVersion,
    path: &str,
    findings: &mut Vec<Finding>,
) {
    if version != EpubVersion::Epub3 {
        return;
    }
    let nav_count = manifest.values().filter(|item| item.has_property("nav")).count();
    if nav_count > 1 {
        findings.push(Finding::new(
            Severity::Error,
            "OPF-040",
            format!("{nav_count} manifest items carry properties=\"nav\"; EPUB 3 allows exactly one"),
            Some(Location::path(path)),
        ));
    }
}

/// EPUB 2 requires `spine/@toc` to name the manifest item for the NCX
/// document (spec.md §4.3 table). EPUB 3 treats the attribute as optional
/// and deprecated, so it is not checked there.
fn check_epub2_toc(
    manifest: &IndexMap<String, ManifestItem>,
    spine: &Spine,
    version: EpubVersion,
    path: &str,
    findings: &mut Vec<Finding>,
) {
    if version != EpubVersion::Epub2 {
        return;
    }
    match &spine.toc {
        None => findings.push(Finding::new(
            Severity::Error,
            "NCX-002",
            "EPUB 2 spine has no toc attribute referencing the NCX document",
            Some(Location::path(path)),
        )),
        Some(idref) => {
            let resolves_to_ncx = manifest
                .get(idref)
                .is_some_and(|item| item.media_type.eq_ignore_ascii_case("application/x-dtbncx+xml"));
            if !resolves_to_ncx {
                findings.push(Finding::new(
                    Severity::Error,
                    "NCX-002",
                    format!("spine toc '{idref}' does not resolve to an NCX manifest item"),
                    Some(Location::path(path)),
                ));
            }
        }
    }
}

fn check_duplicate_ids(
    manifest: &IndexMap<String, ManifestItem>,
    metadata: &Metadata,
    path: &str,
    findings: &mut Vec<Finding>,
) {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    let mut duplicate = HashSet::new();

    for id in manifest.keys().chain(metadata.all_ids()) {
        if !seen.insert(id.clone()) {
            duplicate.insert(id.clone());
        }
    }
    for id in duplicate {
        findings.push(Finding::new(
            Severity::Error,
            "OPF-060",
            format!("id '{id}' is used more than once in the package document"),
            Some(Location::path(path)),
        ));
    }
}
