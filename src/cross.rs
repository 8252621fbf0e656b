//! Cross-Document Validator: checks that need the whole parsed model
//! rather than a single document.

use std::collections::{HashMap, HashSet};

use crate::content::{Reference, RefKind, is_core_media_type};
use crate::graph::{FallbackGraph, FallbackWalk};
use crate::nav::NavModel;
use crate::package::{EpubVersion, ManifestItem, PackageDocument};
use crate::report::{Finding, Location, Severity};
use crate::uri::{self, UriResolver};

/// The navigation document's parsed `toc` nav, alongside its own container path.
pub(crate) struct NavContext<'a> {
    pub(crate) path: &'a str,
    pub(crate) model: &'a NavModel,
}

/// The EPUB 2 NCX's `dtb:uid`, alongside its own container path.
pub(crate) struct NcxContext<'a> {
    pub(crate) path: &'a str,
    pub(crate) dtb_uid: Option<&'a str>,
}

/// Everything the cross-document checks need, gathered by the engine from
/// the earlier pipeline stages.
pub(crate) struct CrossContext<'a> {
    pub(crate) opf_path: &'a str,
    pub(crate) entry_names: &'a HashSet<String>,
    pub(crate) package: &'a PackageDocument,
    pub(crate) nav: Option<NavContext<'a>>,
    pub(crate) ncx: Option<NcxContext<'a>>,
    /// `(resource container path, references discovered scanning it)`.
    pub(crate) resource_references: &'a [(String, Vec<Reference>)],
}

/// `true` if `path` names a container entry, falling back to a
/// case-insensitive match (SPEC_FULL.md §B).
fn entry_exists(entry_names: &HashSet<String>, path: &str) -> bool {
    entry_names.contains(path) || entry_names.iter().any(|name| name.eq_ignore_ascii_case(path))
}

pub(crate) fn validate(ctx: &CrossContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();

    let resolved_hrefs = manifest_container_symmetry(ctx, &mut findings);
    spine_reachability(ctx, &mut findings);
    fallback_chains(ctx, &mut findings);
    remote_resources(ctx, &resolved_hrefs, &mut findings);
    navigation(ctx, &resolved_hrefs, &mut findings);
    guide_references(ctx, &mut findings);

    findings
}

/// `<guide>` reference hrefs (EPUB 2, or deprecated-but-legal EPUB 3) must
/// resolve to a container entry, same as a manifest href (`RSC-001`).
fn guide_references(ctx: &CrossContext<'_>, findings: &mut Vec<Finding>) {
    for (reference_type, _title, href) in &ctx.package.guide_references {
        if !entry_exists(ctx.entry_names, href) {
            findings.push(Finding::new(
                Severity::Error,
                "RSC-001",
                format!("guide reference '{reference_type}' points to '{href}', which is not in the container"),
                Some(Location::path(ctx.opf_path)),
            ));
        }
    }
}

/// Every manifest href must map to a container entry (`RSC-001`); every
/// container entry outside `META-INF`/`mimetype` must be reachable from the
/// manifest or be the package document itself (`RSC-008`).
fn manifest_container_symmetry(
    ctx: &CrossContext<'_>,
    findings: &mut Vec<Finding>,
) -> HashMap<String, String> {
    let mut resolved_hrefs = HashMap::new();
    let mut referenced = HashSet::new();
    referenced.insert(ctx.opf_path.to_string());

    for (id, item) in &ctx.package.manifest {
        let resolved_href = item.resolved_href(ctx.opf_path);
        if entry_exists(ctx.entry_names, &resolved_href) {
            referenced.insert(resolved_href.clone());
        } else {
            findings.push(Finding::new(
                Severity::Error,
                "RSC-001",
                format!("manifest item '{id}' references '{resolved_href}', which is not in the container"),
                Some(Location::path(ctx.opf_path)),
            ));
        }
        resolved_hrefs.insert(id.clone(), resolved_href);
    }

    for name in ctx.entry_names {
        if name.starts_with("META-INF/") || name == "mimetype" || referenced.contains(name) {
            continue;
        }
        findings.push(Finding::new(
            Severity::Error,
            "RSC-008",
            format!("'{name}' is not referenced from the manifest"),
            Some(Location::path(name.as_str())),
        ));
    }

    resolved_hrefs
}

/// Every spine `idref` must resolve to a manifest item (`OPF-049`); the same
/// item referenced more than once is a warning (`OPF-033`).
fn spine_reachability(ctx: &CrossContext<'_>, findings: &mut Vec<Finding>) {
    let mut seen = HashSet::new();
    for itemref in &ctx.package.spine.itemrefs {
        if !ctx.package.manifest.contains_key(&itemref.idref) {
            findings.push(Finding::new(
                Severity::Error,
                "OPF-049",
                format!("spine itemref '{}' does not resolve to a manifest item", itemref.idref),
                Some(Location::path(ctx.opf_path)),
            ));
            continue;
        }
        if !seen.insert(itemref.idref.clone()) {
            findings.push(Finding::new(
                Severity::Warning,
                "OPF-033",
                format!("spine references manifest item '{}' more than once", itemref.idref),
                Some(Location::path(ctx.opf_path)),
            ));
        }
    }
}

/// Walks every non-core-media-type item's `fallback` chain (SPEC_FULL.md §B:
/// over the whole manifest, not just spine-reachable items), reporting a
/// cycle once (`OPF-045`) or a chain with no core-media-type terminal
/// (`OPF-043`).
fn fallback_chains(ctx: &CrossContext<'_>, findings: &mut Vec<Finding>) {
    let mut graph = FallbackGraph::new();
    for (id, item) in &ctx.package.manifest {
        if let Some(fallback) = &item.fallback {
            graph.add_edge(id.clone(), fallback.clone());
        }
    }

    let is_core = |id: &str| {
        ctx.package
            .manifest
            .get(id)
            .is_some_and(|item| is_core_media_type(&item.media_type))
    };

    let mut reported_cycles: HashSet<Vec<String>> = HashSet::new();
    for (id, item) in &ctx.package.manifest {
        if is_core_media_type(&item.media_type) {
            continue;
        }
        match graph.walk(id, is_core) {
            FallbackWalk::Terminal(_) => {}
            FallbackWalk::Cycle(cycle) => {
                if reported_cycles.insert(cycle.clone()) {
                    findings.push(Finding::new(
                        Severity::Error,
                        "OPF-045",
                        format!("fallback chain contains a cycle: {}", cycle.join(" -> ")),
                        Some(Location::path(ctx.opf_path)),
                    ));
                }
            }
            FallbackWalk::Dangling(_) => {
                findings.push(Finding::new(
                    Severity::Warning,
                    "OPF-043",
                    format!("manifest item '{id}' has no usable fallback to a core media type"),
                    Some(Location::path(ctx.opf_path)),
                ));
            }
        }
    }
}

/// Classifies every reference discovered by the Content Scanner: remote
/// `file:`/`http:` URLs (`RSC-030`/`RSC-031`), remote `https:` resources
/// missing the `remote-resources` manifest property (`OPF-014`/`CSS-009`),
/// and local references that fail to resolve (`RSC-001`/`CSS-005`/
/// `CSS-007`/`CSS-008`).
fn remote_resources(
    ctx: &CrossContext<'_>,
    resolved_hrefs: &HashMap<String, String>,
    findings: &mut Vec<Finding>,
) {
    let by_path: HashMap<&str, &ManifestItem> = ctx
        .package
        .manifest
        .iter()
        .filter_map(|(id, item)| resolved_hrefs.get(id).map(|path| (path.as_str(), item)))
        .collect();

    for (resource_path, references) in ctx.resource_references {
        let resolver = UriResolver::parent_of(resource_path);
        for reference in references {
            let raw = &reference.raw_href;

            if uri::has_scheme(raw) {
                check_remote_reference(resource_path, raw, reference.kind, &by_path, findings);
                continue;
            }

            let resolved = resolver.resolve(uri::path(raw));
            if entry_exists(ctx.entry_names, &resolved) {
                continue;
            }
            let check_id: &'static str = match reference.kind {
                RefKind::Import => "CSS-005",
                RefKind::FontFaceSrc => "CSS-007",
                RefKind::BackgroundImage => "CSS-008",
                RefKind::Generic | RefKind::Anchor | RefKind::Stylesheet => "RSC-001",
            };
            findings.push(Finding::new(
                Severity::Error,
                check_id,
                format!("reference '{raw}' does not resolve to an entry in the container"),
                Some(Location::path(resource_path.clone())),
            ));
        }
    }
}

fn check_remote_reference(
    resource_path: &str,
    raw: &str,
    kind: RefKind,
    by_path: &HashMap<&str, &ManifestItem>,
    findings: &mut Vec<Finding>,
) {
    match uri::scheme(raw) {
        Some("file") => findings.push(Finding::new(
            Severity::Error,
            "RSC-030",
            format!("'{raw}' uses a file: URL"),
            Some(Location::path(resource_path)),
        )),
        Some("http") => findings.push(Finding::new(
            Severity::Warning,
            "RSC-031",
            format!("'{raw}' uses an http: URL instead of https:"),
            Some(Location::path(resource_path)),
        )),
        Some("https") => {
            let has_remote_property = by_path
                .get(resource_path)
                .is_some_and(|item| item.has_property("remote-resources"));
            if !has_remote_property {
                let check_id: &'static str = if kind == RefKind::FontFaceSrc {
                    "CSS-009"
                } else {
                    "OPF-014"
                };
                findings.push(Finding::new(
                    Severity::Error,
                    check_id,
                    format!("'{raw}' is a remote resource; the referencing item needs the remote-resources property"),
                    Some(Location::path(resource_path)),
                ));
            }
        }
        _ => {}
    }
}

/// EPUB 3 navigation (`NAV-001`/`NAV-002`/`NAV-003`/`NAV-004`) and EPUB 2
/// NCX `dtb:uid` cross-checking (`NCX-001`).
fn navigation(ctx: &CrossContext<'_>, resolved_hrefs: &HashMap<String, String>, findings: &mut Vec<Finding>) {
    if ctx.package.version == EpubVersion::Epub3 {
        match &ctx.nav {
            None => findings.push(Finding::new(
                Severity::Error,
                "NAV-001",
                "EPUB 3 package has no navigation document",
                Some(Location::path(ctx.opf_path)),
            )),
            Some(nav) => navigation_epub3(ctx, nav, resolved_hrefs, findings),
        }
    }

    if let Some(ncx) = &ctx.ncx {
        let package_uid = ctx
            .package
            .unique_identifier_id
            .as_deref()
            .and_then(|id| {
                ctx.package
                    .metadata
                    .identifiers
                    .iter()
                    .find(|(ident_id, _)| ident_id.as_deref() == Some(id))
            })
            .map(|(_, value)| value.as_str());

        if ncx.dtb_uid != package_uid {
            findings.push(Finding::new(
                Severity::Error,
                "NCX-001",
                "NCX dtb:uid does not match the package unique-identifier",
                Some(Location::path(ncx.path)),
            ));
        }
    }
}

fn navigation_epub3(
    ctx: &CrossContext<'_>,
    nav: &NavContext<'_>,
    resolved_hrefs: &HashMap<String, String>,
    findings: &mut Vec<Finding>,
) {
    if !nav.model.toc_found {
        findings.push(Finding::new(
            Severity::Error,
            "NAV-002",
            "navigation document has no toc nav",
            Some(Location::path(nav.path)),
        ));
        return;
    }

    let spine_ids: HashSet<&str> = ctx
        .package
        .spine
        .itemrefs
        .iter()
        .map(|itemref| itemref.idref.as_str())
        .collect();
    let path_to_id: HashMap<&str, &str> = resolved_hrefs
        .iter()
        .map(|(id, path)| (path.as_str(), id.as_str()))
        .collect();

    for link in &nav.model.links {
        match path_to_id.get(link.href.as_str()) {
            None => findings.push(Finding::new(
                Severity::Error,
                "NAV-003",
                format!("toc link '{}' does not resolve to a manifest item", link.raw_href),
                Some(Location::path(nav.path)),
            )),
            Some(id) if !spine_ids.contains(id) => findings.push(Finding::new(
                Severity::Warning,
                "NAV-004",
                format!("toc link target '{}' is not part of the spine", link.raw_href),
                Some(Location::path(nav.path)),
            )),
            Some(_) => {}
        }
    }
}
