//! Pipeline orchestrator: runs every stage in order, threading findings into
//! one [`Report`], and honors cancellation at each stage boundary.

pub(crate) mod error;

use std::collections::HashSet;
use std::path::Path;

use log::debug;

use crate::archive::Container;
use crate::cancel::CancellationToken;
use crate::content;
use crate::cross::{self, CrossContext, NavContext, NcxContext};
use crate::nav;
use crate::options::ValidateOptions;
use crate::package;
use crate::container_xml;
use crate::report::{Finding, Location, Report, Severity};

use self::error::EngineError;

const CONTAINER_XML_PATH: &str = "META-INF/container.xml";

/// Runs the full validation pipeline against the file at `path`.
///
/// Returns `Err` only when `path` itself cannot be read from disk; every
/// other defect, however severe, ends up as a [`Finding`] in the returned
/// `Report`.
pub(crate) fn run(
    path: &Path,
    options: &ValidateOptions,
    cancel: &CancellationToken,
) -> Result<Report, EngineError> {
    let mut report = Report::new();

    debug!(
        "{}: profile={:?}, reporting_level={:?}, single_file_mode={}",
        path.display(),
        options.profile_value(),
        options.reporting_level_value(),
        options.is_single_file_mode(),
    );

    if options.wants_remote_fetch() {
        report.push(Finding::new(
            Severity::Usage,
            "USG-001",
            "remote-fetch was requested but is not supported in this run; ignored",
            Some(Location::archive()),
        ));
    }

    let bytes = std::fs::read(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut container = if options.is_single_file_mode() {
        Container::synthetic(&synthetic_entry_name(path), bytes)
    } else {
        match Container::open(bytes) {
            Ok(container) => container,
            Err(open_error) => {
                report.push(Finding::new(
                    Severity::Fatal,
                    "PKG-003",
                    format!("archive could not be opened: {}", open_error.0),
                    Some(Location::archive()),
                ));
                return Ok(report.finalize());
            }
        }
    };

    if !options.is_single_file_mode() {
        for finding in container.container_findings(options.max_entry_bytes_value()) {
            report.push(finding);
        }
    }
    debug!("{}: opened, {} entries", path.display(), container.entry_names().len());

    if cancel.is_cancelled() {
        return Ok(cancel_and_finalize(report));
    }

    let opf_path = match resolve_package_path(&mut container, options, &mut report) {
        Some(opf_path) => opf_path,
        None => return Ok(report.finalize()),
    };

    if cancel.is_cancelled() {
        return Ok(cancel_and_finalize(report));
    }

    if !options.is_single_file_mode() && !container.contains(&opf_path) {
        report.push(Finding::new(
            Severity::Fatal,
            "RSC-001",
            format!("primary rootfile '{opf_path}' is not present in the container"),
            Some(Location::path(opf_path)),
        ));
        return Ok(report.finalize());
    }

    let Some(opf_text) = container.read_text(&opf_path) else {
        report.push(Finding::new(
            Severity::Fatal,
            "PKG-003",
            format!("package document '{opf_path}' could not be read"),
            Some(Location::path(opf_path)),
        ));
        return Ok(report.finalize());
    };

    if opf_text.is_empty() {
        report.push(Finding::new(
            Severity::Fatal,
            "RSC-002",
            format!("primary rootfile '{opf_path}' is empty"),
            Some(Location::path(opf_path)),
        ));
        return Ok(report.finalize());
    }

    let (package_doc, findings) = package::parse(&opf_text, &opf_path);
    let package_has_fatal = findings.iter().any(|finding| finding.severity() == Severity::Fatal);
    for finding in findings {
        report.push(finding);
    }
    if package_has_fatal {
        return Ok(report.finalize());
    }
    debug!(
        "{opf_path}: {} manifest items, {} spine items",
        package_doc.manifest.len(),
        package_doc.spine.itemrefs.len()
    );

    if cancel.is_cancelled() {
        return Ok(cancel_and_finalize(report));
    }

    let entry_names: HashSet<String> = container.entry_names().into_iter().collect();
    let (resource_references, nav_path_model, ncx_path_uid, scan_cancelled) = scan_resources(
        &mut container,
        &package_doc,
        &opf_path,
        options.max_entry_bytes_value(),
        cancel,
        &mut report,
    );
    if scan_cancelled {
        return Ok(cancel_and_finalize(report));
    }

    let nav_ctx = nav_path_model.as_ref().map(|(path, model)| NavContext { path, model });
    let ncx_ctx = ncx_path_uid
        .as_ref()
        .map(|(path, dtb_uid)| NcxContext { path, dtb_uid: dtb_uid.as_deref() });

    let cross_ctx = CrossContext {
        opf_path: &opf_path,
        entry_names: &entry_names,
        package: &package_doc,
        nav: nav_ctx,
        ncx: ncx_ctx,
        resource_references: &resource_references,
    };
    for finding in cross::validate(&cross_ctx) {
        report.push(finding);
    }

    Ok(apply_downgrades(report, options).finalize())
}

/// Derives the package-document path: for single-file mode it is the lone
/// synthetic entry; otherwise it comes from `META-INF/container.xml`.
fn resolve_package_path(
    container: &mut Container,
    options: &ValidateOptions,
    report: &mut Report,
) -> Option<String> {
    if options.is_single_file_mode() {
        return container.entry_names().into_iter().next();
    }

    let Some(container_xml_text) = container.read_text(CONTAINER_XML_PATH) else {
        report.push(Finding::new(
            Severity::Fatal,
            "OPF-002",
            "META-INF/container.xml is missing",
            Some(Location::path(CONTAINER_XML_PATH)),
        ));
        return None;
    };

    let (manifest, findings) = container_xml::parse(&container_xml_text);
    for finding in findings {
        report.push(finding);
    }
    manifest.primary_rootfile().map(str::to_string)
}

/// Content Scanner: reads and dispatches every manifest resource, plus the
/// nav document and NCX, for the Cross-Document Validator to assemble into
/// one model.
#[allow(clippy::type_complexity)]
fn scan_resources(
    container: &mut Container,
    package_doc: &package::PackageDocument,
    opf_path: &str,
    max_entry_bytes: u64,
    cancel: &CancellationToken,
    report: &mut Report,
) -> (
    Vec<(String, Vec<content::Reference>)>,
    Option<(String, nav::NavModel)>,
    Option<(String, Option<String>)>,
    bool,
) {
    let mut resource_references = Vec::new();
    let mut nav_path_model = None;
    let mut ncx_path_uid = None;

    for (id, item) in &package_doc.manifest {
        if cancel.is_cancelled() {
            return (resource_references, nav_path_model, ncx_path_uid, true);
        }

        let resolved = item.resolved_href(opf_path);
        let Some(text) = container.read_text_capped(&resolved, max_entry_bytes) else {
            continue;
        };

        let outcome = content::scan(&item.media_type, &text, &resolved, package_doc.version);
        for finding in outcome.findings {
            report.push(finding);
        }
        if !outcome.references.is_empty() {
            resource_references.push((resolved.clone(), outcome.references));
        }

        if item.has_property("nav") {
            let (model, findings) = nav::parse_epub3_nav(&text, &resolved);
            for finding in findings {
                report.push(finding);
            }
            if let Some(model) = model {
                nav_path_model = Some((resolved.clone(), model));
            }
        }

        if package_doc.spine.toc.as_deref() == Some(id.as_str()) {
            let (dtb_uid, findings) = nav::parse_ncx_dtb_uid(&text, &resolved);
            for finding in findings {
                report.push(finding);
            }
            if let Some(dtb_uid) = dtb_uid {
                ncx_path_uid = Some((resolved.clone(), dtb_uid));
            }
        }
    }

    (resource_references, nav_path_model, ncx_path_uid, false)
}

fn synthetic_entry_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .unwrap_or_else(|| "content.opf".to_string())
}

/// Stops the run early, recording that cancellation cut it short (`RSC-099`).
fn cancel_and_finalize(mut report: Report) -> Report {
    report.push(Finding::new(
        Severity::Fatal,
        "RSC-099",
        "validation was cancelled before completion",
        Some(Location::archive()),
    ));
    report.finalize()
}

/// Report Collector downgrade pass: overrides each finding's severity per
/// `options`'s downgrade table. Data, not control flow — every stage above
/// emits its own default severity unaware of this table.
fn apply_downgrades(report: Report, options: &ValidateOptions) -> Report {
    let mut downgraded = Report::new();
    for finding in report.into_findings() {
        let severity = options.effective_severity(finding.check_id(), finding.severity());
        downgraded.push(finding.downgraded(severity));
    }
    downgraded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write as _};

    fn build_minimal_epub() -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut bytes));
            let stored = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.start_file("mimetype", stored).unwrap();
            writer.write_all(b"application/epub+zip").unwrap();

            let deflated = zip::write::SimpleFileOptions::default();
            writer.start_file("META-INF/container.xml", deflated).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/package.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
                )
                .unwrap();

            writer.start_file("OEBPS/package.opf", deflated).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="bookid">urn:uuid:1</dc:identifier>
    <dc:title>Example</dc:title>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">2020-01-01T00:00:00Z</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="c1"/>
  </spine>
</package>"#,
                )
                .unwrap();

            writer.start_file("OEBPS/nav.xhtml", deflated).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?>
<html xmlns:epub="http://www.idpf.org/2007/ops"><head><title>Nav</title></head>
<body><nav epub:type="toc"><ol><li><a href="c1.xhtml">Chapter 1</a></li></ol></nav></body>
</html>"#,
                )
                .unwrap();

            writer.start_file("OEBPS/c1.xhtml", deflated).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?>
<html><head><title>Chapter 1</title></head><body><p>Hello</p></body></html>"#,
                )
                .unwrap();

            writer.finish().unwrap();
        }
        bytes
    }

    fn write_temp(bytes: &[u8]) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("epublint-engine-test-{:p}.epub", bytes.as_ptr()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn minimal_epub_is_valid() {
        let path = write_temp(&build_minimal_epub());
        let report = run(&path, &ValidateOptions::default(), &CancellationToken::new()).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(
            report.is_valid(),
            "unexpected findings: {:?}",
            report.findings().iter().map(Finding::check_id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn missing_container_xml_is_opf_002() {
        let mut bytes = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut bytes));
            let stored = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.start_file("mimetype", stored).unwrap();
            writer.write_all(b"application/epub+zip").unwrap();
            writer.finish().unwrap();
        }
        let path = write_temp(&bytes);
        let report = run(&path, &ValidateOptions::default(), &CancellationToken::new()).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(!report.is_valid());
        assert!(report.findings().iter().any(|f| f.check_id() == "OPF-002"));
    }

    #[test]
    fn rootfile_path_absent_from_container_is_rsc_001() {
        let mut bytes = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut bytes));
            let stored = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.start_file("mimetype", stored).unwrap();
            writer.write_all(b"application/epub+zip").unwrap();

            let deflated = zip::write::SimpleFileOptions::default();
            writer.start_file("META-INF/container.xml", deflated).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/package.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
                )
                .unwrap();
            writer.finish().unwrap();
        }
        let path = write_temp(&bytes);
        let report = run(&path, &ValidateOptions::default(), &CancellationToken::new()).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(!report.is_valid());
        assert!(report.findings().iter().any(|f| f.check_id() == "RSC-001"));
    }

    #[test]
    fn empty_rootfile_is_rsc_002() {
        let mut bytes = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut bytes));
            let stored = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.start_file("mimetype", stored).unwrap();
            writer.write_all(b"application/epub+zip").unwrap();

            let deflated = zip::write::SimpleFileOptions::default();
            writer.start_file("META-INF/container.xml", deflated).unwrap();
            writer
                .write_all(
                    br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/package.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
                )
                .unwrap();
            writer.start_file("OEBPS/package.opf", deflated).unwrap();
            writer.write_all(b"").unwrap();
            writer.finish().unwrap();
        }
        let path = write_temp(&bytes);
        let report = run(&path, &ValidateOptions::default(), &CancellationToken::new()).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(!report.is_valid());
        assert!(report.findings().iter().any(|f| f.check_id() == "RSC-002"));
    }

    #[test]
    fn already_cancelled_token_stops_before_parsing() {
        let path = write_temp(&build_minimal_epub());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = run(&path, &ValidateOptions::default(), &cancel).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(report.findings().iter().any(|f| f.check_id() == "RSC-099"));
    }

    #[test]
    fn remote_fetch_requested_is_usg_001_and_stays_valid() {
        let path = write_temp(&build_minimal_epub());
        let options = ValidateOptions::default().remote_fetch(true);
        let report = run(&path, &options, &CancellationToken::new()).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(report.is_valid());
        assert!(report.findings().iter().any(|f| f.check_id() == "USG-001"));
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let mut missing = std::env::temp_dir();
        missing.push("epublint-engine-test-does-not-exist.epub");
        let result = run(&missing, &ValidateOptions::default(), &CancellationToken::new());
        assert!(matches!(result, Err(EngineError::Io { .. })));
    }
}
