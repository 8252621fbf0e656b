//! End-to-end scenarios against the public `validate` entry point.

use std::io::{Cursor, Write as _};

use epublint::{Finding, ValidateOptions, validate};

struct EpubBuilder {
    writer: zip::ZipWriter<Cursor<Vec<u8>>>,
}

impl EpubBuilder {
    fn new() -> Self {
        Self {
            writer: zip::ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn mimetype(mut self, method: zip::CompressionMethod) -> Self {
        let options = zip::write::SimpleFileOptions::default().compression_method(method);
        self.writer.start_file("mimetype", options).unwrap();
        self.writer.write_all(b"application/epub+zip").unwrap();
        self
    }

    fn file(mut self, name: &str, content: &str) -> Self {
        let options = zip::write::SimpleFileOptions::default();
        self.writer.start_file(name, options).unwrap();
        self.writer.write_all(content.as_bytes()).unwrap();
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.writer.finish().unwrap().into_inner()
    }
}

const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="EPUB/package.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const NAV_XHTML: &str = r#"<?xml version="1.0"?>
<html xmlns:epub="http://www.idpf.org/2007/ops"><head><title>Nav</title></head>
<body><nav epub:type="toc"><ol><li><a href="c1.xhtml">Chapter 1</a></li></ol></nav></body>
</html>"#;

const NAV_XHTML_DANGLING: &str = r#"<?xml version="1.0"?>
<html xmlns:epub="http://www.idpf.org/2007/ops"><head><title>Nav</title></head>
<body><nav epub:type="toc"><ol><li><a href="nonexistent.xhtml">X</a></li></ol></nav></body>
</html>"#;

const CHAPTER_XHTML: &str = r#"<?xml version="1.0"?>
<html><head><title>Chapter 1</title></head><body><p>Hello</p></body></html>"#;

fn package_opf(spine_itemref: &str, extra_meta: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="u">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Test</dc:title>
    <dc:identifier id="u">urn:uuid:0</dc:identifier>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">2024-01-15T10:30:00Z</meta>
    {extra_meta}
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    {spine_itemref}
  </spine>
</package>"#
    )
}

fn write_temp(bytes: &[u8], name: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("epublint-scenario-{name}.epub"));
    std::fs::write(&path, bytes).unwrap();
    path
}

fn check_ids(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(Finding::check_id).collect()
}

#[test]
fn minimal_valid_epub3_has_no_findings() {
    let bytes = EpubBuilder::new()
        .mimetype(zip::CompressionMethod::Stored)
        .file("META-INF/container.xml", CONTAINER_XML)
        .file("EPUB/package.opf", &package_opf(r#"<itemref idref="c1"/>"#, ""))
        .file("EPUB/nav.xhtml", NAV_XHTML)
        .file("EPUB/c1.xhtml", CHAPTER_XHTML)
        .finish();
    let path = write_temp(&bytes, "minimal-valid");

    let report = validate(&path, &ValidateOptions::default()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(
        report.is_valid(),
        "unexpected findings: {:?}",
        check_ids(report.findings())
    );
    assert!(report.findings().is_empty(), "{:?}", check_ids(report.findings()));
}

#[test]
fn missing_mimetype_is_pkg_006() {
    let bytes = EpubBuilder::new()
        .file("META-INF/container.xml", CONTAINER_XML)
        .file("EPUB/package.opf", &package_opf(r#"<itemref idref="c1"/>"#, ""))
        .file("EPUB/nav.xhtml", NAV_XHTML)
        .file("EPUB/c1.xhtml", CHAPTER_XHTML)
        .finish();
    let path = write_temp(&bytes, "missing-mimetype");

    let report = validate(&path, &ValidateOptions::default()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(!report.is_valid());
    let pkg_006: Vec<_> = report.findings().iter().filter(|f| f.check_id() == "PKG-006").collect();
    assert_eq!(pkg_006.len(), 1, "findings: {:?}", check_ids(report.findings()));
}

#[test]
fn compressed_mimetype_is_pkg_007() {
    let bytes = EpubBuilder::new()
        .mimetype(zip::CompressionMethod::Deflated)
        .file("META-INF/container.xml", CONTAINER_XML)
        .file("EPUB/package.opf", &package_opf(r#"<itemref idref="c1"/>"#, ""))
        .file("EPUB/nav.xhtml", NAV_XHTML)
        .file("EPUB/c1.xhtml", CHAPTER_XHTML)
        .finish();
    let path = write_temp(&bytes, "compressed-mimetype");

    let report = validate(&path, &ValidateOptions::default()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(!report.is_valid());
    assert!(report.findings().iter().any(|f| f.check_id() == "PKG-007"));
}

#[test]
fn dangling_spine_idref_is_opf_049_without_nav_001() {
    let bytes = EpubBuilder::new()
        .mimetype(zip::CompressionMethod::Stored)
        .file("META-INF/container.xml", CONTAINER_XML)
        .file("EPUB/package.opf", &package_opf(r#"<itemref idref="ghost"/>"#, ""))
        .file("EPUB/nav.xhtml", NAV_XHTML)
        .file("EPUB/c1.xhtml", CHAPTER_XHTML)
        .finish();
    let path = write_temp(&bytes, "dangling-spine-idref");

    let report = validate(&path, &ValidateOptions::default()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(!report.is_valid());
    assert!(report.findings().iter().any(|f| f.check_id() == "OPF-049"));
    assert!(!report.findings().iter().any(|f| f.check_id() == "NAV-001"));
}

#[test]
fn dangling_nav_link_is_nav_003() {
    let bytes = EpubBuilder::new()
        .mimetype(zip::CompressionMethod::Stored)
        .file("META-INF/container.xml", CONTAINER_XML)
        .file("EPUB/package.opf", &package_opf(r#"<itemref idref="c1"/>"#, ""))
        .file("EPUB/nav.xhtml", NAV_XHTML_DANGLING)
        .file("EPUB/c1.xhtml", CHAPTER_XHTML)
        .finish();
    let path = write_temp(&bytes, "dangling-nav-link");

    let report = validate(&path, &ValidateOptions::default()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(!report.is_valid());
    assert!(report.findings().iter().any(|f| f.check_id() == "NAV-003"));
}

#[test]
fn duplicate_dcterms_modified_is_opf_053() {
    let extra_meta = r#"<meta property="dcterms:modified">2024-01-15T10:30:00Z</meta>"#;
    let bytes = EpubBuilder::new()
        .mimetype(zip::CompressionMethod::Stored)
        .file("META-INF/container.xml", CONTAINER_XML)
        .file("EPUB/package.opf", &package_opf(r#"<itemref idref="c1"/>"#, extra_meta))
        .file("EPUB/nav.xhtml", NAV_XHTML)
        .file("EPUB/c1.xhtml", CHAPTER_XHTML)
        .finish();
    let path = write_temp(&bytes, "duplicate-dcterms-modified");

    let report = validate(&path, &ValidateOptions::default()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(!report.is_valid());
    let opf_053: Vec<_> = report.findings().iter().filter(|f| f.check_id() == "OPF-053").collect();
    assert_eq!(opf_053.len(), 1, "findings: {:?}", check_ids(report.findings()));
}

#[test]
fn reporting_level_filters_without_affecting_validity() {
    use epublint::Severity;

    let bytes = EpubBuilder::new()
        .mimetype(zip::CompressionMethod::Stored)
        .file("META-INF/container.xml", CONTAINER_XML)
        .file("EPUB/package.opf", &package_opf(r#"<itemref idref="c1"/>"#, ""))
        .file("EPUB/nav.xhtml", NAV_XHTML)
        .file(
            "EPUB/c1.xhtml",
            r#"<?xml version="1.0"?><html><head><title>C1</title></head><body><center>old</center></body></html>"#,
        )
        .finish();
    let path = write_temp(&bytes, "reporting-level-filter");

    let report = validate(&path, &ValidateOptions::default()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(report.is_valid());
    assert!(report.findings().iter().any(|f| f.check_id() == "HTM-001"));
    assert!(report.filtered(Severity::Error).is_empty());
    assert!(!report.filtered(Severity::Warning).is_empty());
}
