//! `<guide>` parsing (spec.md §4.3 "Guide", §2 table row: allowed on EPUB 2,
//! deprecated on EPUB 3).

use crate::package::EpubVersion;
use crate::report::{Finding, Location, Severity};
use crate::uri::UriResolver;
use crate::xml::{XmlEvent, XmlReader};

/// One `<reference>` child of `<guide>`: `(type, title, href)`, with `href`
/// already resolved to a container-absolute path.
pub(crate) type GuideReference = (String, String, String);

pub(crate) fn parse(
    reader: &mut XmlReader<'_>,
    findings: &mut Vec<Finding>,
    version: EpubVersion,
    opf_path: &str,
) -> Vec<GuideReference> {
    let mut references = Vec::new();
    let mut depth = 0u32;
    let resolver = UriResolver::parent_of(opf_path);

    if version == EpubVersion::Epub3 {
        findings.push(Finding::new(
            Severity::Info,
            "OPF-061",
            "<guide> is deprecated in EPUB 3; use the nav document's landmarks instead",
            Some(Location::path(opf_path)),
        ));
    }

    while let Some(event) = reader.next() {
        let Ok(event) = event else { continue };
        match event {
            XmlEvent::End(name) if name == "guide" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            XmlEvent::Start(element) if element.local_name() == "guide" => depth += 1,
            XmlEvent::Start(element) if element.local_name() == "reference" => {
                let reference_type = element.attribute("type").unwrap_or_default();
                let title = element.attribute("title").unwrap_or_default();
                let Some(href_raw) = element.attribute("href") else {
                    findings.push(Finding::new(
                        Severity::Error,
                        "RSC-001",
                        "guide reference has no href attribute",
                        Some(Location::path(opf_path)),
                    ));
                    continue;
                };
                let href = resolver.resolve(&href_raw);
                references.push((reference_type, title, href));
            }
            _ => {}
        }
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_and_resolves_href() {
        let xml = r#"<guide>
            <reference type="cover" title="Cover" href="cover.xhtml"/>
        </guide>"#;
        let mut reader = XmlReader::from_bytes(xml.as_bytes());
        reader.next();
        let mut findings = Vec::new();
        let references = parse(&mut reader, &mut findings, EpubVersion::Epub2, "OEBPS/package.opf");

        assert!(findings.is_empty());
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].2, "OEBPS/cover.xhtml");
    }

    #[test]
    fn epub3_guide_emits_deprecation_info() {
        let xml = r#"<guide></guide>"#;
        let mut reader = XmlReader::from_bytes(xml.as_bytes());
        reader.next();
        let mut findings = Vec::new();
        parse(&mut reader, &mut findings, EpubVersion::Epub3, "OEBPS/package.opf");
        assert!(findings.iter().any(|f| f.check_id() == "OPF-061"));
    }
}
