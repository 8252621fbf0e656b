//! Container Manifest Parser (spec.md §4.2): `META-INF/container.xml`.

use crate::report::{Finding, Location, Severity};
use crate::xml::{XmlEvent, XmlReader};

/// The resolved set of rootfiles declared in `container.xml`.
#[derive(Debug, Default)]
pub(crate) struct ContainerManifest {
    /// `(full-path, media-type)` pairs in document order.
    pub(crate) rootfiles: Vec<(String, String)>,
}

impl ContainerManifest {
    /// The primary rootfile: the first `<rootfile>` with
    /// `media-type="application/oebps-package+xml"`, or the first rootfile
    /// of any media type if none matches, matching reader tie-breaking by
    /// document order (spec.md §4.2).
    pub(crate) fn primary_rootfile(&self) -> Option<&str> {
        self.rootfiles
            .iter()
            .find(|(_, media_type)| media_type == "application/oebps-package+xml")
            .or_else(|| self.rootfiles.first())
            .map(|(path, _)| path.as_str())
    }
}

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Parses `xml` as `container.xml`, producing both the manifest and any
/// structural findings (OPF-003 if no usable rootfile, RSC-002 for a
/// malformed rootfile path).
pub(crate) fn parse(xml: &str) -> (ContainerManifest, Vec<Finding>) {
    let mut manifest = ContainerManifest::default();
    let mut findings = Vec::new();
    let mut reader = XmlReader::from_bytes(xml.as_bytes());

    while let Some(event) = reader.next() {
        let Ok(event) = event else { continue };
        if let XmlEvent::Start(element) = event {
            if element.local_name() == "rootfile" {
                let full_path = element.attribute("full-path");
                let media_type = element
                    .attribute("media-type")
                    .unwrap_or_default();
                match full_path {
                    Some(path) if !path.is_empty() => {
                        manifest.rootfiles.push((path, media_type));
                    }
                    _ => findings.push(Finding::new(
                        Severity::Error,
                        "RSC-002",
                        "rootfile element has no full-path attribute",
                        Some(Location::path(CONTAINER_PATH)),
                    )),
                }
            }
        }
    }

    if manifest.primary_rootfile().is_none() {
        findings.push(Finding::new(
            Severity::Fatal,
            "OPF-003",
            "container.xml declares no usable rootfile",
            Some(Location::path(CONTAINER_PATH)),
        ));
    }

    (manifest, findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primary_rootfile() {
        let xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/package.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
        let (manifest, findings) = parse(xml);
        assert!(findings.is_empty());
        assert_eq!(manifest.primary_rootfile(), Some("OEBPS/package.opf"));
    }

    #[test]
    fn missing_rootfile_is_fatal() {
        let xml = r#"<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles></rootfiles>
</container>"#;
        let (_, findings) = parse(xml);
        assert!(findings.iter().any(|f| f.check_id() == "OPF-003"));
    }
}
