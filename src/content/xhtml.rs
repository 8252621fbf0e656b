//! XHTML content-document checks (spec.md §4.6 table, row 1):
//! well-formedness, a required `<title>`, id uniqueness within the file,
//! obsolete elements, empty-href anchors, and reference collection.

use std::collections::HashSet;

use crate::package::EpubVersion;
use crate::report::{Finding, Location, Severity};
use crate::xml::{self, XmlEvent, XmlReader};

use super::{Reference, RefKind};

const OBSOLETE_ELEMENTS: &[&str] = &["center", "font", "marquee"];

pub(crate) struct XhtmlScan {
    pub(crate) findings: Vec<Finding>,
    pub(crate) references: Vec<Reference>,
    pub(crate) ids: HashSet<String>,
}

pub(crate) fn scan(text: &str, path: &str, version: EpubVersion) -> XhtmlScan {
    let mut findings = Vec::new();
    let mut references = Vec::new();
    let mut ids = HashSet::new();
    let mut reader = XmlReader::from_bytes(text.as_bytes());

    let mut in_head = false;
    let mut head_seen = false;
    let mut saw_title = false;
    let mut same_doc_fragments: Vec<String> = Vec::new();

    loop {
        let Some(event) = reader.next() else { break };
        let event = match event {
            Ok(event) => event,
            Err(error) => {
                findings.push(Finding::new(
                    Severity::Fatal,
                    "RSC-016",
                    format!("{path} is not well-formed XML: {error}"),
                    Some(xml::located(path, &error)),
                ));
                return XhtmlScan {
                    findings,
                    references,
                    ids,
                };
            }
        };

        match event {
            XmlEvent::Start(element) => {
                if let Some(id) = element.attribute("id") {
                    if !id.is_empty() && !ids.insert(id.clone()) {
                        findings.push(Finding::new(
                            Severity::Error,
                            "RSC-005",
                            format!("id '{id}' is used more than once in {path}"),
                            Some(Location::path(path)),
                        ));
                    }
                }

                let local = element.local_name().into_owned();
                match local.as_str() {
                    "head" => {
                        head_seen = true;
                        in_head = true;
                    }
                    "title" if in_head => {
                        let text = reader.read_element_text(&element).unwrap_or_default();
                        if !text.trim().is_empty() {
                            saw_title = true;
                        }
                    }
                    _ if OBSOLETE_ELEMENTS.contains(&local.as_str()) => {
                        findings.push(Finding::new(
                            Severity::Warning,
                            "HTM-001",
                            format!("<{local}> is obsolete; avoid it in EPUB content documents"),
                            Some(Location::path(path)),
                        ));
                    }
                    "a" => {
                        if let Some(href) = element.attribute("href") {
                            if href.trim().is_empty() {
                                findings.push(Finding::new(
                                    Severity::Warning,
                                    "HTM-003",
                                    "anchor has an empty href",
                                    Some(Location::path(path)),
                                ));
                            } else if let Some(target) = href.strip_prefix('#') {
                                same_doc_fragments.push(target.to_string());
                            } else {
                                references.push(Reference {
                                    raw_href: href,
                                    kind: RefKind::Anchor,
                                });
                            }
                        }
                    }
                    "img" => {
                        if let Some(src) = element.attribute("src") {
                            references.push(Reference {
                                raw_href: src,
                                kind: RefKind::Generic,
                            });
                        }
                    }
                    "link" => {
                        let is_stylesheet = element.attribute("rel").as_deref() == Some("stylesheet");
                        if let Some(href) = element.attribute("href") {
                            references.push(Reference {
                                raw_href: href,
                                kind: if is_stylesheet {
                                    RefKind::Stylesheet
                                } else {
                                    RefKind::Generic
                                },
                            });
                        }
                    }
                    "script" => {
                        if let Some(src) = element.attribute("src") {
                            references.push(Reference {
                                raw_href: src,
                                kind: RefKind::Generic,
                            });
                        }
                    }
                    "source" | "audio" | "video" | "embed" => {
                        if let Some(src) = element.attribute("src") {
                            references.push(Reference {
                                raw_href: src,
                                kind: RefKind::Generic,
                            });
                        }
                    }
                    "object" => {
                        if let Some(data) = element.attribute("data") {
                            references.push(Reference {
                                raw_href: data,
                                kind: RefKind::Generic,
                            });
                        }
                    }
                    _ => {}
                }
            }
            XmlEvent::End(name) if in_head && name == "head" => {
                in_head = false;
            }
            _ => {}
        }
    }

    if !head_seen {
        findings.push(Finding::new(
            Severity::Error,
            "HTM-002",
            "XHTML content document has no <head>",
            Some(Location::path(path)),
        ));
    } else if !saw_title {
        // spec.md §9 Open Question: EPUB 2 treats this as an XHTML 1.1 DTD
        // violation (error); EPUB 3 downgrades it to a warning.
        let severity = if version == EpubVersion::Epub2 {
            Severity::Error
        } else {
            Severity::Warning
        };
        findings.push(Finding::new(
            severity,
            "HTM-002",
            "<head> has no non-empty <title>",
            Some(Location::path(path)),
        ));
    }

    for target in &same_doc_fragments {
        if !target.is_empty() && !ids.contains(target) {
            findings.push(Finding::new(
                Severity::Error,
                "HTM-004",
                format!("fragment link '#{target}' does not resolve to an id in {path}"),
                Some(Location::path(path)),
            ));
        }
    }

    XhtmlScan {
        findings,
        references,
        ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_title_is_warning_on_epub3() {
        let xml = "<html><head></head><body/></html>";
        let scan = scan(xml, "c1.xhtml", EpubVersion::Epub3);
        let finding = scan.findings.iter().find(|f| f.check_id() == "HTM-002").unwrap();
        assert_eq!(finding.severity(), Severity::Warning);
    }

    #[test]
    fn missing_title_is_error_on_epub2() {
        let xml = "<html><head></head><body/></html>";
        let scan = scan(xml, "c1.xhtml", EpubVersion::Epub2);
        let finding = scan.findings.iter().find(|f| f.check_id() == "HTM-002").unwrap();
        assert_eq!(finding.severity(), Severity::Error);
    }

    #[test]
    fn duplicate_ids_are_rsc_005() {
        let xml = r#"<html><head><title>T</title></head><body><p id="a"/><p id="a"/></body></html>"#;
        let scan = scan(xml, "c1.xhtml", EpubVersion::Epub3);
        assert!(scan.findings.iter().any(|f| f.check_id() == "RSC-005"));
    }

    #[test]
    fn obsolete_elements_are_warnings() {
        let xml = r#"<html><head><title>T</title></head><body><center>old</center></body></html>"#;
        let scan = scan(xml, "c1.xhtml", EpubVersion::Epub3);
        assert!(scan.findings.iter().any(|f| f.check_id() == "HTM-001"));
    }

    #[test]
    fn collects_image_and_anchor_references() {
        let xml = r#"<html><head><title>T</title></head><body>
            <img src="cover.png"/>
            <a href="c2.xhtml">next</a>
            <a href="#section">same doc</a>
        </body></html>"#;
        let scan = scan(xml, "c1.xhtml", EpubVersion::Epub3);
        assert_eq!(scan.references.len(), 2);
    }

    #[test]
    fn broken_same_doc_fragment_is_htm_004() {
        let xml = r#"<html><head><title>T</title></head><body>
            <a href="#missing">jump</a>
        </body></html>"#;
        let scan = scan(xml, "c1.xhtml", EpubVersion::Epub3);
        assert!(scan.findings.iter().any(|f| f.check_id() == "HTM-004"));
    }

    #[test]
    fn valid_same_doc_fragment_is_not_flagged() {
        let xml = r#"<html><head><title>T</title></head><body>
            <p id="sec1">Section</p>
            <a href="#sec1">jump</a>
        </body></html>"#;
        let scan = scan(xml, "c1.xhtml", EpubVersion::Epub3);
        assert!(!scan.findings.iter().any(|f| f.check_id() == "HTM-004"));
    }
}
