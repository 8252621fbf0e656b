//! SVG content checks (spec.md §4.6 table, row 2): well-formedness, a
//! required `<title>`, and external reference collection.

use std::collections::HashSet;

use crate::report::{Finding, Location, Severity};
use crate::xml::{self, XmlEvent, XmlReader};

use super::{Reference, RefKind};

pub(crate) struct SvgScan {
    pub(crate) findings: Vec<Finding>,
    pub(crate) references: Vec<Reference>,
    pub(crate) ids: HashSet<String>,
}

fn href_attribute(element: &crate::xml::XmlStartElement<'_>) -> Option<String> {
    element
        .attribute("xlink:href")
        .or_else(|| element.attribute("href"))
}

pub(crate) fn scan(text: &str, path: &str) -> SvgScan {
    let mut findings = Vec::new();
    let mut references = Vec::new();
    let mut ids = HashSet::new();
    let mut reader = XmlReader::from_bytes(text.as_bytes());
    let mut saw_title = false;

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
                return SvgScan {
                    findings,
                    references,
                    ids,
                };
            }
        };

        let XmlEvent::Start(element) = event else {
            continue;
        };

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

        match element.local_name().as_ref() {
            "title" => saw_title = true,
            "image" | "use" => {
                if let Some(href) = href_attribute(&element) {
                    if !href.starts_with('#') {
                        references.push(Reference {
                            raw_href: href,
                            kind: RefKind::Generic,
                        });
                    }
                }
            }
            "a" => {
                if let Some(href) = href_attribute(&element) {
                    if !href.trim().is_empty() && !href.starts_with('#') {
                        references.push(Reference {
                            raw_href: href,
                            kind: RefKind::Anchor,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    if !saw_title {
        findings.push(Finding::new(
            Severity::Warning,
            "SVG-001",
            "svg document has no <title>",
            Some(Location::path(path)),
        ));
    }

    SvgScan {
        findings,
        references,
        ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_title_is_svg_001() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#;
        let scan = scan(svg, "cover.svg");
        assert!(scan.findings.iter().any(|f| f.check_id() == "SVG-001"));
    }

    #[test]
    fn collects_image_reference() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
            <title>Cover</title>
            <image xlink:href="cover.jpg"/>
        </svg>"#;
        let scan = scan(svg, "cover.svg");
        assert!(scan.findings.iter().all(|f| f.check_id() != "SVG-001"));
        assert_eq!(scan.references.len(), 1);
        assert_eq!(scan.references[0].raw_href, "cover.jpg");
    }
}
