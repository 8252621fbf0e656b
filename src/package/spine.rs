//! `<spine>` parsing (spec.md §4.3 spine rules).

use crate::package::EpubVersion;
use crate::report::{Finding, Location, Severity};
use crate::xml::{XmlEvent, XmlReader, XmlStartElement};

/// One `<itemref>` entry.
#[derive(Clone, Debug)]
pub(crate) struct SpineItemRef {
    pub(crate) idref: String,
    pub(crate) linear: bool,
    pub(crate) properties: Vec<String>,
}

/// The parsed `<spine>`.
#[derive(Default)]
pub(crate) struct Spine {
    /// EPUB 2 `toc` attribute: the manifest id of the NCX document.
    pub(crate) toc: Option<String>,
    pub(crate) page_progression_direction: Option<String>,
    pub(crate) itemrefs: Vec<SpineItemRef>,
}

pub(crate) fn parse(
    reader: &mut XmlReader<'_>,
    spine_start: &XmlStartElement<'_>,
    version: EpubVersion,
    path: &str,
    findings: &mut Vec<Finding>,
) -> Spine {
    let mut spine = Spine {
        toc: spine_start.attribute("toc"),
        page_progression_direction: spine_start.attribute("page-progression-direction"),
        itemrefs: Vec::new(),
    };

    if spine.page_progression_direction.is_some() && version == EpubVersion::Epub2 {
        // Deliberate divergence: the attribute was introduced in EPUB 3, so
        // an EPUB 2 spine carrying it references something the reading
        // system cannot resolve as the author intended.
        findings.push(Finding::new(
            Severity::Error,
            "RSC-005",
            "page-progression-direction is not defined for EPUB 2 spines",
            Some(Location::path(path)),
        ));
    }

    let mut depth = 0u32;
    if spine_start.is_self_closing() {
        return spine;
    }

    while let Some(event) = reader.next() {
        let Ok(event) = event else { continue };
        match event {
            XmlEvent::End(name) if name == "spine" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            XmlEvent::Start(element) if element.local_name() == "spine" => depth += 1,
            XmlEvent::Start(element) if element.local_name() == "itemref" => {
                let Some(idref) = element.attribute("idref") else {
                    findings.push(Finding::new(
                        Severity::Error,
                        "OPF-049",
                        "itemref has no idref attribute",
                        Some(Location::path(path)),
                    ));
                    continue;
                };
                let linear = element
                    .attribute("linear")
                    .map(|value| value != "no")
                    .unwrap_or(true);
                let properties = element
                    .attribute("properties")
                    .unwrap_or_default()
                    .split_ascii_whitespace()
                    .map(str::to_owned)
                    .collect();
                spine.itemrefs.push(SpineItemRef { idref, linear, properties });
            }
            _ => {}
        }
    }

    spine
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_itemrefs_and_linear_flag() {
        let xml = r#"<spine toc="ncx"><itemref idref="c1"/><itemref idref="c2" linear="no"/></spine>"#;
        let mut reader = XmlReader::from_bytes(xml.as_bytes());
        let start = match reader.next().unwrap().unwrap() {
            XmlEvent::Start(el) => el,
            _ => panic!("expected start"),
        };
        let mut findings = Vec::new();
        let spine = parse(&mut reader, &start, EpubVersion::Epub2, "OEBPS/package.opf", &mut findings);

        assert_eq!(spine.toc.as_deref(), Some("ncx"));
        assert_eq!(spine.itemrefs.len(), 2);
        assert!(spine.itemrefs[0].linear);
        assert!(!spine.itemrefs[1].linear);
    }

    #[test]
    fn page_progression_on_epub2_is_flagged() {
        let xml = r#"<spine page-progression-direction="rtl"></spine>"#;
        let mut reader = XmlReader::from_bytes(xml.as_bytes());
        let start = match reader.next().unwrap().unwrap() {
            XmlEvent::Start(el) => el,
            _ => panic!("expected start"),
        };
        let mut findings = Vec::new();
        parse(&mut reader, &start, EpubVersion::Epub2, "OEBPS/package.opf", &mut findings);
        assert!(findings.iter().any(|f| f.check_id() == "RSC-005"));
    }
}
