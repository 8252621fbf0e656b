//! `<manifest>` parsing (spec.md §4.3 manifest rules).

use indexmap::IndexMap;

use crate::report::{Finding, Location, Severity};
use crate::uri::UriResolver;
use crate::xml::{XmlEvent, XmlReader, XmlStartElement};

/// A single `<item>` of the package manifest.
///
/// `href` is kept exactly as written (raw); [`ManifestItem::resolved_href`]
/// computes the container-absolute path on demand, matching spec.md §3's
/// "href (raw + resolved container path)" field.
#[derive(Clone, Debug)]
pub(crate) struct ManifestItem {
    pub(crate) id: String,
    pub(crate) href: String,
    pub(crate) media_type: String,
    pub(crate) fallback: Option<String>,
    pub(crate) media_overlay: Option<String>,
    pub(crate) properties: Vec<String>,
}

impl ManifestItem {
    pub(crate) fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// `href` resolved against the package document's own location.
    pub(crate) fn resolved_href(&self, opf_path: &str) -> String {
        UriResolver::parent_of(opf_path).resolve(crate::uri::path(&self.href))
    }
}

pub(crate) fn parse(
    reader: &mut XmlReader<'_>,
    manifest_start: &XmlStartElement<'_>,
    findings: &mut Vec<Finding>,
    path: &str,
) -> IndexMap<String, ManifestItem> {
    let mut items = IndexMap::new();
    let mut depth = 0u32;

    if manifest_start.is_self_closing() {
        return items;
    }

    while let Some(event) = reader.next() {
        let Ok(event) = event else { continue };
        match event {
            XmlEvent::End(name) if name == "manifest" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            XmlEvent::Start(element) if element.local_name() == "manifest" => depth += 1,
            XmlEvent::Start(element) if element.local_name() == "item" => {
                let Some(id) = element.attribute("id") else {
                    findings.push(Finding::new(
                        Severity::Error,
                        "OPF-060",
                        "manifest item has no id attribute",
                        Some(Location::path(path)),
                    ));
                    continue;
                };
                let Some(href) = element.attribute("href") else {
                    findings.push(Finding::new(
                        Severity::Error,
                        "RSC-001",
                        format!("manifest item '{id}' has no href attribute"),
                        Some(Location::path(path)),
                    ));
                    continue;
                };
                let media_type = element.attribute("media-type").unwrap_or_default();
                let fallback = element.attribute("fallback");
                let media_overlay = element.attribute("media-overlay");
                let properties = element
                    .attribute("properties")
                    .unwrap_or_default()
                    .split_ascii_whitespace()
                    .map(str::to_owned)
                    .collect();

                if items
                    .insert(
                        id.clone(),
                        ManifestItem {
                            id,
                            href,
                            media_type,
                            fallback,
                            media_overlay,
                            properties,
                        },
                    )
                    .is_some()
                {
                    findings.push(Finding::new(
                        Severity::Error,
                        "OPF-060",
                        "manifest declares the same item id more than once",
                        Some(Location::path(path)),
                    ));
                }
            }
            _ => {}
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_items_and_properties() {
        let xml = r#"<manifest>
            <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
            <item id="img" href="cover.png" media-type="image/png" fallback="img-svg"/>
        </manifest>"#;
        let mut reader = XmlReader::from_bytes(xml.as_bytes());
        let start = match reader.next().unwrap().unwrap() {
            XmlEvent::Start(el) => el,
            _ => panic!("expected start"),
        };
        let mut findings = Vec::new();
        let items = parse(&mut reader, &start, &mut findings, "OEBPS/package.opf");

        assert!(findings.is_empty());
        assert_eq!(items.len(), 2);
        assert!(items["nav"].has_property("nav"));
        assert_eq!(items["img"].fallback.as_deref(), Some("img-svg"));
    }
}
