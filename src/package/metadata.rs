//! `<metadata>` parsing (spec.md §4.3 metadata rules).

use crate::package::EpubVersion;
use crate::report::{Finding, Location, Severity};
use crate::xml::{XmlEvent, XmlReader, XmlStartElement};

/// Dublin Core and `<meta>` metadata extracted from the package document.
#[derive(Default)]
pub(crate) struct Metadata {
    /// `(id, value)` for every `dc:title`.
    pub(crate) titles: Vec<(Option<String>, String)>,
    /// `(id, value)` for every `dc:language`.
    pub(crate) languages: Vec<(Option<String>, String)>,
    /// `(id, value)` for every `dc:identifier`.
    pub(crate) identifiers: Vec<(Option<String>, String)>,
    /// Raw `dcterms:modified` values, in document order.
    pub(crate) modified: Vec<String>,
    /// Every `id` attribute seen on a metadata child, for duplicate detection.
    ids: Vec<String>,
}

impl Metadata {
    pub(crate) fn all_ids(&self) -> impl Iterator<Item = &String> {
        self.ids.iter()
    }
}

fn is_valid_iso8601_utc(value: &str) -> bool {
    // CCYY-MM-DDThh:mm:ssZ, per the EPUB 3 dcterms:modified profile.
    let bytes = value.as_bytes();
    if bytes.len() != 20 || !value.ends_with('Z') {
        return false;
    }
    let digit = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);
    let positions_digit = [0, 1, 2, 3, 5, 6, 8, 9, 11, 12, 14, 15, 17, 18];
    positions_digit.iter().all(|&i| digit(i))
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[10] == b'T'
        && bytes[13] == b':'
        && bytes[16] == b':'
}

pub(crate) fn parse(
    reader: &mut XmlReader<'_>,
    metadata_start: &XmlStartElement<'_>,
    version: EpubVersion,
    path: &str,
    findings: &mut Vec<Finding>,
) -> Metadata {
    let mut metadata = Metadata::default();
    let mut depth = 0u32;

    if !metadata_start.is_self_closing() {
        loop {
            let Some(event) = reader.next() else { break };
            let Ok(event) = event else { continue };
            match event {
                XmlEvent::End(name) if name == "metadata" => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                XmlEvent::Start(element) if element.local_name() == "metadata" => depth += 1,
                XmlEvent::Start(element) => {
                    if let Some(id) = element.attribute("id") {
                        metadata.ids.push(id);
                    }
                    match element.local_name().as_ref() {
                        "title" => {
                            let id = element.attribute("id");
                            let text = reader.read_element_text(&element).unwrap_or_default();
                            metadata.titles.push((id, text));
                        }
                        "language" => {
                            let id = element.attribute("id");
                            let text = reader.read_element_text(&element).unwrap_or_default();
                            metadata.languages.push((id, text));
                        }
                        "identifier" => {
                            let id = element.attribute("id");
                            let text = reader.read_element_text(&element).unwrap_or_default();
                            metadata.identifiers.push((id, text));
                        }
                        "meta" => {
                            let is_modified = element.attribute("property").as_deref() == Some("dcterms:modified")
                                || element.attribute("name").as_deref() == Some("dcterms:modified");
                            if is_modified {
                                let value = if element.has_attribute("content") {
                                    element.attribute("content").unwrap_or_default()
                                } else {
                                    reader.read_element_text(&element).unwrap_or_default()
                                };
                                metadata.modified.push(value);
                            } else if !element.is_self_closing() {
                                let _ = reader.read_element_text(&element);
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
    }

    match metadata.titles.iter().find(|(_, text)| !text.trim().is_empty()) {
        None => findings.push(Finding::new(
            Severity::Error,
            "OPF-059",
            "package metadata has no non-empty dc:title",
            Some(Location::path(path)),
        )),
        Some(_) => {}
    }

    if !metadata.languages.iter().any(|(_, text)| !text.trim().is_empty()) {
        findings.push(Finding::new(
            Severity::Error,
            "OPF-092",
            "package metadata has no non-empty dc:language",
            Some(Location::path(path)),
        ));
    }

    if version == EpubVersion::Epub3 {
        match metadata.modified.len() {
            0 => findings.push(Finding::new(
                Severity::Error,
                "OPF-053",
                "EPUB 3 package metadata requires exactly one dcterms:modified",
                Some(Location::path(path)),
            )),
            1 => {
                if !is_valid_iso8601_utc(metadata.modified[0].trim()) {
                    findings.push(Finding::new(
                        Severity::Error,
                        "OPF-053",
                        format!(
                            "dcterms:modified '{}' is not a valid CCYY-MM-DDThh:mm:ssZ timestamp",
                            metadata.modified[0]
                        ),
                        Some(Location::path(path)),
                    ));
                }
            }
            _ => findings.push(Finding::new(
                Severity::Error,
                "OPF-053",
                "package metadata declares dcterms:modified more than once",
                Some(Location::path(path)),
            )),
        }
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::is_valid_iso8601_utc;

    #[test]
    fn validates_iso8601_utc_timestamps() {
        assert!(is_valid_iso8601_utc("2020-01-01T00:00:00Z"));
        assert!(!is_valid_iso8601_utc("2020-01-01"));
        assert!(!is_valid_iso8601_utc("2020-01-01T00:00:00+00:00"));
        assert!(!is_valid_iso8601_utc("not-a-date"));
    }
}
