//! Navigation Parser (spec.md §4.5): the EPUB 3 nav document's `toc` nav,
//! and the EPUB 2 `toc.ncx` document.

use crate::report::{Finding, Location, Severity};
use crate::uri::{self, UriResolver};
use crate::xml::{self, XmlEvent, XmlReader};

/// One link extracted from the first `<a>` under a `toc` nav's `<li>`.
#[derive(Clone, Debug)]
pub(crate) struct NavLink {
    /// Container-absolute path the link resolves to (fragment stripped).
    pub(crate) href: String,
    /// The href exactly as written, before resolution.
    pub(crate) raw_href: String,
}

/// The result of scanning an EPUB 3 nav document for its `toc` nav.
#[derive(Default)]
pub(crate) struct NavModel {
    /// `true` if a `<nav epub:type="toc">` element was found at all.
    pub(crate) toc_found: bool,
    /// The first `<a>` under each `<li>` within the `toc` nav.
    pub(crate) links: Vec<NavLink>,
}

/// Parses `text` (the content of the nav document at `nav_path`) looking for
/// its `toc` nav and the first link under every one of its list items.
///
/// Returns `None` only when `text` is not well-formed XML, in which case a
/// `RSC-016` finding is already included (spec.md §4.6: scoped to the
/// offending resource, not fatal for the run).
pub(crate) fn parse_epub3_nav(text: &str, nav_path: &str) -> (Option<NavModel>, Vec<Finding>) {
    let mut findings = Vec::new();
    let mut reader = XmlReader::from_bytes(text.as_bytes());
    let resolver = UriResolver::parent_of(nav_path);

    let mut model = NavModel::default();
    let mut toc_depth: Option<u32> = None;
    let mut li_stack: Vec<bool> = Vec::new();

    loop {
        let Some(event) = reader.next() else { break };
        let event = match event {
            Ok(event) => event,
            Err(error) => {
                return (
                    None,
                    vec![Finding::new(
                        Severity::Fatal,
                        "RSC-016",
                        format!("{nav_path} is not well-formed XML: {error}"),
                        Some(xml::located(nav_path, &error)),
                    )],
                );
            }
        };

        match event {
            XmlEvent::Start(element) if element.local_name() == "nav" => {
                if toc_depth.is_none() {
                    let is_toc = element
                        .attribute("epub:type")
                        .is_some_and(|value| value.split_ascii_whitespace().any(|t| t == "toc"));
                    if is_toc {
                        model.toc_found = true;
                        toc_depth = Some(0);
                    }
                } else {
                    toc_depth = toc_depth.map(|depth| depth + 1);
                }
            }
            XmlEvent::End(name) if name == "nav" => {
                toc_depth = match toc_depth {
                    Some(0) => None,
                    Some(depth) => Some(depth - 1),
                    None => None,
                };
            }
            XmlEvent::Start(element) if toc_depth.is_some() && element.local_name() == "li" => {
                li_stack.push(true);
            }
            XmlEvent::End(name) if toc_depth.is_some() && name == "li" => {
                if li_stack.pop() == Some(true) {
                    findings.push(Finding::new(
                        Severity::Error,
                        "NAV-003",
                        "toc list item has no usable first link",
                        Some(Location::path(nav_path)),
                    ));
                }
            }
            XmlEvent::Start(element) if toc_depth.is_some() && element.local_name() == "a" => {
                if let Some(awaiting) = li_stack.last_mut().filter(|a| **a) {
                    *awaiting = false;
                    let raw_href = element.attribute("href").unwrap_or_default();
                    if raw_href.trim().is_empty() {
                        findings.push(Finding::new(
                            Severity::Error,
                            "NAV-003",
                            "toc list item's first link has an empty href",
                            Some(Location::path(nav_path)),
                        ));
                    } else {
                        let href = resolver.resolve(uri::path(&raw_href)).into_owned();
                        model.links.push(NavLink { href, raw_href });
                    }
                }
            }
            _ => {}
        }
    }

    (Some(model), findings)
}

/// Parses `text` (the content of the `toc.ncx` document at `ncx_path`),
/// returning the `dtb:uid` meta value for `NCX-001` cross-checking.
///
/// Returns `None` only on a well-formedness failure (`RSC-016`).
pub(crate) fn parse_ncx_dtb_uid(text: &str, ncx_path: &str) -> (Option<Option<String>>, Vec<Finding>) {
    let mut reader = XmlReader::from_bytes(text.as_bytes());
    let mut dtb_uid = None;

    loop {
        let Some(event) = reader.next() else { break };
        match event {
            Ok(XmlEvent::Start(element)) if element.local_name() == "meta" => {
                if element.attribute("name").as_deref() == Some("dtb:uid") {
                    dtb_uid = element.attribute("content");
                }
            }
            Ok(_) => {}
            Err(error) => {
                return (
                    None,
                    vec![Finding::new(
                        Severity::Fatal,
                        "RSC-016",
                        format!("{ncx_path} is not well-formed XML: {error}"),
                        Some(xml::located(ncx_path, &error)),
                    )],
                );
            }
        }
    }

    (Some(dtb_uid), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_toc_nav_and_first_links() {
        let xml = r#"<html xmlns:epub="http://www.idpf.org/2007/ops">
<body>
  <nav epub:type="toc">
    <ol>
      <li><a href="c1.xhtml">Chapter 1</a></li>
      <li><a href="c2.xhtml#sec">Chapter 2</a></li>
    </ol>
  </nav>
</body>
</html>"#;
        let (model, findings) = parse_epub3_nav(xml, "EPUB/nav.xhtml");
        let model = model.unwrap();
        assert!(findings.is_empty());
        assert!(model.toc_found);
        assert_eq!(model.links.len(), 2);
        assert_eq!(model.links[0].href, "EPUB/c1.xhtml");
        assert_eq!(model.links[1].href, "EPUB/c2.xhtml");
    }

    #[test]
    fn no_toc_nav_is_reported_by_caller() {
        let xml = r#"<html xmlns:epub="http://www.idpf.org/2007/ops">
<body><nav epub:type="landmarks"><ol><li><a href="c1.xhtml">x</a></li></ol></nav></body>
</html>"#;
        let (model, _) = parse_epub3_nav(xml, "EPUB/nav.xhtml");
        assert!(!model.unwrap().toc_found);
    }

    #[test]
    fn empty_li_is_nav_003() {
        let xml = r#"<html xmlns:epub="http://www.idpf.org/2007/ops">
<body><nav epub:type="toc"><ol><li>No link here</li></ol></nav></body>
</html>"#;
        let (_, findings) = parse_epub3_nav(xml, "EPUB/nav.xhtml");
        assert!(findings.iter().any(|f| f.check_id() == "NAV-003"));
    }

    #[test]
    fn extracts_dtb_uid() {
        let xml = r#"<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/">
  <head><meta name="dtb:uid" content="urn:uuid:0"/></head>
</ncx>"#;
        let (dtb_uid, findings) = parse_ncx_dtb_uid(xml, "EPUB/toc.ncx");
        assert!(findings.is_empty());
        assert_eq!(dtb_uid.unwrap().as_deref(), Some("urn:uuid:0"));
    }
}
