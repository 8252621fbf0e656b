//! Path/URI resolution for the Resource Resolver (spec.md §4.4).

use std::borrow::Cow;

const SEPARATOR: char = '/';
const SEPARATOR_STR: &str = "/";
const CURRENT_DIR: &str = ".";
const PARENT_DIR: &str = "..";
const EMPTY: &str = "";

/// Resolves relative hrefs against the absolute container path they appear in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct UriResolver<'a>(&'a str);

impl<'a> UriResolver<'a> {
    /// A resolver rooted at the directory containing `absolute_path`.
    pub(crate) fn parent_of(absolute_path: &'a str) -> Self {
        Self(parent(absolute_path))
    }

    /// Resolves `href` (which may carry a `#fragment` or `?query`) to an
    /// absolute container path, normalizing `.`/`..`/empty components.
    pub(crate) fn resolve(&self, href: &str) -> String {
        resolve(self.0, href).into_owned()
    }
}

/// The directory portion of `href` (everything before the final `/`).
pub(crate) fn parent(href: &str) -> &str {
    href.rfind(SEPARATOR).map_or(EMPTY, |index| {
        if index == 0 {
            SEPARATOR_STR
        } else {
            &href[..index]
        }
    })
}

/// Strips any trailing `#fragment` or `?query` from `href`.
pub(crate) fn path(href: &str) -> &str {
    href.find(['#', '?']).map_or(href, |index| &href[..index])
}

/// `true` if `href` carries an RFC 3986 scheme (e.g. `https:`, `mailto:`).
///
/// Assumes `href` is otherwise well-formed; used to distinguish remote
/// references from container-relative ones (spec.md §4.4).
pub(crate) fn has_scheme(href: &str) -> bool {
    let ascii = href.as_bytes();
    let Some(colon_pos) = ascii.iter().position(|&c| c == b':') else {
        return false;
    };
    if ascii.is_empty() || !ascii[0].is_ascii_alphabetic() {
        return false;
    }
    ascii[1..colon_pos]
        .iter()
        .all(|c| c.is_ascii_alphanumeric() || matches!(*c, b'+' | b'.' | b'-'))
}

/// The scheme of `href` (e.g. `"https"`), if [`has_scheme`] would return `true`.
pub(crate) fn scheme(href: &str) -> Option<&str> {
    if !has_scheme(href) {
        return None;
    }
    href.split_once(':').map(|(scheme, _)| scheme)
}

/// Percent-decodes `encoded`, lossily substituting invalid UTF-8.
pub(crate) fn decode(encoded: &str) -> Cow<'_, str> {
    percent_encoding::percent_decode_str(encoded).decode_utf8_lossy()
}

/// Resolves `relative` against `parent_dir`, normalizing `.`/`..`/empty
/// components and percent-decoding the path portion (spec.md §4.4: hrefs are
/// IRI references whose `%20`/`%28`/etc. escapes must be decoded before
/// mapping to the (decoded) ZIP entry names).
pub(crate) fn resolve<'a>(parent_dir: &str, relative: &'a str) -> Cow<'a, str> {
    let (raw_main_href, ext) = relative
        .find(['?', '#'])
        .map_or((relative, EMPTY), |position| {
            (&relative[..position], &relative[position..])
        });

    if raw_main_href.starts_with(SEPARATOR) || has_scheme(raw_main_href) {
        return Cow::Borrowed(relative);
    }

    let main_href = decode(raw_main_href);

    let resolved_href = if parent_dir.is_empty() {
        main_href.into_owned() + ext
    } else {
        String::from(parent_dir) + SEPARATOR_STR + main_href.as_ref() + ext
    };

    match normalize(&resolved_href) {
        Cow::Borrowed(_) => Cow::Owned(resolved_href),
        Cow::Owned(normalized) => Cow::Owned(normalized),
    }
}

/// Collapses `.`, `..`, and empty path components.
pub(crate) fn normalize(original: &str) -> Cow<'_, str> {
    let mut components = original.split(SEPARATOR);
    if original.starts_with(SEPARATOR) {
        components.next();
    }
    if !components.any(|c| matches!(c, EMPTY | CURRENT_DIR | PARENT_DIR)) {
        return Cow::Borrowed(original);
    }

    let mut stack = Vec::new();
    for component in original.split(SEPARATOR) {
        match component {
            EMPTY | CURRENT_DIR => {}
            PARENT_DIR => {
                stack.pop();
            }
            _ => stack.push(component),
        }
    }

    let capacity = stack.iter().map(|s| s.len()).sum::<usize>() + stack.len();
    let mut path = String::with_capacity(capacity);
    let mut components = stack.into_iter();

    if original.starts_with(SEPARATOR) {
        path.push(SEPARATOR);
    }
    if let Some(component) = components.next() {
        path.push_str(component);
    }
    for component in components {
        path.push(SEPARATOR);
        path.push_str(component);
    }
    Cow::Owned(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_hrefs_against_parent() {
        #[rustfmt::skip]
        let cases = [
            ("/c3.xhtml", "OPS/content", "/c3.xhtml"),
            ("content/c3.xhtml", "./content", "c3.xhtml"),
            ("OPS/content/toc/toc.xhtml", "OPS/content/toc", "toc.xhtml"),
            ("OPS/content/toc/toc.xhtml", "OPS/content/toc", "./././////./toc.xhtml"),
            ("OPS/content/c1.xhtml", "OPS/content/toc", "../c1.xhtml"),
            ("OPS/c1.xhtml?q=1", "OPS/content/toc", "../../c1.xhtml?q=1"),
            ("c1.xhtml#part-2", "OPS/content/toc", "../../../c1.xhtml#part-2"),
        ];
        for (expected, absolute_dir, relative_href) in cases {
            assert_eq!(expected, resolve(absolute_dir, relative_href));
        }
    }

    #[test]
    fn resolve_percent_decodes_the_path_portion() {
        assert_eq!(resolve("OPS", "chapter%20one.xhtml"), "OPS/chapter one.xhtml");
        assert_eq!(resolve("OPS", "caf%28e%29.xhtml"), "OPS/caf(e).xhtml");
    }

    #[test]
    fn classifies_schemes() {
        assert!(has_scheme("https://ab.c"));
        assert!(has_scheme("mailto:a@b.c"));
        assert_eq!(scheme("https://ab.c"), Some("https"));
        assert!(!has_scheme("1https://ab.c"));
        assert!(!has_scheme(":abc"));
        assert!(!has_scheme(""));
        assert!(!has_scheme("not a scheme:..."));
    }

    #[test]
    fn resolver_resolves_from_parent_of_referencing_path() {
        let resolver = UriResolver::parent_of("OPS/content/toc/toc.xhtml");
        assert_eq!(resolver.resolve("../c1.xhtml"), "OPS/content/c1.xhtml");
    }
}
