//! CSS stylesheet checks (spec.md §4.6 table, row 3).
//!
//! A lightweight text scan rather than a full CSS parser, consistent with
//! spec.md §1's "targeted content-model pattern matching" rather than deep
//! schema validation.

use crate::report::{Finding, Location, Severity};

use super::{Reference, RefKind};

pub(crate) struct CssScan {
    pub(crate) findings: Vec<Finding>,
    pub(crate) references: Vec<Reference>,
}

pub(crate) fn scan(text: &str, path: &str) -> CssScan {
    let mut findings = Vec::new();
    let mut references = Vec::new();

    check_balanced_braces(text, path, &mut findings);
    check_charset(text, path, &mut findings);
    check_forbidden_properties(text, path, &mut findings);
    collect_imports(text, path, &mut findings, &mut references);
    collect_font_faces(text, path, &mut findings, &mut references);
    collect_background_images(text, &mut references);

    CssScan { findings, references }
}

fn check_balanced_braces(text: &str, path: &str, findings: &mut Vec<Finding>) {
    let mut depth = 0i32;
    for ch in text.chars() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    findings.push(Finding::new(
                        Severity::Error,
                        "CSS-001",
                        "stylesheet has an unmatched closing brace",
                        Some(Location::path(path)),
                    ));
                    return;
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        findings.push(Finding::new(
            Severity::Error,
            "CSS-001",
            "stylesheet has unbalanced braces",
            Some(Location::path(path)),
        ));
    }
}

fn check_charset(text: &str, path: &str, findings: &mut Vec<Finding>) {
    let Some(rest) = text.trim_start().strip_prefix("@charset") else {
        return;
    };
    let rest = rest.trim_start();
    let value = rest
        .trim_start_matches('"')
        .trim_start_matches('\'')
        .split(['"', '\'', ';'])
        .next()
        .unwrap_or_default();
    if !value.eq_ignore_ascii_case("utf-8") && !value.eq_ignore_ascii_case("utf-16") {
        findings.push(Finding::new(
            Severity::Error,
            "CSS-003",
            format!("@charset '{value}' must be utf-8 or utf-16"),
            Some(Location::path(path)),
        ));
    }
}

/// `true` if `text` contains a top-level `property: ...` declaration, not a
/// substring match inside a longer identifier or selector.
fn declares_property(text: &str, property: &str) -> bool {
    for (index, _) in text.match_indices(property) {
        let prefix = text[..index].trim_end();
        let prefix_ok = prefix.is_empty() || prefix.ends_with('{') || prefix.ends_with(';');
        if !prefix_ok {
            continue;
        }
        let after = text[index + property.len()..].trim_start();
        if after.starts_with(':') {
            return true;
        }
    }
    false
}

fn check_forbidden_properties(text: &str, path: &str, findings: &mut Vec<Finding>) {
    for property in ["direction", "unicode-bidi"] {
        if declares_property(text, property) {
            findings.push(Finding::new(
                Severity::Warning,
                "CSS-002",
                format!(
                    "stylesheet sets '{property}' directly; let the reading system control directionality"
                ),
                Some(Location::path(path)),
            ));
        }
    }
}

/// Extracts the target of a CSS `url(...)` or bare quoted string starting at
/// the front of `rest`, trimming any surrounding quotes.
fn extract_url_or_string(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    if let Some(inner) = rest.strip_prefix("url(") {
        let end = inner.find(')')?;
        let raw = inner[..end].trim().trim_matches(|c| c == '"' || c == '\'');
        return Some(raw.to_string());
    }
    let quote = rest.chars().next()?;
    if quote == '"' || quote == '\'' {
        let end = rest[1..].find(quote)? + 1;
        return Some(rest[1..end].to_string());
    }
    None
}

fn collect_imports(
    text: &str,
    path: &str,
    findings: &mut Vec<Finding>,
    references: &mut Vec<Reference>,
) {
    for (index, _) in text.match_indices("@import") {
        findings.push(Finding::new(
            Severity::Info,
            "CSS-004",
            "@import is discouraged in EPUB stylesheets",
            Some(Location::path(path)),
        ));
        if let Some(href) = extract_url_or_string(&text[index + "@import".len()..]) {
            references.push(Reference {
                raw_href: href,
                kind: RefKind::Import,
            });
        }
    }
}

fn find_matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (index, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn collect_font_faces(
    text: &str,
    path: &str,
    findings: &mut Vec<Finding>,
    references: &mut Vec<Reference>,
) {
    for (index, _) in text.match_indices("@font-face") {
        let tail = &text[index..];
        let Some(brace_start) = tail.find('{') else {
            continue;
        };
        let Some(brace_end) = find_matching_brace(&tail[brace_start..]) else {
            continue;
        };
        let body = &tail[brace_start + 1..brace_start + brace_end];

        let mut found_src = false;
        for (offset, _) in body.match_indices("src") {
            let prefix = body[..offset].trim_end();
            if !(prefix.is_empty() || prefix.ends_with('{') || prefix.ends_with(';')) {
                continue;
            }
            let after = body[offset + "src".len()..].trim_start();
            let Some(after) = after.strip_prefix(':') else {
                continue;
            };
            found_src = true;
            if let Some(href) = extract_url_or_string(after) {
                references.push(Reference {
                    raw_href: href,
                    kind: RefKind::FontFaceSrc,
                });
            }
        }
        if !found_src {
            findings.push(Finding::new(
                Severity::Warning,
                "CSS-006",
                "@font-face has no src descriptor",
                Some(Location::path(path)),
            ));
        }
    }
}

fn collect_background_images(text: &str, references: &mut Vec<Reference>) {
    for property in ["background-image", "background"] {
        for (index, _) in text.match_indices(property) {
            let prefix = text[..index].trim_end();
            let prefix_ok = prefix.is_empty() || prefix.ends_with('{') || prefix.ends_with(';');
            if !prefix_ok {
                continue;
            }
            let after = text[index + property.len()..].trim_start();
            let Some(after) = after.strip_prefix(':') else {
                continue;
            };
            let value_end = after.find(';').unwrap_or(after.len());
            if let Some(href) = extract_url_or_string(&after[..value_end]) {
                references.push(Reference {
                    raw_href: href,
                    kind: RefKind::BackgroundImage,
                });
            }
        }
    }
}
