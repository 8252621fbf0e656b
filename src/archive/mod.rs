//! Container Reader (spec.md §4.1): OCF byte-level invariants plus
//! general-purpose entry access.
//!
//! Two layers cooperate here, matching the split between the teacher's
//! high-level `ZipArchive` wrapper and the byte-level scanner an EPUB
//! validator needs but a general-purpose ZIP crate does not expose:
//!
//! - [`zip::ZipArchive`] handles decompression and entry listing for every
//!   check that only cares about *content*.
//! - [`scan_ocf`] re-reads the same bytes by hand to check what the `zip`
//!   crate's API cannot answer: is `mimetype` the very first local header,
//!   stored rather than deflated, free of an extra field or a data
//!   descriptor bit (PKG-006/007/008/009)?

use std::io::{Cursor, Read};

use crate::report::{Finding, Location, Severity};

const SIG_LOCAL_FILE_HEADER: u32 = 0x0403_4b50;
const MIMETYPE_NAME: &str = "mimetype";
const MIMETYPE_CONTENT: &str = "application/epub+zip";

/// An opened OCF container: decompressible entries plus the raw bytes
/// needed for the byte-level checks.
pub(crate) struct Container {
    raw: Vec<u8>,
    zip: zip::ZipArchive<Cursor<Vec<u8>>>,
}

/// Failure opening `bytes` as a ZIP archive at all (spec.md PKG-003, fatal).
#[derive(Debug)]
pub(crate) struct OpenError(pub(crate) String);

impl Container {
    pub(crate) fn open(bytes: Vec<u8>) -> Result<Self, OpenError> {
        let zip = zip::ZipArchive::new(Cursor::new(bytes.clone()))
            .map_err(|error| OpenError(error.to_string()))?;
        Ok(Self { raw: bytes, zip })
    }

    /// A synthetic single-entry container used by single-file mode
    /// (SPEC_FULL.md §B), wrapping a standalone `.opf`/`.xhtml` file.
    pub(crate) fn synthetic(entry_name: &str, content: Vec<u8>) -> Self {
        let mut bytes = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut bytes));
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            let _ = writer.start_file(entry_name, options);
            use std::io::Write as _;
            let _ = writer.write_all(&content);
            let _ = writer.finish();
        }
        Self::open(bytes).expect("synthetic single-entry archive is always a valid zip")
    }

    /// All entry names in the container (directories excluded).
    pub(crate) fn entry_names(&self) -> Vec<String> {
        self.zip
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_owned)
            .collect()
    }

    /// `true` if `path` names an entry in the container (exact, case-sensitive).
    pub(crate) fn contains(&self, path: &str) -> bool {
        self.zip.file_names().any(|name| name == path)
    }

    /// Reads `path`'s decompressed bytes, or `None` if absent/unreadable.
    pub(crate) fn read_bytes(&mut self, path: &str) -> Option<Vec<u8>> {
        let mut file = self.zip.by_name(path).ok()?;
        let mut buffer = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buffer).ok()?;
        Some(buffer)
    }

    /// Reads `path`'s decompressed bytes, capped at `max_bytes`; returns
    /// `None` if the entry is absent and `Some(Err(()))` sentinel-style via
    /// the bool flag when the cap is exceeded (PKG-025).
    pub(crate) fn read_bytes_capped(&mut self, path: &str, max_bytes: u64) -> CappedRead {
        let Ok(mut file) = self.zip.by_name(path) else {
            return CappedRead::Missing;
        };
        if file.size() > max_bytes {
            return CappedRead::TooLarge;
        }
        let mut buffer = Vec::with_capacity(file.size() as usize);
        match file.read_to_end(&mut buffer) {
            Ok(_) => CappedRead::Ok(buffer),
            Err(_) => CappedRead::Missing,
        }
    }

    /// Decoded UTF-8 text of `path`, transcoding from UTF-16 if BOM-marked.
    pub(crate) fn read_text(&mut self, path: &str) -> Option<String> {
        self.read_bytes(path)
            .and_then(|bytes| crate::util::utf::into_utf8_str(bytes).ok())
    }

    /// Decoded UTF-8 text of `path`, or `None` if absent, unreadable, *or*
    /// its declared uncompressed size exceeds `max_bytes` (spec.md §5: an
    /// over-cap entry "emits PKG-025 and is skipped"; the finding itself is
    /// raised once, up front, by [`Self::container_findings`]).
    pub(crate) fn read_text_capped(&mut self, path: &str, max_bytes: u64) -> Option<String> {
        match self.read_bytes_capped(path, max_bytes) {
            CappedRead::Ok(bytes) => crate::util::utf::into_utf8_str(bytes).ok(),
            CappedRead::Missing | CappedRead::TooLarge => None,
        }
    }

    /// Runs the OCF byte-level invariants on the raw archive bytes
    /// (PKG-006/007/008/009) plus entry-level checks that need the `zip`
    /// crate's decompressed view (PKG-025 size cap, RSC-004 name safety,
    /// PKG-014 encryption).
    pub(crate) fn container_findings(&mut self, max_entry_bytes: u64) -> Vec<Finding> {
        let mut findings = scan_ocf(&self.raw);
        let has_encryption_manifest = self.contains("META-INF/encryption.xml");
        for index in 0..self.zip.len() {
            if let Ok(file) = self.zip.by_index(index) {
                let name = file.name().to_owned();
                if file.size() > max_entry_bytes {
                    findings.push(Finding::new(
                        Severity::Error,
                        "PKG-025",
                        format!(
                            "entry '{name}' decompresses to {} bytes, exceeding the {max_entry_bytes}-byte cap",
                            file.size()
                        ),
                        Some(Location::path(name.clone())),
                    ));
                }
                if let Some(reason) = unsafe_entry_name_reason(&name) {
                    findings.push(Finding::new(
                        Severity::Error,
                        "RSC-004",
                        format!("entry name '{name}' is unsafe: {reason}"),
                        Some(Location::path(name.clone())),
                    ));
                }
                if file.encrypted() && !has_encryption_manifest {
                    findings.push(Finding::new(
                        Severity::Error,
                        "PKG-014",
                        format!("entry '{name}' is encrypted, but META-INF/encryption.xml is absent"),
                        Some(Location::path(name)),
                    ));
                }
            }
        }
        findings
    }
}

pub(crate) enum CappedRead {
    Ok(Vec<u8>),
    Missing,
    TooLarge,
}

/// Why `name` violates OCF's entry-name rules (spec.md §3 "Invariants
/// (container-level)"), or `None` if it is safe. Checked against every entry,
/// not just `mimetype`, since a traversal or absolute path anywhere in the
/// archive is equally unsafe to extract.
fn unsafe_entry_name_reason(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("entry name is empty");
    }
    if name.starts_with('/') {
        return Some("entry name is an absolute path");
    }
    if name.contains('\\') {
        return Some("entry name contains a backslash");
    }
    if name.split('/').any(|component| component == "..") {
        return Some("entry name traverses outside the archive root");
    }
    if name.chars().any(|c| c.is_control()) {
        return Some("entry name contains a control character");
    }
    None
}

/// Reads a little-endian `u16`/`u32` out of `buf` at `offset`, or `None` if
/// out of bounds.
fn u16_at(buf: &[u8], offset: usize) -> Option<u16> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Hand-scans the first local file header in `raw` to verify the four
/// byte-level invariants a general ZIP API does not surface.
fn scan_ocf(raw: &[u8]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let location = Some(Location::archive());

    let error = |id, message: String| {
        Finding::new(Severity::Error, id, message, location.clone())
    };

    let Some(signature) = u32_at(raw, 0) else {
        findings.push(error("PKG-006", "archive is too short to contain a local file header".into()));
        return findings;
    };
    if signature != SIG_LOCAL_FILE_HEADER {
        findings.push(error(
            "PKG-006",
            "the first bytes of the archive are not a ZIP local file header".into(),
        ));
        return findings;
    }

    let Some(general_purpose_flag) = u16_at(raw, 6) else {
        return findings;
    };
    let Some(method) = u16_at(raw, 8) else {
        return findings;
    };
    let Some(name_len) = u16_at(raw, 26).map(usize::from) else {
        return findings;
    };
    let Some(extra_len) = u16_at(raw, 28).map(usize::from) else {
        return findings;
    };

    let name_start = 30;
    let Some(name_bytes) = raw.get(name_start..name_start + name_len) else {
        return findings;
    };
    let name = String::from_utf8_lossy(name_bytes);

    if name != MIMETYPE_NAME {
        findings.push(error(
            "PKG-006",
            format!("the first entry in the archive is '{name}', not 'mimetype'"),
        ));
        return findings;
    }

    const METHOD_STORED: u16 = 0;
    if method != METHOD_STORED {
        findings.push(error(
            "PKG-007",
            "the mimetype entry is compressed; it must be stored".into(),
        ));
    }

    const DATA_DESCRIPTOR_BIT: u16 = 0x0008;
    if extra_len != 0 || general_purpose_flag & DATA_DESCRIPTOR_BIT != 0 {
        findings.push(error(
            "PKG-008",
            "the mimetype entry carries an extra field or a data descriptor".into(),
        ));
    }

    let data_start = name_start + name_len + extra_len;
    let Some(content_len) = u32_at(raw, 18).map(|n| n as usize) else {
        return findings;
    };
    match raw.get(data_start..data_start + content_len) {
        Some(content) if content == MIMETYPE_CONTENT.as_bytes() => {}
        _ => findings.push(error(
            "PKG-009",
            format!("the mimetype entry's content is not exactly '{MIMETYPE_CONTENT}'"),
        )),
    }

    findings
}
