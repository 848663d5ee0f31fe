//! Directory listing: the `FileItem` record and the pluggable parser that
//! turns a LIST/MLSD response body into a `Vec<FileItem>`.
//!
//! The parser is an external collaborator by design — callers working
//! against an unusual server can supply their own `ListingParser` via
//! `FtpConfig::with_listing_parser` instead of patching this crate.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::collections::HashMap;
use std::fmt;

/// What kind of filesystem entry a `FileItem` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

/// One entry returned by `list()`.
#[derive(Debug, Clone)]
pub struct FileItem {
    pub name: String,
    pub kind: FileKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Raw `rwxrwxrwx`-style permission string, if the source format carried one
    pub permissions: Option<String>,
    /// Standard octal permission bits (e.g. 0o755), derived from `permissions`
    pub permission_bits: Option<u32>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub link_target: Option<String>,
    /// MLSD facts, if the entry came from an MLSD response
    pub facts: HashMap<String, String>,
}

/// Turns a listing response body into structured entries.
///
/// Implementations must be `Send + Sync` since the engine may hold a
/// `Arc<dyn ListingParser>` shared across an async client.
pub trait ListingParser: Send + Sync {
    fn parse(&self, body: &str) -> Vec<FileItem>;
}

impl fmt::Debug for dyn ListingParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn ListingParser")
    }
}

/// Default parser recognizing MLSD facts, Unix `ls -l`, and Windows/IIS
/// listing styles, falling back to a bare filename entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultListingParser;

impl ListingParser for DefaultListingParser {
    fn parse(&self, body: &str) -> Vec<FileItem> {
        body.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(parse_line)
            .filter(|e| e.name != "." && e.name != "..")
            .collect()
    }
}

fn parse_line(line: &str) -> Option<FileItem> {
    if line.contains(';') && line.contains('=') {
        if let Some(item) = parse_mlsd(line) {
            return Some(item);
        }
    }
    if let Some(item) = parse_unix(line) {
        return Some(item);
    }
    if let Some(item) = parse_windows(line) {
        return Some(item);
    }
    Some(FileItem {
        name: line.to_string(),
        kind: FileKind::Unknown,
        size: 0,
        modified: None,
        permissions: None,
        permission_bits: None,
        owner: None,
        group: None,
        link_target: None,
        facts: HashMap::new(),
    })
}

/// Byte offset of the start of the `n`th whitespace-delimited token in `line`
/// (1-indexed), returning everything from there to the end of the line.
fn name_after_nth_token(line: &str, n: usize) -> String {
    let bytes = line.as_bytes();
    let mut idx = 0;
    let mut seen = 0;
    let mut in_token = false;
    while idx < bytes.len() {
        let is_ws = bytes[idx].is_ascii_whitespace();
        if !is_ws && !in_token {
            in_token = true;
            seen += 1;
            if seen == n + 1 {
                break;
            }
        } else if is_ws {
            in_token = false;
        }
        idx += 1;
    }
    line[idx..].to_string()
}

fn parse_mlsd(line: &str) -> Option<FileItem> {
    let (facts_str, name) = if let Some(pos) = line.find("; ") {
        (&line[..pos + 1], line[pos + 2..].to_string())
    } else if let Some(pos) = line.rfind(' ') {
        (&line[..pos], line[pos + 1..].to_string())
    } else {
        return None;
    };
    if name.is_empty() {
        return None;
    }

    let mut facts = HashMap::new();
    for segment in facts_str.split(';') {
        let segment = segment.trim();
        if let Some((k, v)) = segment.split_once('=') {
            facts.insert(k.to_lowercase(), v.to_string());
        }
    }

    let kind = match facts.get("type").map(|s| s.to_lowercase()).as_deref() {
        Some("dir") | Some("cdir") | Some("pdir") => FileKind::Directory,
        Some("file") => FileKind::File,
        Some(t) if t.contains("slink") || t.contains("symlink") => FileKind::Symlink,
        _ => FileKind::Unknown,
    };
    let size = facts.get("size").and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
    let modified = facts.get("modify").and_then(|v| parse_mlsd_time(v));
    let permissions = facts.get("unix.mode").cloned();
    let permission_bits = permissions.as_deref().and_then(parse_octal_mode);

    Some(FileItem {
        name,
        kind,
        size,
        modified,
        permissions,
        permission_bits,
        owner: facts.get("unix.owner").cloned(),
        group: facts.get("unix.group").cloned(),
        link_target: None,
        facts,
    })
}

fn parse_mlsd_time(s: &str) -> Option<DateTime<Utc>> {
    let base = if s.len() >= 14 { &s[..14] } else { s };
    NaiveDateTime::parse_from_str(base, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// `unix.mode` in an MLSD fact is already octal digits (e.g. "0755").
fn parse_octal_mode(s: &str) -> Option<u32> {
    u32::from_str_radix(s.trim_start_matches('0'), 8).ok().or(Some(0))
}

fn parse_unix(line: &str) -> Option<FileItem> {
    // Unix listings are whitespace-delimited but the filename (field 9) may
    // itself contain spaces, so tokenize the first 8 fields and treat
    // whatever follows the 8th as the name, preserving its original spacing.
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 9 {
        return None;
    }
    let perms = tokens[0];
    if perms.len() != 10 || !matches!(perms.as_bytes()[0], b'd' | b'l' | b'-' | b'c' | b'b' | b's' | b'p') {
        return None;
    }
    let owner = tokens[2].to_string();
    let group = tokens[3].to_string();
    let size: u64 = tokens[4].parse().ok()?;
    let date_str = format!("{} {} {}", tokens[5], tokens[6], tokens[7]);

    let name_raw = name_after_nth_token(line, 8);
    if name_raw.is_empty() {
        return None;
    }

    let kind = match perms.as_bytes()[0] {
        b'd' => FileKind::Directory,
        b'l' => FileKind::Symlink,
        b'-' => FileKind::File,
        _ => FileKind::Unknown,
    };

    let (name, link_target) = if kind == FileKind::Symlink {
        match name_raw.find(" -> ") {
            Some(pos) => (name_raw[..pos].to_string(), Some(name_raw[pos + 4..].to_string())),
            None => (name_raw, None),
        }
    } else {
        (name_raw, None)
    };

    Some(FileItem {
        name,
        kind,
        size,
        modified: parse_unix_date(&date_str),
        permission_bits: parse_rwx_mode(perms),
        permissions: Some(perms.to_string()),
        owner: Some(owner),
        group: Some(group),
        link_target,
        facts: HashMap::new(),
    })
}

/// Convert a `rwxrwxrwx`-style string into standard octal permission bits.
///
/// Each rwx triplet maps independently to a digit 0..=7 (r=4, w=2, x=1
/// summed); this is the conventional POSIX mapping, not a bit-position
/// formula.
fn parse_rwx_mode(perms: &str) -> Option<u32> {
    let bits = perms.as_bytes();
    if bits.len() != 10 {
        return None;
    }
    let triplet = |r: u8, w: u8, x: u8| -> u32 {
        (if r != b'-' { 4 } else { 0 }) + (if w != b'-' { 2 } else { 0 }) + (if x != b'-' && x != b'S' && x != b'T' { 1 } else { 0 })
    };
    let owner = triplet(bits[1], bits[2], bits[3]);
    let group = triplet(bits[4], bits[5], bits[6]);
    let other = triplet(bits[7], bits[8], bits[9]);
    Some(owner * 64 + group * 8 + other)
}

fn parse_unix_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let normalised: String = s.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Ok(dt) = NaiveDateTime::parse_from_str(
        &format!("{} {}", Utc::now().format("%Y"), normalised),
        "%Y %b %d %H:%M",
    ) {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&normalised, "%b %d %Y") {
        let dt = date.and_time(NaiveTime::from_hms_opt(0, 0, 0)?);
        return Some(Utc.from_utc_datetime(&dt));
    }
    None
}

fn parse_windows(line: &str) -> Option<FileItem> {
    let tokens: Vec<&str> = line.splitn(4, char::is_whitespace).filter(|s| !s.is_empty()).collect();
    if tokens.len() < 4 {
        return None;
    }
    let date_str = tokens[0];
    if date_str.len() != 8 || date_str.as_bytes()[2] != b'-' || date_str.as_bytes()[5] != b'-' {
        return None;
    }
    let time_str = tokens[1];
    let size_or_dir = tokens[2];
    let name = tokens[3].to_string();

    let (kind, size) = if size_or_dir.eq_ignore_ascii_case("<dir>") {
        (FileKind::Directory, 0)
    } else {
        match size_or_dir.parse::<u64>() {
            Ok(n) => (FileKind::File, n),
            Err(_) => return None,
        }
    };

    Some(FileItem {
        name,
        kind,
        size,
        modified: parse_windows_date(date_str, time_str),
        permissions: None,
        permission_bits: None,
        owner: None,
        group: None,
        link_target: None,
        facts: HashMap::new(),
    })
}

fn parse_windows_date(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let combined = format!("{} {}", date, time);
    if let Ok(dt) = NaiveDateTime::parse_from_str(&combined, "%m-%d-%y %I:%M%p") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&combined, "%m-%d-%y %H:%M") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_file() {
        let items = DefaultListingParser.parse("-rw-r--r--   1 user group  1234 Jan  1 12:00 readme.txt");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "readme.txt");
        assert_eq!(items[0].kind, FileKind::File);
        assert_eq!(items[0].size, 1234);
        assert_eq!(items[0].permission_bits, Some(0o644));
    }

    #[test]
    fn unix_dir() {
        let items = DefaultListingParser.parse("drwxr-xr-x   2 root root  4096 Mar  1 09:30 subdir");
        assert_eq!(items[0].kind, FileKind::Directory);
        assert_eq!(items[0].permission_bits, Some(0o755));
    }

    #[test]
    fn unix_symlink_with_target() {
        let items = DefaultListingParser.parse("lrwxrwxrwx   1 root root    22 Jan  5 08:00 link -> /var/target");
        assert_eq!(items[0].kind, FileKind::Symlink);
        assert_eq!(items[0].link_target.as_deref(), Some("/var/target"));
        assert_eq!(items[0].name, "link");
    }

    #[test]
    fn mlsd_file() {
        let items = DefaultListingParser.parse("type=file;size=1024;modify=20260101120000; example.bin");
        assert_eq!(items[0].name, "example.bin");
        assert_eq!(items[0].kind, FileKind::File);
        assert_eq!(items[0].size, 1024);
        assert!(items[0].modified.is_some());
    }

    #[test]
    fn filters_dot_entries() {
        let body = "type=dir;; .\ntype=dir;; ..\ntype=file;size=10;; real.txt";
        let items = DefaultListingParser.parse(body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "real.txt");
    }

    #[test]
    fn windows_dir() {
        let items = DefaultListingParser.parse("01-01-26  12:00AM      <DIR> My Documents");
        assert_eq!(items[0].kind, FileKind::Directory);
        assert_eq!(items[0].name, "My Documents");
    }

    #[test]
    fn unparseable_line_falls_back_to_raw_name() {
        let items = DefaultListingParser.parse("not a listing line at all");
        assert_eq!(items[0].kind, FileKind::Unknown);
    }
}
