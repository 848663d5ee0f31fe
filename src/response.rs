//! FTP response framing (RFC 959 §4) and the PASV/FEAT micro-parsers that read it.
//!
//! `parse_frame` is a pure, stateless function: it never retains state between
//! calls and never blocks. The connection layer repeatedly feeds it the bytes
//! read so far from the control socket; each call either returns a complete
//! frame plus how many leading bytes it consumed, or `Ok(None)` meaning "not
//! enough data yet, read more and call again".

use crate::error::{FtpError, Result};
use std::net::Ipv4Addr;

/// A complete FTP control-channel reply: one 3-digit code plus every line that
/// belongs to it (a single line for simple replies, several for multi-line
/// replies like FEAT or a directory listing banner).
#[derive(Debug, Clone)]
pub struct FtpResponse {
    /// 3-digit reply code shared by every line of this reply
    pub code: u16,
    /// Every line of the reply, in order, without the trailing CRLF
    pub lines: Vec<String>,
}

impl FtpResponse {
    /// Text of the final line, with the leading "CODE " or "CODE-" stripped
    pub fn text(&self) -> &str {
        let last = self.lines.last().map(String::as_str).unwrap_or("");
        match leading_code(last) {
            Some((_, _, rest)) => rest,
            None => last,
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 1xx
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 4xx or 5xx
    pub fn is_error(&self) -> bool {
        self.code >= 400
    }
}

/// Passive-mode data channel address, parsed from a 227 reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveAddr {
    /// Data channel IP address
    pub ip: Ipv4Addr,
    /// Data channel port
    pub port: u16,
}

/// Scan `line` for a leading `"DDD-"` or `"DDD "` and split off the code,
/// separator, and remaining text. Returns `None` if `line` does not start
/// with exactly three ASCII digits followed by one of those separators.
fn leading_code(line: &str) -> Option<(u16, u8, &str)> {
    let bytes = line.as_bytes();
    if bytes.len() < 4
        || !bytes[0].is_ascii_digit()
        || !bytes[1].is_ascii_digit()
        || !bytes[2].is_ascii_digit()
    {
        return None;
    }
    let sep = bytes[3];
    if sep != b' ' && sep != b'-' {
        return None;
    }
    let code = line[0..3].parse::<u16>().ok()?;
    Some((code, sep, &line[4..]))
}

/// Try to parse one complete reply frame off the front of `buf`.
///
/// Returns `Ok(Some((response, consumed)))` when a full frame was found —
/// the caller should drop the first `consumed` bytes of `buf` before the next
/// call. Returns `Ok(None)` when `buf` holds only a partial frame. Returns
/// `Err` when the bytes seen so far cannot be a valid reply (e.g. the first
/// line does not start with a 3-digit code).
pub fn parse_frame(buf: &[u8]) -> Result<Option<(FtpResponse, usize)>> {
    let mut consumed = 0usize;
    let mut lines = Vec::new();
    let mut code: Option<u16> = None;

    loop {
        let rest = &buf[consumed..];
        let Some(nl) = rest.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let raw = &rest[..nl];
        let line_bytes = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(line_bytes).into_owned();
        consumed += nl + 1;

        match code {
            None => match leading_code(&line) {
                Some((c, b'-', _)) => {
                    code = Some(c);
                    lines.push(line);
                }
                Some((c, b' ', _)) => {
                    lines.push(line);
                    return Ok(Some((FtpResponse { code: c, lines }, consumed)));
                }
                _ => {
                    return Err(FtpError::ProtocolError(format!(
                        "reply does not start with a 3-digit code: {line:?}"
                    )));
                }
            },
            Some(expected) => {
                let terminates = matches!(leading_code(&line), Some((c, b' ', _)) if c == expected);
                lines.push(line);
                if terminates {
                    return Ok(Some((FtpResponse { code: expected, lines }, consumed)));
                }
            }
        }
    }
}

/// A maximal run of ASCII digits found while scanning response text for a
/// PASV tuple, with its byte span so callers can inspect what separates it
/// from its neighbors.
struct DigitRun {
    value: Option<u64>,
    start: usize,
    end: usize,
}

fn digit_runs(text: &str) -> Vec<DigitRun> {
    let bytes = text.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            runs.push(DigitRun { value: text[start..i].parse().ok(), start, end: i });
        } else {
            i += 1;
        }
    }
    runs
}

/// Parse `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` into an address.
///
/// The six groups are located anywhere in the text, independent of any
/// surrounding parentheses — some servers omit them. We scan for six
/// consecutive digit runs joined by nothing but a comma (and optional
/// whitespace) and take the first such window that fits in a byte each.
pub fn parse_pasv(text: &str) -> Option<PassiveAddr> {
    let runs = digit_runs(text);
    if runs.len() < 6 {
        return None;
    }
    'windows: for window in runs.windows(6) {
        for pair in window.windows(2) {
            if text[pair[0].end..pair[1].start].trim() != "," {
                continue 'windows;
            }
        }
        let mut nums = [0u64; 6];
        for (slot, run) in nums.iter_mut().zip(window) {
            match run.value {
                Some(v) => *slot = v,
                None => continue 'windows,
            }
        }
        if nums.iter().any(|&n| n > 255) {
            continue;
        }
        let ip = Ipv4Addr::new(nums[0] as u8, nums[1] as u8, nums[2] as u8, nums[3] as u8);
        let port = (nums[4] * 256 + nums[5]) as u16;
        return Some(PassiveAddr { ip, port });
    }
    None
}

/// Strip the FEAT banner/terminator lines, returning the trimmed capability
/// tokens in between (e.g. `["MDTM", "SIZE", "UTF8", "MODE Z"]`).
pub fn parse_feat(response: &FtpResponse) -> Vec<String> {
    if response.lines.len() < 2 {
        return Vec::new();
    }
    response.lines[1..response.lines.len() - 1]
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_reply() {
        let buf = b"220 Welcome\r\n";
        let (resp, n) = parse_frame(buf).unwrap().unwrap();
        assert_eq!(resp.code, 220);
        assert_eq!(resp.lines, vec!["220 Welcome"]);
        assert_eq!(n, buf.len());
    }

    #[test]
    fn incomplete_line_returns_none() {
        let buf = b"220 Welc";
        assert!(parse_frame(buf).unwrap().is_none());
    }

    #[test]
    fn multiline_reply() {
        let buf = b"211-Features:\r\n MDTM\r\n SIZE\r\n211 End\r\n";
        let (resp, n) = parse_frame(buf).unwrap().unwrap();
        assert_eq!(resp.code, 211);
        assert_eq!(resp.lines.len(), 4);
        assert_eq!(n, buf.len());
        let feats = parse_feat(&resp);
        assert_eq!(feats, vec!["MDTM", "SIZE"]);
    }

    #[test]
    fn multiline_reply_split_across_two_buffers() {
        let part1 = b"211-Features:\r\n MDTM\r\n";
        assert!(parse_frame(part1).unwrap().is_none());
        let full = b"211-Features:\r\n MDTM\r\n SIZE\r\n211 End\r\n";
        let (resp, _) = parse_frame(full).unwrap().unwrap();
        assert_eq!(resp.code, 211);
    }

    #[test]
    fn trailing_bytes_not_consumed() {
        let buf = b"220 Welcome\r\n230 Logged in\r\n";
        let (resp, n) = parse_frame(buf).unwrap().unwrap();
        assert_eq!(resp.code, 220);
        assert!(n < buf.len());
        let (resp2, n2) = parse_frame(&buf[n..]).unwrap().unwrap();
        assert_eq!(resp2.code, 230);
        assert_eq!(n + n2, buf.len());
    }

    #[test]
    fn malformed_first_line_errors() {
        let buf = b"not a reply\r\n";
        assert!(parse_frame(buf).is_err());
    }

    #[test]
    fn parse_pasv_valid() {
        let addr = parse_pasv("227 Entering Passive Mode (192,168,1,10,200,15)").unwrap();
        assert_eq!(addr.ip, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(addr.port, 200 * 256 + 15);
    }

    #[test]
    fn parse_pasv_invalid() {
        assert!(parse_pasv("227 Entering Passive Mode").is_none());
        assert!(parse_pasv("227 (1,2,3,4,5)").is_none());
    }

    #[test]
    fn parse_pasv_without_parens() {
        let addr = parse_pasv("227 Entering Passive Mode 192,168,1,10,200,15").unwrap();
        assert_eq!(addr.ip, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(addr.port, 200 * 256 + 15);
    }

    #[test]
    fn parse_pasv_rejects_out_of_range_port_group() {
        assert!(parse_pasv("227 Entering Passive Mode (1,2,3,4,256,0)").is_none());
        assert!(parse_pasv("227 Entering Passive Mode (1,2,3,4,0,256)").is_none());
    }

    #[test]
    fn response_text_strips_code() {
        let resp = FtpResponse {
            code: 220,
            lines: vec!["220 Welcome aboard".to_string()],
        };
        assert_eq!(resp.text(), "Welcome aboard");
    }
}
