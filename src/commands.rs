//! FTP command builders (RFC 959 plus the extensions this client uses)

/// Build USER command
pub fn user(username: &str) -> String {
    format!("USER {username}")
}

/// Build PASS command
pub fn pass(password: &str) -> String {
    format!("PASS {password}")
}

/// Build AUTH TLS command (RFC 4217 explicit FTPS upgrade)
pub fn auth_tls() -> &'static str {
    "AUTH TLS"
}

/// Build PBSZ command (protection buffer size, always 0 for TLS streams)
pub fn pbsz_zero() -> &'static str {
    "PBSZ 0"
}

/// Build PROT command, `level` is typically "P" (private) or "C" (clear)
pub fn prot(level: &str) -> String {
    format!("PROT {level}")
}

/// Build FEAT command
pub fn feat() -> &'static str {
    "FEAT"
}

/// Build SYST command
pub fn syst() -> &'static str {
    "SYST"
}

/// Build PWD command
pub fn pwd() -> &'static str {
    "PWD"
}

/// Build TYPE command, `mode` is "A" (ASCII) or "I" (binary/image)
pub fn type_(mode: &str) -> String {
    format!("TYPE {mode}")
}

/// Build OPTS UTF8 ON command
pub fn opts_utf8_on() -> &'static str {
    "OPTS UTF8 ON"
}

/// Build CWD command
pub fn cwd(path: &str) -> String {
    format!("CWD {path}")
}

/// Build CDUP command
pub fn cdup() -> &'static str {
    "CDUP"
}

/// Build MKD command
pub fn mkd(path: &str) -> String {
    format!("MKD {path}")
}

/// Build RMD command
pub fn rmd(path: &str) -> String {
    format!("RMD {path}")
}

/// Build SITE MKDIR command (non-standard but widely supported fallback)
pub fn site_mkdir(path: &str) -> String {
    format!("SITE MKDIR {path}")
}

/// Build SITE RMDIR command
pub fn site_rmdir(path: &str) -> String {
    format!("SITE RMDIR {path}")
}

/// Build arbitrary SITE command
pub fn site(argument: &str) -> String {
    format!("SITE {argument}")
}

/// Build DELE command
pub fn dele(path: &str) -> String {
    format!("DELE {path}")
}

/// Build RNFR command
pub fn rnfr(path: &str) -> String {
    format!("RNFR {path}")
}

/// Build RNTO command
pub fn rnto(path: &str) -> String {
    format!("RNTO {path}")
}

/// Build SIZE command (RFC 3659)
pub fn size(path: &str) -> String {
    format!("SIZE {path}")
}

/// Build MDTM command (RFC 3659)
pub fn mdtm(path: &str) -> String {
    format!("MDTM {path}")
}

/// Build PASV command
pub fn pasv() -> &'static str {
    "PASV"
}

/// Build MODE command, `mode` is "S" (stream, default) or "Z" (deflate compressed)
pub fn mode(mode: &str) -> String {
    format!("MODE {mode}")
}

/// Build LIST command
pub fn list(path: Option<&str>) -> String {
    match path {
        Some(p) => format!("LIST {p}"),
        None => "LIST".to_string(),
    }
}

/// Build LIST command with the `-A` flag (show dotfiles), as used by `list(path, all=true)`
pub fn list_all(path: Option<&str>) -> String {
    match path {
        Some(p) => format!("LIST -A {p}"),
        None => "LIST -A".to_string(),
    }
}

/// Build MLSD command (RFC 3659)
pub fn mlsd(path: Option<&str>) -> String {
    match path {
        Some(p) => format!("MLSD {p}"),
        None => "MLSD".to_string(),
    }
}

/// Build NLST command
pub fn nlst(path: Option<&str>) -> String {
    match path {
        Some(p) => format!("NLST {p}"),
        None => "NLST".to_string(),
    }
}

/// Build RETR command
pub fn retr(path: &str) -> String {
    format!("RETR {path}")
}

/// Build STOR command
pub fn stor(path: &str) -> String {
    format!("STOR {path}")
}

/// Build APPE command
pub fn appe(path: &str) -> String {
    format!("APPE {path}")
}

/// Build REST command (restart marker, bytes offset)
pub fn rest(offset: u64) -> String {
    format!("REST {offset}")
}

/// Build ABOR command
pub fn abor() -> &'static str {
    "ABOR"
}

/// Build STAT command
pub fn stat(path: Option<&str>) -> String {
    match path {
        Some(p) => format!("STAT {p}"),
        None => "STAT".to_string(),
    }
}

/// Build NOOP command
pub fn noop() -> &'static str {
    "NOOP"
}

/// Build QUIT command
pub fn quit() -> &'static str {
    "QUIT"
}
