//! File metadata verbs: SIZE, MDTM, SYST, STAT, SITE, and the ASCII/binary
//! transfer-type switch.

use super::state::TransferType;
use super::FtpClient;
use crate::commands;
use crate::error::{FtpError, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

impl FtpClient {
    /// Size of a remote file in bytes (RFC 3659 SIZE). Meaningless for
    /// directories on most servers — use `list` instead.
    pub async fn size(&mut self, path: &str) -> Result<u64> {
        let resp = self
            .dispatch_simple("SIZE", Some(path.to_string()), &commands::size(path))
            .await?;
        if !resp.is_success() {
            return Err(FtpError::from_reply(resp.code, resp.text().to_string()));
        }
        resp.text()
            .trim()
            .parse::<u64>()
            .map_err(|_| FtpError::ProtocolError(format!("unparseable SIZE reply: {}", resp.text())))
    }

    /// Last-modified time of a remote file (RFC 3659 MDTM), as UTC.
    pub async fn last_modified(&mut self, path: &str) -> Result<DateTime<Utc>> {
        let resp = self
            .dispatch_simple("MDTM", Some(path.to_string()), &commands::mdtm(path))
            .await?;
        if !resp.is_success() {
            return Err(FtpError::from_reply(resp.code, resp.text().to_string()));
        }
        parse_mdtm(resp.text().trim())
            .ok_or_else(|| FtpError::ProtocolError(format!("unparseable MDTM reply: {}", resp.text())))
    }

    /// Server system type string (RFC 959 SYST), e.g. "UNIX Type: L8".
    pub async fn system(&mut self) -> Result<String> {
        let resp = self.dispatch_simple("SYST", None, commands::syst()).await?;
        if resp.is_success() {
            Ok(resp.text().to_string())
        } else {
            Err(FtpError::from_reply(resp.code, resp.text().to_string()))
        }
    }

    /// Raw STAT reply, optionally scoped to a path.
    pub async fn status(&mut self, path: Option<&str>) -> Result<String> {
        let cmd = commands::stat(path);
        let resp = self
            .dispatch_simple("STAT", path.map(str::to_string), &cmd)
            .await?;
        Ok(resp.lines.join("\n"))
    }

    /// Send an arbitrary `SITE <argument>` command and return its reply text.
    pub async fn site(&mut self, argument: &str) -> Result<String> {
        let cmd = commands::site(argument);
        let resp = self
            .dispatch_simple("SITE", Some(argument.to_string()), &cmd)
            .await?;
        if resp.is_success() {
            Ok(resp.text().to_string())
        } else {
            Err(FtpError::from_reply(resp.code, resp.text().to_string()))
        }
    }

    /// Switch to ASCII (TYPE A) transfer mode. Transfers after this call are
    /// line-ending translated by the server; binary data should stay in
    /// `binary` mode (the default after login).
    pub async fn ascii(&mut self) -> Result<()> {
        let resp = self.dispatch_simple("TYPE", Some("A".into()), &commands::type_("A")).await?;
        if !resp.is_success() {
            return Err(FtpError::from_reply(resp.code, resp.text().to_string()));
        }
        self.transfer_type = TransferType::Ascii;
        Ok(())
    }

    /// Switch to binary (TYPE I) transfer mode.
    pub async fn binary(&mut self) -> Result<()> {
        let resp = self.dispatch_simple("TYPE", Some("I".into()), &commands::type_("I")).await?;
        if !resp.is_success() {
            return Err(FtpError::from_reply(resp.code, resp.text().to_string()));
        }
        self.transfer_type = TransferType::Binary;
        Ok(())
    }
}

/// Parse the RFC 3659 `YYYYMMDDHHMMSS[.sss]` timestamp MDTM replies with.
fn parse_mdtm(text: &str) -> Option<DateTime<Utc>> {
    let digits = text.split('.').next().unwrap_or(text);
    let naive = NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S").ok()?;
    Some(Utc.from_utc_datetime(&naive))
}
