//! Filesystem navigation verbs: cwd/cdup/pwd, mkdir/rmdir, delete, rename.

use super::FtpClient;
use crate::commands;
use crate::error::{FtpError, Result};

impl FtpClient {
    /// Change the working directory.
    pub async fn cwd(&mut self, path: &str) -> Result<()> {
        let resp = self
            .dispatch_simple("CWD", Some(path.to_string()), &commands::cwd(path))
            .await?;
        if resp.is_success() {
            Ok(())
        } else {
            Err(FtpError::from_reply(resp.code, resp.text().to_string()))
        }
    }

    /// Move up one directory (CDUP).
    pub async fn cdup(&mut self) -> Result<()> {
        let resp = self.dispatch_simple("CDUP", None, commands::cdup()).await?;
        if resp.is_success() {
            Ok(())
        } else {
            Err(FtpError::from_reply(resp.code, resp.text().to_string()))
        }
    }

    /// Current working directory, parsed out of the quoted 257 reply.
    pub async fn pwd(&mut self) -> Result<String> {
        let resp = self.dispatch_simple("PWD", None, commands::pwd()).await?;
        if resp.code != 257 {
            return Err(FtpError::from_reply(resp.code, resp.text().to_string()));
        }
        parse_quoted_path(resp.text())
            .ok_or_else(|| FtpError::ProtocolError(format!("could not parse PWD reply: {}", resp.text())))
    }

    /// Create a directory. `recursive` creates every missing intermediate
    /// component via `SITE MKDIR`, which most servers map onto `mkdir -p`;
    /// a plain `MKD` is used otherwise.
    pub async fn mkdir(&mut self, path: &str, recursive: bool) -> Result<()> {
        let cmd = if recursive {
            commands::site_mkdir(path)
        } else {
            commands::mkd(path)
        };
        let resp = self
            .dispatch_simple("MKD", Some(path.to_string()), &cmd)
            .await?;
        if resp.is_success() {
            Ok(())
        } else {
            Err(FtpError::from_reply(resp.code, resp.text().to_string()))
        }
    }

    /// Remove a directory. `recursive` first tries `SITE RMDIR`; if the
    /// server doesn't support it, falls back to listing the tree and
    /// deleting files and subdirectories deepest-first.
    pub async fn rmdir(&mut self, path: &str, recursive: bool) -> Result<()> {
        if !recursive {
            let resp = self
                .dispatch_simple("RMD", Some(path.to_string()), &commands::rmd(path))
                .await?;
            return if resp.is_success() {
                Ok(())
            } else {
                Err(FtpError::from_reply(resp.code, resp.text().to_string()))
            };
        }

        let resp = self
            .dispatch_simple("RMD", Some(path.to_string()), &commands::site_rmdir(path))
            .await?;
        if resp.is_success() {
            return Ok(());
        }

        self.rmdir_recursive_fallback(path).await
    }

    /// `SITE RMDIR` wasn't understood: enumerate the tree ourselves and tear
    /// it down bottom-up with plain `DELE`/`RMD`.
    async fn rmdir_recursive_fallback(&mut self, path: &str) -> Result<()> {
        let mut directories = vec![path.to_string()];
        let mut stack = vec![path.to_string()];

        while let Some(dir) = stack.pop() {
            for entry in self.list(Some(&dir), true).await? {
                let child_path = format!("{}/{}", dir.trim_end_matches('/'), entry.name);
                match entry.kind {
                    crate::listing::FileKind::Directory => {
                        directories.push(child_path.clone());
                        stack.push(child_path);
                    }
                    _ => {
                        self.delete(&child_path).await?;
                    }
                }
            }
        }

        // deepest paths first so a child is always removed before its parent
        directories.sort_by_key(|p| std::cmp::Reverse(p.matches('/').count()));
        for dir in directories {
            let resp = self
                .dispatch_simple("RMD", Some(dir.clone()), &commands::rmd(&dir))
                .await?;
            if !resp.is_success() {
                return Err(FtpError::from_reply(resp.code, resp.text().to_string()));
            }
        }
        Ok(())
    }

    /// Delete a single file.
    pub async fn delete(&mut self, path: &str) -> Result<()> {
        let resp = self
            .dispatch_simple("DELE", Some(path.to_string()), &commands::dele(path))
            .await?;
        if resp.is_success() {
            Ok(())
        } else {
            Err(FtpError::from_reply(resp.code, resp.text().to_string()))
        }
    }

    /// Rename a file or directory via the RNFR/RNTO pair.
    pub async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let rnfr = self
            .dispatch_simple("RNFR", Some(from.to_string()), &commands::rnfr(from))
            .await?;
        if rnfr.code != 350 {
            return Err(FtpError::from_reply(rnfr.code, rnfr.text().to_string()));
        }
        let rnto = self
            .dispatch_simple("RNTO", Some(to.to_string()), &commands::rnto(to))
            .await?;
        if rnto.is_success() {
            Ok(())
        } else {
            Err(FtpError::from_reply(rnto.code, rnto.text().to_string()))
        }
    }

    /// Whether `path` exists, probed via `SIZE` (falling back to success if
    /// the server answers at all with something other than "no such file").
    pub async fn file_exists(&mut self, path: &str) -> Result<bool> {
        match self.size(path).await {
            Ok(_) => Ok(true),
            Err(FtpError::ServerRejected { code, .. }) if code == 550 => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Parse `"/some/path" created` (RFC 959 §4.1.2) into the quoted path, with
/// `""` doubled inside the quotes unescaped back to a single `"`.
fn parse_quoted_path(text: &str) -> Option<String> {
    let start = text.find('"')?;
    let rest = &text[start + 1..];
    let mut out = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '"' {
            if rest[i + 1..].starts_with('"') {
                out.push('"');
                chars.next();
            } else {
                return Some(out);
            }
        } else {
            out.push(c);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quoted_path_simple() {
        assert_eq!(parse_quoted_path(r#""/pub/incoming" is current directory"#), Some("/pub/incoming".to_string()));
    }

    #[test]
    fn parse_quoted_path_escaped_quote() {
        assert_eq!(parse_quoted_path(r#""/a""b" created"#), Some(r#"/a"b"#.to_string()));
    }

    #[test]
    fn parse_quoted_path_missing_quotes() {
        assert_eq!(parse_quoted_path("no quotes here"), None);
    }
}
