//! FEAT capability parsing and storage (RFC 2389)
//!
//! The FEAT command returns a multi-line list of extensions supported by the
//! server. Each line may carry arguments, e.g. `MODE Z` or `REST STREAM`.

use crate::response::{parse_feat, FtpResponse};
use std::collections::HashMap;

/// Capabilities advertised by an FTP server's FEAT reply.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    /// Map of capability name to its arguments, e.g. "MODE" -> ["Z"]
    capabilities: HashMap<String, Vec<String>>,
}

impl Capabilities {
    /// Empty capability set — used before FEAT has been issued, or when the
    /// server does not support FEAT at all.
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Parse capabilities out of a FEAT response.
    ///
    /// # Format
    /// ```text
    /// 211-Features:
    ///  MDTM
    ///  SIZE
    ///  MODE Z
    /// 211 End
    /// ```
    pub fn parse(response: &FtpResponse) -> Self {
        let mut capabilities = HashMap::new();
        for line in parse_feat(response) {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }
            let name = parts[0].to_uppercase();
            let args: Vec<String> = parts[1..].iter().map(|s| s.to_string()).collect();
            capabilities.insert(name, args);
        }
        Self { capabilities }
    }

    /// Check whether a capability is advertised
    #[must_use]
    pub fn has(&self, capability: &str) -> bool {
        self.capabilities.contains_key(&capability.to_uppercase())
    }

    /// Get arguments for a capability, if advertised
    #[must_use]
    pub fn get_args(&self, capability: &str) -> Option<&Vec<String>> {
        self.capabilities.get(&capability.to_uppercase())
    }

    /// Check whether a capability is advertised with a specific argument
    /// (e.g. `caps.has_arg("MODE", "Z")`)
    pub fn has_arg(&self, capability: &str, arg: &str) -> bool {
        self.get_args(capability)
            .map(|args| args.iter().any(|a| a.eq_ignore_ascii_case(arg)))
            .unwrap_or(false)
    }

    /// All advertised capability names
    pub fn list(&self) -> Vec<String> {
        self.capabilities.keys().cloned().collect()
    }
}
