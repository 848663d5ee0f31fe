#![doc = include_str!("../README.md")]

mod capabilities;
mod client;
/// FTP command builders (RFC 959, plus FEAT/MDTM/SIZE/MODE Z/SITE extensions)
pub mod commands;
mod config;
mod error;
/// Directory listing parsing: the `FileItem` record and pluggable `ListingParser`
pub mod listing;
/// Stream limiter: quantum-paced bandwidth throttling for transfer pipelines
pub mod limiter;
/// Transfer pipeline: data-channel adapters for throttling and MODE Z compression
pub mod pipeline;
mod queue;
/// FTP response framing (RFC 959 §4) and PASV/FEAT micro-parsers
pub mod response;
mod request;

pub use capabilities::Capabilities;
pub use client::{FtpClient, UploadSource};
pub use config::FtpConfig;
pub use error::{FtpError, Result};
pub use listing::{DefaultListingParser, FileItem, FileKind, ListingParser};
pub use limiter::{Progress, StreamLimiter};
pub use queue::RequestQueue;
pub use request::{Request, RequestState};
pub use response::{parse_feat, parse_frame, parse_pasv, FtpResponse, PassiveAddr};
