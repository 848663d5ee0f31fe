//! Basic FTP client example
//!
//! Run with: cargo run --example basic

use ftp_rs::{FtpClient, FtpConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // Replace with your actual server credentials, or set these env vars.
    let host = std::env::var("FTP_HOST").unwrap_or_else(|_| "ftp.example.com".to_string());
    let user = std::env::var("FTP_USER").unwrap_or_else(|_| "anonymous".to_string());
    let pass = std::env::var("FTP_PASS").unwrap_or_else(|_| "guest@example.com".to_string());
    let use_tls = std::env::var("FTP_TLS").map(|v| v == "1").unwrap_or(true);

    let config = if use_tls {
        FtpConfig::ftps(&host, &user, &pass)
    } else {
        FtpConfig::plain(&host, &user, &pass)
    }
    .with_compression(true);

    println!("Connecting to {host}...");
    let mut client = FtpClient::connect(Arc::new(config)).await?;
    println!("Connected! Features: {:?}", client.capabilities().list());

    client.login().await?;
    println!("Logged in as {user}");

    let cwd = client.pwd().await?;
    println!("Working directory: {cwd}");

    let entries = client.list(None, false).await?;
    println!("\n{} entries:", entries.len());
    for entry in entries.iter().take(20) {
        println!("  {:?} {:>10}  {}", entry.kind, entry.size, entry.name);
    }

    if client.can_use_compression() {
        println!("\nServer advertises MODE Z compression");
    }

    client.disconnect().await?;
    println!("\nConnection closed.");

    Ok(())
}
