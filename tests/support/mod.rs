//! A minimal in-process FTP control+data server for exercising `FtpClient`
//! end to end without a live daemon. Speaks just enough RFC 959 (plus FEAT/
//! SIZE/MDTM/MODE Z/SITE MKDIR-RMDIR) to drive the scenarios under test.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// What the mock server should hand back for directory/file-content transfers
/// and how many times it should sabotage `PASV` before answering honestly.
#[derive(Default)]
pub struct MockServerConfig {
    pub listing_body: String,
    pub retr_body: Vec<u8>,
    pub sizes: HashMap<String, u64>,
    pub pasv_failures: usize,
    /// Close the control socket with no reply the moment this verb arrives,
    /// simulating a dead transport mid-session.
    pub drop_connection_on: Option<String>,
}

/// Bytes received by a `STOR`/`APPE`, keyed by the path argument, recorded for
/// assertions after the test's `FtpClient` session ends.
pub type UploadLog = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

pub struct MockServer {
    pub port: u16,
    pub uploads: UploadLog,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn start(config: MockServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock control listener");
        let port = listener.local_addr().expect("local_addr").port();
        let uploads: UploadLog = Arc::new(Mutex::new(Vec::new()));
        let uploads_for_task = Arc::clone(&uploads);

        let handle = tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                serve(stream, config, uploads_for_task).await;
            }
        });

        Self { port, uploads, _handle: handle }
    }
}

async fn serve(stream: TcpStream, config: MockServerConfig, uploads: UploadLog) {
    let MockServerConfig { listing_body, retr_body, sizes, pasv_failures, drop_connection_on } = config;
    let (rd, wr) = stream.into_split();
    let mut reader = BufReader::new(rd);

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        let mut wr = wr;
        while let Some(line) = line_rx.recv().await {
            if wr.write_all(format!("{line}\r\n").as_bytes()).await.is_err() {
                break;
            }
            let _ = wr.flush().await;
        }
    });

    line_tx.send("220 mock ftp ready".to_string()).ok();

    let pasv_attempts = Arc::new(AtomicUsize::new(0));
    let pending_data: Arc<Mutex<Option<mpsc::Receiver<TcpStream>>>> = Arc::new(Mutex::new(None));
    let rename_from: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let mut line = String::new();
    loop {
        line.clear();
        let n = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(_) => break,
        };
        if n == 0 {
            break;
        }
        let cmd = line.trim_end_matches(['\r', '\n']).to_string();
        if cmd.is_empty() {
            continue;
        }

        let (verb, arg) = match cmd.split_once(' ') {
            Some((v, a)) => (v.to_ascii_uppercase(), a.to_string()),
            None => (cmd.to_ascii_uppercase(), String::new()),
        };

        if drop_connection_on.as_deref() == Some(verb.as_str()) {
            break;
        }

        match verb.as_str() {
            "FEAT" => {
                line_tx.send("211-Features:".into()).ok();
                line_tx.send(" MDTM".into()).ok();
                line_tx.send(" SIZE".into()).ok();
                line_tx.send(" MODE Z".into()).ok();
                line_tx.send(" UTF8".into()).ok();
                line_tx.send("211 End".into()).ok();
            }
            "USER" => {
                line_tx.send("331 Need password".into()).ok();
            }
            "PASS" => {
                line_tx.send("230 Logged in".into()).ok();
            }
            "TYPE" => {
                line_tx.send(format!("200 Type set to {arg}")).ok();
            }
            "PWD" => {
                line_tx.send("257 \"/\" is current directory".into()).ok();
            }
            "CWD" => {
                line_tx.send("250 directory changed".into()).ok();
            }
            "CDUP" => {
                line_tx.send("250 directory changed".into()).ok();
            }
            "MODE" => {
                line_tx.send("200 Mode set".into()).ok();
            }
            "PASV" => {
                let attempt = pasv_attempts.fetch_add(1, Ordering::SeqCst);
                if attempt < pasv_failures {
                    line_tx.send("227 Entering Passive Mode (not,a,valid,tuple)".into()).ok();
                    continue;
                }
                let data_listener =
                    TcpListener::bind("127.0.0.1:0").await.expect("bind mock data listener");
                let data_port = data_listener.local_addr().expect("data local_addr").port();
                let (tx, rx) = mpsc::channel(1);
                *pending_data.lock().unwrap() = Some(rx);
                tokio::spawn(async move {
                    if let Ok((stream, _)) = data_listener.accept().await {
                        let _ = tx.send(stream).await;
                    }
                });
                let ip = Ipv4Addr::new(127, 0, 0, 1);
                let octets = ip.octets();
                let p1 = data_port / 256;
                let p2 = data_port % 256;
                line_tx
                    .send(format!(
                        "227 Entering Passive Mode ({},{},{},{},{},{})",
                        octets[0], octets[1], octets[2], octets[3], p1, p2
                    ))
                    .ok();
            }
            "LIST" | "MLSD" | "NLST" => {
                line_tx.send("150 Opening data connection".into()).ok();
                let rx = pending_data.lock().unwrap().take();
                let body = if verb == "NLST" {
                    listing_body
                        .lines()
                        .filter_map(|l| l.split_whitespace().last())
                        .collect::<Vec<_>>()
                        .join("\r\n")
                } else {
                    listing_body.clone()
                };
                let line_tx = line_tx.clone();
                tokio::spawn(async move {
                    if let Some(mut rx) = rx {
                        if let Some(mut data) = rx.recv().await {
                            let _ = data.write_all(body.as_bytes()).await;
                            let _ = data.shutdown().await;
                        }
                    }
                    line_tx.send("226 Transfer complete".into()).ok();
                });
            }
            "RETR" => {
                line_tx.send("150 Opening data connection".into()).ok();
                let rx = pending_data.lock().unwrap().take();
                let body = retr_body.clone();
                let line_tx = line_tx.clone();
                tokio::spawn(async move {
                    if let Some(mut rx) = rx {
                        if let Some(mut data) = rx.recv().await {
                            let _ = data.write_all(&body).await;
                            let _ = data.shutdown().await;
                        }
                    }
                    line_tx.send("226 Transfer complete".into()).ok();
                });
            }
            "STOR" | "APPE" => {
                line_tx.send("150 Opening data connection".into()).ok();
                let rx = pending_data.lock().unwrap().take();
                let line_tx = line_tx.clone();
                let uploads = Arc::clone(&uploads);
                let dst = arg.clone();
                tokio::spawn(async move {
                    if let Some(mut rx) = rx {
                        if let Some(mut data) = rx.recv().await {
                            let mut buf = Vec::new();
                            let _ = tokio::io::AsyncReadExt::read_to_end(&mut data, &mut buf).await;
                            uploads.lock().unwrap().push((dst, buf));
                        }
                    }
                    line_tx.send("226 Transfer complete".into()).ok();
                });
            }
            "DELE" => {
                line_tx.send("250 Deleted".into()).ok();
            }
            "MKD" => {
                line_tx.send(format!("257 \"{arg}\" created")).ok();
            }
            "RMD" => {
                line_tx.send("250 Directory removed".into()).ok();
            }
            "SITE" => {
                let mut parts = arg.splitn(2, ' ');
                match parts.next().unwrap_or("").to_ascii_uppercase().as_str() {
                    "MKDIR" => {
                        line_tx.send(format!("257 \"{}\" created", parts.next().unwrap_or(""))).ok();
                    }
                    "RMDIR" => {
                        line_tx.send("250 Directory tree removed".into()).ok();
                    }
                    _ => {
                        line_tx.send("200 SITE command ok".into()).ok();
                    }
                }
            }
            "RNFR" => {
                *rename_from.lock().unwrap() = Some(arg);
                line_tx.send("350 Ready for RNTO".into()).ok();
            }
            "RNTO" => {
                rename_from.lock().unwrap().take();
                line_tx.send("250 Rename successful".into()).ok();
            }
            "SIZE" => match sizes.get(&arg) {
                Some(size) => {
                    line_tx.send(format!("213 {size}")).ok();
                }
                None => {
                    line_tx.send("550 No such file or directory".into()).ok();
                }
            },
            "MDTM" => {
                line_tx.send("213 20240115123045".into()).ok();
            }
            "SYST" => {
                line_tx.send("215 UNIX Type: L8".into()).ok();
            }
            "STAT" => {
                line_tx.send("211 status ok".into()).ok();
            }
            "ABOR" => {
                line_tx.send("226 Closing data connection".into()).ok();
            }
            "QUIT" => {
                line_tx.send("221 Bye".into()).ok();
                break;
            }
            _ => {
                line_tx.send("502 Command not implemented".into()).ok();
            }
        }
    }

    drop(line_tx);
    let _ = writer_task.await;
}
