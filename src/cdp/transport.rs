//! CDP transport layer
//!
//! Talks to Chrome over its DevTools WebSocket with a hand-rolled frame
//! codec, correlating command responses by message id. Commands that are
//! loud tells for automation (Runtime.enable and friends) are swallowed
//! before they reach the wire.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex};

use crate::error::{Error, Result};

/// Commands that anti-bot scripts can observe side effects of
const SUPPRESSED_COMMANDS: &[&str] = &[
    "Runtime.enable",
    "Runtime.disable",
    "Debugger.enable",
    "Debugger.disable",
    "Console.enable",
    "Console.disable",
];

const OPCODE_TEXT: u8 = 0x1;
const OPCODE_CLOSE: u8 = 0x8;
const OPCODE_PING: u8 = 0x9;
const OPCODE_PONG: u8 = 0xA;

type PendingRequest = oneshot::Sender<Result<Value>>;

/// Write one masked text frame (clients must mask per RFC 6455)
fn write_frame(stream: &mut TcpStream, data: &[u8]) -> std::io::Result<()> {
    let len = data.len();
    let mut frame = Vec::with_capacity(14 + len);

    frame.push(0x80 | OPCODE_TEXT);

    if len < 126 {
        frame.push(0x80 | len as u8);
    } else if len < 65536 {
        frame.push(0x80 | 126);
        frame.push((len >> 8) as u8);
        frame.push(len as u8);
    } else {
        frame.push(0x80 | 127);
        for i in (0..8).rev() {
            frame.push((len >> (i * 8)) as u8);
        }
    }

    let mask: [u8; 4] = rand::random();
    frame.extend_from_slice(&mask);
    for (i, byte) in data.iter().enumerate() {
        frame.push(byte ^ mask[i % 4]);
    }

    stream.write_all(&frame)?;
    stream.flush()
}

/// Read one frame, returning (opcode, unmasked payload)
fn read_frame(stream: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header)?;

    let opcode = header[0] & 0x0F;
    let masked = (header[1] & 0x80) != 0;
    let mut len = (header[1] & 0x7F) as usize;

    if len == 126 {
        let mut ext = [0u8; 2];
        stream.read_exact(&mut ext)?;
        len = ((ext[0] as usize) << 8) | (ext[1] as usize);
    } else if len == 127 {
        let mut ext = [0u8; 8];
        stream.read_exact(&mut ext)?;
        len = ext.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
    }

    let mask = if masked {
        let mut m = [0u8; 4];
        stream.read_exact(&mut m)?;
        Some(m)
    } else {
        None
    };

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload)?;

    if let Some(mask) = mask {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= mask[i % 4];
        }
    }

    Ok((opcode, payload))
}

/// Connection to Chrome's DevTools endpoint plus ownership of the child process
pub struct Transport {
    child: Mutex<Child>,
    writer: Mutex<TcpStream>,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
}

impl Transport {
    /// Connect to the ws:// URL Chrome printed at startup
    pub fn new(child: Child, ws_url: &str) -> Result<Self> {
        let url = ws_url.trim_start_matches("ws://");
        let (host_port, _) = url.split_once('/').unwrap_or((url, ""));

        let mut stream = TcpStream::connect(host_port)
            .map_err(|e| Error::transport_io("Failed to connect to Chrome", e))?;

        let path = format!("/{}", url.split_once('/').map(|(_, p)| p).unwrap_or(""));
        let key = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            rand::random::<[u8; 16]>(),
        );

        let handshake = format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n",
            path, host_port, key
        );

        stream
            .write_all(handshake.as_bytes())
            .map_err(|e| Error::transport_io("Handshake write failed", e))?;

        let mut response = [0u8; 1024];
        let n = stream
            .read(&mut response)
            .map_err(|e| Error::transport_io("Handshake read failed", e))?;
        let response = String::from_utf8_lossy(&response[..n]);

        if !response.contains("101") {
            return Err(Error::transport(format!(
                "WebSocket handshake failed: {}",
                response
            )));
        }

        tracing::debug!("WebSocket connected to {}", ws_url);

        let reader_stream = stream
            .try_clone()
            .map_err(|e| Error::transport_io("Failed to clone stream", e))?;

        let pending: Arc<Mutex<HashMap<u64, PendingRequest>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let pending_clone = Arc::clone(&pending);
        std::thread::spawn(move || {
            Self::reader_loop(reader_stream, pending_clone);
        });

        Ok(Self {
            child: Mutex::new(child),
            writer: Mutex::new(stream),
            next_id: AtomicU64::new(1),
            pending,
        })
    }

    /// Dedicated reader thread: parses frames, wakes pending senders
    fn reader_loop(mut stream: TcpStream, pending: Arc<Mutex<HashMap<u64, PendingRequest>>>) {
        loop {
            let (opcode, payload) = match read_frame(&mut stream) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!("WebSocket read error: {}", e);
                    break;
                }
            };

            match opcode {
                OPCODE_TEXT => {
                    let msg: Value = match serde_json::from_slice(&payload) {
                        Ok(v) => v,
                        Err(e) => {
                            tracing::warn!("Unparseable CDP message: {}", e);
                            continue;
                        }
                    };

                    // Events (no id) are not consumed by this workflow
                    let Some(id) = msg.get("id").and_then(|v| v.as_u64()) else {
                        continue;
                    };

                    let result = if let Some(error) = msg.get("error") {
                        Err(Error::cdp(
                            msg.get("method")
                                .and_then(|m| m.as_str())
                                .unwrap_or("unknown"),
                            error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1),
                            error
                                .get("message")
                                .and_then(|m| m.as_str())
                                .unwrap_or("unknown"),
                        ))
                    } else {
                        Ok(msg.get("result").cloned().unwrap_or(json!({})))
                    };

                    let mut pending_guard = pending.blocking_lock();
                    if let Some(sender) = pending_guard.remove(&id) {
                        let _ = sender.send(result);
                    }
                }
                OPCODE_PING => {
                    let pong = vec![0x80 | OPCODE_PONG, 0x80, 0, 0, 0, 0];
                    let _ = stream.write_all(&pong);
                }
                OPCODE_CLOSE => {
                    tracing::debug!("WebSocket closed by server");
                    break;
                }
                _ => {}
            }
        }

        tracing::debug!("CDP reader loop ended");
    }

    /// Send a browser-level CDP command and await its response
    pub async fn send<C, R>(&self, method: &str, params: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        self.dispatch(method, params, None).await
    }

    /// Send a CDP command scoped to a page session
    pub async fn send_to_session<C, R>(
        &self,
        session_id: &str,
        method: &str,
        params: &C,
    ) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        self.dispatch(method, params, Some(session_id)).await
    }

    async fn dispatch<C, R>(&self, method: &str, params: &C, session_id: Option<&str>) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        if SUPPRESSED_COMMANDS.contains(&method) {
            tracing::debug!("Suppressed detectable CDP command: {}", method);
            // Empty object deserializes via #[serde(default)] on result types
            return serde_json::from_value(json!({})).map_err(Into::into);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        let mut msg = json!({
            "id": id,
            "method": method,
            "params": serde_json::to_value(params)?
        });
        if let Some(session_id) = session_id {
            msg["sessionId"] = json!(session_id);
        }

        let data = serde_json::to_string(&msg)?;
        {
            let mut writer = self.writer.lock().await;
            write_frame(&mut writer, data.as_bytes())
                .map_err(|e| Error::transport_io("WebSocket write failed", e))?;
        }

        tracing::trace!("Sent CDP command: {} (id={})", method, id);

        let result = rx
            .await
            .map_err(|_| Error::transport("Response channel closed"))??;

        Ok(serde_json::from_value(result)?)
    }

    /// Close the WebSocket and kill Chrome
    pub async fn close(&self) -> Result<()> {
        {
            let mut writer = self.writer.lock().await;
            let close_frame = vec![0x80 | OPCODE_CLOSE, 0x80, 0, 0, 0, 0];
            let _ = writer.write_all(&close_frame);
        }

        let mut child = self.child.lock().await;
        let _ = child.kill();
        let _ = child.wait();
        Ok(())
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // Backstop if close() was never reached (panic, early return)
        if let Ok(mut child) = self.child.try_lock() {
            let _ = child.kill();
        }
    }
}

/// Launch Chrome and scrape the DevTools WebSocket URL from its stderr
pub fn launch_chrome(path: &std::path::Path, args: &[String]) -> Result<(Child, String)> {
    let mut cmd = Command::new(path);
    cmd.args(args)
        .arg("--remote-debugging-port=0") // Chrome picks a free port
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::Launch(format!("Failed to spawn Chrome: {}", e)))?;

    let stderr = child
        .stderr
        .take()
        .ok_or(Error::Launch("No stderr from Chrome".into()))?;

    // Chrome prints: DevTools listening on ws://127.0.0.1:PORT/devtools/browser/GUID
    let reader = BufReader::new(stderr);
    let mut ws_url = None;
    for line in reader.lines() {
        let Ok(line) = line else { break };
        tracing::trace!("Chrome stderr: {}", line);
        if line.contains("DevTools listening on") {
            if let Some(start) = line.find("ws://") {
                ws_url = Some(line[start..].trim().to_string());
                break;
            }
        }
    }

    let ws_url = ws_url.ok_or(Error::Launch(
        "Chrome never printed a DevTools WebSocket URL".into(),
    ))?;

    tracing::info!("Chrome DevTools URL: {}", ws_url);

    Ok((child, ws_url))
}
