//! Shared fixtures for unit tests: a scripted loopback HTTP server and a
//! pause recorder that never sleeps.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::transport::http::Pause;

/// Loopback server answering accepted connections from a fixed script.
pub struct ScriptedServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    request_lines: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    /// Serve `(status, body)` pairs in order, one per connection.
    pub fn spawn(script: Vec<(u16, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let request_lines = Arc::new(Mutex::new(Vec::new()));
        let counter = Arc::clone(&hits);
        let lines = Arc::clone(&request_lines);
        thread::spawn(move || {
            for (status, body) in script {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut request_buf = [0u8; 4096];
                let read = stream.read(&mut request_buf).unwrap_or(0);
                let request = String::from_utf8_lossy(&request_buf[..read]);
                let first_line = request.lines().next().unwrap_or_default().to_string();
                lines.lock().unwrap().push(first_line);
                counter.fetch_add(1, Ordering::SeqCst);
                let headers = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(headers.as_bytes());
                let _ = stream.write_all(&body);
                let _ = stream.flush();
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            hits,
            request_lines,
        }
    }

    /// Serve JSON text bodies.
    pub fn spawn_json(script: Vec<(u16, &str)>) -> Self {
        Self::spawn(
            script
                .into_iter()
                .map(|(status, body)| (status, body.as_bytes().to_vec()))
                .collect(),
        )
    }

    /// Answer one connection with a success head and part of the body, then
    /// hold the socket open for `stall` without sending the rest.
    pub fn spawn_stalled_body(stall: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut request_buf = [0u8; 4096];
            let _ = stream.read(&mut request_buf);
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = stream.write_all(
                b"HTTP/1.1 200 Scripted\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{\"id\":",
            );
            let _ = stream.flush();
            thread::sleep(stall);
        });
        Self {
            base_url: format!("http://{addr}"),
            hits,
            request_lines: Arc::default(),
        }
    }

    /// Number of requests answered so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request lines (`GET /path?query HTTP/1.1`) in arrival order.
    pub fn request_lines(&self) -> Vec<String> {
        self.request_lines.lock().unwrap().clone()
    }
}

/// Path of a request line, without the query string.
pub fn request_path(request_line: &str) -> &str {
    let target = request_line.split(' ').nth(1).unwrap_or_default();
    target.split('?').next().unwrap_or_default()
}

/// Percent-decoded query parameters of a request line, in order.
pub fn query_pairs(request_line: &str) -> Vec<(String, String)> {
    let target = request_line.split(' ').nth(1).unwrap_or_default();
    let Some((_, query)) = target.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(key), percent_decode(value))
        })
        .collect()
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' && idx + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[idx + 1..idx + 3]).unwrap();
            decoded.push(u8::from_str_radix(hex, 16).unwrap());
            idx += 3;
        } else {
            decoded.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8(decoded).unwrap()
}

/// Records requested pauses instead of sleeping.
#[derive(Default)]
pub struct RecordingPause {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.pauses().into_iter().sum()
    }
}

impl Pause for RecordingPause {
    fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}
