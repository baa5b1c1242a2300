//! Shared test utilities for winelog integration tests
//!
//! - a tiny HTTP stub server that records requests and returns a fixed reply
//! - entry and form fixtures
//! - generated images for photo tests
#![cfg(test)]
#![allow(dead_code)]

use std::{
    io::Cursor,
    sync::{Arc, Mutex},
};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use winelog::prelude::*;

/// Url where nothing listens
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

// =============================================================================
// HTTP stub
// =============================================================================

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query, as sent on the request line
    pub target: String,
    pub body: String,
}

pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Serves every request with `status` and `body`
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let body = Arc::new(body.into());

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let body = body.clone();
                tokio::spawn(async move {
                    if let Some(req) = read_request(&mut socket).await {
                        recorded.lock().expect("lock").push(req);
                    }
                    let response = format!(
                        "HTTP/1.1 {status} STUB\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    Some(RecordedRequest {
        method: request_line.next()?.to_string(),
        target: request_line.next()?.to_string(),
        body: String::from_utf8_lossy(&buf[body_start..]).to_string(),
    })
}

// =============================================================================
// Fixtures
// =============================================================================

/// The white wine from the quick start
pub fn chablis_form() -> FormData {
    let mut form = FormData::new();
    form.set("name", "Chablis")
        .set("hue", "pale straw")
        .append("smell_fresh", "citrus")
        .append("smell_fresh", "green apple");
    form
}

pub fn named_form(name: &str) -> FormData {
    let mut form = FormData::new();
    form.set("name", name);
    form
}

/// Submits a form and returns the new entry id
pub fn submit<S: Storage>(app: &mut App<S>, kind: WineType, form: FormData) -> String {
    match app
        .dispatch(Event::Submit {
            kind,
            form,
            photo: PhotoInput::Keep,
        })
        .expect("submit")
    {
        Outcome::Created(id) => id,
        other => panic!("expected Created, got {other:?}"),
    }
}

/// PNG bytes of a `width` x `height` gradient
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}
