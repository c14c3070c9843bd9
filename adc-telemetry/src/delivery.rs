//! One-shot delivery to the collector
//!
//! Each call opens a fresh TCP connection, writes a single HTTP/1.1 POST,
//! drains whatever the collector sends back and closes the connection.
//!
//! Success means "connected and request written". The response status is
//! logged but never inspected: a collector answering `500` still counts as
//! `Delivered`.

use crate::payload::Payload;
use crate::types::DeliveryOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// Collector path used when none is configured
pub const DEFAULT_PATH: &str = "/api/sensor-data";

/// Collector address and request target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: default_path(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.host, self.port, self.path)
    }
}

/// Render the full request for `payload`
pub fn format_request(payload: &Payload, endpoint: &Endpoint) -> String {
    format!(
        "POST {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Connection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\n\
         Content-Length: {len}\r\n\
         \r\n\
         {body}",
        path = endpoint.path,
        host = endpoint.host,
        len = payload.len(),
        body = payload.as_str(),
    )
}

/// Owns the single outbound connection slot
#[derive(Debug, Default)]
pub struct DeliveryClient {
    stream: Option<TcpStream>,
    last_status: Option<String>,
    response_timeout: Option<Duration>,
}

impl DeliveryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read timeout while waiting for the response; `None` waits for the peer
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Send `payload` to `endpoint` and report how far the attempt got
    ///
    /// The connection is closed on every path before this returns.
    pub fn deliver(&mut self, payload: &Payload, endpoint: &Endpoint) -> DeliveryOutcome {
        self.last_status = None;

        let outcome = match TcpStream::connect((endpoint.host.as_str(), endpoint.port)) {
            Ok(stream) => {
                log::info!("Connected to collector {}", endpoint);
                self.stream = Some(stream);
                match self.exchange(payload, endpoint) {
                    Ok(()) => DeliveryOutcome::Delivered,
                    Err(e) => {
                        log::error!("Transport error talking to {}: {}", endpoint, e);
                        DeliveryOutcome::TransportError
                    }
                }
            }
            Err(e) => {
                log::warn!("Connection to {} failed: {}", endpoint, e);
                DeliveryOutcome::ConnectionFailed
            }
        };

        self.close();
        outcome
    }

    /// True while a connection is held; always false between calls
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Status line of the last response, if the collector sent one
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    fn exchange(&mut self, payload: &Payload, endpoint: &Endpoint) -> io::Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "no open connection"))?;

        let request = format_request(payload, endpoint);
        log::debug!(
            "POST {} ({} byte body) to {}:{}",
            endpoint.path,
            payload.len(),
            endpoint.host,
            endpoint.port
        );
        stream.write_all(request.as_bytes())?;
        stream.flush()?;

        if self.response_timeout.is_some() {
            stream.set_read_timeout(self.response_timeout)?;
        }

        self.last_status = drain_response(stream)?;
        if let Some(status) = &self.last_status {
            log::info!("Collector responded: {}", status);
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Read the response line by line until the peer closes
///
/// Returns the first line, which is the status line for a well-formed reply.
/// A reset from the peer ends the response like an orderly close.
fn drain_response(stream: &mut TcpStream) -> io::Result<Option<String>> {
    let mut reader = BufReader::new(stream);
    let mut status = None;
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end();
                log::debug!("Server: {}", text);
                if status.is_none() && !text.is_empty() {
                    status = Some(text.to_string());
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                ) =>
            {
                log::debug!("Collector reset the connection: {}", e);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadEncoder;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    fn payload() -> Payload {
        let values: Vec<f64> = (1..=16).map(|i| i as f64).collect();
        PayloadEncoder::new().encode(&values).unwrap()
    }

    #[test]
    fn test_request_format() {
        let payload = payload();
        let endpoint = Endpoint::new("10.0.0.5", 5176);
        let request = format_request(&payload, &endpoint);

        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        let lines: Vec<&str> = head.split("\r\n").collect();
        assert_eq!(lines[0], "POST /api/sensor-data HTTP/1.1");
        assert!(lines.contains(&"Host: 10.0.0.5"));
        assert!(lines.contains(&"Connection: close"));
        assert!(lines.contains(&"Content-Type: application/x-www-form-urlencoded"));
        assert!(lines.contains(&format!("Content-Length: {}", payload.len()).as_str()));
        assert_eq!(body, payload.as_str());
    }

    #[test]
    fn test_endpoint_display() {
        let endpoint = Endpoint::new("collector.local", 8080).with_path("/ingest");
        assert_eq!(endpoint.to_string(), "collector.local:8080/ingest");
    }

    #[test]
    fn test_status_line_is_captured() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let expected = format_request(&payload(), &Endpoint::new("127.0.0.1", port)).len();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while received.len() < expected {
                let n = socket.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n")
                .unwrap();
        });

        let mut client = DeliveryClient::new();
        let outcome = client.deliver(&payload(), &Endpoint::new("127.0.0.1", port));
        server.join().unwrap();

        // A server error is still a delivery
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(client.last_status(), Some("HTTP/1.1 500 Internal Server Error"));
        assert!(!client.is_open());
    }

    #[test]
    fn test_silent_collector_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf);
            // Hold the connection open without answering
            let _ = done_rx.recv();
        });

        let mut client =
            DeliveryClient::new().with_response_timeout(Some(Duration::from_millis(100)));
        let outcome = client.deliver(&payload(), &Endpoint::new("127.0.0.1", port));
        done_tx.send(()).unwrap();
        server.join().unwrap();

        assert_eq!(outcome, DeliveryOutcome::TransportError);
        assert!(!outcome.is_delivered());
        assert_eq!(client.last_status(), None);
        assert!(!client.is_open());
    }
}
