//! Raw socket fallback back-end.

use crate::backend::{HttpBackend, HttpRequest, RawResponse};
use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use url::{Host, Url};

/// Back-end that speaks HTTP/1.0 directly over a TCP socket.
///
/// Used where the managed client is unavailable or misbehaves. Only plain
/// `http://` URLs are supported; anything else is reported as
/// [`TransportError::Unsupported`] so negotiation moves on.
#[derive(Debug, Clone)]
pub struct RawStreamBackend {
    user_agent: String,
    default_timeout: Duration,
}

impl RawStreamBackend {
    /// Id recorded in the preference cache.
    pub const ID: &'static str = "stream";

    /// Creates the back-end.
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            default_timeout: config.default_timeout,
        }
    }

    fn connect(&self, target: &Target, timeout: Duration) -> TransportResult<TcpStream> {
        let addrs = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect(format!("{}: {e}", target.host)))?;

        let mut last_error = TransportError::Connect(format!("{}: no address", target.host));
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_error = e.into(),
            }
        }
        Err(last_error)
    }
}

impl HttpBackend for RawStreamBackend {
    fn id(&self) -> &str {
        Self::ID
    }

    fn send(&self, request: &HttpRequest) -> TransportResult<RawResponse> {
        let target = Target::parse(&request.url)?;
        let timeout = request.timeout().unwrap_or(self.default_timeout);
        let mut stream = self.connect(&target, timeout)?;

        let body = request.args.body.as_deref().unwrap_or_default();
        let mut head = format!(
            "{} {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: {}\r\nConnection: close\r\nContent-Length: {}\r\n",
            request.method,
            target.path,
            target.authority,
            self.user_agent,
            body.len()
        );
        for (name, value) in &request.args.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");

        let mut message = head.into_bytes();
        message.extend_from_slice(body);
        stream.write_all(&message)?;
        stream.flush()?;

        let mut received = Vec::new();
        stream.read_to_end(&mut received)?;
        parse_response(&received)
    }
}

/// Where an `http://` request goes and what its request line carries.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    /// Host to resolve; IPv6 literals without brackets.
    host: String,
    port: u16,
    /// Value of the `Host` header.
    authority: String,
    /// Path and query. The fragment is never sent.
    path: String,
}

impl Target {
    fn parse(raw: &str) -> TransportResult<Self> {
        let url = Url::parse(raw)
            .map_err(|e| TransportError::Unsupported(format!("{raw}: {e}")))?;
        if url.scheme() != "http" {
            return Err(TransportError::Unsupported(format!("scheme of {raw}")));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(TransportError::Unsupported(format!("no host in {raw}"))),
        };
        let port = url.port_or_known_default().unwrap_or(80);
        let authority = match (url.host_str(), url.port()) {
            (Some(name), Some(port)) => format!("{name}:{port}"),
            (Some(name), None) => name.to_string(),
            (None, _) => host.clone(),
        };

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            host,
            port,
            authority,
            path,
        })
    }
}

/// Parses a complete HTTP/1.x response.
///
/// The status line yields code and reason phrase; header names are
/// lower-cased; a chunked body is decoded.
fn parse_response(bytes: &[u8]) -> TransportResult<RawResponse> {
    let split = bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| TransportError::Protocol("missing header terminator".into()))?;
    let head = std::str::from_utf8(&bytes[..split])
        .map_err(|e| TransportError::Protocol(format!("non-UTF-8 headers: {e}")))?;
    let body = &bytes[split + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines
        .next()
        .ok_or_else(|| TransportError::Protocol("empty response".into()))?;
    let (code, message) = parse_status_line(status_line)?;

    let mut headers = BTreeMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let chunked = headers
        .get("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
    let body = if chunked {
        decode_chunked(body)?
    } else {
        body.to_vec()
    };

    Ok(RawResponse {
        code,
        message,
        headers,
        body,
    })
}

fn parse_status_line(line: &str) -> TransportResult<(u16, String)> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(TransportError::Protocol(format!("bad status line: {line}")));
    }
    let code = parts
        .next()
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| TransportError::Protocol(format!("bad status code: {line}")))?;
    let message = parts.next().unwrap_or_default().trim().to_string();
    Ok((code, message))
}

fn decode_chunked(mut body: &[u8]) -> TransportResult<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let line_end = body
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| TransportError::Protocol("truncated chunk size".into()))?;
        let size_line = std::str::from_utf8(&body[..line_end])
            .map_err(|_| TransportError::Protocol("bad chunk size".into()))?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| TransportError::Protocol(format!("bad chunk size {size_hex:?}")))?;
        body = &body[line_end + 2..];

        if size == 0 {
            return Ok(out);
        }
        if body.len() < size + 2 {
            return Err(TransportError::Protocol("truncated chunk".into()));
        }
        out.extend_from_slice(&body[..size]);
        body = &body[size + 2..];
    }
}
