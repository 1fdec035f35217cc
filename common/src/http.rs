//! Minimal HTTP/1.1 client framing: one request per connection, response
//! headers skipped, body returned verbatim.
//!
//! Chunked transfer encoding is not decoded. A chunked body comes back with its
//! size lines intact, which the array extractor tolerates as long as the JSON
//! itself arrives in a single chunk.

use std::{future::Future, io::ErrorKind};

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, warn};

use crate::{
    endpoints::{CONTENT_TYPE_JSON, TUNNEL_BYPASS_HEADER},
    error::ClientError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }

    pub fn carries_body(self) -> bool {
        matches!(self, Self::Post)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub content_type: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<Body>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(
        path: impl Into<String>,
        content_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(Body {
                content_type: content_type.into(),
                payload: payload.into(),
            }),
        }
    }

    pub fn post_json(path: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::post(path, CONTENT_TYPE_JSON, payload)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code from the status line; `None` when the line was missing or
    /// unreadable.
    pub status: Option<u16>,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

/// Sends one request and hands back the raw response body.
pub trait Transport {
    fn send(
        &mut self,
        request: &Request,
    ) -> impl Future<Output = Result<Response, ClientError>> + Send;
}

/// Builds the request head and body exactly as written to the wire.
pub fn encode_request(host: &str, user_agent: &str, request: &Request) -> Vec<u8> {
    let mut head = format!(
        "{} {} HTTP/1.1\r\n\
         Host: {host}\r\n\
         User-Agent: {user_agent}\r\n\
         {TUNNEL_BYPASS_HEADER}: true\r\n\
         Connection: close\r\n",
        request.method.as_str(),
        request.path,
    );

    let (content_type, payload) = match (&request.body, request.method.carries_body()) {
        (Some(body), true) => (Some(body.content_type.as_str()), body.payload.as_str()),
        (None, true) => (Some(CONTENT_TYPE_JSON), ""),
        (_, false) => (None, ""),
    };
    if let Some(content_type) = content_type {
        head.push_str(&format!(
            "Content-Type: {content_type}\r\nContent-Length: {}\r\n",
            payload.len()
        ));
    }
    head.push_str("\r\n");

    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

/// Writes `request` to `stream` and reads the response until the peer closes.
pub async fn exchange<S>(
    stream: &mut S,
    host: &str,
    user_agent: &str,
    request: &Request,
    max_body_bytes: usize,
) -> Result<Response, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(&encode_request(host, user_agent, request))
        .await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    read_response(&mut reader, max_body_bytes).await
}

/// Skips the status line and headers up to the first empty line, then reads
/// every remaining byte as the body.
pub async fn read_response<R>(
    reader: &mut R,
    max_body_bytes: usize,
) -> Result<Response, ClientError>
where
    R: AsyncBufRead + Unpin,
{
    let mut status = None;
    let mut first_line = true;
    let mut head_bytes = 0usize;
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = read_line(reader, &mut line).await?;
        if read == 0 {
            debug!("connection closed before end of response headers");
            return Ok(Response {
                status,
                body: String::new(),
            });
        }

        head_bytes += read;
        if head_bytes > max_body_bytes {
            return Err(ClientError::PayloadTooLarge {
                limit: max_body_bytes,
            });
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\r', '\n']);
        if text.is_empty() {
            break;
        }

        if first_line {
            first_line = false;
            status = parse_status_line(text);
            if status.is_some() {
                continue;
            }
        }

        if is_chunked_header(text) {
            warn!("server sent a chunked body; returning it undecoded");
        }
    }

    let mut body = Vec::new();
    let limit = max_body_bytes as u64 + 1;
    match reader.take(limit).read_to_end(&mut body).await {
        Ok(_) => {}
        // TLS peers often drop the socket without close_notify after `Connection: close`.
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => {}
        Err(err) => return Err(err.into()),
    }

    if body.len() > max_body_bytes {
        return Err(ClientError::PayloadTooLarge {
            limit: max_body_bytes,
        });
    }

    Ok(Response {
        status,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn read_line<R>(reader: &mut R, line: &mut Vec<u8>) -> Result<usize, ClientError>
where
    R: AsyncBufRead + Unpin,
{
    match reader.read_until(b'\n', line).await {
        Ok(read) => Ok(read),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(line.len()),
        Err(err) => Err(err.into()),
    }
}

fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

fn is_chunked_header(line: &str) -> bool {
    let Some((name, value)) = line.split_once(':') else {
        return false;
    };
    name.trim().eq_ignore_ascii_case("transfer-encoding")
        && value.to_ascii_lowercase().contains("chunked")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn get_request_has_no_body_headers() {
        let bytes = encode_request("api.local", "ambience/0.1", &Request::get("/api/device"));

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "GET /api/device HTTP/1.1\r\n\
             Host: api.local\r\n\
             User-Agent: ambience/0.1\r\n\
             bypass-tunnel-reminder: true\r\n\
             Connection: close\r\n\
             \r\n"
        );
    }

    #[test]
    fn post_request_carries_type_and_length() {
        let request = Request::post_json("/api/installation/publish", r#"{"index":3}"#);
        let bytes = encode_request("api.local", "ambience/0.1", &request);

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "POST /api/installation/publish HTTP/1.1\r\n\
             Host: api.local\r\n\
             User-Agent: ambience/0.1\r\n\
             bypass-tunnel-reminder: true\r\n\
             Connection: close\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 11\r\n\
             \r\n\
             {\"index\":3}"
        );
    }

    #[test]
    fn bodiless_post_announces_zero_length() {
        let request = Request {
            method: Method::Post,
            path: "/api/installation/publish".to_string(),
            body: None,
        };
        let bytes = encode_request("api.local", "ambience/0.1", &request);

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "POST /api/installation/publish HTTP/1.1\r\n\
             Host: api.local\r\n\
             User-Agent: ambience/0.1\r\n\
             bypass-tunnel-reminder: true\r\n\
             Connection: close\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 0\r\n\
             \r\n"
        );
    }

    #[test]
    fn get_ignores_stray_body() {
        let request = Request {
            method: Method::Get,
            path: "/api/device".to_string(),
            body: Some(Body {
                content_type: CONTENT_TYPE_JSON.to_string(),
                payload: "{}".to_string(),
            }),
        };
        let text = String::from_utf8(encode_request("api.local", "ua", &request)).unwrap();

        assert!(text.ends_with("Connection: close\r\n\r\n"));
        assert!(!text.contains("Content-Length"));
    }

    #[tokio::test]
    async fn skips_headers_and_keeps_body_verbatim() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nX-Noise: [{\r\n\r\nhello\r\nworld";
        let response = read_response(&mut &raw[..], 1024).await.unwrap();

        assert_eq!(response.status, Some(200));
        assert_eq!(response.body, "hello\r\nworld");
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn bare_newline_ends_headers() {
        let raw = b"HTTP/1.1 404 Not Found\nServer: tunnel\n\n[{\"id\":1}]";
        let response = read_response(&mut &raw[..], 1024).await.unwrap();

        assert_eq!(response.status, Some(404));
        assert_eq!(response.body, "[{\"id\":1}]");
    }

    #[tokio::test]
    async fn eof_inside_headers_yields_empty_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n";
        let response = read_response(&mut &raw[..], 1024).await.unwrap();

        assert_eq!(response.body, "");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let raw = b"HTTP/1.1 200 OK\r\n\r\n0123456789";
        let err = read_response(&mut &raw[..], 8).await.unwrap_err();

        assert!(matches!(err, ClientError::PayloadTooLarge { limit: 8 }));
    }

    #[tokio::test]
    async fn body_at_exact_limit_is_accepted() {
        let raw = b"HTTP/1.1 200 OK\r\n\r\n01234567";
        let response = read_response(&mut &raw[..], 8).await.unwrap();

        assert_eq!(response.body, "01234567");
    }

    #[tokio::test]
    async fn exchange_round_trips_over_a_stream() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let server_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            let read = server.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..read]).into_owned();
            server
                .write_all(b"HTTP/1.1 201 Created\r\nConnection: close\r\n\r\n{\"ok\":true}")
                .await
                .unwrap();
            server.shutdown().await.unwrap();
            request
        });

        let response = exchange(
            &mut client,
            "api.local",
            "ambience/0.1",
            &Request::post_json("/api/device", r#"{"key":"AA","name":"Weather Station"}"#),
            1024,
        )
        .await
        .unwrap();
        let request = server_task.await.unwrap();

        assert!(request.starts_with("POST /api/device HTTP/1.1\r\n"));
        assert!(request.ends_with("\r\n\r\n{\"key\":\"AA\",\"name\":\"Weather Station\"}"));
        assert_eq!(response.status, Some(201));
        assert_eq!(response.body, "{\"ok\":true}");
    }
}
