//! HTTP message heads and responses

use super::{Error, Result, CRLF};

/// Method and target of a received request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
}

impl RequestHead {
    /// Parse a request head (request line plus header lines)
    pub fn parse(head: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(head)
            .map_err(|_| Error::Parse("request head is not UTF-8".to_string()))?;
        let line = text.split(CRLF).next().unwrap_or_default();

        let mut parts = line.split(' ');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(path), Some(version))
                if !method.is_empty() && version.starts_with("HTTP/") =>
            {
                Ok(RequestHead {
                    method: method.to_string(),
                    path: path.to_string(),
                })
            }
            _ => Err(Error::Parse(format!("invalid request line: {:?}", line))),
        }
    }
}

/// Response received by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Parse a complete response as read up to connection close
    ///
    /// The body is cut to `Content-Length` when present.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .ok_or_else(|| Error::Parse("response head is incomplete".to_string()))?;
        let head = std::str::from_utf8(&raw[..split])
            .map_err(|_| Error::Parse("response head is not UTF-8".to_string()))?;
        let mut body = raw[split + 4..].to_vec();

        let mut lines = head.split(CRLF);
        let status_line = lines.next().unwrap_or_default();
        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/") {
            return Err(Error::Parse(format!("invalid status line: {:?}", status_line)));
        }
        let status = parts
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(|| Error::Parse(format!("invalid status line: {:?}", status_line)))?;
        let reason = parts.next().unwrap_or_default().to_string();

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::Parse(format!("invalid header line: {:?}", line)))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let response = Response {
            status,
            reason,
            headers,
            body: Vec::new(),
        };

        if let Some(length) = response.header("Content-Length") {
            let length: usize = length
                .parse()
                .map_err(|_| Error::Parse(format!("invalid Content-Length: {:?}", length)))?;
            if body.len() < length {
                return Err(Error::ConnectionClosed);
            }
            body.truncate(length);
        }

        Ok(Response { body, ..response })
    }

    /// First header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Reason phrase for the status codes the server answers with
pub(crate) fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
