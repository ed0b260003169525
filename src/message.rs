//! Parsed HTTP/1.x messages handed to the caller.

use std::collections::HashMap;
use std::fmt;

use crate::method::HttpMethod;
use crate::status::HttpStatus;

/// Header map. Names that match case-insensitively keep only the last
/// spelling and value seen.
pub type Headers = HashMap<String, String>;

/// Protocol version from the request or status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HttpVersion {
    pub major: u8,
    pub minor: u8,
}

impl HttpVersion {
    pub const HTTP_10: Self = Self::new(1, 0);
    pub const HTTP_11: Self = Self::new(1, 1);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

/// Version-less request lines are read as HTTP/1.1.
impl Default for HttpVersion {
    fn default() -> Self {
        Self::HTTP_11
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: HttpMethod,
    /// Raw request-target, undecoded.
    pub url: String,
    pub version: HttpVersion,
    pub headers: Headers,
    /// Trailer fields following a chunked body.
    pub trailers: Headers,
    /// Buffered body. Empty when the body was streamed to a body hook.
    pub body: Vec<u8>,
}

/// A parsed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: HttpStatus,
    pub version: HttpVersion,
    pub headers: Headers,
    pub trailers: Headers,
    pub body: Vec<u8>,
}

/// Either kind of message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Request {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

impl Response {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

impl Message {
    pub fn version(&self) -> HttpVersion {
        match self {
            Self::Request(r) => r.version,
            Self::Response(r) => r.version,
        }
    }

    pub fn headers(&self) -> &Headers {
        match self {
            Self::Request(r) => &r.headers,
            Self::Response(r) => &r.headers,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(self.headers(), name)
    }

    pub fn body(&self) -> &[u8] {
        match self {
            Self::Request(r) => &r.body,
            Self::Response(r) => &r.body,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Self::Request(r) => Some(r),
            Self::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Self::Response(r) => Some(r),
            Self::Request(_) => None,
        }
    }

    /// Attach what arrives after the head: body bytes and trailers.
    pub(crate) fn complete(&mut self, body: Vec<u8>, trailers: Headers) {
        match self {
            Self::Request(r) => {
                r.body = body;
                r.trailers = trailers;
            }
            Self::Response(r) => {
                r.body = body;
                r.trailers = trailers;
            }
        }
    }
}

fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
