//! HTTP request methods recognized by the parser.

use std::fmt;

/// A request method from the fixed method table.
///
/// Method tokens are case-sensitive. Tokens outside this table are rejected
/// with [`InvalidMethod`](crate::ParserError::InvalidMethod).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Delete,
    Get,
    Head,
    Post,
    Put,
    Connect,
    Options,
    Trace,
    // WebDAV
    Copy,
    Lock,
    Mkcol,
    Move,
    Propfind,
    Proppatch,
    Search,
    Unlock,
    // Subversion
    Report,
    Mkactivity,
    Checkout,
    Merge,
    // UPnP
    MSearch,
    Notify,
    Subscribe,
    Unsubscribe,
    // RFC 5789
    Patch,
    Purge,
    // CalDAV
    Mkcalendar,
}

/// Longest token in the method table (`UNSUBSCRIBE`).
pub const MAX_METHOD_LEN: usize = 11;

const METHODS: [(&[u8], HttpMethod); 27] = [
    (b"DELETE", HttpMethod::Delete),
    (b"GET", HttpMethod::Get),
    (b"HEAD", HttpMethod::Head),
    (b"POST", HttpMethod::Post),
    (b"PUT", HttpMethod::Put),
    (b"CONNECT", HttpMethod::Connect),
    (b"OPTIONS", HttpMethod::Options),
    (b"TRACE", HttpMethod::Trace),
    (b"COPY", HttpMethod::Copy),
    (b"LOCK", HttpMethod::Lock),
    (b"MKCOL", HttpMethod::Mkcol),
    (b"MOVE", HttpMethod::Move),
    (b"PROPFIND", HttpMethod::Propfind),
    (b"PROPPATCH", HttpMethod::Proppatch),
    (b"SEARCH", HttpMethod::Search),
    (b"UNLOCK", HttpMethod::Unlock),
    (b"REPORT", HttpMethod::Report),
    (b"MKACTIVITY", HttpMethod::Mkactivity),
    (b"CHECKOUT", HttpMethod::Checkout),
    (b"MERGE", HttpMethod::Merge),
    (b"M-SEARCH", HttpMethod::MSearch),
    (b"NOTIFY", HttpMethod::Notify),
    (b"SUBSCRIBE", HttpMethod::Subscribe),
    (b"UNSUBSCRIBE", HttpMethod::Unsubscribe),
    (b"PATCH", HttpMethod::Patch),
    (b"PURGE", HttpMethod::Purge),
    (b"MKCALENDAR", HttpMethod::Mkcalendar),
];

impl HttpMethod {
    /// Look up a method token, e.g. `b"GET"`.
    pub fn from_token(token: &[u8]) -> Option<Self> {
        METHODS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, method)| *method)
    }

    /// The method token as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Copy => "COPY",
            Self::Lock => "LOCK",
            Self::Mkcol => "MKCOL",
            Self::Move => "MOVE",
            Self::Propfind => "PROPFIND",
            Self::Proppatch => "PROPPATCH",
            Self::Search => "SEARCH",
            Self::Unlock => "UNLOCK",
            Self::Report => "REPORT",
            Self::Mkactivity => "MKACTIVITY",
            Self::Checkout => "CHECKOUT",
            Self::Merge => "MERGE",
            Self::MSearch => "M-SEARCH",
            Self::Notify => "NOTIFY",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Patch => "PATCH",
            Self::Purge => "PURGE",
            Self::Mkcalendar => "MKCALENDAR",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
