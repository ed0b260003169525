//! Parser error taxonomy.
//!
//! Every failure `Parser::feed` can report is a value of [`ParserError`].
//! Success is `Ok`; there is no "OK" variant.

/// Errors reported while parsing an HTTP/1.x byte stream.
///
/// Three families exist:
///
/// - callback aborts (`Cb*`): a hook asked to stop. The current message is
///   abandoned and the parser is ready for the next one;
/// - grammar violations: the stream is desynchronized and the parser keeps
///   returning the same error until [`reset`](crate::Parser::reset);
/// - [`Paused`](ParserError::Paused): not a failure, parsing resumes after
///   [`resume`](crate::Parser::resume).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ParserError {
    #[error("the on_message_begin callback failed")]
    CbMessageBegin,
    #[error("the on_url callback failed")]
    CbUrl,
    #[error("the on_body callback failed")]
    CbBody,
    #[error("the on_message_complete callback failed")]
    CbMessageComplete,
    #[error("the on_status callback failed")]
    CbStatus,
    #[error("the on_header_field callback failed")]
    CbHeaderField,
    #[error("the on_header_value callback failed")]
    CbHeaderValue,
    #[error("the on_headers_complete callback failed")]
    CbHeadersComplete,

    #[error("stream ended at an unexpected time")]
    InvalidEofState,
    #[error("too many header bytes seen; overflow detected")]
    HeaderOverflow,
    #[error("data received after completed connection: close message")]
    ClosedConnection,
    #[error("invalid HTTP version")]
    InvalidVersion,
    #[error("invalid HTTP status code")]
    InvalidStatus,
    #[error("invalid HTTP method")]
    InvalidMethod,
    #[error("invalid URL")]
    InvalidUrl,
    #[error("invalid host")]
    InvalidHost,
    #[error("invalid port")]
    InvalidPort,
    #[error("invalid path")]
    InvalidPath,
    #[error("invalid query string")]
    InvalidQueryString,
    #[error("invalid fragment")]
    InvalidFragment,
    #[error("LF character expected")]
    LineFeedExpected,
    #[error("invalid character in header")]
    InvalidHeaderToken,
    #[error("invalid character in content-length header")]
    InvalidContentLength,
    #[error("invalid character in chunk size header")]
    InvalidChunkSize,
    #[error("invalid constant string")]
    InvalidConstant,
    #[error("encountered unexpected internal state")]
    InvalidInternalState,
    #[error("strict mode assertion failed")]
    NotStrict,
    #[error("parser is paused")]
    Paused,
}

impl ParserError {
    /// Stable short name, suitable for logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CbMessageBegin => "CB_message_begin",
            Self::CbUrl => "CB_url",
            Self::CbBody => "CB_body",
            Self::CbMessageComplete => "CB_message_complete",
            Self::CbStatus => "CB_status",
            Self::CbHeaderField => "CB_header_field",
            Self::CbHeaderValue => "CB_header_value",
            Self::CbHeadersComplete => "CB_headers_complete",
            Self::InvalidEofState => "INVALID_EOF_STATE",
            Self::HeaderOverflow => "HEADER_OVERFLOW",
            Self::ClosedConnection => "CLOSED_CONNECTION",
            Self::InvalidVersion => "INVALID_VERSION",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidMethod => "INVALID_METHOD",
            Self::InvalidUrl => "INVALID_URL",
            Self::InvalidHost => "INVALID_HOST",
            Self::InvalidPort => "INVALID_PORT",
            Self::InvalidPath => "INVALID_PATH",
            Self::InvalidQueryString => "INVALID_QUERY_STRING",
            Self::InvalidFragment => "INVALID_FRAGMENT",
            Self::LineFeedExpected => "LF_EXPECTED",
            Self::InvalidHeaderToken => "INVALID_HEADER_TOKEN",
            Self::InvalidContentLength => "INVALID_CONTENT_LENGTH",
            Self::InvalidChunkSize => "INVALID_CHUNK_SIZE",
            Self::InvalidConstant => "INVALID_CONSTANT",
            Self::InvalidInternalState => "INVALID_INTERNAL_STATE",
            Self::NotStrict => "STRICT",
            Self::Paused => "PAUSED",
        }
    }

    /// True for errors raised because a callback asked to abort.
    pub fn is_callback(&self) -> bool {
        matches!(
            self,
            Self::CbMessageBegin
                | Self::CbUrl
                | Self::CbBody
                | Self::CbMessageComplete
                | Self::CbStatus
                | Self::CbHeaderField
                | Self::CbHeaderValue
                | Self::CbHeadersComplete
        )
    }

    /// True when the parser can keep consuming the same stream afterwards.
    pub fn is_recoverable(&self) -> bool {
        self.is_callback() || *self == Self::Paused
    }
}
