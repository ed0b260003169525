//! HTTP/1.x grammar engine.
//!
//! A byte-at-a-time state machine for request lines, status lines, header
//! blocks and the three body framings (Content-Length, chunked, read until
//! EOF). It keeps no message data of its own: every syntactic unit is pushed
//! to an [`EngineSink`] as soon as it is recognized, and fields that straddle
//! a buffer boundary are delivered as several fragments.
//!
//! Reference: RFC 7230 (HTTP/1.1 Message Syntax and Routing)

use crate::callbacks::Control;
use crate::config::{ParserConfig, ParserMode};
use crate::error::ParserError;
use crate::message::HttpVersion;
use crate::method::{HttpMethod, MAX_METHOD_LEN};
use crate::status::HttpStatus;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const HTTP_PREFIX: &[u8] = b"HTTP/";

/// Header names the engine interprets, lowercase.
const HEADER_NAMES: &[&[u8]] = &[
    b"content-length",
    b"transfer-encoding",
    b"connection",
    b"proxy-connection",
    b"upgrade",
];
const TRANSFER_CODINGS: &[&[u8]] = &[b"chunked"];
const CONNECTION_OPTIONS: &[&[u8]] = &[b"close", b"keep-alive", b"upgrade"];

/// Kind of message on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

/// How the end of the body is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    #[default]
    NoBody,
    ContentLength(u64),
    Chunked,
    /// Body runs until the end of the stream.
    UntilEof,
}

/// Everything the engine learned from a message head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    pub direction: Direction,
    /// Set for requests.
    pub method: Option<HttpMethod>,
    /// Set for responses.
    pub status: Option<HttpStatus>,
    pub version: HttpVersion,
    pub framing: Framing,
    pub upgrade: bool,
}

/// Receiver of engine events.
///
/// Fragment methods may be called several times per field. Returning
/// [`Control::Abort`] fails the call with the `Cb*` error matching the event;
/// returning `Err` fails it with that error.
#[allow(unused_variables)]
pub trait EngineSink {
    fn on_message_begin(&mut self) -> Result<Control, ParserError> {
        Ok(Control::Continue)
    }

    fn on_url(&mut self, fragment: &[u8]) -> Result<Control, ParserError> {
        Ok(Control::Continue)
    }

    fn on_header_field(&mut self, fragment: &[u8]) -> Result<Control, ParserError> {
        Ok(Control::Continue)
    }

    fn on_header_value(&mut self, fragment: &[u8]) -> Result<Control, ParserError> {
        Ok(Control::Continue)
    }

    /// [`Control::SkipBody`] here means the message has no body.
    fn on_headers_complete(&mut self, head: &Head) -> Result<Control, ParserError> {
        Ok(Control::Continue)
    }

    fn on_body(&mut self, fragment: &[u8]) -> Result<Control, ParserError> {
        Ok(Control::Continue)
    }

    fn on_message_complete(&mut self) -> Result<Control, ParserError> {
        Ok(Control::Continue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// A non-persistent message completed; only blank lines may follow.
    Dead,
    StartReq,
    StartRes,
    StartReqOrRes,
    ReqOrRes,
    ReqOrResH,
    ReqMethod,
    ReqSpacesBeforeUrl,
    ReqUrl,
    ReqHttpStart,
    /// Index into `HTTP/` of the next expected byte.
    HttpConst(u8),
    HttpMajor,
    HttpDot,
    HttpMinor,
    HttpVersionDone,
    ResStatusCodeStart,
    ResStatusCode,
    ResStatus,
    LineAlmostDone,
    HeaderFieldStart,
    HeaderField,
    HeaderValueDiscardWs,
    HeaderValue,
    HeaderAlmostDone,
    HeaderValueLws,
    HeadersAlmostDone,
    BodyIdentity,
    BodyIdentityEof,
    ChunkSizeStart,
    ChunkSize,
    ChunkParameters,
    ChunkSizeAlmostDone,
    ChunkData,
    ChunkDataAlmostDone,
    ChunkDataDone,
}

impl State {
    /// States whose bytes count against the header size limit.
    fn is_head(self) -> bool {
        !matches!(
            self,
            State::Dead
                | State::StartReq
                | State::StartRes
                | State::StartReqOrRes
                | State::BodyIdentity
                | State::BodyIdentityEof
                | State::ChunkSizeStart
                | State::ChunkSize
                | State::ChunkParameters
                | State::ChunkSizeAlmostDone
                | State::ChunkData
                | State::ChunkDataAlmostDone
                | State::ChunkDataDone
        )
    }

    fn is_start(self) -> bool {
        matches!(self, State::StartReq | State::StartRes | State::StartReqOrRes)
    }
}

/// What the main loop does after a byte was handled.
enum Step {
    Next,
    /// Handle the same byte again in the new state.
    Again,
    Advance(usize),
    /// Stop: the rest of the buffer belongs to another protocol.
    Upgrade,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum HeaderKind {
    #[default]
    General,
    ContentLength,
    TransferEncoding,
    Connection,
    Upgrade,
}

impl HeaderKind {
    fn from_name_index(index: Option<usize>) -> Self {
        match index {
            Some(0) => Self::ContentLength,
            Some(1) => Self::TransferEncoding,
            Some(2) | Some(3) => Self::Connection,
            Some(4) => Self::Upgrade,
            _ => Self::General,
        }
    }

    fn tokens(self) -> &'static [&'static [u8]] {
        match self {
            Self::TransferEncoding => TRANSFER_CODINGS,
            Self::Connection => CONNECTION_OPTIONS,
            _ => &[],
        }
    }
}

/// Case-insensitive incremental match of a token against a candidate list.
/// Works across buffer boundaries since it never looks back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TokenMatcher {
    candidates: &'static [&'static [u8]],
    alive: u32,
    len: usize,
}

impl Default for TokenMatcher {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl TokenMatcher {
    fn new(candidates: &'static [&'static [u8]]) -> Self {
        Self {
            candidates,
            alive: (1u32 << candidates.len()) - 1,
            len: 0,
        }
    }

    fn push(&mut self, b: u8) {
        let b = b.to_ascii_lowercase();
        for (idx, candidate) in self.candidates.iter().enumerate() {
            if candidate.get(self.len) != Some(&b) {
                self.alive &= !(1 << idx);
            }
        }
        self.len += 1;
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn matched(&self) -> Option<usize> {
        self.candidates
            .iter()
            .enumerate()
            .find(|(idx, candidate)| self.alive & (1 << idx) != 0 && candidate.len() == self.len)
            .map(|(idx, _)| idx)
    }
}

/// Per-message engine state, reset at message-begin.
#[derive(Debug, Default)]
struct MessageState {
    method_buf: [u8; MAX_METHOD_LEN],
    method_len: usize,
    method: Option<HttpMethod>,
    status_code: u16,
    status_digits: u8,
    status: Option<HttpStatus>,
    version: HttpVersion,
    header_bytes: usize,
    header: HeaderKind,
    name_matcher: TokenMatcher,
    value_matcher: TokenMatcher,
    value_emitted: bool,
    /// Content-Length digits of the header line being read.
    length: Option<u64>,
    /// Whitespace followed the Content-Length digits.
    length_closed: bool,
    content_length: Option<u64>,
    chunked: bool,
    connection_close: bool,
    connection_keep_alive: bool,
    connection_upgrade: bool,
    has_upgrade: bool,
    upgrade: bool,
    framing: Framing,
    /// Body or chunk bytes still expected.
    remaining: u64,
    in_trailers: bool,
}

impl MessageState {
    fn token_byte(&mut self, b: u8) {
        if matches!(b, b',' | b' ' | b'\t') {
            self.end_token();
        } else {
            self.value_matcher.push(b);
        }
    }

    fn end_token(&mut self) {
        if self.value_matcher.is_empty() {
            return;
        }
        let matched = self.value_matcher.matched();
        match self.header {
            // The final coding decides.
            HeaderKind::TransferEncoding => self.chunked = matched == Some(0),
            HeaderKind::Connection => match matched {
                Some(0) => self.connection_close = true,
                Some(1) => self.connection_keep_alive = true,
                Some(2) => self.connection_upgrade = true,
                _ => {}
            },
            _ => {}
        }
        self.value_matcher = TokenMatcher::new(self.header.tokens());
    }
}

/// The HTTP/1.x state machine.
#[derive(Debug)]
pub struct Engine {
    mode: ParserMode,
    strict: bool,
    max_header_size: usize,
    state: State,
    direction: Option<Direction>,
    error: Option<ParserError>,
    paused: bool,
    msg: MessageState,
    url_mark: Option<usize>,
    field_mark: Option<usize>,
    value_mark: Option<usize>,
}

impl Engine {
    pub fn new(config: &ParserConfig) -> Self {
        let mut engine = Self {
            mode: config.mode,
            strict: config.strict,
            max_header_size: config.max_header_size,
            state: State::StartReqOrRes,
            direction: None,
            error: None,
            paused: false,
            msg: MessageState::default(),
            url_mark: None,
            field_mark: None,
            value_mark: None,
        };
        engine.reset();
        engine
    }

    /// Back to the state of a freshly constructed engine.
    pub fn reset(&mut self) {
        self.direction = match self.mode {
            ParserMode::Request => Some(Direction::Request),
            ParserMode::Response => Some(Direction::Response),
            ParserMode::Either => None,
        };
        self.state = self.start_state();
        self.error = None;
        self.paused = false;
        self.msg = MessageState::default();
        self.clear_marks();
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The sticky grammar error, if any.
    pub fn error(&self) -> Option<ParserError> {
        self.error
    }

    /// `None` until the first start line in `Either` mode.
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Whether the connection may carry another message after the current
    /// (or just completed) one.
    pub fn should_keep_alive(&self) -> bool {
        let msg = &self.msg;
        let persistent = if msg.version >= HttpVersion::HTTP_11 {
            !msg.connection_close
        } else {
            msg.connection_keep_alive && !msg.connection_close
        };
        persistent && msg.framing != Framing::UntilEof
    }

    /// The last message switched protocols; bytes after the returned offset
    /// are not HTTP/1.x.
    pub fn is_upgrade(&self) -> bool {
        self.msg.upgrade
    }

    /// No more body bytes are expected for the current message: either the
    /// last chunk has been read or no message is in progress.
    pub fn body_is_final(&self) -> bool {
        self.msg.in_trailers || self.state.is_start() || self.state == State::Dead
    }

    /// Feed bytes. An empty slice signals the end of the stream.
    ///
    /// Returns how many bytes were consumed, which is less than `data.len()`
    /// only on error, pause or upgrade.
    pub fn execute<S: EngineSink + ?Sized>(
        &mut self,
        sink: &mut S,
        data: &[u8],
    ) -> (usize, Result<(), ParserError>) {
        if let Some(err) = self.error {
            return (0, Err(err));
        }
        if self.paused {
            return (0, Err(ParserError::Paused));
        }
        if data.is_empty() {
            return (0, self.finish(sink));
        }

        self.url_mark = (self.state == State::ReqUrl).then_some(0);
        self.field_mark = (self.state == State::HeaderField).then_some(0);
        self.value_mark = (self.state == State::HeaderValue).then_some(0);

        let mut i = 0;
        while i < data.len() {
            let in_head = self.state.is_head();
            let step = match self.step(sink, data, i) {
                Ok(step) => step,
                Err(err) => return (i, Err(self.fail(err))),
            };
            match step {
                Step::Next => {
                    if in_head {
                        self.msg.header_bytes += 1;
                        if self.msg.header_bytes > self.max_header_size {
                            return (i, Err(self.fail(ParserError::HeaderOverflow)));
                        }
                    }
                    i += 1;
                }
                Step::Again => {}
                Step::Advance(n) => i += n,
                Step::Upgrade => {
                    let consumed = i + 1;
                    tracing::trace!(consumed, "protocol upgrade");
                    return if self.paused {
                        (consumed, Err(ParserError::Paused))
                    } else {
                        (consumed, Ok(()))
                    };
                }
            }
            if self.paused {
                if let Err(err) = self.flush(sink, data, i) {
                    return (i, Err(self.fail(err)));
                }
                return (i, Err(ParserError::Paused));
            }
        }

        if let Err(err) = self.flush(sink, data, data.len()) {
            return (data.len(), Err(self.fail(err)));
        }
        if self.paused {
            return (data.len(), Err(ParserError::Paused));
        }
        (data.len(), Ok(()))
    }

    fn step<S: EngineSink + ?Sized>(
        &mut self,
        sink: &mut S,
        data: &[u8],
        i: usize,
    ) -> Result<Step, ParserError> {
        let b = data[i];
        match self.state {
            State::Dead => {
                if b == CR || b == LF {
                    Ok(Step::Next)
                } else {
                    Err(ParserError::ClosedConnection)
                }
            }

            // ---------------------------------------------------------------
            // Start line
            // ---------------------------------------------------------------
            State::StartReq | State::StartRes | State::StartReqOrRes => {
                if b == CR || b == LF {
                    return Ok(Step::Next);
                }
                let next = match self.state {
                    State::StartReq => State::ReqMethod,
                    State::StartRes => State::HttpConst(0),
                    _ => State::ReqOrRes,
                };
                self.begin_message(sink)?;
                self.state = next;
                Ok(Step::Again)
            }
            State::ReqOrRes => {
                if b == b'H' {
                    self.push_method_byte(b)?;
                    self.state = State::ReqOrResH;
                    Ok(Step::Next)
                } else {
                    self.direction = Some(Direction::Request);
                    self.state = State::ReqMethod;
                    Ok(Step::Again)
                }
            }
            State::ReqOrResH => {
                if b == b'T' {
                    self.direction = Some(Direction::Response);
                    self.msg.method_len = 0;
                    self.state = State::HttpConst(2);
                    Ok(Step::Next)
                } else {
                    self.direction = Some(Direction::Request);
                    self.state = State::ReqMethod;
                    Ok(Step::Again)
                }
            }
            State::ReqMethod => {
                if b == b' ' {
                    let token = &self.msg.method_buf[..self.msg.method_len];
                    let method = HttpMethod::from_token(token).ok_or(ParserError::InvalidMethod)?;
                    self.msg.method = Some(method);
                    self.state = State::ReqSpacesBeforeUrl;
                } else if b.is_ascii_uppercase() || b == b'-' {
                    self.push_method_byte(b)?;
                } else {
                    return Err(ParserError::InvalidMethod);
                }
                Ok(Step::Next)
            }
            State::ReqSpacesBeforeUrl => {
                match b {
                    b' ' => {}
                    _ if self.is_url_char(b) => {
                        self.url_mark = Some(i);
                        self.state = State::ReqUrl;
                    }
                    _ => return Err(ParserError::InvalidUrl),
                }
                Ok(Step::Next)
            }
            State::ReqUrl => {
                match b {
                    b' ' => {
                        self.emit_url(sink, data, i)?;
                        self.state = State::ReqHttpStart;
                    }
                    CR => {
                        self.versionless()?;
                        self.emit_url(sink, data, i)?;
                        self.state = State::LineAlmostDone;
                    }
                    LF => {
                        self.versionless()?;
                        self.bare_lf()?;
                        self.emit_url(sink, data, i)?;
                        self.state = State::HeaderFieldStart;
                    }
                    _ if self.is_url_char(b) => {}
                    _ => return Err(ParserError::InvalidUrl),
                }
                Ok(Step::Next)
            }
            State::ReqHttpStart => {
                match b {
                    b' ' => {}
                    b'H' => self.state = State::HttpConst(1),
                    CR => {
                        self.versionless()?;
                        self.state = State::LineAlmostDone;
                    }
                    LF => {
                        self.versionless()?;
                        self.bare_lf()?;
                        self.state = State::HeaderFieldStart;
                    }
                    _ => return Err(ParserError::InvalidConstant),
                }
                Ok(Step::Next)
            }
            State::HttpConst(n) => {
                let n = usize::from(n);
                if b != HTTP_PREFIX[n] {
                    return Err(ParserError::InvalidConstant);
                }
                self.state = if n + 1 == HTTP_PREFIX.len() {
                    State::HttpMajor
                } else {
                    State::HttpConst((n + 1) as u8)
                };
                Ok(Step::Next)
            }
            State::HttpMajor => {
                if !b.is_ascii_digit() {
                    return Err(ParserError::InvalidVersion);
                }
                self.msg.version.major = b - b'0';
                self.state = State::HttpDot;
                Ok(Step::Next)
            }
            State::HttpDot => {
                if b != b'.' {
                    return Err(ParserError::InvalidVersion);
                }
                self.state = State::HttpMinor;
                Ok(Step::Next)
            }
            State::HttpMinor => {
                if !b.is_ascii_digit() {
                    return Err(ParserError::InvalidVersion);
                }
                self.msg.version.minor = b - b'0';
                self.state = State::HttpVersionDone;
                Ok(Step::Next)
            }
            State::HttpVersionDone => {
                match (self.direction, b) {
                    (Some(Direction::Response), b' ') => self.state = State::ResStatusCodeStart,
                    (Some(Direction::Request), CR) => self.state = State::LineAlmostDone,
                    (Some(Direction::Request), LF) => {
                        self.bare_lf()?;
                        self.state = State::HeaderFieldStart;
                    }
                    _ => return Err(ParserError::InvalidVersion),
                }
                Ok(Step::Next)
            }
            State::ResStatusCodeStart => {
                match b {
                    b' ' => {}
                    _ if b.is_ascii_digit() => {
                        self.status_digit(b)?;
                        self.state = State::ResStatusCode;
                    }
                    _ => return Err(ParserError::InvalidStatus),
                }
                Ok(Step::Next)
            }
            State::ResStatusCode => {
                match b {
                    _ if b.is_ascii_digit() => self.status_digit(b)?,
                    b' ' => {
                        self.finish_status()?;
                        self.state = State::ResStatus;
                    }
                    CR => {
                        self.finish_status()?;
                        self.state = State::LineAlmostDone;
                    }
                    LF => {
                        self.finish_status()?;
                        self.bare_lf()?;
                        self.state = State::HeaderFieldStart;
                    }
                    _ => return Err(ParserError::InvalidStatus),
                }
                Ok(Step::Next)
            }
            State::ResStatus => {
                // The reason phrase carries no information the status does not.
                match b {
                    CR => self.state = State::LineAlmostDone,
                    LF => {
                        self.bare_lf()?;
                        self.state = State::HeaderFieldStart;
                    }
                    _ => {}
                }
                Ok(Step::Next)
            }
            State::LineAlmostDone => {
                if b != LF {
                    return Err(ParserError::LineFeedExpected);
                }
                self.state = State::HeaderFieldStart;
                Ok(Step::Next)
            }

            // ---------------------------------------------------------------
            // Header and trailer fields
            // ---------------------------------------------------------------
            State::HeaderFieldStart => match b {
                CR => {
                    self.state = State::HeadersAlmostDone;
                    Ok(Step::Next)
                }
                LF => {
                    self.bare_lf()?;
                    self.headers_done(sink)
                }
                _ if is_token(b) => {
                    self.field_mark = Some(i);
                    self.msg.name_matcher = TokenMatcher::new(HEADER_NAMES);
                    self.msg.name_matcher.push(b);
                    self.state = State::HeaderField;
                    Ok(Step::Next)
                }
                _ => Err(ParserError::InvalidHeaderToken),
            },
            State::HeaderField => {
                match b {
                    b':' => {
                        self.emit_field(sink, data, i)?;
                        self.start_value();
                        self.state = State::HeaderValueDiscardWs;
                    }
                    _ if is_token(b) => self.msg.name_matcher.push(b),
                    _ => return Err(ParserError::InvalidHeaderToken),
                }
                Ok(Step::Next)
            }
            State::HeaderValueDiscardWs => {
                match b {
                    b' ' | b'\t' => {}
                    CR => self.state = State::HeaderAlmostDone,
                    LF => {
                        self.bare_lf()?;
                        self.state = State::HeaderValueLws;
                    }
                    _ => {
                        self.value_byte(b)?;
                        self.value_mark = Some(i);
                        self.state = State::HeaderValue;
                    }
                }
                Ok(Step::Next)
            }
            State::HeaderValue => {
                match b {
                    CR => {
                        self.emit_value(sink, data, i)?;
                        self.state = State::HeaderAlmostDone;
                    }
                    LF => {
                        self.bare_lf()?;
                        self.emit_value(sink, data, i)?;
                        self.state = State::HeaderValueLws;
                    }
                    _ => self.value_byte(b)?,
                }
                Ok(Step::Next)
            }
            State::HeaderAlmostDone => {
                if b != LF {
                    return Err(ParserError::LineFeedExpected);
                }
                self.state = State::HeaderValueLws;
                Ok(Step::Next)
            }
            State::HeaderValueLws => {
                if b == b' ' || b == b'\t' {
                    // obs-fold: the continuation joins the value with one space.
                    if self.strict {
                        return Err(ParserError::NotStrict);
                    }
                    self.emit(sink.on_header_value(b" "), ParserError::CbHeaderValue)?;
                    self.msg.value_emitted = true;
                    self.value_byte(b' ')?;
                    self.state = State::HeaderValueDiscardWs;
                    return Ok(Step::Next);
                }
                if !self.msg.value_emitted {
                    self.emit(sink.on_header_value(b""), ParserError::CbHeaderValue)?;
                    self.msg.value_emitted = true;
                }
                self.finish_header_value()?;
                self.state = State::HeaderFieldStart;
                Ok(Step::Again)
            }
            State::HeadersAlmostDone => {
                if b != LF {
                    return Err(ParserError::LineFeedExpected);
                }
                self.headers_done(sink)
            }

            // ---------------------------------------------------------------
            // Body
            // ---------------------------------------------------------------
            State::BodyIdentity => {
                let take = self.body_slice_len(data.len() - i);
                self.emit(sink.on_body(&data[i..i + take]), ParserError::CbBody)?;
                self.msg.remaining -= take as u64;
                if self.msg.remaining == 0 {
                    self.message_done(sink)?;
                }
                Ok(Step::Advance(take))
            }
            State::BodyIdentityEof => {
                self.emit(sink.on_body(&data[i..]), ParserError::CbBody)?;
                Ok(Step::Advance(data.len() - i))
            }
            State::ChunkSizeStart => {
                let digit = hex_value(b).ok_or(ParserError::InvalidChunkSize)?;
                self.msg.remaining = u64::from(digit);
                self.state = State::ChunkSize;
                Ok(Step::Next)
            }
            State::ChunkSize => {
                match b {
                    CR => self.state = State::ChunkSizeAlmostDone,
                    LF => {
                        self.bare_lf()?;
                        return Ok(self.chunk_size_done());
                    }
                    b';' | b' ' | b'\t' => self.state = State::ChunkParameters,
                    _ => {
                        let digit = hex_value(b).ok_or(ParserError::InvalidChunkSize)?;
                        self.msg.remaining = self
                            .msg
                            .remaining
                            .checked_mul(16)
                            .and_then(|n| n.checked_add(u64::from(digit)))
                            .ok_or(ParserError::InvalidChunkSize)?;
                    }
                }
                Ok(Step::Next)
            }
            State::ChunkParameters => {
                // Chunk extensions are not interpreted.
                match b {
                    CR => self.state = State::ChunkSizeAlmostDone,
                    LF => {
                        self.bare_lf()?;
                        return Ok(self.chunk_size_done());
                    }
                    _ => {}
                }
                Ok(Step::Next)
            }
            State::ChunkSizeAlmostDone => {
                if b != LF {
                    return Err(ParserError::LineFeedExpected);
                }
                Ok(self.chunk_size_done())
            }
            State::ChunkData => {
                let take = self.body_slice_len(data.len() - i);
                self.emit(sink.on_body(&data[i..i + take]), ParserError::CbBody)?;
                self.msg.remaining -= take as u64;
                if self.msg.remaining == 0 {
                    self.state = State::ChunkDataAlmostDone;
                }
                Ok(Step::Advance(take))
            }
            State::ChunkDataAlmostDone => {
                match b {
                    CR => self.state = State::ChunkDataDone,
                    LF => {
                        self.bare_lf()?;
                        self.state = State::ChunkSizeStart;
                    }
                    // More data than the chunk size announced.
                    _ => return Err(ParserError::InvalidChunkSize),
                }
                Ok(Step::Next)
            }
            State::ChunkDataDone => {
                if b != LF {
                    return Err(ParserError::LineFeedExpected);
                }
                self.state = State::ChunkSizeStart;
                Ok(Step::Next)
            }
        }
    }

    /// End of stream.
    fn finish<S: EngineSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), ParserError> {
        match self.state {
            State::BodyIdentityEof => {
                if let Err(err) = self.message_done(sink) {
                    return Err(self.fail(err));
                }
                if self.paused {
                    return Err(ParserError::Paused);
                }
                Ok(())
            }
            State::Dead | State::StartReq | State::StartRes | State::StartReqOrRes => Ok(()),
            _ => Err(self.fail(ParserError::InvalidEofState)),
        }
    }

    fn start_state(&self) -> State {
        match self.direction {
            Some(Direction::Request) => State::StartReq,
            Some(Direction::Response) => State::StartRes,
            None => State::StartReqOrRes,
        }
    }

    fn begin_message<S: EngineSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), ParserError> {
        self.msg = MessageState::default();
        tracing::trace!("message begin");
        self.emit(sink.on_message_begin(), ParserError::CbMessageBegin)?;
        Ok(())
    }

    fn headers_done<S: EngineSink + ?Sized>(&mut self, sink: &mut S) -> Result<Step, ParserError> {
        if self.msg.in_trailers {
            self.message_done(sink)?;
            return Ok(Step::Next);
        }

        self.msg.framing = self.framing()?;
        self.msg.upgrade = match self.direction {
            Some(Direction::Request) => {
                self.msg.method == Some(HttpMethod::Connect)
                    || (self.msg.has_upgrade && self.msg.connection_upgrade)
            }
            Some(Direction::Response) => self.msg.status == Some(HttpStatus::SWITCHING_PROTOCOLS),
            None => false,
        };
        let head = self.head()?;
        tracing::trace!(direction = ?head.direction, framing = ?head.framing, "headers complete");

        let control = self.emit(sink.on_headers_complete(&head), ParserError::CbHeadersComplete)?;
        if control == Control::SkipBody {
            self.msg.framing = Framing::NoBody;
        }

        if self.msg.upgrade {
            self.message_done(sink)?;
            return Ok(Step::Upgrade);
        }
        match self.msg.framing {
            Framing::NoBody => self.message_done(sink)?,
            Framing::ContentLength(n) => {
                self.msg.remaining = n;
                self.state = State::BodyIdentity;
            }
            Framing::Chunked => self.state = State::ChunkSizeStart,
            Framing::UntilEof => self.state = State::BodyIdentityEof,
        }
        Ok(Step::Next)
    }

    fn framing(&self) -> Result<Framing, ParserError> {
        let msg = &self.msg;
        if let Some(status) = msg.status {
            if !status.permits_body() {
                return Ok(Framing::NoBody);
            }
        }
        if msg.chunked {
            if msg.content_length.is_some() && self.strict {
                return Err(ParserError::InvalidContentLength);
            }
            return Ok(Framing::Chunked);
        }
        Ok(match (msg.content_length, self.direction) {
            (Some(0), _) => Framing::NoBody,
            (Some(n), _) => Framing::ContentLength(n),
            (None, Some(Direction::Response)) => Framing::UntilEof,
            (None, _) => Framing::NoBody,
        })
    }

    fn head(&self) -> Result<Head, ParserError> {
        let direction = self.direction.ok_or(ParserError::InvalidInternalState)?;
        Ok(Head {
            direction,
            method: self.msg.method,
            status: self.msg.status,
            version: self.msg.version,
            framing: self.msg.framing,
            upgrade: self.msg.upgrade,
        })
    }

    fn message_done<S: EngineSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), ParserError> {
        let keep_alive = self.should_keep_alive();
        self.state = if keep_alive { self.start_state() } else { State::Dead };
        tracing::trace!(keep_alive, "message complete");
        self.emit(sink.on_message_complete(), ParserError::CbMessageComplete)?;
        Ok(())
    }

    fn chunk_size_done(&mut self) -> Step {
        if self.msg.remaining == 0 {
            self.msg.in_trailers = true;
            self.msg.header_bytes = 0;
            self.state = State::HeaderFieldStart;
        } else {
            self.state = State::ChunkData;
        }
        Step::Next
    }

    fn body_slice_len(&self, available: usize) -> usize {
        usize::try_from(self.msg.remaining).map_or(available, |remaining| remaining.min(available))
    }

    fn push_method_byte(&mut self, b: u8) -> Result<(), ParserError> {
        if self.msg.method_len == MAX_METHOD_LEN {
            return Err(ParserError::InvalidMethod);
        }
        self.msg.method_buf[self.msg.method_len] = b;
        self.msg.method_len += 1;
        Ok(())
    }

    fn status_digit(&mut self, b: u8) -> Result<(), ParserError> {
        if self.msg.status_digits == 3 {
            return Err(ParserError::InvalidStatus);
        }
        self.msg.status_code = self.msg.status_code * 10 + u16::from(b - b'0');
        self.msg.status_digits += 1;
        Ok(())
    }

    fn finish_status(&mut self) -> Result<(), ParserError> {
        if self.msg.status_digits != 3 {
            return Err(ParserError::InvalidStatus);
        }
        self.msg.status = Some(HttpStatus::new(self.msg.status_code).ok_or(ParserError::InvalidStatus)?);
        Ok(())
    }

    fn start_value(&mut self) {
        let msg = &mut self.msg;
        msg.header = if msg.in_trailers {
            HeaderKind::General
        } else {
            HeaderKind::from_name_index(msg.name_matcher.matched())
        };
        msg.value_matcher = TokenMatcher::new(msg.header.tokens());
        msg.value_emitted = false;
        msg.length = None;
        msg.length_closed = false;
    }

    fn value_byte(&mut self, b: u8) -> Result<(), ParserError> {
        if !is_value_char(b) {
            return Err(ParserError::InvalidHeaderToken);
        }
        let msg = &mut self.msg;
        match msg.header {
            HeaderKind::General | HeaderKind::Upgrade => {}
            HeaderKind::ContentLength => match b {
                b'0'..=b'9' => {
                    if msg.length_closed {
                        return Err(ParserError::InvalidContentLength);
                    }
                    let length = msg
                        .length
                        .unwrap_or(0)
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(u64::from(b - b'0')))
                        .ok_or(ParserError::InvalidContentLength)?;
                    msg.length = Some(length);
                }
                b' ' | b'\t' => msg.length_closed = msg.length.is_some(),
                _ => return Err(ParserError::InvalidContentLength),
            },
            HeaderKind::TransferEncoding | HeaderKind::Connection => msg.token_byte(b),
        }
        Ok(())
    }

    fn finish_header_value(&mut self) -> Result<(), ParserError> {
        let msg = &mut self.msg;
        match msg.header {
            HeaderKind::General => {}
            HeaderKind::ContentLength => {
                let length = msg.length.ok_or(ParserError::InvalidContentLength)?;
                if msg.content_length.is_some() {
                    return Err(ParserError::InvalidContentLength);
                }
                msg.content_length = Some(length);
            }
            HeaderKind::TransferEncoding | HeaderKind::Connection => msg.end_token(),
            HeaderKind::Upgrade => msg.has_upgrade = true,
        }
        msg.header = HeaderKind::General;
        Ok(())
    }

    fn versionless(&mut self) -> Result<(), ParserError> {
        if self.strict {
            return Err(ParserError::InvalidVersion);
        }
        self.msg.version = HttpVersion::HTTP_11;
        Ok(())
    }

    fn bare_lf(&self) -> Result<(), ParserError> {
        if self.strict {
            Err(ParserError::NotStrict)
        } else {
            Ok(())
        }
    }

    fn is_url_char(&self, b: u8) -> bool {
        (0x21..=0x7e).contains(&b) || (!self.strict && b >= 0x80)
    }

    /// Translate a sink result into the engine's view.
    fn emit(
        &mut self,
        result: Result<Control, ParserError>,
        on_abort: ParserError,
    ) -> Result<Control, ParserError> {
        match result? {
            Control::Abort => Err(on_abort),
            Control::Pause => {
                self.paused = true;
                Ok(Control::Continue)
            }
            control => Ok(control),
        }
    }

    fn emit_url<S: EngineSink + ?Sized>(
        &mut self,
        sink: &mut S,
        data: &[u8],
        end: usize,
    ) -> Result<(), ParserError> {
        if let Some(mark) = self.url_mark.take() {
            self.emit(sink.on_url(&data[mark..end]), ParserError::CbUrl)?;
        }
        Ok(())
    }

    fn emit_field<S: EngineSink + ?Sized>(
        &mut self,
        sink: &mut S,
        data: &[u8],
        end: usize,
    ) -> Result<(), ParserError> {
        if let Some(mark) = self.field_mark.take() {
            self.emit(sink.on_header_field(&data[mark..end]), ParserError::CbHeaderField)?;
        }
        Ok(())
    }

    fn emit_value<S: EngineSink + ?Sized>(
        &mut self,
        sink: &mut S,
        data: &[u8],
        end: usize,
    ) -> Result<(), ParserError> {
        if let Some(mark) = self.value_mark.take() {
            self.emit(sink.on_header_value(&data[mark..end]), ParserError::CbHeaderValue)?;
            self.msg.value_emitted = true;
        }
        Ok(())
    }

    /// Deliver the open parts of fields that continue past `end`.
    fn flush<S: EngineSink + ?Sized>(
        &mut self,
        sink: &mut S,
        data: &[u8],
        end: usize,
    ) -> Result<(), ParserError> {
        if self.url_mark.is_some_and(|mark| mark < end) {
            self.emit_url(sink, data, end)?;
        }
        if self.field_mark.is_some_and(|mark| mark < end) {
            self.emit_field(sink, data, end)?;
        }
        if self.value_mark.is_some_and(|mark| mark < end) {
            self.emit_value(sink, data, end)?;
        }
        self.clear_marks();
        Ok(())
    }

    fn clear_marks(&mut self) {
        self.url_mark = None;
        self.field_mark = None;
        self.value_mark = None;
    }

    /// Record `err`. Callback aborts drop the current message and leave the
    /// engine ready for the next one; anything else sticks.
    fn fail(&mut self, err: ParserError) -> ParserError {
        self.clear_marks();
        if err.is_callback() {
            // A completed non-persistent message keeps the stream closed.
            if self.state != State::Dead {
                self.state = self.start_state();
            }
            self.msg = MessageState::default();
        } else {
            self.error = Some(err);
        }
        err
    }
}

fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn is_value_char(b: u8) -> bool {
    b == b'\t' || (b >= 0x20 && b != 0x7f)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
