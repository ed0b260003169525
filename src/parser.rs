//! The caller-facing parser.

use crate::accumulator::ParseState;
use crate::builder::MessageBuilder;
use crate::callbacks::Control;
use crate::config::ParserConfig;
use crate::engine::Engine;
use crate::error::ParserError;
use crate::message::{Message, Request, Response};

/// Incremental HTTP/1.x parser.
///
/// Feed bytes as they arrive; completed messages are delivered to the
/// registered hooks from inside [`feed`](Self::feed). Slices may be split
/// anywhere.
#[derive(Debug)]
pub struct Parser {
    config: ParserConfig,
    engine: Engine,
    builder: MessageBuilder,
    consumed: usize,
    last_error: Option<ParserError>,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            engine: Engine::new(&config),
            builder: MessageBuilder::new(),
            config,
            consumed: 0,
            last_error: None,
        }
    }

    /// Parser for a stream of requests (server side).
    pub fn request() -> Self {
        Self::new(ParserConfig::request())
    }

    /// Parser for a stream of responses (client side).
    pub fn response() -> Self {
        Self::new(ParserConfig::response())
    }

    /// Parser that detects the direction from the first message.
    pub fn either() -> Self {
        Self::new(ParserConfig::default())
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `data`. An empty slice signals the end of the stream, which
    /// completes a body delimited by connection close.
    ///
    /// Returns the number of bytes consumed. It is smaller than `data.len()`
    /// only after a protocol upgrade; on `Err`, see
    /// [`bytes_consumed`](Self::bytes_consumed).
    pub fn feed(&mut self, data: &[u8]) -> Result<usize, ParserError> {
        let (consumed, result) = self.engine.execute(&mut self.builder, data);
        self.consumed = consumed;
        match result {
            Ok(()) => {
                self.last_error = None;
                Ok(consumed)
            }
            Err(err) => Err(self.report(err)),
        }
    }

    /// Signal the end of the stream. Same as feeding an empty slice.
    pub fn finish(&mut self) -> Result<(), ParserError> {
        self.feed(&[]).map(|_| ())
    }

    fn report(&mut self, err: ParserError) -> ParserError {
        match err {
            ParserError::Paused => {}
            ParserError::InvalidInternalState => {
                tracing::error!(consumed = self.consumed, "parser reached an inconsistent state");
                debug_assert!(false, "inconsistent parser state");
            }
            _ if err.is_callback() => {
                tracing::debug!(error = err.name(), "message aborted by callback");
                self.builder.reset();
            }
            _ => {
                tracing::warn!(error = err.name(), consumed = self.consumed, "{}", err);
            }
        }
        self.last_error = Some(err);
        err
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Called once the head of a message is parsed, before any body bytes.
    /// Returning [`Control::SkipBody`] tells the parser that the message has
    /// no body (a response to HEAD, for instance).
    pub fn set_on_headers_complete<F, R>(&mut self, hook: F)
    where
        F: FnMut(&Message) -> R + 'static,
        R: Into<Control>,
    {
        self.builder.callbacks_mut().set_on_headers_complete(hook);
    }

    /// Stream body bytes instead of buffering them in the message.
    pub fn set_on_body_data<F, R>(&mut self, hook: F)
    where
        F: FnMut(&Message, &[u8]) -> R + 'static,
        R: Into<Control>,
    {
        self.builder.callbacks_mut().set_on_body_data(hook);
    }

    pub fn set_on_request_complete<F, R>(&mut self, hook: F)
    where
        F: FnMut(Request) -> R + 'static,
        R: Into<Control>,
    {
        self.builder.callbacks_mut().set_on_request_complete(hook);
    }

    pub fn set_on_response_complete<F, R>(&mut self, hook: F)
    where
        F: FnMut(Response) -> R + 'static,
        R: Into<Control>,
    {
        self.builder.callbacks_mut().set_on_response_complete(hook);
    }

    pub fn clear_all_handlers(&mut self) {
        self.builder.callbacks_mut().clear();
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Which field of the current message is being read.
    pub fn state(&self) -> ParseState {
        self.builder.state()
    }

    /// No further body bytes are expected for the current message.
    pub fn body_is_final(&self) -> bool {
        self.engine.body_is_final()
    }

    pub fn should_keep_alive(&self) -> bool {
        self.engine.should_keep_alive()
    }

    /// The last message switched protocols. Bytes past the count returned by
    /// `feed` belong to the new protocol.
    pub fn is_upgrade(&self) -> bool {
        self.engine.is_upgrade()
    }

    pub fn is_paused(&self) -> bool {
        self.engine.is_paused()
    }

    /// Bytes consumed by the most recent `feed`, including failed or paused
    /// calls.
    pub fn bytes_consumed(&self) -> usize {
        self.consumed
    }

    /// Error returned by the most recent `feed`, if it failed.
    pub fn last_error(&self) -> Option<ParserError> {
        self.last_error
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn resume(&mut self) {
        self.engine.resume();
        if self.last_error == Some(ParserError::Paused) {
            self.last_error = None;
        }
    }

    /// Discard all parsing state, including a sticky error. Hooks stay.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.builder.reset();
        self.consumed = 0;
        self.last_error = None;
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::either()
    }
}
