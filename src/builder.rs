//! Message assembly.
//!
//! [`MessageBuilder`] is the engine's sink: it coalesces fragments through a
//! [`FieldAccumulator`], collects the head into a pending message, builds the
//! [`Message`] at headers-complete and attaches the body and trailers at
//! message-complete before handing it to the caller's hooks.

use std::mem;

use crate::accumulator::{FieldAccumulator, FinishedField, ParseState};
use crate::callbacks::{Callbacks, Control};
use crate::engine::{Direction, EngineSink, Head};
use crate::error::ParserError;
use crate::message::{Headers, Message, Request, Response};

/// Parts of a message collected before it can be built.
#[derive(Debug, Default)]
struct PendingMessage {
    url: Option<String>,
    /// Header fields, then trailer fields once the head is built.
    headers: Headers,
    last_header_name: Option<String>,
    body: Vec<u8>,
}

/// Builds [`Message`] values out of engine events.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    accumulator: FieldAccumulator,
    pending: PendingMessage,
    /// Set between headers-complete and message-complete.
    current: Option<Message>,
    callbacks: Callbacks,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    /// Which field is being accumulated.
    pub fn state(&self) -> ParseState {
        self.accumulator.state()
    }

    /// The message whose head has been parsed, while its body is read.
    pub fn current(&self) -> Option<&Message> {
        self.current.as_ref()
    }

    /// Forget any partial message. Hooks stay registered.
    pub fn reset(&mut self) {
        self.accumulator.reset();
        self.pending = PendingMessage::default();
        self.current = None;
    }

    fn process(&mut self, kind: ParseState, data: &[u8]) -> Result<Control, ParserError> {
        self.finish_field(kind)?;
        Ok(self.add_data(data))
    }

    fn finish_field(&mut self, kind: ParseState) -> Result<(), ParserError> {
        match self.accumulator.transition(kind) {
            Some(field) => self.apply(field),
            None => Ok(()),
        }
    }

    fn add_data(&mut self, data: &[u8]) -> Control {
        if self.accumulator.state() == ParseState::Body && self.callbacks.streams_body() {
            if let Some(message) = self.current.as_ref() {
                return self.callbacks.body_data(message, data);
            }
        }
        self.accumulator.append(data);
        Control::Continue
    }

    fn apply(&mut self, field: FinishedField) -> Result<(), ParserError> {
        let pending = &mut self.pending;
        match field {
            FinishedField::Url(url) => {
                if pending.url.is_some() {
                    return Err(ParserError::InvalidInternalState);
                }
                pending.url = Some(url);
            }
            FinishedField::HeaderName(name) => {
                if pending.last_header_name.is_some() {
                    return Err(ParserError::InvalidInternalState);
                }
                pending.last_header_name = Some(name);
            }
            FinishedField::HeaderValue(value) => {
                let name = pending
                    .last_header_name
                    .take()
                    .ok_or(ParserError::InvalidInternalState)?;
                // Names are case-insensitive; the last spelling and value win.
                pending.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
                pending.headers.insert(name, value);
            }
            // The body is cut short by trailer fields; keep what came before.
            FinishedField::Body(bytes) => {
                if pending.body.is_empty() {
                    pending.body = bytes;
                } else {
                    pending.body.extend_from_slice(&bytes);
                }
            }
        }
        Ok(())
    }

    fn build(&mut self, head: &Head) -> Result<Message, ParserError> {
        let headers = mem::take(&mut self.pending.headers);
        let message = match head.direction {
            Direction::Request => Message::Request(Request {
                method: head.method.ok_or(ParserError::InvalidInternalState)?,
                url: self
                    .pending
                    .url
                    .take()
                    .ok_or(ParserError::InvalidInternalState)?,
                version: head.version,
                headers,
                trailers: Headers::new(),
                body: Vec::new(),
            }),
            Direction::Response => Message::Response(Response {
                status: head.status.ok_or(ParserError::InvalidInternalState)?,
                version: head.version,
                headers,
                trailers: Headers::new(),
                body: Vec::new(),
            }),
        };
        self.pending.url = None;
        self.pending.last_header_name = None;
        Ok(message)
    }
}

impl EngineSink for MessageBuilder {
    fn on_message_begin(&mut self) -> Result<Control, ParserError> {
        self.reset();
        Ok(Control::Continue)
    }

    fn on_url(&mut self, fragment: &[u8]) -> Result<Control, ParserError> {
        self.process(ParseState::Url, fragment)
    }

    fn on_header_field(&mut self, fragment: &[u8]) -> Result<Control, ParserError> {
        self.process(ParseState::HeaderName, fragment)
    }

    fn on_header_value(&mut self, fragment: &[u8]) -> Result<Control, ParserError> {
        self.process(ParseState::HeaderValue, fragment)
    }

    fn on_headers_complete(&mut self, head: &Head) -> Result<Control, ParserError> {
        self.finish_field(ParseState::Body)?;
        let message = self.build(head)?;
        let control = self.callbacks.headers_complete(&message);
        self.current = Some(message);
        Ok(control)
    }

    fn on_body(&mut self, fragment: &[u8]) -> Result<Control, ParserError> {
        self.process(ParseState::Body, fragment)
    }

    fn on_message_complete(&mut self) -> Result<Control, ParserError> {
        self.finish_field(ParseState::Idle)?;
        let mut message = self.current.take().ok_or(ParserError::InvalidInternalState)?;
        let body = mem::take(&mut self.pending.body);
        let trailers = mem::take(&mut self.pending.headers);
        self.pending.last_header_name = None;
        message.complete(body, trailers);
        tracing::debug!(
            request = message.is_request(),
            body_len = message.body().len(),
            "message parsed"
        );
        Ok(self.callbacks.message_complete(message))
    }
}
