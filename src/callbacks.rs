//! Callback dispatch.
//!
//! Hooks are optional boxed closures. Each hook may return `bool`, `()` or a
//! [`Control`]; the return value is turned into a signal for the engine.

use std::fmt;

use crate::message::{Message, Request, Response};

/// What the engine should do after an event has been delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
    #[default]
    Continue,
    /// Stop after the current byte; `feed` returns `Paused`.
    Pause,
    /// Only meaningful at headers-complete: the message has no body even if
    /// its headers announce one (responses to HEAD).
    SkipBody,
    /// Abandon the current message with the matching `Cb*` error.
    Abort,
}

impl From<bool> for Control {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Continue
        } else {
            Self::Abort
        }
    }
}

impl From<()> for Control {
    fn from(_: ()) -> Self {
        Self::Continue
    }
}

type HeadersHook = Box<dyn FnMut(&Message) -> Control>;
type BodyHook = Box<dyn FnMut(&Message, &[u8]) -> Control>;
type RequestHook = Box<dyn FnMut(Request) -> Control>;
type ResponseHook = Box<dyn FnMut(Response) -> Control>;

/// The caller-facing hooks of a parser.
#[derive(Default)]
pub struct Callbacks {
    headers_complete: Option<HeadersHook>,
    body_data: Option<BodyHook>,
    request_complete: Option<RequestHook>,
    response_complete: Option<ResponseHook>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("headers_complete", &self.headers_complete.is_some())
            .field("body_data", &self.body_data.is_some())
            .field("request_complete", &self.request_complete.is_some())
            .field("response_complete", &self.response_complete.is_some())
            .finish()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_on_headers_complete<F, R>(&mut self, mut hook: F)
    where
        F: FnMut(&Message) -> R + 'static,
        R: Into<Control>,
    {
        self.headers_complete = Some(Box::new(move |m: &Message| hook(m).into()));
    }

    /// Registering a body hook switches body delivery from buffering to
    /// streaming.
    pub fn set_on_body_data<F, R>(&mut self, mut hook: F)
    where
        F: FnMut(&Message, &[u8]) -> R + 'static,
        R: Into<Control>,
    {
        self.body_data = Some(Box::new(move |m: &Message, data: &[u8]| hook(m, data).into()));
    }

    pub fn set_on_request_complete<F, R>(&mut self, mut hook: F)
    where
        F: FnMut(Request) -> R + 'static,
        R: Into<Control>,
    {
        self.request_complete = Some(Box::new(move |r: Request| hook(r).into()));
    }

    pub fn set_on_response_complete<F, R>(&mut self, mut hook: F)
    where
        F: FnMut(Response) -> R + 'static,
        R: Into<Control>,
    {
        self.response_complete = Some(Box::new(move |r: Response| hook(r).into()));
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn streams_body(&self) -> bool {
        self.body_data.is_some()
    }

    pub(crate) fn headers_complete(&mut self, message: &Message) -> Control {
        match self.headers_complete.as_mut() {
            Some(hook) => hook(message),
            None => Control::Continue,
        }
    }

    pub(crate) fn body_data(&mut self, message: &Message, data: &[u8]) -> Control {
        match self.body_data.as_mut() {
            Some(hook) => hook(message, data),
            None => Control::Continue,
        }
    }

    /// Route a finished message to the hook for its variant.
    pub(crate) fn message_complete(&mut self, message: Message) -> Control {
        match message {
            Message::Request(request) => match self.request_complete.as_mut() {
                Some(hook) => hook(request),
                None => Control::Continue,
            },
            Message::Response(response) => match self.response_complete.as_mut() {
                Some(hook) => hook(response),
                None => Control::Continue,
            },
        }
    }
}
