//! h1-sans-io: A minimal, sans-I/O incremental HTTP/1.x message parser
//!
//! This crate turns a byte stream of HTTP/1.x requests or responses into
//! complete message values. It never reads a socket: the caller feeds bytes as
//! they arrive, in slices split at arbitrary points, and receives messages
//! through hooks invoked from inside [`Parser::feed`].
//!
//! # Features
//!
//! - **Sans-I/O Design**: No async runtime dependencies, no transport
//! - **Incremental**: Any split of the input yields the same messages
//! - **RFC 7230 Framing**: Content-Length, chunked (with trailers), read until
//!   close, keep-alive and pipelining
//! - **Streaming Bodies**: Buffer bodies in the message or stream them to a hook
//! - **Strict Mode**: Optionally reject bare LF, header folding and ambiguous
//!   framing
//!
//! # Quick Start
//!
//! ```rust
//! use h1_sans_io::{Parser, Request};
//!
//! let mut parser = Parser::request();
//! parser.set_on_request_complete(|req: Request| {
//!     println!("{} {} ({} body bytes)", req.method, req.url, req.body.len());
//! });
//!
//! // Bytes may arrive in any pieces
//! parser.feed(b"POST /submit HTTP/1.1\r\nContent-").unwrap();
//! parser.feed(b"Length: 5\r\n\r\nhel").unwrap();
//! parser.feed(b"lo").unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`engine`]: byte-level grammar, emits field fragments to an
//!   [`EngineSink`]
//! - [`accumulator`]: coalesces fragments into whole fields
//! - [`builder`]: assembles [`Message`] values and runs the hooks
//! - [`Parser`]: the facade tying them together
//!
//! It does NOT provide:
//! - Message serialization
//! - URL decomposition (the URL is the raw request-target)
//! - Transport, TLS or connection management

pub mod accumulator;
pub mod builder;
pub mod callbacks;
pub mod config;
pub mod engine;
pub mod error;
pub mod message;
pub mod method;
pub mod parser;
pub mod status;

pub use accumulator::{FieldAccumulator, FinishedField, ParseState};
pub use builder::MessageBuilder;
pub use callbacks::{Callbacks, Control};
pub use config::{ParserConfig, ParserMode, MAX_HEADER_SIZE};
pub use engine::{Direction, Engine, EngineSink, Framing, Head};
pub use error::ParserError;
pub use message::{Headers, HttpVersion, Message, Request, Response};
pub use method::HttpMethod;
pub use parser::Parser;
pub use status::HttpStatus;
