//! Tests for hook dispatch, aborts, pausing and streaming

use std::cell::RefCell;
use std::rc::Rc;

use h1_sans_io::{Control, Message, Parser, ParserError, Request, Response};

use super::{record_requests, record_responses};

#[test]
fn test_hook_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut parser = Parser::request();

    let sink = log.clone();
    parser.set_on_headers_complete(move |m: &Message| {
        sink.borrow_mut().push(format!("headers {}", m.headers().len()));
    });
    let sink = log.clone();
    parser.set_on_body_data(move |_: &Message, data: &[u8]| {
        sink.borrow_mut().push(format!("body {}", data.len()));
        true
    });
    let sink = log.clone();
    parser.set_on_request_complete(move |r: Request| {
        sink.borrow_mut().push(format!("complete {}", r.url));
        Control::Continue
    });

    parser.feed(b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhe").unwrap();
    parser.feed(b"llo").unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["headers 1", "body 2", "body 3", "complete /x"]
    );
}

#[test]
fn test_streaming_leaves_message_body_empty() {
    let mut parser = Parser::response();
    let responses = record_responses(&mut parser);
    let streamed = Rc::new(RefCell::new(Vec::new()));
    let sink = streamed.clone();
    parser.set_on_body_data(move |m: &Message, data: &[u8]| {
        assert!(!m.is_request());
        sink.borrow_mut().extend_from_slice(data);
    });

    parser
        .feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n3\r\ndef\r\n0\r\n\r\n")
        .unwrap();

    assert_eq!(*streamed.borrow(), b"abcdef");
    assert!(responses.borrow()[0].body.is_empty());
}

#[test]
fn test_headers_hook_abort() {
    let mut parser = Parser::request();
    let requests = record_requests(&mut parser);
    let bodies = Rc::new(RefCell::new(0));
    let sink = bodies.clone();
    parser.set_on_body_data(move |_: &Message, _: &[u8]| *sink.borrow_mut() += 1);
    parser.set_on_headers_complete(|m: &Message| {
        m.as_request().map_or(true, |r| r.url != "/rejected")
    });

    assert_eq!(
        parser.feed(b"POST /rejected HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc"),
        Err(ParserError::CbHeadersComplete)
    );
    assert_eq!(parser.last_error(), Some(ParserError::CbHeadersComplete));
    assert!(requests.borrow().is_empty());
    assert_eq!(*bodies.borrow(), 0);

    // The parser is ready for the next message.
    parser.feed(b"GET /accepted HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(requests.borrow()[0].url, "/accepted");
    assert_eq!(parser.last_error(), None);
}

#[test]
fn test_message_complete_abort() {
    let mut parser = Parser::request();
    parser.set_on_request_complete(|_: Request| false);

    assert_eq!(
        parser.feed(b"GET / HTTP/1.1\r\n\r\n"),
        Err(ParserError::CbMessageComplete)
    );
}

#[test]
fn test_body_hook_abort() {
    let mut parser = Parser::request();
    parser.set_on_body_data(|_: &Message, _: &[u8]| false);

    assert_eq!(
        parser.feed(b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc"),
        Err(ParserError::CbBody)
    );
}

#[test]
fn test_pause_from_complete_hook() {
    let mut parser = Parser::request();
    let urls = Rc::new(RefCell::new(Vec::new()));
    let sink = urls.clone();
    parser.set_on_request_complete(move |r: Request| {
        sink.borrow_mut().push(r.url);
        if sink.borrow().len() == 1 {
            Control::Pause
        } else {
            Control::Continue
        }
    });

    let first: &[u8] = b"GET /1 HTTP/1.1\r\n\r\n";
    let mut input = first.to_vec();
    input.extend_from_slice(b"GET /2 HTTP/1.1\r\n\r\n");

    assert_eq!(parser.feed(&input), Err(ParserError::Paused));
    assert_eq!(parser.bytes_consumed(), first.len());
    assert!(parser.is_paused());
    assert_eq!(*urls.borrow(), vec!["/1"]);

    let rest = &input[first.len()..];
    assert_eq!(parser.feed(rest), Err(ParserError::Paused));
    assert_eq!(parser.bytes_consumed(), 0);

    parser.resume();
    assert_eq!(parser.feed(rest), Ok(rest.len()));
    assert_eq!(*urls.borrow(), vec!["/1", "/2"]);
}

#[test]
fn test_pause_from_body_hook() {
    let mut parser = Parser::request();
    let requests = record_requests(&mut parser);
    parser.set_on_body_data(|_: &Message, _: &[u8]| Control::Pause);

    let head: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 6\r\n\r\n";
    let mut input = head.to_vec();
    input.extend_from_slice(b"abc");

    assert_eq!(parser.feed(&input), Err(ParserError::Paused));
    assert_eq!(parser.bytes_consumed(), input.len());

    parser.resume();
    assert_eq!(parser.feed(b"def"), Err(ParserError::Paused));
    assert_eq!(parser.bytes_consumed(), 3);
    assert_eq!(requests.borrow().len(), 1);
}

#[test]
fn test_skip_body_for_head_response() {
    let mut parser = Parser::response();
    let responses = record_responses(&mut parser);
    parser.set_on_headers_complete(|m: &Message| {
        match m.as_response() {
            Some(r) if r.status.code() == 200 => Control::SkipBody,
            _ => Control::Continue,
        }
    });

    parser
        .feed(b"HTTP/1.1 200 OK\r\nContent-Length: 1234\r\n\r\nHTTP/1.1 404 Not Found\r\nContent-Length: 2\r\n\r\nno")
        .unwrap();

    let responses = responses.borrow();
    assert_eq!(responses.len(), 2);
    assert!(responses[0].body.is_empty());
    assert_eq!(responses[0].header("content-length"), Some("1234"));
    assert_eq!(responses[1].body, b"no");
}

#[test]
fn test_reregistration_replaces_hook() {
    let first = Rc::new(RefCell::new(0));
    let second = Rc::new(RefCell::new(0));
    let mut parser = Parser::request();

    let sink = first.clone();
    parser.set_on_request_complete(move |_: Request| *sink.borrow_mut() += 1);
    let sink = second.clone();
    parser.set_on_request_complete(move |_: Request| *sink.borrow_mut() += 1);

    parser.feed(b"GET / HTTP/1.1\r\n\r\n").unwrap();

    assert_eq!(*first.borrow(), 0);
    assert_eq!(*second.borrow(), 1);
}

#[test]
fn test_request_hook_not_called_for_responses() {
    let mut parser = Parser::either();
    let requests = record_requests(&mut parser);
    let responses: Rc<RefCell<Vec<Response>>> = record_responses(&mut parser);

    parser.feed(b"HTTP/1.1 204 No Content\r\n\r\n").unwrap();

    assert!(requests.borrow().is_empty());
    assert_eq!(responses.borrow().len(), 1);
}
