//! Tests for grammar violations, strict mode and error recovery

use h1_sans_io::{Parser, ParserConfig, ParserError, MAX_HEADER_SIZE};

use super::record_requests;

fn strict_request() -> Parser {
    Parser::new(ParserConfig::request().with_strict(true))
}

#[test]
fn test_bad_header_name() {
    let mut parser = Parser::request();
    assert_eq!(
        parser.feed(b"GET / HTTP/1.1\r\nBad Header\r\n\r\n"),
        Err(ParserError::InvalidHeaderToken)
    );
}

#[test]
fn test_request_grammar_violations() {
    let cases: &[(&[u8], ParserError)] = &[
        (b"FETCH / HTTP/1.1\r\n\r\n", ParserError::InvalidMethod),
        (b"Get / HTTP/1.1\r\n\r\n", ParserError::InvalidMethod),
        (b"GET  \r\n\r\n", ParserError::InvalidUrl),
        (b"GET /a\x7fb HTTP/1.1\r\n\r\n", ParserError::InvalidUrl),
        (b"GET / FTP/1.1\r\n\r\n", ParserError::InvalidConstant),
        (b"GET / HTTP/11\r\n\r\n", ParserError::InvalidVersion),
        (b"GET / HTTP/1.1\r\r\n", ParserError::LineFeedExpected),
        (b"GET / HTTP/1.1\r\n: empty-name\r\n\r\n", ParserError::InvalidHeaderToken),
        (b"GET / HTTP/1.1\r\nA: b\r\r\n", ParserError::LineFeedExpected),
        (b"GET / HTTP/1.1\r\n\rX", ParserError::LineFeedExpected),
        (b"POST / HTTP/1.1\r\nContent-Length: -1\r\n\r\n", ParserError::InvalidContentLength),
        (b"POST / HTTP/1.1\r\nContent-Length: 0x10\r\n\r\n", ParserError::InvalidContentLength),
        (b"POST / HTTP/1.1\r\nContent-Length: 1 2\r\n\r\n", ParserError::InvalidContentLength),
        (b"POST / HTTP/1.1\r\nContent-Length:\r\n\r\n", ParserError::InvalidContentLength),
        (
            b"POST / HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\n",
            ParserError::InvalidContentLength,
        ),
        (
            b"POST / HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 1\r\n\r\n",
            ParserError::InvalidContentLength,
        ),
        (b"GET / HTTP/1.1\r\nA: b\x01c\r\n\r\n", ParserError::InvalidHeaderToken),
        (b"UNSUBSCRIBEX / HTTP/1.1\r\n\r\n", ParserError::InvalidMethod),
        (
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nG\r\n",
            ParserError::InvalidChunkSize,
        ),
        (
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nFFFFFFFFFFFFFFFFF\r\n",
            ParserError::InvalidChunkSize,
        ),
        (
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n1\r\nab\r\n",
            ParserError::InvalidChunkSize,
        ),
        (
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n1\r\na\rX",
            ParserError::LineFeedExpected,
        ),
    ];
    for (input, expected) in cases {
        let mut parser = Parser::request();
        assert_eq!(
            parser.feed(input),
            Err(*expected),
            "input {:?}",
            String::from_utf8_lossy(input)
        );
    }
}

#[test]
fn test_response_grammar_violations() {
    let cases: &[(&[u8], ParserError)] = &[
        (b"HTTP/1.1 2OO OK\r\n\r\n", ParserError::InvalidStatus),
        (b"HTTP/1.1 12 Short\r\n\r\n", ParserError::InvalidStatus),
        (b"HTTP/1.1 1234 Long\r\n\r\n", ParserError::InvalidStatus),
        (b"HTTP/1.1 099 Odd\r\n\r\n", ParserError::InvalidStatus),
        (b"HTTP/1.1\r\n\r\n", ParserError::InvalidVersion),
        (b"HTTP/1.1200 OK\r\n\r\n", ParserError::InvalidVersion),
        (b"HTTP/1 200 OK\r\n\r\n", ParserError::InvalidVersion),
        (b"http/1.1 200 OK\r\n\r\n", ParserError::InvalidConstant),
    ];
    for (input, expected) in cases {
        let mut parser = Parser::response();
        assert_eq!(
            parser.feed(input),
            Err(*expected),
            "input {:?}",
            String::from_utf8_lossy(input)
        );
    }
}

#[test]
fn test_errors_are_sticky_until_reset() {
    let mut parser = Parser::request();
    let requests = record_requests(&mut parser);

    assert_eq!(
        parser.feed(b"GET / HTTP/1.1\r\nBad Header\r\n\r\n"),
        Err(ParserError::InvalidHeaderToken)
    );
    assert_eq!(
        parser.feed(b"GET / HTTP/1.1\r\n\r\n"),
        Err(ParserError::InvalidHeaderToken)
    );
    assert_eq!(parser.bytes_consumed(), 0);
    assert_eq!(parser.finish(), Err(ParserError::InvalidHeaderToken));

    parser.reset();
    parser.feed(b"GET /ok HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(requests.borrow()[0].url, "/ok");
}

#[test]
fn test_error_offset_points_at_bad_byte() {
    let mut parser = Parser::request();
    let input = b"GET / HTTP/1.1\r\nHost: a\x00b\r\n\r\n";
    assert_eq!(parser.feed(input), Err(ParserError::InvalidHeaderToken));
    assert_eq!(input[parser.bytes_consumed()], 0x00);
}

#[test]
fn test_eof_mid_message() {
    let mut parser = Parser::request();
    parser.feed(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").unwrap();
    assert_eq!(parser.finish(), Err(ParserError::InvalidEofState));

    let mut parser = Parser::request();
    parser.feed(b"GET /partial").unwrap();
    assert_eq!(parser.finish(), Err(ParserError::InvalidEofState));
}

#[test]
fn test_eof_between_messages() {
    let mut parser = Parser::request();
    assert_eq!(parser.finish(), Ok(()));
    parser.feed(b"GET / HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parser.finish(), Ok(()));
}

#[test]
fn test_header_overflow() {
    let mut big = b"GET / HTTP/1.1\r\nX-Big: ".to_vec();
    big.extend(std::iter::repeat(b'a').take(MAX_HEADER_SIZE + 1));
    big.extend_from_slice(b"\r\n\r\n");

    let mut parser = Parser::request();
    assert_eq!(parser.feed(&big), Err(ParserError::HeaderOverflow));
}

#[test]
fn test_large_header_under_limit() {
    let mut big = b"GET / HTTP/1.1\r\nX-Big: ".to_vec();
    big.extend(std::iter::repeat(b'a').take(MAX_HEADER_SIZE - 1024));
    big.extend_from_slice(b"\r\n\r\n");

    let mut parser = Parser::request();
    let requests = record_requests(&mut parser);
    assert_eq!(parser.feed(&big), Ok(big.len()));
    assert_eq!(
        requests.borrow()[0].header("x-big").map(str::len),
        Some(MAX_HEADER_SIZE - 1024)
    );
}

#[test]
fn test_custom_header_limit_applies_to_trailers() {
    let config = ParserConfig::request().with_max_header_size(64);
    let mut parser = Parser::new(config);
    let mut input =
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\nX-Trailer: ".to_vec();
    input.extend(std::iter::repeat(b't').take(80));
    input.extend_from_slice(b"\r\n\r\n");

    assert_eq!(parser.feed(&input), Err(ParserError::HeaderOverflow));
}

#[test]
fn test_strict_mode_rejections() {
    let cases: &[&[u8]] = &[
        b"GET / HTTP/1.1\nHost: x\r\n\r\n",
        b"GET / HTTP/1.1\r\nHost: x\n\r\n",
        b"GET / HTTP/1.1\r\nX-Folded: a\r\n b\r\n\r\n",
    ];
    for input in cases {
        assert_eq!(
            strict_request().feed(input),
            Err(ParserError::NotStrict),
            "input {:?}",
            String::from_utf8_lossy(input)
        );
        assert!(Parser::request().feed(input).is_ok());
    }

    assert_eq!(
        strict_request().feed(b"GET /\r\n\r\n"),
        Err(ParserError::InvalidVersion)
    );
}

#[test]
fn test_folded_header_joined_in_lenient_mode() {
    let mut parser = Parser::request();
    let requests = record_requests(&mut parser);

    parser
        .feed(b"GET / HTTP/1.1\r\nX-Folded: first\r\n\tsecond\r\n  third\r\n\r\n")
        .unwrap();

    assert_eq!(requests.borrow()[0].header("x-folded"), Some("first second third"));
}

#[test]
fn test_error_names() {
    assert_eq!(ParserError::HeaderOverflow.name(), "HEADER_OVERFLOW");
    assert_eq!(ParserError::CbHeadersComplete.name(), "CB_headers_complete");
    assert_eq!(ParserError::NotStrict.name(), "STRICT");
    assert_eq!(
        ParserError::InvalidHeaderToken.to_string(),
        "invalid character in header"
    );
}
