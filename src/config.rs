//! Parser configuration.

/// Default limit on the bytes of a message head (start line plus header
/// block), and separately on a trailer block.
pub const MAX_HEADER_SIZE: usize = 80 * 1024;

/// Which start line is legal on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserMode {
    Request,
    Response,
    /// Detect from the first message; later messages keep that direction.
    #[default]
    Either,
}

/// Settings fixed for the lifetime of a parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    pub mode: ParserMode,
    /// Reject bare LF line endings, obsolete header folding, version-less
    /// request lines, non-ASCII URLs and ambiguous framing headers.
    pub strict: bool,
    /// See [`MAX_HEADER_SIZE`].
    pub max_header_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            mode: ParserMode::default(),
            strict: false,
            max_header_size: MAX_HEADER_SIZE,
        }
    }
}

impl ParserConfig {
    pub fn new(mode: ParserMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn request() -> Self {
        Self::new(ParserMode::Request)
    }

    pub fn response() -> Self {
        Self::new(ParserMode::Response)
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_max_header_size(mut self, max_header_size: usize) -> Self {
        self.max_header_size = max_header_size;
        self
    }
}
