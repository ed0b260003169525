//! Coalescing of field fragments.
//!
//! The engine may hand over one field in many pieces. The accumulator keeps
//! appending while the field kind stays the same and finalizes the buffered
//! bytes once a different kind starts.

/// Which field is currently being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    #[default]
    Idle,
    Url,
    HeaderName,
    HeaderValue,
    Body,
}

/// A field whose last fragment has been seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishedField {
    Url(String),
    HeaderName(String),
    HeaderValue(String),
    Body(Vec<u8>),
}

/// Reusable field buffer plus the kind it currently holds.
#[derive(Debug)]
pub struct FieldAccumulator {
    state: ParseState,
    buffer: Vec<u8>,
}

/// Initial buffer capacity; most heads fit without regrowth.
const INITIAL_CAPACITY: usize = 4096;

impl Default for FieldAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldAccumulator {
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            buffer: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Bytes buffered for the active field.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Switch to `kind`. When it differs from the active kind, the buffered
    /// field is finalized and returned and the buffer starts empty.
    ///
    /// Nothing is returned when leaving `Idle`. Header values are returned
    /// without trailing whitespace.
    pub fn transition(&mut self, kind: ParseState) -> Option<FinishedField> {
        if kind == self.state {
            return None;
        }
        let finished = match self.state {
            ParseState::Idle => None,
            ParseState::Url => Some(FinishedField::Url(self.take_string())),
            ParseState::HeaderName => Some(FinishedField::HeaderName(self.take_string())),
            ParseState::HeaderValue => {
                let end = self
                    .buffer
                    .iter()
                    .rposition(|b| !matches!(b, b' ' | b'\t'))
                    .map_or(0, |p| p + 1);
                self.buffer.truncate(end);
                Some(FinishedField::HeaderValue(self.take_string()))
            }
            // The body leaves with its allocation; nothing is copied.
            ParseState::Body => Some(FinishedField::Body(std::mem::take(&mut self.buffer))),
        };
        self.state = kind;
        self.buffer.clear();
        finished
    }

    /// Drop whatever is buffered and go back to `Idle`.
    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.buffer.clear();
    }

    fn take_string(&mut self) -> String {
        let s = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        s
    }
}
