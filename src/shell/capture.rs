//! Bounded, incrementally decoded capture of one output stream.
//!
//! Bytes are decoded as they arrive (invalid sequences become U+FFFD), the
//! kept text is capped, and an optional signature is searched in the full,
//! uncapped stream using a tail buffer one byte shorter than the signature.

/// Appended to captured text that hit the cap.
pub const TRUNCATION_SUFFIX: &str = "...";

/// Streaming UTF-8 decoder that carries incomplete sequences across chunks.
#[derive(Debug, Default)]
struct Utf8Stream {
    pending: Vec<u8>,
}

impl Utf8Stream {
    fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes.
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }
}

/// Substring search across chunk boundaries.
#[derive(Debug)]
struct SignatureScan {
    needle: String,
    tail: String,
    found: bool,
}

impl SignatureScan {
    fn new(needle: &str) -> Self {
        Self {
            needle: needle.to_string(),
            tail: String::new(),
            found: false,
        }
    }

    fn feed(&mut self, text: &str) {
        if self.found {
            return;
        }
        let mut hay = std::mem::take(&mut self.tail);
        hay.push_str(text);
        if hay.contains(&self.needle) {
            self.found = true;
            return;
        }
        let keep = self.needle.len().saturating_sub(1);
        let mut start = hay.len().saturating_sub(keep);
        while !hay.is_char_boundary(start) {
            start += 1;
        }
        self.tail = hay[start..].to_string();
    }
}

/// Final state of one captured stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// Kept text, with [`TRUNCATION_SUFFIX`] when capped.
    pub text: String,

    /// Whether output beyond the cap was discarded.
    pub truncated: bool,

    /// Whether the signature was seen (`None` if none was requested).
    pub signature_found: Option<bool>,

    /// Raw bytes read from the stream, including discarded ones.
    pub bytes_read: u64,
}

/// Accumulates one stream of child output.
#[derive(Debug)]
pub struct StreamCapture {
    text: String,
    cap: usize,
    truncated: bool,
    bytes_read: u64,
    decoder: Utf8Stream,
    signature: Option<SignatureScan>,
}

impl StreamCapture {
    /// Create a capture keeping at most `cap` bytes of decoded text.
    pub fn new(cap: usize, signature: Option<&str>) -> Self {
        Self {
            text: String::new(),
            cap,
            truncated: false,
            bytes_read: 0,
            decoder: Utf8Stream::default(),
            signature: signature.filter(|s| !s.is_empty()).map(SignatureScan::new),
        }
    }

    /// Feed a chunk of raw bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.bytes_read += bytes.len() as u64;
        let text = self.decoder.decode(bytes);
        self.accept(&text);
    }

    fn accept(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(scan) = self.signature.as_mut() {
            scan.feed(text);
        }

        let remaining = self.cap.saturating_sub(self.text.len());
        if text.len() <= remaining {
            self.text.push_str(text);
            return;
        }
        let mut end = remaining;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.text.push_str(&text[..end]);
        self.truncated = true;
    }

    /// Flush the decoder and return the captured text.
    pub fn finish(mut self) -> Captured {
        let rest = self.decoder.finish();
        self.accept(&rest);

        let mut text = self.text;
        if self.truncated {
            text.push_str(TRUNCATION_SUFFIX);
        }
        Captured {
            text,
            truncated: self.truncated,
            signature_found: self.signature.map(|s| s.found),
            bytes_read: self.bytes_read,
        }
    }
}
