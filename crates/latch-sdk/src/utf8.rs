//! Incremental UTF-8 decoding.
//!
//! Network chunks can end in the middle of a multi-byte character. The
//! [`Utf8StreamDecoder`] keeps such an incomplete tail and prepends it to the
//! next chunk, so a character split across chunks is decoded exactly once.
//! Invalid sequences decode to U+FFFD and decoding continues.

/// Replacement character emitted for invalid byte sequences.
const REPLACEMENT: char = '\u{FFFD}';

/// Streaming UTF-8 decoder that carries incomplete sequences across calls.
#[derive(Debug, Default, Clone)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a decoder with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, returning all complete characters.
    ///
    /// A trailing incomplete sequence is held back until the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // `valid_up_to` guarantees this prefix is well formed.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());

                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of stream; an unfinished sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT.to_string()
        }
    }

    /// Number of bytes held back for the next call.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
