//! Runtime-variable segments inside otherwise static phrases.
//!
//! Code writes `"Hello $Alice$"`; the translation table is keyed by `"Hello $$"` and its
//! translated phrases carry the same `$$` tokens where the segments go back in.

pub const DEFAULT_MARKER: char = '$';

/// Result of pulling the placeholder segments out of a phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Segment contents in left-to-right order, markers excluded.
    pub segments: Vec<String>,
    /// The phrase with every segment collapsed to an empty placeholder token.
    pub canonical: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderCodec {
    marker: char,
}

impl Default for PlaceholderCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl PlaceholderCodec {
    pub fn new(marker: char) -> Self {
        Self { marker }
    }

    pub fn marker(&self) -> char {
        self.marker
    }

    /// The two-character token that stands in for one segment.
    pub fn token(&self) -> String {
        let mut token = String::with_capacity(self.marker.len_utf8() * 2);
        token.push(self.marker);
        token.push(self.marker);
        token
    }

    /// Split `text` into its placeholder segments and canonical lookup key.
    ///
    /// An unterminated trailing marker is not a placeholder: it and everything after it
    /// stay in the canonical text as literals.
    pub fn extract(&self, text: &str) -> Extracted {
        let mut segments = Vec::new();
        let mut canonical = String::with_capacity(text.len());
        let mut current = String::new();
        let mut inside = false;

        for ch in text.chars() {
            if ch == self.marker {
                canonical.push(ch);
                if inside {
                    segments.push(std::mem::take(&mut current));
                }
                inside = !inside;
            } else if inside {
                current.push(ch);
            } else {
                canonical.push(ch);
            }
        }

        if inside {
            canonical.push_str(&current);
        }

        Extracted { segments, canonical }
    }

    /// Fill the placeholder tokens of `template` with `segments`, left to right.
    ///
    /// Extra segments are dropped and extra tokens are left as they are. Inserted text is
    /// never rescanned, so a segment that itself contains the token is copied verbatim.
    pub fn reinsert<S: AsRef<str>>(&self, template: &str, segments: &[S]) -> String {
        let token = self.token();
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        for segment in segments {
            let Some(pos) = rest.find(&token) else {
                break;
            };
            out.push_str(&rest[..pos]);
            out.push_str(segment.as_ref());
            rest = &rest[pos + token.len()..];
        }

        out.push_str(rest);
        out
    }
}
