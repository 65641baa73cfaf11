//! Reversible encoding of string lists into one scalar column.
//!
//! Elements are joined with [`ListCodec::SEPARATOR`]. A literal separator or backslash inside
//! an element is escaped with a backslash, so `decode(encode(items)) == items` for any list of
//! non-empty elements. The empty list encodes to the empty string (never null).

/// Encoder/decoder for list-valued columns such as `tags` and `cuisines`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListCodec;

impl ListCodec {
    /// Element separator.
    pub const SEPARATOR: char = '|';
    /// Escape character.
    pub const ESCAPE: char = '\\';

    /// Join `items` into one string.
    pub fn encode<S: AsRef<str>>(&self, items: &[S]) -> String {
        let mut out = String::new();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(Self::SEPARATOR);
            }
            for c in item.as_ref().chars() {
                if c == Self::SEPARATOR || c == Self::ESCAPE {
                    out.push(Self::ESCAPE);
                }
                out.push(c);
            }
        }
        out
    }

    /// Split an encoded string back into its elements.
    ///
    /// A trailing lone escape character is kept literally.
    pub fn decode(&self, encoded: &str) -> Vec<String> {
        if encoded.is_empty() {
            return Vec::new();
        }

        let mut items = Vec::new();
        let mut current = String::new();
        let mut chars = encoded.chars();
        while let Some(c) = chars.next() {
            match c {
                Self::ESCAPE => match chars.next() {
                    Some(next) => current.push(next),
                    None => current.push(Self::ESCAPE),
                },
                Self::SEPARATOR => items.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        items.push(current);
        items
    }
}
