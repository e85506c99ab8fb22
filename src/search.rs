//! Knuth-Morris-Pratt substring search over bytes.
//!
//! # Examples
//!
//! ```
//! # extern crate x11_clipboard_rs;
//! use x11_clipboard_rs::search::search;
//!
//! let matches: Vec<_> = search(b"AAAAA", b"AAA").collect();
//! assert_eq!(matches, [0, 1, 2]);
//! ```

/// Builds the longest-proper-prefix-suffix table of `pattern`.
///
/// `lps[i]` is the length of the longest proper prefix of `pattern[..=i]` which is also a suffix
/// of it. The table is empty for an empty pattern.
pub fn lps_table(pattern: &[u8]) -> Vec<usize> {
    let mut lps = vec![0; pattern.len()];

    let mut length = 0;
    let mut i = 1;
    while i < pattern.len() {
        if pattern[i] == pattern[length] {
            length += 1;
            lps[i] = length;
            i += 1;
        } else if length > 0 {
            length = lps[length - 1];
        } else {
            lps[i] = 0;
            i += 1;
        }
    }

    lps
}

/// Iterator over the offsets of `pattern` in `text`, returned by [`search`] and [`search_by`].
#[derive(Clone, Debug)]
pub struct Matches<'a, F> {
    text: &'a [u8],
    pattern: &'a [u8],
    lps: Vec<usize>,
    // Position in the text.
    i: usize,
    // Length of the currently matched pattern prefix.
    j: usize,
    eq: F,
}

impl<F> Iterator for Matches<'_, F>
where
    F: FnMut(u8, u8) -> bool,
{
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let (text, pattern) = (self.text, self.pattern);

        while self.i < text.len() {
            if (self.eq)(pattern[self.j], text[self.i]) {
                self.i += 1;
                self.j += 1;
            }

            if self.j == pattern.len() {
                let start = self.i - self.j;
                self.j = self.lps[self.j - 1];
                return Some(start);
            } else if self.i < text.len() && !(self.eq)(pattern[self.j], text[self.i]) {
                if self.j > 0 {
                    self.j = self.lps[self.j - 1];
                } else {
                    self.i += 1;
                }
            }
        }

        None
    }
}

/// Returns the starting offsets of every occurrence of `pattern` in `text`.
///
/// Offsets are produced lazily in increasing order, overlapping occurrences included. An empty
/// pattern has no occurrences.
#[inline]
pub fn search<'a>(text: &'a [u8], pattern: &'a [u8]) -> Matches<'a, fn(u8, u8) -> bool> {
    search_by(text, pattern, byte_eq as fn(u8, u8) -> bool)
}

fn byte_eq(a: u8, b: u8) -> bool {
    a == b
}

/// Like [`search`], but compares bytes with `eq`.
///
/// `eq` is called once per byte comparison the scan performs, which makes it usable for
/// counting comparisons or for case-insensitive matching.
pub fn search_by<'a, F>(text: &'a [u8], pattern: &'a [u8], eq: F) -> Matches<'a, F>
where
    F: FnMut(u8, u8) -> bool,
{
    // With nothing to match, start the scan at the end so that it yields nothing.
    let i = if pattern.is_empty() || pattern.len() > text.len() {
        text.len()
    } else {
        0
    };

    Matches {
        text,
        pattern,
        lps: lps_table(pattern),
        i,
        j: 0,
        eq,
    }
}
