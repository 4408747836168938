use std::iter;
use std::str::{self, FromStr};

use memchr::{memchr, memchr_iter};

use crate::error::{Error, Result};

/// One input line, tagged with its 1-based line number for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    pub text: &'a [u8],
}

impl<'a> Line<'a> {
    #[inline]
    pub fn new(number: usize, text: &'a [u8]) -> Self {
        Self { number, text }
    }

    #[inline]
    fn with_text(self, text: &'a [u8]) -> Self {
        Self { text, ..self }
    }

    pub fn error(self, expected: &'static str) -> Error {
        Error::Parse {
            line: self.number,
            expected,
            found: String::from_utf8_lossy(self.text).into_owned(),
        }
    }

    #[inline]
    pub fn is_blank(self) -> bool {
        self.text.trim_ascii().is_empty()
    }

    #[inline]
    pub fn trim(self) -> Self {
        self.with_text(self.text.trim_ascii())
    }

    #[inline]
    pub fn first(self) -> Option<u8> {
        self.text.first().copied()
    }

    #[inline]
    pub fn advance(self, n: usize) -> Self {
        self.with_text(self.text.get(n..).unwrap_or_default())
    }

    pub fn strip_prefix(self, prefix: &str, expected: &'static str) -> Result<Self> {
        match self.text.strip_prefix(prefix.as_bytes()) {
            Some(text) => Ok(self.with_text(text)),
            None => Err(self.error(expected)),
        }
    }

    pub fn strip_suffix(self, suffix: &str, expected: &'static str) -> Result<Self> {
        match self.text.strip_suffix(suffix.as_bytes()) {
            Some(text) => Ok(self.with_text(text)),
            None => Err(self.error(expected)),
        }
    }

    /// Parses the whole (trimmed) line as a `T`.
    pub fn parse<T: FromStr>(self, expected: &'static str) -> Result<T> {
        str::from_utf8(self.text.trim_ascii())
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error(expected))
    }

    /// Splits on `sep`; every part keeps the line number of the whole line.
    pub fn split(self, sep: u8) -> impl Iterator<Item = Line<'a>> {
        let mut start = 0;
        memchr_iter(sep, self.text).chain(iter::once(self.text.len())).map(move |end| {
            let part = self.with_text(&self.text[start..end]);
            start = end + 1;
            part
        })
    }
}

#[derive(Clone, Debug)]
pub struct Lines<'a> {
    s: &'a [u8],
    number: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.s.is_empty() {
            return None;
        }
        let n = memchr(b'\n', self.s).unwrap_or(self.s.len());
        let mut text = &self.s[..n];
        if let [head @ .., b'\r'] = text {
            text = head;
        }
        self.s = self.s.get(n + 1..).unwrap_or_default();
        self.number += 1;
        Some(Line::new(self.number, text))
    }
}

#[inline]
pub fn lines(s: &[u8]) -> Lines<'_> {
    Lines { s, number: 0 }
}

/// Parses every non-blank line with `f`, stopping at the first failure.
pub fn parse_lines<'a, T>(
    s: &'a [u8], f: impl FnMut(Line<'a>) -> Result<T>,
) -> Result<Vec<T>> {
    lines(s).filter(|line| !line.is_blank()).map(f).collect()
}

#[test]
fn test_lines_numbering() {
    let got: Vec<_> = lines(b"a\r\n\nbc").map(|l| (l.number, l.text)).collect();
    assert_eq!(got, vec![(1, &b"a"[..]), (2, &b""[..]), (3, &b"bc"[..])]);
}

#[test]
fn test_line_split_and_parse() {
    let line = Line::new(7, b" 79, 98,1");
    let items: Vec<u64> = line.split(b',').map(|p| p.parse("item")).collect::<Result<_>>().unwrap();
    assert_eq!(items, vec![79, 98, 1]);
    assert_eq!(
        Line::new(7, b"x").parse::<u64>("number"),
        Err(Error::Parse { line: 7, expected: "number", found: "x".into() })
    );
}
