//! Splitting a line-MARC stream into per-record line batches.

use std::borrow::Cow;
use std::io::BufRead;
use anyhow::{ Result, Context };
use bstr::{ ByteSlice, io::{ BufReadExt, ByteLines } };

/// A line whose entire content is this ends a record.
pub const SENTINEL: &[u8] = b"^";

/// The lines of one record, sentinel excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based input line number of `lines[0]`.
    pub first_line: usize,
    pub lines: Vec<String>,
}

/// Iterator over the record batches of a reader.
///
/// Line terminators (`\n` or `\r\n`) are stripped. Bytes that are not
/// UTF-8 are replaced with U+FFFD. Runs of sentinels never produce empty
/// batches, and a final group without a sentinel is still returned.
pub struct Batches<R> {
    lines: ByteLines<R>,
    line_no: usize,
}

impl<R: BufRead> Batches<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: reader.byte_lines(), line_no: 0 }
    }
}

impl<R: BufRead> Iterator for Batches<R> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Batch { first_line: self.line_no + 1, lines: Vec::new() };

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    let line_no = self.line_no + 1;
                    return Some(Err::<Batch, _>(e).with_context(|| format!("Reading input line {}", line_no)));
                }
                None => {
                    if batch.lines.is_empty() {
                        return None;
                    }
                    tracing::warn!(
                        first_line = batch.first_line,
                        "last record is not terminated by a '^' line"
                    );
                    return Some(Ok(batch));
                }
            };
            self.line_no += 1;

            if line == SENTINEL {
                if batch.lines.is_empty() {
                    batch.first_line = self.line_no + 1;
                    continue;
                }
                return Some(Ok(batch));
            }

            let text = match line.to_str_lossy() {
                Cow::Borrowed(s) => s.to_owned(),
                Cow::Owned(s) => {
                    tracing::warn!(line = self.line_no, "invalid UTF-8 replaced with U+FFFD");
                    s
                }
            };
            batch.lines.push(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batches(input: &[u8]) -> Vec<Batch> {
        Batches::new(input).collect::<Result<_>>().unwrap()
    }

    fn lines(b: &Batch) -> Vec<&str> {
        b.lines.iter().map(String::as_str).collect()
    }

    #[test]
    fn splits_on_sentinel() {
        let b = batches(b"*0011\n*245  $aA\n^\n*0012\n^\n");
        assert_eq!(b.len(), 2);
        assert_eq!(lines(&b[0]), ["*0011", "*245  $aA"]);
        assert_eq!(b[0].first_line, 1);
        assert_eq!(lines(&b[1]), ["*0012"]);
        assert_eq!(b[1].first_line, 4);
    }

    #[test]
    fn repeated_sentinels_yield_nothing() {
        assert!(batches(b"^\n^\n^\n").is_empty());
        let b = batches(b"^\n^\n*0011\n^\n");
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].first_line, 3);
    }

    #[test]
    fn sentinel_must_be_whole_line() {
        let b = batches(b"*0011\n^ \n ^\n^\n");
        assert_eq!(lines(&b[0]), ["*0011", "^ ", " ^"]);
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let b = batches(b"*0011\r\n^\r\n");
        assert_eq!(lines(&b[0]), ["*0011"]);
    }

    #[test]
    fn unterminated_tail_is_kept() {
        let b = batches(b"*0011\n^\n*0012\n*0013");
        assert_eq!(b.len(), 2);
        assert_eq!(lines(&b[1]), ["*0012", "*0013"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let b = batches(b"*245  $aK\xE5re\n^\n");
        assert_eq!(lines(&b[0]), ["*245  $aK\u{FFFD}re"]);
    }

    #[test]
    fn empty_input() {
        assert!(batches(b"").is_empty());
    }
}
