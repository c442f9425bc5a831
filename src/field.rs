//! Decoding of single line-MARC lines into control or data fields.
//!
//! A line looks like `*TTT...`: the `*` marker, a 3-character tag and a
//! tag-dependent tail. Tags starting with `00` are control fields whose
//! tail is kept as one string; everything else is a data field with two
//! indicator characters followed by `$`-delimited subfields.
//!
//! All offsets are in characters, not bytes, and every fixed-offset read
//! is checked. A line that is too short becomes [`LineError::MalformedLine`].

use crate::error::LineError;

pub const MARKER: char = '*';
pub const SUBFIELD_DELIMITER: char = '$';

/// Status of a `000` field whose 10th character is missing or blank.
pub const DEFAULT_STATUS: char = 'c';

const TAG_LEN: usize = 3;
const INDICATORS_LEN: usize = 2;
/// Character index of the status inside a `000` line (`*000` + 5 more).
const STATUS_INDEX: usize = 9;
const FIXED_LENGTH_DATA_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlField {
    pub tag: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: char,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    pub tag: String,
    pub ind1: char,
    pub ind2: char,
    pub subfields: Vec<Subfield>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Control(ControlField),
    Data(DataField),
}

// Splits off the first `n` characters, or `None` if there are fewer.
fn split_chars(s: &str, n: usize) -> Option<(&str, &str)> {
    let end = s
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(n)?;
    Some(s.split_at(end))
}

fn malformed(line: &str, part: &'static str, needed: usize) -> LineError {
    LineError::MalformedLine {
        line: line.to_owned(),
        part,
        needed,
        found: line.chars().count(),
    }
}

impl ControlField {
    pub fn is_status(&self) -> bool {
        self.tag == "000"
    }

    /// `tag` is the 3-character tag, `tail` everything after it.
    fn decode(line: &str, tag: &str, tail: &str) -> Self {
        let content = match tag {
            "000" => {
                let status = match line.chars().nth(STATUS_INDEX) {
                    Some(c) if c != ' ' => c,
                    _ => DEFAULT_STATUS,
                };
                status.to_string()
            }
            "008" => {
                // longer tails are cut, shorter ones padded with spaces
                let head = split_chars(tail, FIXED_LENGTH_DATA_LEN).map_or(tail, |(head, _)| head);
                format!("{:<width$}", head, width = FIXED_LENGTH_DATA_LEN)
            }
            _ => tail.to_owned(),
        };
        Self { tag: tag.to_owned(), content }
    }
}

impl Subfield {
    fn parse_all(tail: &str) -> Vec<Self> {
        // whatever precedes the first delimiter is not a subfield
        tail.split(SUBFIELD_DELIMITER)
            .skip(1)
            .filter_map(|segment| {
                let mut chars = segment.chars();
                let code = chars.next()?;
                Some(Self { code, content: chars.as_str().to_owned() })
            })
            .collect()
    }
}

impl DataField {
    fn decode(line: &str, tag: &str, rest: &str) -> Result<Self, LineError> {
        let (indicators, tail) = split_chars(rest, INDICATORS_LEN)
            .ok_or_else(|| malformed(line, "data field tag and indicators", 1 + TAG_LEN + INDICATORS_LEN))?;
        let mut indicators = indicators.chars();
        let (Some(ind1), Some(ind2)) = (indicators.next(), indicators.next()) else {
            return Err(malformed(line, "data field indicators", 1 + TAG_LEN + INDICATORS_LEN));
        };
        Ok(Self {
            tag: tag.to_owned(),
            ind1,
            ind2,
            subfields: Subfield::parse_all(tail),
        })
    }
}

impl Field {
    /// Decodes one line of a record.
    pub fn parse(line: &str) -> Result<Self, LineError> {
        let Some(rest) = line.strip_prefix(MARKER) else {
            return Err(LineError::UnrecognizedLine { line: line.to_owned() });
        };

        let is_control = rest.starts_with("00");
        let (tag, tail) = split_chars(rest, TAG_LEN).ok_or_else(|| {
            let part = if is_control { "control field tag" } else { "data field tag and indicators" };
            let needed = if is_control { 1 + TAG_LEN } else { 1 + TAG_LEN + INDICATORS_LEN };
            malformed(line, part, needed)
        })?;

        if is_control {
            Ok(Field::Control(ControlField::decode(line, tag, tail)))
        } else {
            DataField::decode(line, tag, tail).map(Field::Data)
        }
    }
}
