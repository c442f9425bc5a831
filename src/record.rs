use crate::error::{EmptyBatch, SkippedLine};
use crate::field::{ControlField, DataField, Field};

/// Length of the leader itself, the starting point of the record size.
pub const LEADER_LEN: usize = 24;
/// Leader positions 6-23: type/level constants fixed by this tool.
const LEADER_SUFFIX: &str = "am a22     1  4500";
/// Status of a record that has no `000` field at all ("new").
pub const NEW_STATUS: char = 'n';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub leader: String,
    pub control_fields: Vec<ControlField>,
    pub data_fields: Vec<DataField>,
}

/// A record together with the lines that were dropped while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub record: Record,
    pub skipped: Vec<SkippedLine>,
}

/// `size` is rendered as 5 zero-padded digits (more if it does not fit).
pub fn leader(size: usize, status: char) -> String {
    format!("{:05}{}{}", size, status, LEADER_SUFFIX)
}

impl Record {
    /// Builds one record from the lines of a single batch (sentinel excluded).
    ///
    /// Lines that cannot be decoded are dropped and listed in
    /// [`Assembly::skipped`]; they do not count towards the record size.
    /// If no line is usable the whole batch is rejected with [`EmptyBatch`].
    ///
    /// The leader status comes from the last `000` field, or is
    /// [`NEW_STATUS`] when there is none.
    pub fn assemble<S: AsRef<str>>(lines: &[S]) -> Result<Assembly, EmptyBatch> {
        let mut size = LEADER_LEN;
        let mut status = None;
        let mut control_fields = Vec::new();
        let mut data_fields = Vec::new();
        let mut skipped = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            let field = match Field::parse(line) {
                Ok(field) => field,
                Err(error) => {
                    skipped.push(SkippedLine { index, error });
                    continue;
                }
            };

            // byte length, as in the ISO 2709 record length
            size += line.len();

            match field {
                Field::Control(field) => {
                    if field.is_status() {
                        status = field.content.chars().next();
                    }
                    control_fields.push(field);
                }
                Field::Data(field) => data_fields.push(field),
            }
        }

        if control_fields.is_empty() && data_fields.is_empty() {
            return Err(EmptyBatch { skipped });
        }

        Ok(Assembly {
            record: Record {
                leader: leader(size, status.unwrap_or(NEW_STATUS)),
                control_fields,
                data_fields,
            },
            skipped,
        })
    }

    /// Leader position 5.
    pub fn status(&self) -> Option<char> {
        self.leader.chars().nth(5)
    }

    /// The numeric length prefix of the leader.
    pub fn declared_len(&self) -> Option<usize> {
        let digits: String = self.leader.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LineError;

    #[test]
    fn leader_layout() {
        assert_eq!(leader(573, 'n'), "00573nam a22     1  4500");
        assert_eq!(leader(24, 'c').len(), 24);
        assert_eq!(leader(123456, 'c'), "123456cam a22     1  4500");
    }

    #[test]
    fn size_is_leader_plus_line_bytes() {
        let lines = ["*0010010463", "*245  $aÅ"];
        let a = Record::assemble(&lines).unwrap();
        let expected = 24 + lines.iter().map(|l| l.len()).sum::<usize>();
        assert_eq!(a.record.declared_len(), Some(expected));
        assert_eq!(a.record.leader, format!("{expected:05}nam a22     1  4500"));
    }

    #[test]
    fn fields_are_routed_in_order() {
        let lines = ["*0010001", "*650  $aB", "*008x", "*245  $aA"];
        let r = Record::assemble(&lines).unwrap().record;
        let control: Vec<_> = r.control_fields.iter().map(|f| f.tag.as_str()).collect();
        let data: Vec<_> = r.data_fields.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(control, ["001", "008"]);
        assert_eq!(data, ["650", "245"]);
    }

    #[test]
    fn status_comes_from_000_field() {
        let r = Record::assemble(&["*000     d", "*0010001"]).unwrap().record;
        assert_eq!(r.status(), Some('d'));
        assert_eq!(r.control_fields[0].content, "d");
    }

    #[test]
    fn status_defaults() {
        let r = Record::assemble(&["*0010001"]).unwrap().record;
        assert_eq!(r.status(), Some('n'));

        let r = Record::assemble(&["*000"]).unwrap().record;
        assert_eq!(r.status(), Some('c'));
    }

    #[test]
    fn bad_lines_are_skipped_and_reported() {
        let lines = ["*0010001", "garbage", "*24", "*245  $aTitle"];
        let a = Record::assemble(&lines).unwrap();
        assert_eq!(a.record.control_fields.len(), 1);
        assert_eq!(a.record.data_fields.len(), 1);
        assert_eq!(a.skipped.len(), 2);
        assert_eq!(a.skipped[0].index, 1);
        assert!(matches!(a.skipped[0].error, LineError::UnrecognizedLine { .. }));
        assert_eq!(a.skipped[1].index, 2);
        assert!(matches!(a.skipped[1].error, LineError::MalformedLine { .. }));
        assert_eq!(a.record.declared_len(), Some(24 + "*0010001".len() + "*245  $aTitle".len()));
    }

    #[test]
    fn batch_without_usable_lines_is_empty() {
        let none: [&str; 0] = [];
        assert_eq!(Record::assemble(&none), Err(EmptyBatch { skipped: vec![] }));

        let err = Record::assemble(&["", "^x", "*"]).unwrap_err();
        assert_eq!(err.skipped.len(), 3);
    }
}
