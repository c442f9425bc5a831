use std::io::{ BufRead, Write };
use anyhow::{ Result, Context, bail };

use crate::batch::{ Batch, Batches };
use crate::error::SkippedLine;
use crate::record::Record;
use crate::xml::read_records;

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Stop after this many records have been written.
    pub max_records: Option<usize>,
    /// Read every serialized record back and compare it before writing.
    pub verify: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub records: usize,
    pub batches: usize,
    pub empty_batches: usize,
    pub skipped_lines: usize,
}

fn report_skipped(batch: &Batch, skipped: &[SkippedLine]) {
    if skipped.is_empty() {
        return;
    }
    for s in skipped {
        tracing::debug!(line = batch.first_line + s.index, "{}", s.error);
    }
    tracing::warn!(
        first_line = batch.first_line,
        "skipped {} of {} lines in record",
        skipped.len(), batch.lines.len()
    );
}

fn verify(record: &Record, xml: &str) -> Result<()> {
    let back = read_records(xml)?;
    if back.len() != 1 || back[0] != *record {
        bail!("Serialized record does not read back unchanged");
    }
    Ok(())
}

/// Converts a line-MARC stream into MARCXML records, one per line group,
/// each followed by a newline. `on_record` runs after every written record.
///
/// Per-line problems are logged and counted; read, serialization and
/// write errors end the conversion.
pub fn convert<R, W, F>(input: R, mut output: W, options: &ConvertOptions, mut on_record: F) -> Result<Summary>
where
    R: BufRead,
    W: Write,
    F: FnMut(&Summary),
{
    let mut summary = Summary::default();
    let mut batches = Batches::new(input);

    // TODO: records are independent; assemble them on a worker pool and write in order
    while options.max_records.is_none_or(|max| summary.records < max) {
        let Some(batch) = batches.next() else { break };
        let batch = batch?;
        summary.batches += 1;

        let assembly = match Record::assemble(&batch.lines) {
            Ok(assembly) => assembly,
            Err(empty) => {
                report_skipped(&batch, &empty.skipped);
                tracing::warn!(first_line = batch.first_line, "{}", empty);
                summary.skipped_lines += empty.skipped.len();
                summary.empty_batches += 1;
                continue;
            }
        };
        report_skipped(&batch, &assembly.skipped);
        summary.skipped_lines += assembly.skipped.len();

        let context = || format!("Record starting at input line {}", batch.first_line);
        let xml = assembly.record.to_xml().with_context(context)?;
        if options.verify {
            verify(&assembly.record, &xml).with_context(context)?;
        }

        output.write_all(xml.as_bytes())
            .and_then(|_| output.write_all(b"\n"))
            .with_context(context)?;

        summary.records += 1;
        on_record(&summary);
    }

    output.flush().context("Flushing output")?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "*0010001\n*245  $aOne\n^\n^\n*0010002\nbogus\n^\nnope\n^\n*0010003\n^\n";

    fn run(options: &ConvertOptions) -> (String, Summary) {
        let mut out = Vec::new();
        let summary = convert(INPUT.as_bytes(), &mut out, options, |_| {}).unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[test]
    fn converts_every_record() {
        let (xml, summary) = run(&ConvertOptions::default());
        assert_eq!(summary, Summary { records: 3, batches: 4, empty_batches: 1, skipped_lines: 2 });
        assert_eq!(xml.matches("<record>").count(), 3);
        assert!(xml.ends_with("</record>\n"));

        let ids: Vec<_> = xml.lines()
            .filter_map(|l| l.trim().strip_prefix("<controlfield tag=\"001\">"))
            .collect();
        assert_eq!(ids, ["0001</controlfield>", "0002</controlfield>", "0003</controlfield>"]);
    }

    #[test]
    fn stops_at_record_cap() {
        let (xml, summary) = run(&ConvertOptions { max_records: Some(2), verify: false });
        assert_eq!(summary.records, 2);
        assert_eq!(summary.batches, 2);
        assert_eq!(xml.matches("<record>").count(), 2);

        let (xml, summary) = run(&ConvertOptions { max_records: Some(0), verify: false });
        assert_eq!(summary, Summary::default());
        assert!(xml.is_empty());
    }

    #[test]
    fn verified_output_is_identical() {
        let (plain, _) = run(&ConvertOptions::default());
        let (verified, _) = run(&ConvertOptions { max_records: None, verify: true });
        assert_eq!(plain, verified);
    }

    #[test]
    fn reports_progress() {
        let mut seen = Vec::new();
        convert(INPUT.as_bytes(), std::io::sink(), &ConvertOptions::default(), |s| seen.push(s.records)).unwrap();
        assert_eq!(seen, [1, 2, 3]);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_fatal() {
        let mut calls = 0;
        let err = convert(INPUT.as_bytes(), FailingWriter, &ConvertOptions::default(), |_| calls += 1).unwrap_err();
        assert_eq!(calls, 0);
        assert!(format!("{err:#}").contains("disk full"));
    }
}
