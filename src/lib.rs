//! Conversion of line-MARC records to MARCXML.
//!
//! Line-MARC has one field per line (`*001...`, `*24510$a...$b...`) and ends
//! every record with a `^` line. [`Batches`] splits a stream into records,
//! [`Record::assemble`] decodes one record and computes its leader, and
//! [`Record::to_xml`] renders it. [`convert`] ties the three together.

pub mod batch;
pub mod convert;
pub mod error;
pub mod field;
pub mod record;
pub mod xml;

pub use batch::{ Batch, Batches };
pub use convert::{ convert, ConvertOptions, Summary };
pub use error::{ EmptyBatch, LineError, SkippedLine };
pub use field::{ ControlField, DataField, Field, Subfield };
pub use record::{ Assembly, Record };
pub use xml::read_records;
