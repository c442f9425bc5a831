use std::fmt::Write as _;
use anyhow::{ Result, Context, anyhow, bail };

use crate::field::{ ControlField, DataField, Subfield };
use crate::record::Record;

/// Character data or attribute value, escaped on display.
///
/// Characters that XML 1.0 cannot carry are replaced with U+FFFD.
/// Tab, newline and carriage return are written as character references
/// so they survive attribute-value normalization on the way back in.
struct Escaped<'a>(&'a str);

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}'
    )
}

impl std::fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&apos;")?,
                '\t' => f.write_str("&#9;")?,
                '\n' => f.write_str("&#10;")?,
                '\r' => f.write_str("&#13;")?,
                c if is_xml_char(c) => f.write_char(c)?,
                _ => f.write_char('\u{FFFD}')?,
            }
        }
        Ok(())
    }
}

// Indicators and codes are single characters; format them through a
// stack buffer so they get the same escaping as everything else.
fn escaped_char(c: char, buf: &mut [u8; 4]) -> Escaped<'_> {
    Escaped(c.encode_utf8(buf))
}

impl ControlField {
    fn to_xml(&self, xml: &mut String) -> Result<()> {
        write!(xml, "  <controlfield tag=\"{}\">{}</controlfield>\n",
            Escaped(&self.tag), Escaped(&self.content))?;
        Ok(())
    }

    fn from_xml(node: &roxmltree::Node) -> Result<Self> {
        Ok(Self {
            tag: node.attribute("tag").context("controlfield missing tag attribute")?.to_owned(),
            content: node.text().unwrap_or_default().to_owned(),
        })
    }
}

impl Subfield {
    fn to_xml(&self, xml: &mut String) -> Result<()> {
        let mut buf = [0u8; 4];
        write!(xml, "    <subfield code=\"{}\">{}</subfield>\n",
            escaped_char(self.code, &mut buf), Escaped(&self.content))?;
        Ok(())
    }

    fn from_xml(node: &roxmltree::Node) -> Result<Self> {
        Ok(Self {
            code: char_attribute(node, "code")?,
            content: node.text().unwrap_or_default().to_owned(),
        })
    }
}

impl DataField {
    fn to_xml(&self, xml: &mut String) -> Result<()> {
        let (mut b1, mut b2) = ([0u8; 4], [0u8; 4]);
        write!(xml, "  <datafield tag=\"{}\" ind1=\"{}\" ind2=\"{}\">",
            Escaped(&self.tag), escaped_char(self.ind1, &mut b1), escaped_char(self.ind2, &mut b2))?;

        if !self.subfields.is_empty() {
            xml.push('\n');
            for (i, subfield) in self.subfields.iter().enumerate() {
                subfield.to_xml(xml).context(format!("XML formatting subfield {}", i))?;
            }
            xml.push_str("  ");
        }

        xml.push_str("</datafield>\n");
        Ok(())
    }

    fn from_xml(node: &roxmltree::Node) -> Result<Self> {
        let mut subfields = Vec::new();
        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "subfield" => subfields.push(Subfield::from_xml(&child)?),
                name => bail!("Unexpected element <{}> in datafield", name),
            }
        }

        Ok(Self {
            tag: node.attribute("tag").context("datafield missing tag attribute")?.to_owned(),
            ind1: char_attribute(node, "ind1")?,
            ind2: char_attribute(node, "ind2")?,
            subfields,
        })
    }
}

fn char_attribute(node: &roxmltree::Node, name: &str) -> Result<char> {
    let value = node.attribute(name)
        .with_context(|| format!("<{}> missing {} attribute", node.tag_name().name(), name))?;
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(anyhow!("{} attribute must be a single character, got {:?}", name, value)),
    }
}

impl Record {
    /// Renders the record as a `<record>` element, indented by two spaces
    /// per level, without a trailing newline.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::new();
        xml.push_str("<record>\n");
        write!(xml, "  <leader>{}</leader>\n", Escaped(&self.leader))?;

        for (i, field) in self.control_fields.iter().enumerate() {
            field.to_xml(&mut xml).context(format!("XML formatting controlfield {}", i))?;
        }
        for (i, field) in self.data_fields.iter().enumerate() {
            field.to_xml(&mut xml).context(format!("XML formatting datafield {}", i))?;
        }

        xml.push_str("</record>");
        Ok(xml)
    }

    /// Reads a `<record>` element back.
    pub fn from_xml(node: &roxmltree::Node) -> Result<Self> {
        let mut leader = None;
        let mut control_fields = Vec::new();
        let mut data_fields = Vec::new();

        for (i, child) in node.children().filter(|n| n.is_element()).enumerate() {
            match child.tag_name().name() {
                "leader" => leader = Some(child.text().unwrap_or_default().to_owned()),
                "controlfield" => control_fields.push(
                    ControlField::from_xml(&child).context(format!("Record element {}", i))?
                ),
                "datafield" => data_fields.push(
                    DataField::from_xml(&child).context(format!("Record element {}", i))?
                ),
                name => bail!("Unexpected element <{}> in record", name),
            }
        }

        Ok(Self {
            leader: leader.context("Record missing leader")?,
            control_fields,
            data_fields,
        })
    }
}

/// Reads every `<record>` element of a document. The root may be a single
/// record or any wrapper element around them.
pub fn read_records(xml: &str) -> Result<Vec<Record>> {
    let doc = roxmltree::Document::parse(xml).context("Parsing MARCXML")?;
    let root = doc.root_element();
    if root.has_tag_name("record") {
        return Ok(vec![Record::from_xml(&root)?]);
    }

    root.descendants()
        .filter(|n| n.has_tag_name("record"))
        .enumerate()
        .map(|(i, node)| Record::from_xml(&node).context(format!("Record {}", i)))
        .collect()
}
