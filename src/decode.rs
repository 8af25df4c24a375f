//! Decoder for the `--output-replacements-xml` report emitted by clang-format.
//!
//! The report looks like:
//!
//! ```text
//! <?xml version='1.0'?>
//! <replacements xml:space='preserve' incomplete_format='false'>
//! <replacement offset='12' length='4'>&#10;  </replacement>
//! </replacements>
//! ```
//!
//! Decoding happens in two passes. The first pass walks the XML with text
//! trimming disabled and collects raw records, so a syntactically broken
//! report is rejected as a whole before any record is interpreted. The second
//! pass turns raw attribute text into [`Replacement`]s.

use crate::replacement::Replacement;
use quick_xml::escape::EscapeError;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

const ROOT_ELEMENT: &[u8] = b"replacements";
const RECORD_ELEMENT: &[u8] = b"replacement";

/// Decoding failure that invalidates the whole report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("replacement #{index} is missing the required '{attribute}' attribute")]
    MissingAttribute {
        index: usize,
        attribute: &'static str,
    },
}

/// A record dropped because its offset or length is not a non-negative
/// integer, or because `offset + length` overflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position of the record among the `<replacement>` elements
    pub index: usize,
    /// Raw `offset` attribute text
    pub offset: String,
    /// Raw `length` attribute text
    pub length: String,
}

/// Outcome of decoding one replacement report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedReport {
    /// Replacements in document order
    pub replacements: Vec<Replacement>,
    /// Records dropped because of unparseable numeric attributes
    pub skipped: Vec<SkippedRecord>,
    /// The formatter could not format the whole input
    pub incomplete_format: bool,
    /// Parser message when the report was not well-formed XML
    pub malformed: Option<String>,
}

impl DecodedReport {
    fn malformed(message: impl Into<String>) -> Self {
        Self {
            malformed: Some(message.into()),
            ..Self::default()
        }
    }

    /// True when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

/// Reasons a report is treated as not well-formed.
#[derive(Error, Debug)]
enum ScanError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Attribute(#[from] AttrError),

    #[error(transparent)]
    Escape(#[from] EscapeError),

    #[error("report ended inside {0} open element(s)")]
    Unclosed(usize),
}

#[derive(Debug, Default)]
struct RawRecord {
    offset: Option<String>,
    length: Option<String>,
    text: String,
}

impl RawRecord {
    fn from_start(element: &BytesStart<'_>) -> Result<Self, ScanError> {
        Ok(Self {
            offset: attribute(element, "offset")?,
            length: attribute(element, "length")?,
            text: String::new(),
        })
    }
}

#[derive(Debug, Default)]
struct RawReport {
    records: Vec<RawRecord>,
    incomplete_format: bool,
}

/// Decode a replacement report.
///
/// A report without a `<replacements>` root, or one that is not well-formed,
/// decodes to an empty report. A record missing `offset` or `length` aborts
/// decoding with [`DecodeError::MissingAttribute`]. A record whose attributes
/// are not non-negative integers is skipped and listed in
/// [`DecodedReport::skipped`].
pub fn decode(report: &str) -> Result<DecodedReport, DecodeError> {
    let raw = match scan(report) {
        Ok(raw) => raw,
        Err(err) => {
            log::debug!("replacement report is not well-formed: {err}");
            return Ok(DecodedReport::malformed(err.to_string()));
        }
    };

    let mut decoded = DecodedReport {
        incomplete_format: raw.incomplete_format,
        ..DecodedReport::default()
    };

    for (index, record) in raw.records.into_iter().enumerate() {
        let offset = record.offset.ok_or(DecodeError::MissingAttribute {
            index,
            attribute: "offset",
        })?;
        let length = record.length.ok_or(DecodeError::MissingAttribute {
            index,
            attribute: "length",
        })?;

        match (parse_count(&offset), parse_count(&length)) {
            // A range whose end does not fit in usize cannot address any buffer
            (Some(start), Some(len)) if start.checked_add(len).is_some() => {
                decoded
                    .replacements
                    .push(Replacement::new(start, len, record.text));
            }
            _ => {
                log::warn!(
                    "could not convert offset ('{offset}') and/or length ('{length}') in replacement #{index}"
                );
                decoded.skipped.push(SkippedRecord {
                    index,
                    offset,
                    length,
                });
            }
        }
    }

    Ok(decoded)
}

fn parse_count(raw: &str) -> Option<usize> {
    raw.trim().parse().ok()
}

/// First pass: collect raw records from the XML, preserving all whitespace.
fn scan(report: &str) -> Result<RawReport, ScanError> {
    let mut reader = Reader::from_str(report);
    reader.config_mut().trim_text(false);

    let mut raw = RawReport::default();
    let mut depth = 0usize;
    let mut root_seen = false;
    let mut in_root = false;
    let mut current: Option<RawRecord> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let name = element.name();
                if depth == 0 && !root_seen && name.as_ref() == ROOT_ELEMENT {
                    root_seen = true;
                    in_root = true;
                    raw.incomplete_format = is_incomplete(&element)?;
                } else if in_root && depth == 1 && name.as_ref() == RECORD_ELEMENT {
                    current = Some(RawRecord::from_start(&element)?);
                }
                depth += 1;
            }
            Event::Empty(element) => {
                let name = element.name();
                if depth == 0 && !root_seen && name.as_ref() == ROOT_ELEMENT {
                    root_seen = true;
                    raw.incomplete_format = is_incomplete(&element)?;
                } else if in_root && depth == 1 && name.as_ref() == RECORD_ELEMENT {
                    raw.records.push(RawRecord::from_start(&element)?);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if in_root && depth == 1 {
                    if let Some(record) = current.take() {
                        raw.records.push(record);
                    }
                } else if in_root && depth == 0 {
                    in_root = false;
                }
            }
            Event::Text(text) => {
                if let Some(record) = current.as_mut().filter(|_| depth == 2) {
                    record.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(record) = current.as_mut().filter(|_| depth == 2) {
                    record.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ScanError::Unclosed(depth));
    }

    Ok(raw)
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, ScanError> {
    let Some(attr) = element.try_get_attribute(name)? else {
        return Ok(None);
    };
    let value = attr.unescape_value()?;
    Ok(Some(value.into_owned()))
}

fn is_incomplete(root: &BytesStart<'_>) -> Result<bool, ScanError> {
    Ok(attribute(root, "incomplete_format")?.is_some_and(|value| value.trim() == "true"))
}
