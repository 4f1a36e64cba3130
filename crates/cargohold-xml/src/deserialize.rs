//! Parsing S3-compatible XML request bodies into cargohold input types.
//!
//! Request bodies are far simpler than responses: the only one cargohold
//! needs to parse is the `CompleteMultipartUpload` part list.

use quick_xml::Reader;
use quick_xml::events::Event;

use cargohold_model::input::multipart::CompletedPart;

use crate::error::XmlError;

/// Types that can parse themselves from an XML element's children.
///
/// The reader is positioned just after the element's opening tag; the
/// implementation consumes through the matching end tag.
pub trait S3Deserialize: Sized {
    /// Parse `Self` from the reader.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` on malformed XML or missing required fields.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;
}

/// Parse a complete XML document, skipping the declaration, into `T`.
///
/// # Errors
///
/// Returns `XmlError` if the document has no root element or `T` fails
/// to parse it.
pub fn from_xml<T: S3Deserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(_) => return T::deserialize_xml(&mut reader),
            Event::Eof => return Err(XmlError::MissingElement("root element".to_owned())),
            _ => {}
        }
    }
}

fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e.decode().map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped =
                    quick_xml::escape::unescape(&decoded).map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::End(_) => return Ok(text),
            Event::Eof => return Err(XmlError::UnexpectedElement("unexpected EOF reading text".to_owned())),
            _ => {}
        }
    }
}

fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => return Err(XmlError::UnexpectedElement("unexpected EOF skipping element".to_owned())),
            _ => {}
        }
    }
}

fn parse_u32(s: &str) -> Result<u32, XmlError> {
    s.parse::<u32>().map_err(|e| XmlError::ParseError(format!("invalid integer '{s}': {e}")))
}

fn tag_name(e: &quick_xml::events::BytesStart<'_>) -> Result<String, XmlError> {
    std::str::from_utf8(e.name().as_ref())
        .map(ToOwned::to_owned)
        .map_err(|err| XmlError::ParseError(err.to_string()))
}

impl S3Deserialize for CompletedPart {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut part_number = None;
        let mut etag = None;
        loop {
            match reader.read_event()? {
                Event::Start(e) => match tag_name(&e)?.as_str() {
                    "PartNumber" => part_number = Some(parse_u32(&read_text_content(reader)?)?),
                    "ETag" => etag = Some(read_text_content(reader)?),
                    _ => skip_element(reader)?,
                },
                Event::End(_) => break,
                Event::Eof => return Err(XmlError::UnexpectedElement("unexpected EOF in Part".to_owned())),
                _ => {}
            }
        }
        Ok(CompletedPart {
            part_number: part_number.ok_or_else(|| XmlError::MissingElement("PartNumber".to_owned()))?,
            etag: etag.ok_or_else(|| XmlError::MissingElement("ETag".to_owned()))?,
        })
    }
}

/// Parsed `CompleteMultipartUpload` request body: an ordered list of parts.
#[derive(Debug, Clone, Default)]
pub struct CompletedMultipartUploadBody {
    /// Parts in the order the client listed them.
    pub parts: Vec<CompletedPart>,
}

impl S3Deserialize for CompletedMultipartUploadBody {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut parts = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if tag_name(&e)? == "Part" {
                        parts.push(CompletedPart::deserialize_xml(reader)?);
                    } else {
                        skip_element(reader)?;
                    }
                }
                Event::End(_) => break,
                Event::Eof => {
                    return Err(XmlError::UnexpectedElement("unexpected EOF in CompleteMultipartUpload".to_owned()));
                }
                _ => {}
            }
        }
        Ok(Self { parts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_completed_parts_in_document_order() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
        <CompleteMultipartUpload>
            <Part><PartNumber>1</PartNumber><ETag>"aaa"</ETag></Part>
            <Part><PartNumber>2</PartNumber><ETag>"bbb"</ETag></Part>
        </CompleteMultipartUpload>"#;
        let body: CompletedMultipartUploadBody = from_xml(xml).expect("parse");
        assert_eq!(body.parts.len(), 2);
        assert_eq!(body.parts[0].part_number, 1);
        assert_eq!(body.parts[0].etag, "\"aaa\"");
        assert_eq!(body.parts[1].part_number, 2);
    }

    #[test]
    fn test_should_error_on_missing_part_number() {
        let xml = br#"<CompleteMultipartUpload><Part><ETag>"aaa"</ETag></Part></CompleteMultipartUpload>"#;
        let result: Result<CompletedMultipartUploadBody, XmlError> = from_xml(xml);
        assert!(result.is_err());
    }

    #[test]
    fn test_should_parse_empty_upload() {
        let xml = br#"<CompleteMultipartUpload></CompleteMultipartUpload>"#;
        let body: CompletedMultipartUploadBody = from_xml(xml).expect("parse");
        assert!(body.parts.is_empty());
    }
}
