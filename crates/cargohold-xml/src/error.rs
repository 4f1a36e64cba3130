//! XML errors and the S3 `<Error>` response body formatter.

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

/// Errors that can occur while serializing or deserializing XML.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An I/O error while writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),
    /// A required XML element was missing.
    #[error("missing required XML element: {0}")]
    MissingElement(String),
    /// An unexpected XML element was encountered.
    #[error("unexpected XML element: {0}")]
    UnexpectedElement(String),
    /// A value failed to parse out of element text content.
    #[error("failed to parse value: {0}")]
    ParseError(String),
}

/// Format an S3 error as a flat `<Error>` XML document.
///
/// S3 does not wrap errors in an outer envelope.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Error>
///   <Code>NoSuchBucket</Code>
///   <Message>The specified bucket does not exist</Message>
///   <Resource>/mybucket</Resource>
///   <RequestId>...</RequestId>
///   <HostId>...</HostId>
/// </Error>
/// ```
pub fn error_to_xml(code: &str, message: &str, resource: Option<&str>, request_id: &str, host_id: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    if let Err(e) = write_error_xml(&mut buf, code, message, resource, request_id, host_id) {
        tracing::error!(error = %e, "failed to serialize error XML");
        buf.clear();
    }
    buf
}

fn write_error_xml(
    buf: &mut Vec<u8>,
    code: &str,
    message: &str,
    resource: Option<&str>,
    request_id: &str,
    host_id: &str,
) -> io::Result<()> {
    let mut writer = Writer::new(buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.create_element("Error").write_inner_content(|w| {
        w.create_element("Code").write_text_content(BytesText::new(code))?;
        w.create_element("Message")
            .write_text_content(BytesText::new(message))?;
        if let Some(res) = resource {
            w.create_element("Resource")
                .write_text_content(BytesText::new(res))?;
        }
        w.create_element("RequestId")
            .write_text_content(BytesText::new(request_id))?;
        w.create_element("HostId")
            .write_text_content(BytesText::new(host_id))?;
        Ok(())
    })?;
    Ok(())
}
