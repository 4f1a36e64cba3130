//! S3 XML wire format for cargohold responses and request bodies.
//!
//! S3 uses the RestXml protocol with `noErrorWrapping: true`: every
//! response body is a bare root element (no SOAP-style envelope) and
//! error bodies are a flat `<Error>` element.
//!
//! # Conventions
//!
//! - Namespace: `http://s3.amazonaws.com/doc/2006-03-01/`
//! - Booleans: lowercase `true`/`false`
//! - Timestamps: ISO 8601 with milliseconds, e.g. `2006-02-03T16:45:09.000Z`
//! - XML declaration: `<?xml version="1.0" encoding="UTF-8"?>`

pub mod deserialize;
pub mod error;
pub mod serialize;

pub use deserialize::{S3Deserialize, from_xml};
pub use error::{XmlError, error_to_xml};
pub use serialize::{S3_NAMESPACE, S3Serialize, to_xml};
