//! Converting cargohold response types to S3-compatible XML.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

use cargohold_model::output::bucket::{BucketSummary, ListBucketsOutput};
use cargohold_model::output::list::{ListObjectsOutput, ObjectSummary};
use cargohold_model::output::multipart::{
    CompleteMultipartUploadOutput, InitiateMultipartUploadOutput, ListMultipartUploadsOutput,
    ListPartsOutput, MultipartUploadSummary, PartSummary, UploadPartCopyOutput,
};
use cargohold_model::output::object::CopyObjectOutput;
use cargohold_model::types::{ChecksumMap, Owner};

use crate::error::XmlError;

/// The S3 XML namespace carried on every root element.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Types that can write themselves as XML child elements.
///
/// Implementors write into the current writer context; the root element
/// name and namespace are added by [`to_xml`].
pub trait S3Serialize {
    /// Write this value's child elements into `writer`.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the underlying writer fails.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize a value as a complete S3 XML document under `root_element`.
///
/// # Errors
///
/// Returns `XmlError` if writing fails.
pub fn to_xml<T: S3Serialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element(root_element)
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w| value.serialize_xml(w))?;
    Ok(buf)
}

fn write_text<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer.create_element(tag).write_text_content(BytesText::new(text))?;
    Ok(())
}

fn write_optional_text<W: Write>(writer: &mut Writer<W>, tag: &str, value: Option<&str>) -> io::Result<()> {
    if let Some(v) = value {
        write_text(writer, tag, v)?;
    }
    Ok(())
}

fn write_bool<W: Write>(writer: &mut Writer<W>, tag: &str, value: bool) -> io::Result<()> {
    write_text(writer, tag, if value { "true" } else { "false" })
}

fn write_u64<W: Write>(writer: &mut Writer<W>, tag: &str, value: u64) -> io::Result<()> {
    write_text(writer, tag, &value.to_string())
}

fn write_u32<W: Write>(writer: &mut Writer<W>, tag: &str, value: u32) -> io::Result<()> {
    write_text(writer, tag, &value.to_string())
}

fn format_timestamp(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn write_timestamp<W: Write>(writer: &mut Writer<W>, tag: &str, dt: &chrono::DateTime<chrono::Utc>) -> io::Result<()> {
    write_text(writer, tag, &format_timestamp(dt))
}

/// Write each populated `x-amz-checksum-*` value as its own element, in
/// the fixed order S3 documents them.
fn write_checksums<W: Write>(writer: &mut Writer<W>, checksums: &ChecksumMap) -> io::Result<()> {
    for algo in cargohold_model::types::ChecksumAlgorithm::ALL {
        if let Some(value) = checksums.get(&algo) {
            write_text(writer, &format!("Checksum{}", algo.as_str()), value)?;
        }
    }
    Ok(())
}

impl S3Serialize for Owner {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Owner").write_inner_content(|w| {
            write_text(w, "ID", &self.id)?;
            write_text(w, "DisplayName", &self.display_name)?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for BucketSummary {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Bucket").write_inner_content(|w| {
            write_text(w, "Name", &self.name)?;
            write_timestamp(w, "CreationDate", &self.creation_date)?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for ListBucketsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        self.owner.serialize_xml(writer)?;
        writer.create_element("Buckets").write_inner_content(|w| {
            for bucket in &self.buckets {
                bucket.serialize_xml(w)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for ObjectSummary {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Contents").write_inner_content(|w| {
            write_text(w, "Key", &self.key)?;
            write_timestamp(w, "LastModified", &self.last_modified)?;
            write_text(w, "ETag", &self.etag)?;
            write_u64(w, "Size", self.size)?;
            write_text(w, "StorageClass", "STANDARD")?;
            self.owner.serialize_xml(w)?;
            Ok(())
        })?;
        Ok(())
    }
}

/// A single `<CommonPrefixes>` entry in a listing response.
pub struct CommonPrefix<'a>(pub &'a str);

impl S3Serialize for CommonPrefix<'_> {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("CommonPrefixes").write_inner_content(|w| write_text(w, "Prefix", self.0))?;
        Ok(())
    }
}

impl S3Serialize for ListObjectsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text(writer, "Name", &self.name)?;
        write_text(writer, "Prefix", &self.prefix)?;
        write_u32(writer, "MaxKeys", self.max_keys)?;
        write_optional_text(writer, "Delimiter", self.delimiter.as_deref())?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        write_u32(writer, "KeyCount", u32::try_from(self.contents.len()).unwrap_or(u32::MAX))?;
        if let Some(cursor) = &self.next_cursor {
            write_text(writer, "NextContinuationToken", cursor)?;
        }
        for obj in &self.contents {
            obj.serialize_xml(writer)?;
        }
        for prefix in &self.common_prefixes {
            CommonPrefix(prefix).serialize_xml(writer)?;
        }
        Ok(())
    }
}

impl S3Serialize for CopyObjectOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text(writer, "ETag", &self.etag)?;
        write_timestamp(writer, "LastModified", &self.last_modified)?;
        write_checksums(writer, &self.checksums)?;
        Ok(())
    }
}

impl S3Serialize for InitiateMultipartUploadOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text(writer, "Bucket", &self.bucket)?;
        write_text(writer, "Key", &self.key)?;
        write_text(writer, "UploadId", &self.upload_id)?;
        Ok(())
    }
}

impl S3Serialize for UploadPartCopyOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text(writer, "ETag", &self.etag)?;
        write_timestamp(writer, "LastModified", &self.last_modified)?;
        Ok(())
    }
}

impl S3Serialize for CompleteMultipartUploadOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text(writer, "Bucket", &self.bucket)?;
        write_text(writer, "Key", &self.key)?;
        write_text(writer, "ETag", &self.etag)?;
        write_checksums(writer, &self.checksums)?;
        Ok(())
    }
}

impl S3Serialize for PartSummary {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Part").write_inner_content(|w| {
            write_u32(w, "PartNumber", self.part_number)?;
            write_timestamp(w, "LastModified", &self.last_modified)?;
            write_text(w, "ETag", &self.etag)?;
            write_u64(w, "Size", self.size)?;
            write_checksums(w, &self.checksums)?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for ListPartsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text(writer, "Bucket", &self.bucket)?;
        write_text(writer, "Key", &self.key)?;
        write_text(writer, "UploadId", &self.upload_id)?;
        write_u32(writer, "MaxParts", self.max_parts)?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        if let Some(marker) = self.next_part_number_marker {
            write_u32(writer, "NextPartNumberMarker", marker)?;
        }
        write_text(writer, "StorageClass", "STANDARD")?;
        for part in &self.parts {
            part.serialize_xml(writer)?;
        }
        Ok(())
    }
}

impl S3Serialize for MultipartUploadSummary {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        writer.create_element("Upload").write_inner_content(|w| {
            write_text(w, "Key", &self.key)?;
            write_text(w, "UploadId", &self.upload_id)?;
            write_timestamp(w, "Initiated", &self.initiated)?;
            write_text(w, "StorageClass", "STANDARD")?;
            Ok(())
        })?;
        Ok(())
    }
}

impl S3Serialize for ListMultipartUploadsOutput {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text(writer, "Bucket", &self.bucket)?;
        write_bool(writer, "IsTruncated", false)?;
        for upload in &self.uploads {
            upload.serialize_xml(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cargohold_model::types::Owner;
    use chrono::TimeZone;

    use super::*;

    fn fixed_time() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_should_serialize_list_buckets() {
        let output = ListBucketsOutput {
            buckets: vec![BucketSummary { name: "demo".into(), creation_date: fixed_time() }],
            owner: Owner::default(),
        };
        let xml = to_xml("ListAllMyBucketsResult", &output).expect("serialize");
        let xml_str = std::str::from_utf8(&xml).unwrap();
        assert!(xml_str.contains("<Name>demo</Name>"));
        assert!(xml_str.contains("2024-06-01T12:30:00.000Z"));
        assert!(xml_str.contains(S3_NAMESPACE));
    }

    #[test]
    fn test_should_serialize_list_objects_with_common_prefixes() {
        let output = ListObjectsOutput {
            name: "demo".into(),
            prefix: "photos/".into(),
            delimiter: Some("/".into()),
            max_keys: 1000,
            contents: vec![ObjectSummary {
                key: "photos/cat.png".into(),
                last_modified: fixed_time(),
                etag: "\"abc\"".into(),
                size: 42,
                owner: Owner::default(),
            }],
            common_prefixes: vec!["photos/2024/".into()],
            is_truncated: false,
            next_cursor: None,
        };
        let xml = to_xml("ListBucketResult", &output).expect("serialize");
        let xml_str = std::str::from_utf8(&xml).unwrap();
        assert!(xml_str.contains("<Key>photos/cat.png</Key>"));
        assert!(xml_str.contains("<Prefix>photos/2024/</Prefix>"));
        assert!(xml_str.contains("<IsTruncated>false</IsTruncated>"));
    }

    #[test]
    fn test_should_serialize_checksums_in_declared_order() {
        let mut checksums = ChecksumMap::new();
        checksums.insert(cargohold_model::types::ChecksumAlgorithm::Sha256, "deadbeef".into());
        checksums.insert(cargohold_model::types::ChecksumAlgorithm::Crc32, "00112233".into());
        let output = CompleteMultipartUploadOutput {
            bucket: "demo".into(),
            key: "big.bin".into(),
            etag: "\"composite-2\"".into(),
            checksums,
        };
        let xml = to_xml("CompleteMultipartUploadResult", &output).expect("serialize");
        let xml_str = std::str::from_utf8(&xml).unwrap();
        let crc_pos = xml_str.find("ChecksumCRC32").unwrap();
        let sha_pos = xml_str.find("ChecksumSHA256").unwrap();
        assert!(crc_pos < sha_pos, "checksums must serialize in ALL order");
    }
}
