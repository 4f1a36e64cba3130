//! The S3 operation enum the dispatcher routes requests to.

use std::fmt;

/// Every operation the gateway understands, one variant per routable
/// method/path/query combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3Operation {
    /// `GET /`
    ListBuckets,
    /// `PUT /<bucket>`
    CreateBucket,
    /// `DELETE /<bucket>`
    DeleteBucket,
    /// `HEAD /<bucket>`
    HeadBucket,
    /// `GET /<bucket>?uploads`
    ListMultipartUploads,
    /// `GET /<bucket>` (no `uploads`)
    ListObjects,
    /// `POST /<bucket>/<key>?uploads`
    InitiateMultipartUpload,
    /// `PUT /<bucket>/<key>?partNumber&uploadId` (no copy-source)
    UploadPart,
    /// `PUT /<bucket>/<key>?partNumber&uploadId` with `x-amz-copy-source`
    UploadPartCopy,
    /// `POST /<bucket>/<key>?uploadId`
    CompleteMultipartUpload,
    /// `DELETE /<bucket>/<key>?uploadId`
    AbortMultipartUpload,
    /// `GET /<bucket>/<key>?uploadId`
    ListParts,
    /// `HEAD /<bucket>/<key>?uploadId`
    HeadMultipartUpload,
    /// `PUT /<bucket>/<key>` (no copy-source)
    PutObject,
    /// `PUT /<bucket>/<key>` with `x-amz-copy-source`
    CopyObject,
    /// `GET /<bucket>/<key>`
    GetObject,
    /// `HEAD /<bucket>/<key>`
    HeadObject,
    /// `DELETE /<bucket>/<key>`
    DeleteObject,
}

impl S3Operation {
    /// A stable name used in tracing spans and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListBuckets => "ListBuckets",
            Self::CreateBucket => "CreateBucket",
            Self::DeleteBucket => "DeleteBucket",
            Self::HeadBucket => "HeadBucket",
            Self::ListMultipartUploads => "ListMultipartUploads",
            Self::ListObjects => "ListObjects",
            Self::InitiateMultipartUpload => "InitiateMultipartUpload",
            Self::UploadPart => "UploadPart",
            Self::UploadPartCopy => "UploadPartCopy",
            Self::CompleteMultipartUpload => "CompleteMultipartUpload",
            Self::AbortMultipartUpload => "AbortMultipartUpload",
            Self::ListParts => "ListParts",
            Self::HeadMultipartUpload => "HeadMultipartUpload",
            Self::PutObject => "PutObject",
            Self::CopyObject => "CopyObject",
            Self::GetObject => "GetObject",
            Self::HeadObject => "HeadObject",
            Self::DeleteObject => "DeleteObject",
        }
    }

    /// Whether this operation targets a bucket only (no key), used by the
    /// signature validator's permission check to decide whether to apply
    /// the `list` permission instead of method-derived read/write/delete.
    #[must_use]
    pub fn is_list_style(self) -> bool {
        matches!(self, Self::ListBuckets | Self::ListObjects | Self::ListMultipartUploads)
    }
}

impl fmt::Display for S3Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
