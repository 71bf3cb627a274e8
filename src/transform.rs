use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

const GZIP_LEVEL: u32 = 6;

/// `name(body);`
pub fn jsonp_wrap(name: &str, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + body.len() + 3);
    out.extend_from_slice(name.as_bytes());
    out.push(b'(');
    out.extend_from_slice(body);
    out.extend_from_slice(b");");
    out
}

pub fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(GZIP_LEVEL));
    encoder.write_all(body)?;
    encoder.finish()
}

/// Content headers stored with the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHeaders {
    pub content_type: String,
    pub content_encoding: Option<String>,
}

pub fn upload_headers(mime_type: &str, compressed: bool) -> UploadHeaders {
    UploadHeaders {
        content_type: mime_type.to_string(),
        content_encoding: compressed.then(|| "gzip".to_string()),
    }
}
