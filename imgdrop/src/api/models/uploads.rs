use axum::http::HeaderMap;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;

/// A file part read out of a multipart upload form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename declared in the part's `Content-Disposition`
    pub file_name: String,
    /// Headers attached to the part itself
    pub headers: HeaderMap,
    pub data: Bytes,
}

impl UploadedFile {
    /// Size of the received content in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Plain-text body returned for a stored upload.
///
/// Renders as four lines: filename, size, part headers and a confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file_name: String,
    pub size: usize,
    pub mime_header: String,
}

impl UploadReceipt {
    pub fn new(upload: &UploadedFile) -> Self {
        Self {
            file_name: upload.file_name.clone(),
            size: upload.size(),
            mime_header: render_mime_header(&upload.headers),
        }
    }
}

impl fmt::Display for UploadReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Uploaded File: {}", self.file_name)?;
        writeln!(f, "File Size: {}", self.size)?;
        writeln!(f, "MIME Header: {}", self.mime_header)?;
        writeln!(f, "File uploaded successfully!")
    }
}

/// Render part headers as `map[Key:[v1 v2] ...]` with canonical keys in sorted order.
///
/// Values for a repeated header keep their arrival order. Non-UTF-8 values are rendered lossily.
pub fn render_mime_header(headers: &HeaderMap) -> String {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        grouped
            .entry(canonical_header_key(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let entries: Vec<String> = grouped
        .into_iter()
        .map(|(key, values)| format!("{key}:[{}]", values.join(" ")))
        .collect();
    format!("map[{}]", entries.join(" "))
}

/// `content-disposition` -> `Content-Disposition`
fn canonical_header_key(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
