//! Content-type detection from raw bytes.
//!
//! Implements the signature table of the WHATWG MIME Sniffing Standard
//! (<https://mimesniff.spec.whatwg.org/>): at most the first [`SNIFF_LEN`] bytes are inspected,
//! rules are tried in order and the first match wins. Data that matches no signature is reported
//! as `text/plain; charset=utf-8` when it contains no binary control bytes, and as
//! `application/octet-stream` otherwise. The client-declared `Content-Type` of an upload is never
//! consulted.

/// Number of leading bytes considered when sniffing
pub const SNIFF_LEN: usize = 512;

/// Fallback for content that matches no signature and is not text
pub const OCTET_STREAM: &str = "application/octet-stream";

const TEXT_UTF8: &str = "text/plain; charset=utf-8";

enum Signature {
    /// Bytes must start with `pattern`
    Exact { pattern: &'static [u8], content_type: &'static str },
    /// `data[i] & mask[i] == pattern[i]` for every `i`, optionally after leading whitespace
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_ws: bool,
        content_type: &'static str,
    },
    /// Case-insensitive HTML tag after leading whitespace, followed by a space or `>`
    Html(&'static [u8]),
    /// ISO base media file with an `mp4` brand
    Mp4,
    /// Anything free of binary control bytes
    Text,
}

const HTML: &str = "text/html; charset=utf-8";

const fn exact(pattern: &'static [u8], content_type: &'static str) -> Signature {
    Signature::Exact { pattern, content_type }
}

const fn masked(mask: &'static [u8], pattern: &'static [u8], content_type: &'static str) -> Signature {
    Signature::Masked {
        mask,
        pattern,
        skip_ws: false,
        content_type,
    }
}

static SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_ws: true,
        content_type: "text/xml; charset=utf-8",
    },
    exact(b"%PDF-", "application/pdf"),
    exact(b"%!PS-Adobe-", "application/postscript"),
    // UTF BOMs
    masked(b"\xFF\xFF\x00\x00", b"\xFE\xFF\x00\x00", "text/plain; charset=utf-16be"),
    masked(b"\xFF\xFF\x00\x00", b"\xFF\xFE\x00\x00", "text/plain; charset=utf-16le"),
    masked(b"\xFF\xFF\xFF\x00", b"\xEF\xBB\xBF\x00", TEXT_UTF8),
    // Images
    exact(b"\x00\x00\x01\x00", "image/x-icon"),
    exact(b"\x00\x00\x02\x00", "image/x-icon"),
    exact(b"BM", "image/bmp"),
    exact(b"GIF87a", "image/gif"),
    exact(b"GIF89a", "image/gif"),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WEBPVP",
        "image/webp",
    ),
    exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // Audio and video
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"FORM\x00\x00\x00\x00AIFF",
        "audio/aiff",
    ),
    masked(b"\xFF\xFF\xFF", b"ID3", "audio/mpeg"),
    masked(b"\xFF\xFF\xFF\xFF\xFF", b"OggS\x00", "application/ogg"),
    masked(
        b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        b"MThd\x00\x00\x00\x06",
        "audio/midi",
    ),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00AVI ",
        "video/avi",
    ),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WAVE",
        "audio/wave",
    ),
    Signature::Mp4,
    exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    // Fonts
    masked(
        // 34 bytes ignored, then "LP"
        b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\xFF\xFF",
        b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00LP",
        "application/vnd.ms-fontobject",
    ),
    exact(b"\x00\x01\x00\x00", "font/ttf"),
    exact(b"OTTO", "font/otf"),
    exact(b"ttcf", "font/collection"),
    exact(b"wOFF", "font/woff"),
    exact(b"wOF2", "font/woff2"),
    // Archives
    exact(b"\x1F\x8B\x08", "application/x-gzip"),
    exact(b"PK\x03\x04", "application/zip"),
    exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    exact(b"\x00\x61\x73\x6D", "application/wasm"),
    Signature::Text,
];

/// Whitespace skipped before HTML and XML signatures
fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

/// Tag-terminating byte that must follow an HTML signature
fn is_tt(b: u8) -> bool {
    matches!(b, b' ' | b'>')
}

/// Bytes that mark content as binary rather than text
fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

fn skip_ws(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|&b| !is_ws(b)).unwrap_or(data.len());
    &data[start..]
}

impl Signature {
    fn matches(&self, data: &[u8]) -> Option<&'static str> {
        match *self {
            Signature::Exact { pattern, content_type } => data.starts_with(pattern).then_some(content_type),
            Signature::Masked {
                mask,
                pattern,
                skip_ws: skip,
                content_type,
            } => {
                let data = if skip { skip_ws(data) } else { data };
                if data.len() < pattern.len() {
                    return None;
                }
                let hit = pattern
                    .iter()
                    .zip(mask)
                    .zip(data)
                    .all(|((&p, &m), &d)| d & m == p);
                hit.then_some(content_type)
            }
            Signature::Html(tag) => {
                let data = skip_ws(data);
                if data.len() < tag.len() + 1 {
                    return None;
                }
                let hit = tag.iter().zip(data).all(|(&t, &d)| {
                    // Fold the data byte to upper case only where the tag expects a letter
                    let d = if t.is_ascii_uppercase() { d & 0xDF } else { d };
                    d == t
                });
                (hit && is_tt(data[tag.len()])).then_some(HTML)
            }
            Signature::Mp4 => is_mp4(data).then_some("video/mp4"),
            Signature::Text => (!data.iter().copied().any(is_binary)).then_some(TEXT_UTF8),
        }
    }
}

/// Checks for an `ftyp` box whose major or compatible brands include `mp4`
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || &data[4..8] != b"ftyp" {
        return false;
    }
    (8..box_size)
        .step_by(4)
        // Offset 12 holds the minor version, not a brand
        .filter(|&offset| offset != 12)
        .any(|offset| &data[offset..offset + 3] == b"mp4")
}

/// Classify `data` and return its MIME type, parameters included.
///
/// Always returns a valid MIME type; when nothing more specific matches the result is
/// [`OCTET_STREAM`].
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    SIGNATURES
        .iter()
        .find_map(|sig| sig.matches(data))
        .unwrap_or(OCTET_STREAM)
}

/// Whether a MIME type is for an image.
pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn detects_png() {
        let mut data = PNG_HEADER.to_vec();
        data.extend_from_slice(b"\x00\x00\x00\x0DIHDR");
        assert_eq!(detect_content_type(&data), "image/png");
    }

    #[test]
    fn detects_bare_png_signature() {
        assert_eq!(detect_content_type(PNG_HEADER), "image/png");
    }

    #[test]
    fn detects_jpeg() {
        assert_eq!(detect_content_type(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F']), "image/jpeg");
    }

    #[test]
    fn detects_gif_variants() {
        assert_eq!(detect_content_type(b"GIF87a\x01\x00"), "image/gif");
        assert_eq!(detect_content_type(b"GIF89a\x01\x00"), "image/gif");
    }

    #[test]
    fn detects_webp() {
        assert_eq!(detect_content_type(b"RIFF\x24\x00\x00\x00WEBPVP8 "), "image/webp");
    }

    #[test]
    fn riff_wave_is_not_an_image() {
        assert_eq!(detect_content_type(b"RIFF\x24\x00\x00\x00WAVEfmt "), "audio/wave");
    }

    #[test]
    fn detects_bmp_and_icon() {
        assert_eq!(detect_content_type(b"BM\x36\x00\x00\x00"), "image/bmp");
        assert_eq!(detect_content_type(b"\x00\x00\x01\x00\x01\x00"), "image/x-icon");
    }

    #[test]
    fn plain_text_is_text() {
        assert_eq!(detect_content_type(b"hello world"), "text/plain; charset=utf-8");
    }

    #[test]
    fn empty_input_is_text() {
        assert_eq!(detect_content_type(b""), "text/plain; charset=utf-8");
    }

    #[test]
    fn binary_garbage_falls_back_to_octet_stream() {
        assert_eq!(detect_content_type(&[0x01, 0x02, 0x03, 0x04, 0x05]), OCTET_STREAM);
    }

    #[test]
    fn html_is_case_insensitive_and_skips_whitespace() {
        assert_eq!(detect_content_type(b"  \n<html><body></body></html>"), "text/html; charset=utf-8");
        assert_eq!(detect_content_type(b"<!doctype html>"), "text/html; charset=utf-8");
    }

    #[test]
    fn html_tag_requires_terminator() {
        // "<Bx" is not a <B> tag, and the content is plain text otherwise
        assert_eq!(detect_content_type(b"<Bxyz"), "text/plain; charset=utf-8");
    }

    #[test]
    fn detects_xml_and_pdf() {
        assert_eq!(detect_content_type(b"\t<?xml version=\"1.0\"?>"), "text/xml; charset=utf-8");
        assert_eq!(detect_content_type(b"%PDF-1.7\n"), "application/pdf");
    }

    #[test]
    fn detects_mp4() {
        let data = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom";
        assert_eq!(detect_content_type(data), "video/mp4");
    }

    #[test]
    fn mp4_minor_version_is_not_a_brand() {
        // Only the minor version slot carries "mp4", so this is not an mp4 file
        let data = b"\x00\x00\x00\x10ftypqt  mp4\x00";
        assert_eq!(detect_content_type(data), OCTET_STREAM);
    }

    #[test]
    fn only_the_sniff_window_is_inspected() {
        let mut data = vec![b'a'; SNIFF_LEN];
        data.push(0x00);
        assert_eq!(detect_content_type(&data), "text/plain; charset=utf-8");
    }

    #[test]
    fn tiff_heif_and_avif_are_not_images() {
        assert_eq!(detect_content_type(b"II*\x00\x08\x00\x00\x00"), OCTET_STREAM);
        assert_eq!(detect_content_type(b"MM\x00*\x00\x00\x00\x08"), OCTET_STREAM);
        assert_eq!(detect_content_type(b"\x00\x00\x00\x18ftypheic\x00\x00\x00\x00mif1heic"), OCTET_STREAM);
        assert_eq!(
            detect_content_type(b"\x00\x00\x00\x1cftypavif\x00\x00\x00\x00avifmif1miaf"),
            OCTET_STREAM
        );
    }

    #[test]
    fn image_prefix_check() {
        assert!(is_image("image/png"));
        assert!(is_image("image/x-icon"));
        assert!(!is_image("text/plain; charset=utf-8"));
        assert!(!is_image(OCTET_STREAM));
    }
}
