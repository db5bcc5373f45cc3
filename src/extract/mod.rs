//! Text-extraction strategies keyed by declared file type.
//!
//! Selection happens before any I/O: an unrecognized type is rejected
//! immediately, while read or parse failures surface the underlying cause.

use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors raised while resolving or running an extraction strategy.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Declared type has no extraction strategy; detected before any I/O.
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    /// Reading the stored bytes failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Storage path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Stored bytes were not valid UTF-8.
    #[error("File is not valid UTF-8: {0}")]
    Decode(String),
    /// Document container could not be parsed.
    #[error("Failed to parse document: {0}")]
    Parse(String),
}

/// Strategy interface: turn a stored file into raw text.
pub trait TextExtractor: Send + Sync {
    /// Read the file at `path` and return its extracted text.
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

struct PdfExtractor;
struct DocxExtractor;
struct PlainTextExtractor;

/// Resolve the extraction strategy for a declared file type
/// (case-insensitive). Returns `None` for unrecognized types.
pub fn extractor_for(file_type: &str) -> Option<&'static dyn TextExtractor> {
    match file_type.to_lowercase().as_str() {
        "pdf" => Some(&PdfExtractor),
        "docx" => Some(&DocxExtractor),
        "txt" | "md" => Some(&PlainTextExtractor),
        _ => None,
    }
}

/// Resolve a strategy and run it.
pub fn extract_text(file_type: &str, path: &Path) -> Result<String, ExtractError> {
    let extractor =
        extractor_for(file_type).ok_or_else(|| ExtractError::UnsupportedType(file_type.into()))?;
    extractor.extract(path)
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        // pdf-extract joins page text with newlines, preserving page order.
        pdf_extract::extract_text(path).map_err(|error| ExtractError::Parse(error.to_string()))
    }
}

impl TextExtractor for DocxExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let file = std::fs::File::open(path).map_err(|source| ExtractError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|error| ExtractError::Parse(error.to_string()))?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|error| ExtractError::Parse(error.to_string()))?
            .read_to_string(&mut xml)
            .map_err(|error| ExtractError::Parse(error.to_string()))?;
        Ok(docx_paragraphs(&xml))
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.display().to_string(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|error| ExtractError::Decode(error.to_string()))
    }
}

/// Concatenate paragraph text from a `word/document.xml` body, one line per
/// `<w:p>` element, in document order.
fn docx_paragraphs(xml: &str) -> String {
    let mut out = String::new();
    for fragment in xml.split("</w:p>") {
        let Some(start) = fragment.find("<w:p") else {
            continue;
        };
        let mut text = String::new();
        let mut rest = &fragment[start..];
        while let Some(open) = rest.find("<w:t") {
            let after = &rest[open + 4..];
            let Some(close) = after.find('>') else {
                break;
            };
            // Self-closing runs carry no text.
            if after[..close].ends_with('/') {
                rest = &after[close + 1..];
                continue;
            }
            let body = &after[close + 1..];
            let Some(end) = body.find("</w:t>") else {
                break;
            };
            text.push_str(&decode_entities(&body[..end]));
            rest = &body[end + 6..];
        }
        out.push_str(&text);
        out.push('\n');
    }
    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn registry_covers_supported_types_case_insensitively() {
        for file_type in ["pdf", "docx", "txt", "md", "PDF", "Md"] {
            assert!(extractor_for(file_type).is_some(), "{file_type}");
        }
        for file_type in ["exe", "png", "doc", ""] {
            assert!(extractor_for(file_type).is_none(), "{file_type}");
        }
    }

    #[test]
    fn unsupported_type_fails_before_touching_storage() {
        let error = extract_text("exe", Path::new("/definitely/missing/file.exe"))
            .expect_err("unsupported type");
        assert!(matches!(error, ExtractError::UnsupportedType(ref t) if t == "exe"));
    }

    #[test]
    fn plain_text_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "alpha\nbeta\ngamma").expect("write");

        let text = extract_text("txt", file.path()).expect("extract");
        assert_eq!(text, "alpha\nbeta\ngamma");
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[0xff, 0xfe, 0x00]).expect("write");

        let error = extract_text("md", file.path()).expect_err("decode failure");
        assert!(matches!(error, ExtractError::Decode(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error =
            extract_text("txt", Path::new("/no/such/file.txt")).expect_err("io failure");
        assert!(matches!(error, ExtractError::Io { .. }));
    }

    #[test]
    fn docx_paragraphs_join_runs_and_decode_entities() {
        let xml = "<w:document><w:body>\
            <w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>\
            <w:p><w:r><w:t>a &amp; b &lt;c&gt;</w:t></w:r></w:p>\
            <w:p/>\
            </w:body></w:document>";
        let text = docx_paragraphs(xml);
        assert_eq!(text, "Hello world\na & b <c>\n\n");
    }

    #[test]
    fn docx_archive_extraction() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let mut writer = zip::ZipWriter::new(file.reopen().expect("reopen"));
        writer
            .start_file("word/document.xml", zip::write::FileOptions::default())
            .expect("start file");
        writer
            .write_all(
                b"<w:document><w:body><w:p><w:r><w:t>Paragraph one</w:t></w:r></w:p>\
                  <w:p><w:r><w:t>Paragraph two</w:t></w:r></w:p></w:body></w:document>",
            )
            .expect("write xml");
        writer.finish().expect("finish zip");

        let text = extract_text("docx", file.path()).expect("extract");
        assert_eq!(text, "Paragraph one\nParagraph two\n");
    }

    #[test]
    fn truncated_docx_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"PK\x03\x04not-really-a-zip").expect("write");

        let error = extract_text("docx", file.path()).expect_err("parse failure");
        assert!(matches!(error, ExtractError::Parse(_)));
    }
}
