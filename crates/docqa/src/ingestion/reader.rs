//! Plain-text extraction for uploaded documents

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Declared document format, taken from the upload's file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Txt,
}

impl DocumentFormat {
    /// Resolve the format from a filename (case-insensitive extension)
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Txt),
            "" => Err(Error::UnsupportedFileType(format!(
                "'{}' has no extension; only .pdf and .txt are supported",
                filename
            ))),
            other => Err(Error::UnsupportedFileType(format!(
                ".{} (only .pdf and .txt are supported)",
                other
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Reads stored documents back as plain text
pub struct DocumentReader;

impl DocumentReader {
    /// Read the document at `path` as text
    pub fn read_text(path: &Path, format: DocumentFormat) -> Result<String> {
        match format {
            DocumentFormat::Txt => Self::read_txt(path),
            DocumentFormat::Pdf => Self::read_pdf(path),
        }
    }

    fn read_txt(path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            Error::file_parse(display_name(path), format!("not valid UTF-8: {}", e))
        })
    }

    fn read_pdf(path: &Path) -> Result<String> {
        let doc = lopdf::Document::load(path).map_err(|e| {
            Error::file_parse(display_name(path), format!("Failed to load PDF: {}", e))
        })?;

        let pages = doc.get_pages();
        tracing::debug!("Extracting text from {} PDF pages", pages.len());

        let text = join_pages(pages.keys().map(|&page_number| {
            (page_number, doc.extract_text(&[page_number]).map_err(|e| e.to_string()))
        }));

        Ok(text)
    }
}

/// Join per-page extraction results; a failed page contributes an empty string
fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = (u32, std::result::Result<String, String>)>,
{
    pages
        .into_iter()
        .map(|(page_number, result)| match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Could not extract text from page {}: {}", page_number, e);
                String::new()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(DocumentFormat::from_filename("a.pdf").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_filename("A.TXT").unwrap(), DocumentFormat::Txt);
        assert_eq!(DocumentFormat::from_filename("notes.v2.txt").unwrap(), DocumentFormat::Txt);
        assert!(matches!(
            DocumentFormat::from_filename("report.docx"),
            Err(Error::UnsupportedFileType(_))
        ));
        assert!(matches!(
            DocumentFormat::from_filename("README"),
            Err(Error::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_read_txt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "alpha beta\ngamma").unwrap();
        let text = DocumentReader::read_text(&path, DocumentFormat::Txt).unwrap();
        assert_eq!(text, "alpha beta\ngamma");
    }

    #[test]
    fn test_read_txt_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            DocumentReader::read_text(&path, DocumentFormat::Txt),
            Err(Error::FileParse { .. })
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        assert!(matches!(
            DocumentReader::read_text(&path, DocumentFormat::Txt),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_unparseable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();
        assert!(matches!(
            DocumentReader::read_text(&path, DocumentFormat::Pdf),
            Err(Error::FileParse { .. })
        ));
    }

    #[test]
    fn test_failed_page_becomes_empty() {
        let text = join_pages(vec![
            (1, Ok("first page".to_string())),
            (2, Err("bad font".to_string())),
            (3, Ok("third page".to_string())),
        ]);
        assert_eq!(text, "first page\n\nthird page");
    }
}
