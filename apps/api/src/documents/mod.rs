//! Document loading: turns uploaded bytes into raw resume text.
//!
//! PDF goes through `pdf-extract`; plain text is decoded as lossy UTF-8. Word
//! documents are rejected explicitly rather than read as garbage.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document is {bytes} bytes, the maximum is {max}")]
    SizeExceeded { bytes: usize, max: usize },

    #[error("text extraction failed: {0}")]
    Extraction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Resolves the format from a file extension, case-insensitively.
    pub fn from_file_name(name: &str) -> Result<Self, LoadError> {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .ok_or_else(|| LoadError::UnsupportedFormat(format!("'{name}' has no extension")))?;
        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "txt" | "text" | "md" => Ok(DocumentFormat::PlainText),
            other => Err(LoadError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    /// Resolves the format from a MIME type, ignoring parameters such as `charset`.
    pub fn from_content_type(content_type: &str) -> Result<Self, LoadError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Ok(DocumentFormat::Pdf),
            "text/plain" | "text/markdown" => Ok(DocumentFormat::PlainText),
            other => Err(LoadError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Extension first, MIME type as fallback; generic binary types are ignored.
    pub fn detect(file_name: Option<&str>, content_type: Option<&str>) -> Result<Self, LoadError> {
        let by_name = file_name.map(Self::from_file_name);
        match (by_name, content_type) {
            (Some(Ok(format)), _) => Ok(format),
            (Some(Err(e)), None) => Err(e),
            (Some(Err(e)), Some(ct)) if ct.starts_with("application/octet-stream") => Err(e),
            (_, Some(ct)) => Self::from_content_type(ct),
            (None, None) => Err(LoadError::UnsupportedFormat("unknown".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DocumentLoader {
    max_bytes: usize,
}

impl DocumentLoader {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Both the upload and the extracted text must fit within `max_bytes`.
    pub fn load(&self, bytes: &[u8], format: DocumentFormat) -> Result<String, LoadError> {
        self.check_size(bytes.len())?;
        let text = match format {
            DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| LoadError::Extraction(e.to_string()))?,
            DocumentFormat::PlainText => String::from_utf8_lossy(bytes).into_owned(),
        };
        self.check_size(text.len())?;
        debug!(?format, bytes = bytes.len(), chars = text.chars().count(), "document loaded");
        Ok(text)
    }

    fn check_size(&self, bytes: usize) -> Result<(), LoadError> {
        if bytes > self.max_bytes {
            return Err(LoadError::SizeExceeded {
                bytes,
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(DocumentFormat::from_file_name("cv.PDF"), Ok(DocumentFormat::Pdf));
        assert_eq!(
            DocumentFormat::from_file_name("jane.doe.txt"),
            Ok(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_file_name("notes.md"),
            Ok(DocumentFormat::PlainText)
        );
        assert!(matches!(
            DocumentFormat::from_file_name("cv.docx"),
            Err(LoadError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            DocumentFormat::from_file_name("README"),
            Err(LoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_from_content_type() {
        assert_eq!(
            DocumentFormat::from_content_type("text/plain; charset=utf-8"),
            Ok(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_content_type("application/pdf"),
            Ok(DocumentFormat::Pdf)
        );
        assert!(DocumentFormat::from_content_type(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        )
        .is_err());
    }

    #[test]
    fn test_detect_prefers_extension() {
        assert_eq!(
            DocumentFormat::detect(Some("a.txt"), Some("application/pdf")),
            Ok(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::detect(Some("upload"), Some("application/pdf")),
            Ok(DocumentFormat::Pdf)
        );
        assert!(DocumentFormat::detect(Some("a.docx"), Some("application/octet-stream")).is_err());
        assert!(DocumentFormat::detect(None, None).is_err());
    }

    #[test]
    fn test_plain_text_is_lossy_utf8() {
        let loader = DocumentLoader::new(64);
        let text = loader
            .load(&[b'R', b'u', b's', b't', 0xff], DocumentFormat::PlainText)
            .unwrap();
        assert!(text.starts_with("Rust"));
        assert!(text.ends_with('\u{fffd}'));
    }

    #[test]
    fn test_size_limit() {
        let loader = DocumentLoader::new(4);
        assert_eq!(
            loader.load(b"12345", DocumentFormat::PlainText),
            Err(LoadError::SizeExceeded { bytes: 5, max: 4 })
        );
        assert_eq!(loader.load(b"1234", DocumentFormat::PlainText), Ok("1234".to_string()));
    }

    #[test]
    fn test_invalid_pdf_is_an_extraction_error() {
        let loader = DocumentLoader::new(1024);
        assert!(matches!(
            loader.load(b"not a pdf", DocumentFormat::Pdf),
            Err(LoadError::Extraction(_))
        ));
    }
}
