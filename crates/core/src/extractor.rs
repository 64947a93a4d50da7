use crate::error::DocumentError;
use crate::models::PageText;
use lopdf::Document;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

pub trait PdfExtractor {
    /// Returns one entry per physical page, in page order.
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, DocumentError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, DocumentError> {
        let mut document =
            Document::load(path).map_err(|error| DocumentError::PdfParse(error.to_string()))?;

        // owner-password-only files open with an empty user password
        if document.is_encrypted() {
            document.decrypt("").map_err(|error| {
                debug!(path = %path.display(), error = %error, "empty user password rejected");
                DocumentError::Encrypted
            })?;
        }

        // get_pages is keyed by page number, so iteration follows physical order
        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = match document.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(error) => {
                    warn!(page = page_no, error = %error, "page text could not be decoded");
                    String::new()
                }
            };

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        debug!(path = %path.display(), pages = pages.len(), "extracted pdf pages");
        Ok(pages)
    }
}

/// Stages `bytes` in a temporary `.pdf` file and extracts it.
///
/// The staged file is removed when this returns, whether or not extraction
/// succeeded. `staging_dir` defaults to the system temp directory.
pub fn extract_from_bytes<E>(
    extractor: &E,
    bytes: &[u8],
    staging_dir: Option<&Path>,
) -> Result<Vec<PageText>, DocumentError>
where
    E: PdfExtractor + ?Sized,
{
    let mut builder = tempfile::Builder::new();
    builder.prefix("pdf-brief-").suffix(".pdf");

    let mut staged = match staging_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    staged.write_all(bytes)?;
    staged.flush()?;

    extractor.extract_pages(staged.path())
}

#[cfg(test)]
mod tests {
    use super::{extract_from_bytes, LopdfExtractor};
    use crate::error::DocumentError;
    use crate::testing::{encrypted_pdf_with_pages, pdf_with_pages};
    use tempfile::tempdir;

    #[test]
    fn extracts_every_page_in_physical_order() -> Result<(), Box<dyn std::error::Error>> {
        let bytes = pdf_with_pages(&["Alpha page", "Bravo page", "Charlie page"]);

        let pages = extract_from_bytes(&LopdfExtractor, &bytes, None)?;

        assert_eq!(pages.len(), 3);
        assert_eq!(
            pages.iter().map(|page| page.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(pages[0].text.contains("Alpha"));
        assert!(pages[1].text.contains("Bravo"));
        assert!(pages[2].text.contains("Charlie"));
        Ok(())
    }

    #[test]
    fn blank_pages_are_kept_as_empty_text() -> Result<(), Box<dyn std::error::Error>> {
        let bytes = pdf_with_pages(&["Intro", "", "Outro"]);

        let pages = extract_from_bytes(&LopdfExtractor, &bytes, None)?;

        assert_eq!(pages.len(), 3);
        assert!(pages[1].is_blank());
        Ok(())
    }

    #[test]
    fn corrupt_bytes_fail_without_partial_result() {
        let result = extract_from_bytes(&LopdfExtractor, b"%PDF-1.4\n%broken", None);
        assert!(matches!(result, Err(DocumentError::PdfParse(_))));
    }

    #[test]
    fn staged_file_is_removed_on_success_and_failure() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;

        let bytes = pdf_with_pages(&["Only page"]);
        extract_from_bytes(&LopdfExtractor, &bytes, Some(dir.path()))?;
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);

        let failed = extract_from_bytes(&LopdfExtractor, b"not a pdf", Some(dir.path()));
        assert!(failed.is_err());
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn empty_user_password_pdf_is_readable() -> Result<(), Box<dyn std::error::Error>> {
        let bytes = encrypted_pdf_with_pages(&["Secret page text", "Second sheet"], "");

        let pages = extract_from_bytes(&LopdfExtractor, &bytes, None)?;

        assert_eq!(pages.len(), 2);
        assert!(pages[0].text.contains("Secret page text"));
        assert!(pages[1].text.contains("Second sheet"));
        Ok(())
    }

    #[test]
    fn password_protected_pdf_is_rejected_and_not_left_on_disk(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let bytes = encrypted_pdf_with_pages(&["Locked page"], "hunter2");

        let result = extract_from_bytes(&LopdfExtractor, &bytes, Some(dir.path()));

        assert!(matches!(result, Err(DocumentError::Encrypted)));
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }
}
