use crate::error::{DocumentError, SessionError};
use crate::extractor::{extract_from_bytes, PdfExtractor};
use crate::inference::TextGenerator;
use crate::language::{detect_language, LanguageDetector};
use crate::models::{
    Document, DocumentFingerprint, GenerationSettings, HighlightCount, LoadedDocument, QaResult,
    SummaryRun,
};
use crate::summarize::{self, SummaryProgress};
use crate::qa;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::info;

/// Extraction, detection and generation wired together for one deployment.
pub struct DocumentPipeline<E, D, G> {
    extractor: E,
    detector: D,
    generator: G,
    settings: GenerationSettings,
    staging_dir: Option<PathBuf>,
}

impl<E, D, G> DocumentPipeline<E, D, G>
where
    E: PdfExtractor,
    D: LanguageDetector,
    G: TextGenerator,
{
    pub fn new(extractor: E, detector: D, generator: G, settings: GenerationSettings) -> Self {
        Self {
            extractor,
            detector,
            generator,
            settings,
            staging_dir: None,
        }
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Parses uploaded bytes and tags the language. CPU-bound; call it off the
    /// async executor.
    pub fn load(&self, bytes: &[u8], file_name: Option<&str>) -> Result<LoadedDocument, DocumentError> {
        let fingerprint = DocumentFingerprint {
            file_name: file_name.map(str::to_string),
            checksum: digest_bytes(bytes),
            byte_len: bytes.len(),
            uploaded_at: Utc::now(),
        };

        let pages = extract_from_bytes(&self.extractor, bytes, self.staging_dir.as_deref())?;
        let document = Document { fingerprint, pages };
        let (language_code, language) = detect_language(&self.detector, &document.language_sample());

        info!(
            file_name = file_name.unwrap_or("<unnamed>"),
            pages = document.page_count(),
            language = language_code.as_deref().unwrap_or("unknown"),
            checksum = %document.fingerprint.checksum,
            "document loaded"
        );

        Ok(LoadedDocument {
            document,
            language_code,
            language,
        })
    }

    pub async fn summarize(&self, loaded: &LoadedDocument, highlights: HighlightCount) -> SummaryRun {
        self.summarize_with_progress(loaded, highlights, &()).await
    }

    pub async fn summarize_with_progress<P>(
        &self,
        loaded: &LoadedDocument,
        highlights: HighlightCount,
        progress: &P,
    ) -> SummaryRun
    where
        P: SummaryProgress + ?Sized,
    {
        summarize::summarize_pages_with_progress(
            &self.generator,
            &self.settings,
            loaded,
            highlights,
            progress,
        )
        .await
    }

    pub async fn ask(&self, loaded: &LoadedDocument, question: &str) -> Result<QaResult, SessionError> {
        qa::answer_question(&self.generator, &self.settings, loaded, question).await
    }
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::pdf_with_pages;
    use crate::extractor::LopdfExtractor;
    use crate::language::LanguageTag;
    use crate::summarize::tests::RecordingGenerator;

    struct FixedDetector(Option<&'static str>);

    impl LanguageDetector for FixedDetector {
        fn detect_code(&self, _sample: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn pipeline(code: Option<&'static str>) -> DocumentPipeline<LopdfExtractor, FixedDetector, RecordingGenerator> {
        DocumentPipeline::new(
            LopdfExtractor,
            FixedDetector(code),
            RecordingGenerator::default(),
            GenerationSettings::default(),
        )
    }

    #[test]
    fn load_builds_fingerprint_and_language() -> Result<(), Box<dyn std::error::Error>> {
        let bytes = pdf_with_pages(&["Quarterly report", "Appendix"]);

        let loaded = pipeline(Some("en")).load(&bytes, Some("report.pdf"))?;

        assert_eq!(loaded.document.page_count(), 2);
        assert_eq!(loaded.document.fingerprint.file_name.as_deref(), Some("report.pdf"));
        assert_eq!(loaded.document.fingerprint.byte_len, bytes.len());
        assert_eq!(loaded.document.fingerprint.checksum, digest_bytes(&bytes));
        assert_eq!(loaded.language, LanguageTag::English);
        Ok(())
    }

    #[test]
    fn undetectable_language_is_unknown() -> Result<(), Box<dyn std::error::Error>> {
        let bytes = pdf_with_pages(&["12345"]);

        let loaded = pipeline(None).load(&bytes, None)?;

        assert_eq!(loaded.language_code, None);
        assert_eq!(loaded.language, LanguageTag::Unknown);
        assert_eq!(loaded.language.display_name(), "Other");
        Ok(())
    }

    #[test]
    fn invalid_pdf_is_a_parse_error() {
        let result = pipeline(Some("en")).load(b"definitely not a pdf", Some("broken.pdf"));
        assert!(matches!(result, Err(DocumentError::PdfParse(_))));
    }

    #[test]
    fn staging_dir_is_left_empty() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let pipeline = pipeline(Some("en")).with_staging_dir(dir.path());

        pipeline.load(&pdf_with_pages(&["Kept"]), None)?;
        assert!(pipeline.load(b"broken", None).is_err());

        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn digest_is_reproducible() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }
}
