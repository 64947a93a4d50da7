pub mod error;
pub mod extractor;
pub mod inference;
pub mod language;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod qa;
pub mod session;
pub mod summarize;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{DocumentError, InferenceError, SessionError};
pub use extractor::{extract_from_bytes, LopdfExtractor, PdfExtractor};
pub use inference::{OllamaClient, TextGenerator, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use language::{detect_language, LanguageDetector, LanguageTag, LinguaDetector};
pub use models::{
    Document, DocumentFingerprint, Generation, GenerationSettings, HighlightCount, LoadedDocument,
    PageText, QaRequest, QaResult, SummaryRequest, SummaryResult, SummaryRun,
};
pub use pipeline::{digest_bytes, DocumentPipeline};
pub use qa::answer_question;
pub use session::{DocumentOverview, Session, SessionSnapshot};
pub use summarize::{summarize_pages, summarize_pages_with_progress, SummaryProgress};
