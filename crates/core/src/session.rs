use crate::error::{DocumentError, SessionError};
use crate::extractor::PdfExtractor;
use crate::inference::TextGenerator;
use crate::language::{LanguageDetector, LanguageTag};
use crate::models::{HighlightCount, LoadedDocument, QaResult, SummaryRun};
use crate::pipeline::DocumentPipeline;
use crate::summarize::SummaryProgress;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// One user's document, highlight count and everything shown so far. Each
/// handler is one user action and runs to completion before the next.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    loaded: Option<LoadedDocument>,
    highlights: HighlightCount,
    summary_runs: Vec<SummaryRun>,
    answers: Vec<QaResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOverview {
    pub file_name: Option<String>,
    pub checksum: String,
    pub page_count: usize,
    pub language_code: Option<String>,
    pub language: LanguageTag,
    pub language_display: &'static str,
}

impl From<&LoadedDocument> for DocumentOverview {
    fn from(loaded: &LoadedDocument) -> Self {
        Self {
            file_name: loaded.document.fingerprint.file_name.clone(),
            checksum: loaded.document.fingerprint.checksum.clone(),
            page_count: loaded.document.page_count(),
            language_code: loaded.language_code.clone(),
            language: loaded.language,
            language_display: loaded.language.display_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub document: Option<DocumentOverview>,
    pub highlights: HighlightCount,
    pub summary_runs: Vec<SummaryRun>,
    pub answers: Vec<QaResult>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            loaded: None,
            highlights: HighlightCount::default(),
            summary_runs: Vec::new(),
            answers: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn loaded(&self) -> Option<&LoadedDocument> {
        self.loaded.as_ref()
    }

    pub fn highlights(&self) -> HighlightCount {
        self.highlights
    }

    pub fn summary_runs(&self) -> &[SummaryRun] {
        &self.summary_runs
    }

    pub fn answers(&self) -> &[QaResult] {
        &self.answers
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            document: self.loaded.as_ref().map(DocumentOverview::from),
            highlights: self.highlights,
            summary_runs: self.summary_runs.clone(),
            answers: self.answers.clone(),
        }
    }

    /// Parses `bytes` and replaces the current document.
    pub fn document_uploaded<E, D, G>(
        &mut self,
        pipeline: &DocumentPipeline<E, D, G>,
        bytes: &[u8],
        file_name: Option<&str>,
    ) -> Result<DocumentOverview, SessionError>
    where
        E: PdfExtractor,
        D: LanguageDetector,
        G: TextGenerator,
    {
        self.document_loaded(pipeline.load(bytes, file_name))
    }

    /// Applies the outcome of a load that ran elsewhere (e.g. a blocking worker).
    ///
    /// Any upload discards the previous document and everything shown for it;
    /// a failed upload leaves the session without a document.
    pub fn document_loaded(
        &mut self,
        outcome: Result<LoadedDocument, DocumentError>,
    ) -> Result<DocumentOverview, SessionError> {
        self.loaded = None;
        self.summary_runs.clear();
        self.answers.clear();

        match outcome {
            Ok(loaded) => {
                let overview = DocumentOverview::from(&loaded);
                self.loaded = Some(loaded);
                Ok(overview)
            }
            Err(error) => {
                warn!(session = %self.id, error = %error, "upload rejected");
                Err(error.into())
            }
        }
    }

    pub fn highlight_count_changed(&mut self, value: i64) -> Result<HighlightCount, SessionError> {
        let highlights = HighlightCount::new(value)?;
        self.highlights = highlights;
        Ok(highlights)
    }

    pub async fn summarize_requested<E, D, G>(
        &mut self,
        pipeline: &DocumentPipeline<E, D, G>,
    ) -> Result<&SummaryRun, SessionError>
    where
        E: PdfExtractor,
        D: LanguageDetector,
        G: TextGenerator,
    {
        self.summarize_requested_with_progress(pipeline, &()).await
    }

    /// Like [`Session::summarize_requested`], reporting each page to `progress`
    /// while the run is still going.
    pub async fn summarize_requested_with_progress<E, D, G, P>(
        &mut self,
        pipeline: &DocumentPipeline<E, D, G>,
        progress: &P,
    ) -> Result<&SummaryRun, SessionError>
    where
        E: PdfExtractor,
        D: LanguageDetector,
        G: TextGenerator,
        P: SummaryProgress + ?Sized,
    {
        let loaded = self.loaded.as_ref().ok_or(SessionError::NoDocument)?;
        let run = pipeline
            .summarize_with_progress(loaded, self.highlights, progress)
            .await;
        info!(
            session = %self.id,
            results = run.results.len(),
            failed = run.failed_pages(),
            "summary run finished"
        );

        self.summary_runs.push(run);
        Ok(&self.summary_runs[self.summary_runs.len() - 1])
    }

    pub async fn question_asked<E, D, G>(
        &mut self,
        pipeline: &DocumentPipeline<E, D, G>,
        question: &str,
    ) -> Result<&QaResult, SessionError>
    where
        E: PdfExtractor,
        D: LanguageDetector,
        G: TextGenerator,
    {
        let loaded = self.loaded.as_ref().ok_or(SessionError::NoDocument)?;
        let answer = pipeline.ask(loaded, question).await?;

        self.answers.push(answer);
        Ok(&self.answers[self.answers.len() - 1])
    }
}
