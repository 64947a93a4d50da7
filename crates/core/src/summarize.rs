use crate::inference::TextGenerator;
use crate::language::LanguageTag;
use crate::models::{
    Generation, GenerationSettings, HighlightCount, LoadedDocument, PageText, SummaryRequest,
    SummaryResult, SummaryRun,
};
use crate::prompts::summary_prompt;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Observer for a summary run that is still in progress.
///
/// `position` counts non-blank pages from 1; `total` is how many of them the
/// run will request.
pub trait SummaryProgress: Send + Sync {
    fn page_started(&self, _page: u32, _position: usize, _total: usize) {}

    fn page_finished(&self, _result: &SummaryResult) {}
}

impl SummaryProgress for () {}

/// Summarizes every non-blank page of `loaded`, one request per page.
///
/// Blank pages are skipped without a request. A failed page is recorded as
/// `Generation::Failed` and the run moves on to the next page. Results always
/// come back in page order, whatever `max_in_flight` allows.
pub async fn summarize_pages<G>(
    generator: &G,
    settings: &GenerationSettings,
    loaded: &LoadedDocument,
    highlights: HighlightCount,
) -> SummaryRun
where
    G: TextGenerator + ?Sized,
{
    summarize_pages_with_progress(generator, settings, loaded, highlights, &()).await
}

pub async fn summarize_pages_with_progress<G, P>(
    generator: &G,
    settings: &GenerationSettings,
    loaded: &LoadedDocument,
    highlights: HighlightCount,
    progress: &P,
) -> SummaryRun
where
    G: TextGenerator + ?Sized,
    P: SummaryProgress + ?Sized,
{
    let language = loaded.language;
    let pending = loaded
        .document
        .pages
        .iter()
        .filter(|page| !page.is_blank())
        .collect::<Vec<_>>();
    let total = pending.len();

    info!(
        pages = total,
        skipped = loaded.document.page_count() - total,
        highlights = highlights.get(),
        model = %settings.model,
        "starting page summaries"
    );

    // collected first: a stream that maps over borrowed pages is not Send
    let requests = pending
        .into_iter()
        .enumerate()
        .map(|(index, page)| {
            let job = PageJob {
                page,
                highlights,
                language,
                position: index + 1,
                total,
            };
            summarize_page(generator, settings, job, progress)
        })
        .collect::<Vec<_>>();

    let results = stream::iter(requests)
        .buffered(settings.max_in_flight.max(1))
        .collect::<Vec<_>>()
        .await;

    SummaryRun {
        highlights,
        language,
        results,
        completed_at: Utc::now(),
    }
}

struct PageJob<'a> {
    page: &'a PageText,
    highlights: HighlightCount,
    language: LanguageTag,
    position: usize,
    total: usize,
}

async fn summarize_page<G, P>(
    generator: &G,
    settings: &GenerationSettings,
    job: PageJob<'_>,
    progress: &P,
) -> SummaryResult
where
    G: TextGenerator + ?Sized,
    P: SummaryProgress + ?Sized,
{
    let PageJob {
        page,
        highlights,
        language,
        position,
        total,
    } = job;

    progress.page_started(page.number, position, total);
    let prompt = summary_prompt(&SummaryRequest { page, highlights }, language);
    debug!(
        page = page.number,
        position,
        total,
        prompt_chars = prompt.len(),
        "requesting page summary"
    );

    let generation = Generation::from(generator.generate(&settings.model, &prompt).await);
    if let Generation::Failed { error } = &generation {
        warn!(page = page.number, error = %error, "page summary failed");
    }

    let result = SummaryResult {
        page_number: page.number,
        generation,
    };
    progress.page_finished(&result);
    result
}
