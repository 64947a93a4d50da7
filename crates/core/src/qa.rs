use crate::error::SessionError;
use crate::inference::TextGenerator;
use crate::models::{Generation, GenerationSettings, LoadedDocument, QaRequest, QaResult};
use crate::prompts::question_prompt;
use tracing::{info, warn};

/// Answers one question against the whole document with a single request.
///
/// Earlier questions and answers are never part of the prompt.
pub async fn answer_question<G>(
    generator: &G,
    settings: &GenerationSettings,
    loaded: &LoadedDocument,
    question: &str,
) -> Result<QaResult, SessionError>
where
    G: TextGenerator + ?Sized,
{
    if question.trim().is_empty() {
        return Err(SessionError::EmptyQuestion);
    }

    let request = QaRequest {
        document_text: loaded.document.full_text(),
        question,
    };
    let prompt = question_prompt(&request, loaded.language);
    info!(
        question_chars = question.len(),
        document_chars = request.document_text.len(),
        model = %settings.model,
        "asking question"
    );

    let answer = Generation::from(generator.generate(&settings.model, &prompt).await);
    if let Generation::Failed { error } = &answer {
        warn!(error = %error, "question failed");
    }

    Ok(QaResult {
        question: question.to_string(),
        answer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageTag;
    use crate::summarize::tests::{loaded, RecordingGenerator};

    #[tokio::test]
    async fn each_question_is_answered_independently() {
        let generator = RecordingGenerator::default();
        let doc = loaded(&["Revenue grew.", "", "Costs fell."], LanguageTag::English);
        let settings = GenerationSettings::default();

        let first = answer_question(&generator, &settings, &doc, "How did revenue change?")
            .await
            .unwrap();
        let second = answer_question(&generator, &settings, &doc, "What about costs?")
            .await
            .unwrap();

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Revenue grew.\n\nCosts fell."));
        assert!(prompts[0].ends_with("How did revenue change?"));
        assert!(!prompts[1].contains("How did revenue change?"));
        assert!(!prompts[1].contains(first.answer.text().unwrap()));
        assert_eq!(second.question, "What about costs?");
    }

    #[tokio::test]
    async fn blank_question_makes_no_request() {
        let generator = RecordingGenerator::default();
        let doc = loaded(&["text"], LanguageTag::English);

        let result =
            answer_question(&generator, &GenerationSettings::default(), &doc, "   ").await;

        assert!(matches!(result, Err(SessionError::EmptyQuestion)));
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_becomes_error_marker() {
        let generator = RecordingGenerator::failing_on("Answer the following question");
        let doc = loaded(&["text"], LanguageTag::English);

        let result = answer_question(&generator, &GenerationSettings::default(), &doc, "Why?")
            .await
            .unwrap();

        assert!(result.answer.is_failed());
    }
}
