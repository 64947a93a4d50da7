use crate::language::LanguageTag;
use crate::models::{QaRequest, SummaryRequest};

/// Page summary prompt. Page text is embedded verbatim.
pub fn summary_prompt(request: &SummaryRequest<'_>, language: LanguageTag) -> String {
    let count = request.highlights;
    let page = request.page.number;
    let text = &request.page.text;

    match language {
        LanguageTag::Chinese => {
            format!("請用 {count} 個重點摘要以下 PDF 第 {page} 頁內容：\n\n{text}")
        }
        _ => format!(
            "Summarize the following content of page {page} of the PDF in {count} key points:\n\n{text}"
        ),
    }
}

pub fn question_prompt(request: &QaRequest<'_>, language: LanguageTag) -> String {
    let document = &request.document_text;
    let question = request.question;

    match language {
        LanguageTag::Chinese => {
            format!("這是 PDF 文件全文：\n\n{document}\n\n根據這份內容，回答以下問題：{question}")
        }
        _ => format!(
            "Here is the full document:\n\n{document}\n\nAnswer the following question based on this content: {question}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HighlightCount, PageText};

    fn page() -> PageText {
        PageText {
            number: 4,
            text: "  Raw text\nwith  spacing ".to_string(),
        }
    }

    #[test]
    fn summary_prompt_embeds_count_page_and_raw_text() {
        let page = page();
        let request = SummaryRequest {
            page: &page,
            highlights: HighlightCount::new(7).unwrap(),
        };

        let prompt = summary_prompt(&request, LanguageTag::English);

        assert!(prompt.contains("in 7 key points"));
        assert!(prompt.contains("page 4"));
        assert!(prompt.ends_with("  Raw text\nwith  spacing "));
    }

    #[test]
    fn chinese_documents_get_chinese_register() {
        let page = page();
        let request = SummaryRequest {
            page: &page,
            highlights: HighlightCount::default(),
        };

        let prompt = summary_prompt(&request, LanguageTag::Chinese);

        assert!(prompt.starts_with("請用 5 個重點摘要以下 PDF 第 4 頁內容"));
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let request = QaRequest {
            document_text: "body".to_string(),
            question: "What is it?",
        };

        let prompt = question_prompt(&request, LanguageTag::Unknown);

        assert_eq!(
            prompt,
            "Here is the full document:\n\nbody\n\nAnswer the following question based on this content: What is it?"
        );
    }
}
