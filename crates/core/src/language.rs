use lingua::{LanguageDetector as LinguaModel, LanguageDetectorBuilder};
use serde::{Deserialize, Serialize};

/// Best-effort language guess; never fails, ambiguity yields `None`.
pub trait LanguageDetector {
    /// ISO 639-1 code in lower case, or `None` when the sample is undetectable.
    fn detect_code(&self, sample: &str) -> Option<String>;
}

impl<T> LanguageDetector for Box<T>
where
    T: LanguageDetector + ?Sized,
{
    fn detect_code(&self, sample: &str) -> Option<String> {
        (**self).detect_code(sample)
    }
}

pub struct LinguaDetector {
    model: LinguaModel,
}

impl LinguaDetector {
    pub fn new() -> Self {
        Self {
            model: LanguageDetectorBuilder::from_all_languages().build(),
        }
    }
}

impl Default for LinguaDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for LinguaDetector {
    fn detect_code(&self, sample: &str) -> Option<String> {
        if sample.trim().is_empty() {
            return None;
        }

        self.model
            .detect_language_of(sample)
            .map(|language| language.iso_code_639_1().to_string().to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageTag {
    Chinese,
    English,
    Other,
    Unknown,
}

impl LanguageTag {
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            None => Self::Unknown,
            Some(code) if code.starts_with("zh") => Self::Chinese,
            Some("en") => Self::English,
            Some(_) => Self::Other,
        }
    }

    /// Category shown to the user; an unknown language is shown as "Other".
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Chinese => "Chinese",
            Self::English => "English",
            Self::Other | Self::Unknown => "Other",
        }
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

pub fn detect_language<D>(detector: &D, sample: &str) -> (Option<String>, LanguageTag)
where
    D: LanguageDetector + ?Sized,
{
    let code = detector.detect_code(sample);
    let tag = LanguageTag::from_code(code.as_deref());
    (code, tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_display_categories() {
        assert_eq!(LanguageTag::from_code(Some("zh")), LanguageTag::Chinese);
        assert_eq!(LanguageTag::from_code(Some("zh-tw")), LanguageTag::Chinese);
        assert_eq!(LanguageTag::from_code(Some("en")), LanguageTag::English);
        assert_eq!(LanguageTag::from_code(Some("eng")), LanguageTag::Other);
        assert_eq!(LanguageTag::from_code(Some("fr")), LanguageTag::Other);
        assert_eq!(LanguageTag::from_code(None), LanguageTag::Unknown);
    }

    #[test]
    fn unknown_is_displayed_as_other() {
        assert_eq!(LanguageTag::Unknown.display_name(), "Other");
        assert_eq!(LanguageTag::Other.to_string(), "Other");
    }

    #[test]
    fn empty_or_undetectable_sample_is_unknown() {
        let detector = LinguaDetector::new();
        assert_eq!(detect_language(&detector, "").1, LanguageTag::Unknown);
        assert_eq!(detect_language(&detector, "   \n\t").1, LanguageTag::Unknown);
        assert_eq!(detect_language(&detector, "1234 5678 90").1, LanguageTag::Unknown);
    }

    #[test]
    fn chinese_sample_maps_to_chinese() {
        let detector = LinguaDetector::new();
        let (code, tag) = detect_language(&detector, "這是一份關於年度財務報告的文件，內容包含營收與支出的分析。");
        assert_eq!(code.as_deref(), Some("zh"));
        assert_eq!(tag, LanguageTag::Chinese);
        assert_eq!(tag.display_name(), "Chinese");
    }
}
