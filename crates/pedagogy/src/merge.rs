//! Merge a generated material payload with an independently generated item
//! bank, sanitizing every item on the way.
//!
//! Sanitization runs in a fixed order per item:
//! 1. true/false answers are normalized through a synonym table
//! 2. choice options are cleaned (bare letters, leaked answer metadata and
//!    letter prefixes removed), with recovery from the stem when nothing is left
//! 3. non-choice items lose their `options`
//!
//! Items that cannot be salvaged are dropped and reported in
//! [`LearningContent::rejected`]. The requested question count is a ceiling.

use std::fmt;

use edupilot_config::SanitizerConfig;
use edupilot_core::GenerationOutput;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TRUE_TOKENS: &[&str] = &[
    "true", "t", "yes", "y", "1", "right", "correct", "对", "正确", "是", "是的", "√", "✓", "✔",
];

const FALSE_TOKENS: &[&str] = &[
    "false", "f", "no", "n", "0", "wrong", "incorrect", "错", "错误", "不对", "不正确", "否",
    "×", "✗", "✘", "x",
];

// Lowercased fragments that mark an option as leaked answer metadata.
const LEAKAGE_MARKERS: &[&str] = &[
    "正确答案", "答案：", "答案:", "解析", "知识点", "answer:", "explanation", "knowledge_point",
    "correct answer",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    FillBlank,
    ShortAnswer,
}

impl ItemType {
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultipleChoice)
    }

    /// Parse the type labels generators tend to emit.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "single_choice" | "choice" | "single" | "mcq" | "选择题" | "单选题" => {
                Some(Self::SingleChoice)
            }
            "multiple_choice" | "multi_choice" | "multiple" | "多选题" => Some(Self::MultipleChoice),
            "true_false" | "truefalse" | "boolean" | "judge" | "判断题" => Some(Self::TrueFalse),
            "fill_blank" | "fill_in_blank" | "fill_in_the_blank" | "blank" | "填空题" => {
                Some(Self::FillBlank)
            }
            "short_answer" | "open" | "问答题" | "简答题" => Some(Self::ShortAnswer),
            _ => None,
        }
    }
}

/// One sanitized practice item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub stem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_point: Option<String>,
}

impl QuizItem {
    /// Every piece of child-facing text in the item.
    pub fn visible_text(&self) -> String {
        let mut text = self.stem.clone();
        for part in self.options.iter().flatten().chain(self.explanation.iter()) {
            text.push('\n');
            text.push_str(part);
        }
        text
    }
}

/// Why an item was removed from the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    NotAnObject,
    EmptyStem,
    AmbiguousBooleanAnswer(String),
    NoValidOptions,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("item is not an object"),
            Self::EmptyStem => f.write_str("item has no stem"),
            Self::AmbiguousBooleanAnswer(raw) => write!(f, "ambiguous true/false answer '{raw}'"),
            Self::NoValidOptions => f.write_str("no usable options after cleaning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedItem {
    pub index: usize,
    pub reason: RejectReason,
}

/// Material plus its sanitized item bank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningContent {
    pub analysis: String,
    pub material: Value,
    pub items: Vec<QuizItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedItem>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer {
    strict_boolean: bool,
}

impl Sanitizer {
    pub fn new(strict_boolean: bool) -> Self {
        Self { strict_boolean }
    }

    pub fn from_config(config: &SanitizerConfig) -> Self {
        Self::new(config.strict_boolean)
    }

    /// Merge the material phase with the item-bank phase.
    ///
    /// The bank's items win; the material phase's items are only used when
    /// the bank came back empty.
    pub fn merge(
        &self,
        material: GenerationOutput,
        bank: GenerationOutput,
        question_count: u32,
    ) -> LearningContent {
        let analysis = if material.analysis.trim().is_empty() {
            bank.analysis
        } else {
            material.analysis
        };
        let raw_items = if bank.items.is_empty() {
            material.items
        } else {
            bank.items
        };

        let mut content = LearningContent {
            analysis,
            material: material.material,
            items: Vec::new(),
            rejected: Vec::new(),
        };
        for (index, raw) in raw_items.iter().enumerate() {
            match self.sanitize_item(raw, index) {
                Ok(item) => content.items.push(item),
                Err(reason) => {
                    tracing::debug!(index, %reason, "Dropping generated item");
                    content.rejected.push(RejectedItem { index, reason });
                }
            }
        }
        content.items.truncate(question_count as usize);
        content
    }

    /// Sanitize one raw generated item.
    pub fn sanitize_item(&self, raw: &Value, index: usize) -> Result<QuizItem, RejectReason> {
        let obj = raw.as_object().ok_or(RejectReason::NotAnObject)?;

        let stem = field(obj, &["stem", "question", "content"]).unwrap_or_default();
        if stem.is_empty() {
            return Err(RejectReason::EmptyStem);
        }
        let raw_options = ["options", "choices"]
            .iter()
            .find_map(|n| obj.get(*n))
            .map(option_texts)
            .unwrap_or_default();

        let item_type = field(obj, &["type", "item_type", "question_type"])
            .and_then(|t| ItemType::parse_loose(&t))
            .unwrap_or(if raw_options.is_empty() {
                ItemType::ShortAnswer
            } else {
                ItemType::SingleChoice
            });

        let mut answer = field(obj, &["answer", "correct_answer"]).unwrap_or_default();
        if item_type == ItemType::TrueFalse {
            answer = self.normalize_boolean(&answer)?.to_string();
        }

        let options = if item_type.is_choice() {
            let mut cleaned = clean_options(&raw_options);
            if cleaned.is_empty() {
                cleaned = recover_options_from_stem(&stem);
            }
            if cleaned.is_empty() {
                return Err(RejectReason::NoValidOptions);
            }
            Some(cleaned)
        } else {
            None
        };

        Ok(QuizItem {
            id: field(obj, &["id"]).unwrap_or_else(|| format!("item-{}", index + 1)),
            item_type,
            stem,
            options,
            answer,
            explanation: field(obj, &["explanation", "analysis"]).filter(|s| !s.is_empty()),
            knowledge_point: field(obj, &["knowledge_point", "knowledgePoint"]).filter(|s| !s.is_empty()),
        })
    }

    /// Map a true/false answer onto `"True"` or `"False"`.
    pub fn normalize_boolean(&self, raw: &str) -> Result<&'static str, RejectReason> {
        match parse_boolean(raw) {
            Some(true) => Ok("True"),
            Some(false) => Ok("False"),
            None if self.strict_boolean => Err(RejectReason::AmbiguousBooleanAnswer(raw.to_string())),
            None => {
                tracing::warn!(answer = raw, "Ambiguous true/false answer, defaulting to True");
                Ok("True")
            }
        }
    }
}

/// Exact synonym match after trimming; negatives are checked first so that
/// "不对" never matches through "对".
pub fn parse_boolean(raw: &str) -> Option<bool> {
    let token = raw
        .trim()
        .trim_matches(|c: char| c.is_whitespace() || ".。!！".contains(c))
        .to_lowercase();
    if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else {
        None
    }
}

/// Strip bare letters, leaked metadata, and letter prefixes from options.
pub fn clean_options(options: &[String]) -> Vec<String> {
    options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty() && !is_bare_letter(o) && !is_leakage(o))
        .map(|o| strip_letter_prefix(o).trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Recover `A. x  B. y` style options embedded in a stem.
pub fn recover_options_from_stem(stem: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = stem.char_indices().collect();
    let mut markers: Vec<(usize, usize)> = Vec::new(); // (marker start, text start)
    let mut expected = 'A';

    for (i, &(pos, ch)) in chars.iter().enumerate() {
        if ch != expected {
            continue;
        }
        let at_boundary = i == 0 || chars[i - 1].1.is_whitespace() || "(（".contains(chars[i - 1].1);
        let Some(&(sep_pos, sep)) = chars.get(i + 1) else {
            continue;
        };
        if at_boundary && is_option_separator(sep) {
            markers.push((pos, sep_pos + sep.len_utf8()));
            expected = char::from(expected as u8 + 1);
        }
    }
    if markers.len() < 2 {
        return Vec::new();
    }

    markers
        .iter()
        .enumerate()
        .map(|(n, &(_, text_start))| {
            let end = markers.get(n + 1).map(|&(start, _)| start).unwrap_or(stem.len());
            stem[text_start..end]
                .trim()
                .trim_end_matches(['(', '（'])
                .trim()
                .to_string()
        })
        .filter(|o| !o.is_empty())
        .collect()
}

fn is_option_separator(c: char) -> bool {
    matches!(c, '.' | '．' | '、' | ')' | '）' | ':' | '：')
}

fn is_bare_letter(option: &str) -> bool {
    let core = option
        .trim_matches(|c: char| c.is_whitespace() || "()（）".contains(c) || is_option_separator(c));
    let mut chars = core.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

fn is_leakage(option: &str) -> bool {
    let lower = option.to_lowercase();
    LEAKAGE_MARKERS.iter().any(|m| lower.contains(m))
}

fn strip_letter_prefix(option: &str) -> &str {
    let rest = option.strip_prefix(['(', '（']).unwrap_or(option);
    let mut chars = rest.char_indices();
    match (chars.next(), chars.next()) {
        (Some((_, letter)), Some((sep_pos, sep)))
            if letter.is_ascii_alphabetic() && is_option_separator(sep) =>
        {
            &rest[sep_pos + sep.len_utf8()..]
        }
        _ => option,
    }
}

fn field(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| obj.get(*n)).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn option_texts(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|o| match o {
            Value::Object(map) => ["text", "content", "value"]
                .iter()
                .find_map(|k| map.get(*k))
                .and_then(scalar_text),
            other => scalar_text(other),
        })
        .collect()
}
