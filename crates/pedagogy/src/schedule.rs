//! Calendar- and material-driven scheduling.
//!
//! The resolver answers two questions for a given day:
//! 1. which [`EffectiveMode`] applies (holidays and weekends become review days);
//! 2. what a piece of uploaded material should turn into under that mode
//!    (a [`LearningDecision`] from a fixed 8×4 matrix).
//!
//! The matrix and the validator are the hard constraints the orchestration
//! layer enforces on generated content, whatever the model produced.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use edupilot_config::ScheduleConfig;
use edupilot_core::LearningPeriod;
use serde::{Deserialize, Serialize};

/// Mode actually applied on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveMode {
    DailyLight,
    WeekendReview,
    ExamPrep,
    Vacation,
}

impl EffectiveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyLight => "daily_light",
            Self::WeekendReview => "weekend_review",
            Self::ExamPrep => "exam_prep",
            Self::Vacation => "vacation",
        }
    }

    /// Inclusive `(min, max)` range for dynamically sized practice sets.
    pub fn question_range(&self) -> (u32, u32) {
        match self {
            Self::ExamPrep => (6, 12),
            Self::Vacation => (10, 15),
            Self::DailyLight | Self::WeekendReview => (3, 8),
        }
    }

    /// Hard item ceiling checked by [`ScheduleResolver::validate`].
    pub fn hard_ceiling(&self) -> Option<u32> {
        match self {
            Self::DailyLight => Some(3),
            Self::ExamPrep => Some(12),
            Self::WeekendReview | Self::Vacation => None,
        }
    }
}

impl fmt::Display for EffectiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the front end presents the outcome of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontMode {
    NoLearning,
    MicroReminder,
    FeedbackOnly,
    Practice,
}

impl FrontMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoLearning => "no_learning",
            Self::MicroReminder => "micro_reminder",
            Self::FeedbackOnly => "feedback_only",
            Self::Practice => "practice",
        }
    }

    /// Whether generated practice items may be shown at all.
    pub fn allows_items(&self) -> bool {
        matches!(self, Self::MicroReminder | Self::Practice)
    }
}

/// Kinds of material a caregiver can upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    TextbookLesson,
    Homework,
    CompletedExam,
    EssayPrompt,
    ReadingPassage,
    VocabularyList,
    ErrorNotebook,
    SchoolNotice,
}

impl MaterialType {
    pub const ALL: [MaterialType; 8] = [
        Self::TextbookLesson,
        Self::Homework,
        Self::CompletedExam,
        Self::EssayPrompt,
        Self::ReadingPassage,
        Self::VocabularyList,
        Self::ErrorNotebook,
        Self::SchoolNotice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextbookLesson => "textbook_lesson",
            Self::Homework => "homework",
            Self::CompletedExam => "completed_exam",
            Self::EssayPrompt => "essay_prompt",
            Self::ReadingPassage => "reading_passage",
            Self::VocabularyList => "vocabulary_list",
            Self::ErrorNotebook => "error_notebook",
            Self::SchoolNotice => "school_notice",
        }
    }
}

impl FromStr for MaterialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown material type '{s}'"))
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with one piece of material on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningDecision {
    pub front_mode: FrontMode,
    pub question_count: u32,
    pub should_save_to_memory: bool,
    pub focus_message: String,
}

impl LearningDecision {
    /// Returned for unknown material or any unmapped cell.
    pub fn safe_default() -> Self {
        Self {
            front_mode: FrontMode::NoLearning,
            question_count: 0,
            should_save_to_memory: false,
            focus_message: "已记录".into(),
        }
    }
}

/// Result of [`ScheduleResolver::resolve_schedule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResolution {
    pub effective_mode: EffectiveMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_decision: Option<LearningDecision>,
}

/// A hard-constraint breach found by [`ScheduleResolver::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    ForbiddenWord { word: String, occurrences: usize },
    CountExceeded { count: u32, ceiling: u32, mode: EffectiveMode },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForbiddenWord { word, occurrences } => {
                write!(f, "forbidden word '{word}' appears {occurrences} time(s)")
            }
            Self::CountExceeded { count, ceiling, mode } => {
                write!(f, "{count} items exceeds the {mode} ceiling of {ceiling}")
            }
        }
    }
}

// (material, mode, front mode, count, save to memory, focus message)
type Cell = (MaterialType, EffectiveMode, FrontMode, u32, bool, &'static str);

const MATRIX: [Cell; 32] = {
    use EffectiveMode::*;
    use FrontMode::*;
    use MaterialType::*;
    [
        (TextbookLesson, DailyLight, MicroReminder, 2, false, "今天学了新课，两道小题回顾一下"),
        (TextbookLesson, WeekendReview, Practice, 5, false, "周末把这周的课本内容串一串"),
        (TextbookLesson, ExamPrep, Practice, 10, false, "考前梳理课本重点"),
        (TextbookLesson, Vacation, Practice, 10, false, "假期温故知新"),
        (Homework, DailyLight, FeedbackOnly, 0, false, "作业已完成，看看老师的小建议"),
        (Homework, WeekendReview, Practice, 5, false, "针对作业里的易错点做几道巩固题"),
        (Homework, ExamPrep, Practice, 8, false, "从作业错题出发查漏补缺"),
        (Homework, Vacation, Practice, 10, false, "假期作业配套练习"),
        (CompletedExam, DailyLight, MicroReminder, 3, false, "试卷已分析，先看三道关键题"),
        (CompletedExam, WeekendReview, Practice, 8, false, "周末复盘试卷失分点"),
        (CompletedExam, ExamPrep, Practice, 12, false, "考前针对失分点强化训练"),
        (CompletedExam, Vacation, Practice, 10, false, "假期回顾上学期试卷"),
        (EssayPrompt, DailyLight, FeedbackOnly, 0, false, "作文已收到，给出写作建议"),
        (EssayPrompt, WeekendReview, FeedbackOnly, 0, false, "作文已收到，给出写作建议"),
        (EssayPrompt, ExamPrep, FeedbackOnly, 0, false, "作文已收到，给出考场写作建议"),
        (EssayPrompt, Vacation, FeedbackOnly, 0, false, "作文已收到，给出写作建议"),
        (ReadingPassage, DailyLight, MicroReminder, 2, false, "读完文章，想一想两个小问题"),
        (ReadingPassage, WeekendReview, Practice, 5, false, "周末阅读理解练习"),
        (ReadingPassage, ExamPrep, Practice, 6, false, "考前阅读理解专项"),
        (ReadingPassage, Vacation, Practice, 12, false, "假期阅读拓展"),
        (VocabularyList, DailyLight, MicroReminder, 3, false, "今天的词语小测三题"),
        (VocabularyList, WeekendReview, Practice, 6, false, "周末词语复习"),
        (VocabularyList, ExamPrep, Practice, 10, false, "考前词语过关"),
        (VocabularyList, Vacation, Practice, 15, false, "假期词汇积累"),
        (ErrorNotebook, DailyLight, MicroReminder, 3, false, "错题本里挑三道再试一次"),
        (ErrorNotebook, WeekendReview, Practice, 8, false, "周末错题重做"),
        (ErrorNotebook, ExamPrep, Practice, 12, false, "考前错题清零"),
        (ErrorNotebook, Vacation, Practice, 10, false, "假期错题回顾"),
        (SchoolNotice, DailyLight, NoLearning, 0, true, "通知已记录"),
        (SchoolNotice, WeekendReview, NoLearning, 0, true, "通知已记录"),
        (SchoolNotice, ExamPrep, NoLearning, 0, true, "通知已记录"),
        (SchoolNotice, Vacation, NoLearning, 0, true, "通知已记录"),
    ]
};

/// Pure matrix lookup.
pub fn decide(material: MaterialType, mode: EffectiveMode) -> LearningDecision {
    MATRIX
        .iter()
        .find(|(m, md, ..)| *m == material && *md == mode)
        .map(|&(_, _, front_mode, question_count, should_save_to_memory, msg)| LearningDecision {
            front_mode,
            question_count,
            should_save_to_memory,
            focus_message: msg.to_string(),
        })
        .unwrap_or_else(LearningDecision::safe_default)
}

/// Matrix lookup from a raw material string; unknown material gets the safe default.
pub fn decide_str(material: &str, mode: EffectiveMode) -> LearningDecision {
    match material.parse::<MaterialType>() {
        Ok(material) => decide(material, mode),
        Err(_) => LearningDecision::safe_default(),
    }
}

/// Scale a base item count by mastery and error rate, then clamp into the
/// mode's range. A base of zero always stays zero.
pub fn dynamic_question_count(base: u32, mastery: f64, error_rate: f64, mode: EffectiveMode) -> u32 {
    if base == 0 {
        return 0;
    }
    let mastery = mastery.clamp(0.0, 1.0);
    let error_rate = error_rate.clamp(0.0, 1.0);
    let scaled = (f64::from(base) * (1.0 - 0.3 * mastery) * (1.0 + 0.5 * error_rate)).round();
    let (min, max) = mode.question_range();
    (scaled as u32).clamp(min, max)
}

// Built-in public holidays as inclusive (start, end) ranges of (month, day).
const HOLIDAYS_2025: &[((u32, u32), (u32, u32))] = &[
    ((1, 1), (1, 1)),
    ((1, 28), (2, 4)),
    ((4, 4), (4, 6)),
    ((5, 1), (5, 5)),
    ((5, 31), (6, 2)),
    ((10, 1), (10, 8)),
];

const HOLIDAYS_2026: &[((u32, u32), (u32, u32))] = &[
    ((1, 1), (1, 3)),
    ((2, 15), (2, 23)),
    ((4, 4), (4, 6)),
    ((5, 1), (5, 5)),
    ((6, 19), (6, 21)),
    ((9, 25), (9, 27)),
    ((10, 1), (10, 7)),
];

/// Precomputed set of non-school days other than weekends.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    dates: HashSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Built-in Chinese public holidays for 2025 and 2026.
    pub fn builtin() -> Self {
        let mut calendar = Self::default();
        for (year, ranges) in [(2025, HOLIDAYS_2025), (2026, HOLIDAYS_2026)] {
            for &((sm, sd), (em, ed)) in ranges {
                let (Some(start), Some(end)) = (
                    NaiveDate::from_ymd_opt(year, sm, sd),
                    NaiveDate::from_ymd_opt(year, em, ed),
                ) else {
                    continue;
                };
                calendar.dates.extend(start.iter_days().take_while(|d| *d <= end));
            }
        }
        calendar
    }

    pub fn with_extra(mut self, extra: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.dates.extend(extra);
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Built-in vocabulary never shown to a child.
pub const BUILTIN_FORBIDDEN_WORDS: &[&str] = &[
    "笨", "蠢", "差生", "没用", "废物", "丢人", "你不行", "太差了", "不及格", "惩罚",
    "必须满分", "stupid", "dumb", "lazy", "failure",
];

/// Calendar plus forbidden vocabulary; every method is pure.
#[derive(Debug, Clone)]
pub struct ScheduleResolver {
    calendar: HolidayCalendar,
    forbidden_words: Vec<String>,
}

impl Default for ScheduleResolver {
    fn default() -> Self {
        Self::new(HolidayCalendar::builtin(), Vec::new())
    }
}

impl ScheduleResolver {
    /// `extra_words` are added to the built-in forbidden vocabulary.
    pub fn new(calendar: HolidayCalendar, extra_words: Vec<String>) -> Self {
        let mut forbidden_words: Vec<String> =
            BUILTIN_FORBIDDEN_WORDS.iter().map(|w| w.to_string()).collect();
        for word in extra_words {
            let word = word.trim().to_lowercase();
            if !word.is_empty() && !forbidden_words.contains(&word) {
                forbidden_words.push(word);
            }
        }
        Self {
            calendar,
            forbidden_words,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(
            HolidayCalendar::builtin().with_extra(config.extra_holidays.iter().copied()),
            config.forbidden_words.clone(),
        )
    }

    pub fn forbidden_words(&self) -> &[String] {
        &self.forbidden_words
    }

    /// Exam prep and vacation ignore the date; school days become review
    /// days on weekends and holidays.
    pub fn effective_mode(&self, period: LearningPeriod, date: NaiveDate) -> EffectiveMode {
        match period {
            LearningPeriod::ExamPrep => EffectiveMode::ExamPrep,
            LearningPeriod::Vacation => EffectiveMode::Vacation,
            LearningPeriod::School => {
                let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
                if weekend || self.calendar.contains(date) {
                    EffectiveMode::WeekendReview
                } else {
                    EffectiveMode::DailyLight
                }
            }
        }
    }

    pub fn resolve_schedule(
        &self,
        period: LearningPeriod,
        date: NaiveDate,
        material: Option<&str>,
    ) -> ScheduleResolution {
        let effective_mode = self.effective_mode(period, date);
        ScheduleResolution {
            effective_mode,
            learning_decision: material.map(|m| decide_str(m, effective_mode)),
        }
    }

    /// Check generated text and item count against the hard constraints.
    pub fn validate(&self, text: &str, count: u32, mode: EffectiveMode) -> Vec<Violation> {
        let haystack = text.to_lowercase();
        let mut violations: Vec<Violation> = self
            .forbidden_words
            .iter()
            .filter_map(|word| {
                let occurrences = haystack.matches(word.as_str()).count();
                (occurrences > 0).then(|| Violation::ForbiddenWord {
                    word: word.clone(),
                    occurrences,
                })
            })
            .collect();

        if let Some(ceiling) = mode.hard_ceiling() {
            if count > ceiling {
                violations.push(Violation::CountExceeded {
                    count,
                    ceiling,
                    mode,
                });
            }
        }
        violations
    }

    /// True when `text` contains no forbidden vocabulary.
    pub fn is_clean(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        !self
            .forbidden_words
            .iter()
            .any(|word| haystack.contains(word.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn exam_prep_and_vacation_ignore_the_date() {
        let resolver = ScheduleResolver::default();
        for d in [date(2025, 3, 12), date(2025, 3, 15), date(2025, 10, 2)] {
            assert_eq!(resolver.effective_mode(LearningPeriod::ExamPrep, d), EffectiveMode::ExamPrep);
            assert_eq!(resolver.effective_mode(LearningPeriod::Vacation, d), EffectiveMode::Vacation);
        }
    }

    #[test]
    fn school_weekday_is_daily_light() {
        let resolver = ScheduleResolver::default();
        // Wednesday
        assert_eq!(
            resolver.effective_mode(LearningPeriod::School, date(2025, 3, 12)),
            EffectiveMode::DailyLight
        );
    }

    #[test]
    fn school_weekend_and_holiday_are_review() {
        let resolver = ScheduleResolver::default();
        assert_eq!(
            resolver.effective_mode(LearningPeriod::School, date(2025, 3, 15)),
            EffectiveMode::WeekendReview
        );
        // National Day, a Thursday
        assert_eq!(
            resolver.effective_mode(LearningPeriod::School, date(2025, 10, 2)),
            EffectiveMode::WeekendReview
        );
        // Spring festival range crosses the month boundary
        assert!(HolidayCalendar::builtin().contains(date(2025, 2, 3)));
    }

    #[test]
    fn configured_extra_holiday_is_review() {
        let config = ScheduleConfig {
            extra_holidays: vec![date(2025, 3, 12)],
            forbidden_words: vec![],
        };
        let resolver = ScheduleResolver::from_config(&config);
        assert_eq!(
            resolver.effective_mode(LearningPeriod::School, date(2025, 3, 12)),
            EffectiveMode::WeekendReview
        );
    }

    #[test]
    fn every_cell_is_defined() {
        let modes = [
            EffectiveMode::DailyLight,
            EffectiveMode::WeekendReview,
            EffectiveMode::ExamPrep,
            EffectiveMode::Vacation,
        ];
        for material in MaterialType::ALL {
            for mode in modes {
                let cells = MATRIX.iter().filter(|(m, md, ..)| *m == material && *md == mode).count();
                assert_eq!(cells, 1, "{material} × {mode}");
            }
        }
    }

    #[test]
    fn completed_exam_on_weekend_is_eight_practice_items() {
        let decision = decide(MaterialType::CompletedExam, EffectiveMode::WeekendReview);
        assert_eq!(decision.front_mode, FrontMode::Practice);
        assert_eq!(decision.question_count, 8);
    }

    #[test]
    fn essay_prompt_is_always_feedback_only() {
        for mode in [
            EffectiveMode::DailyLight,
            EffectiveMode::WeekendReview,
            EffectiveMode::ExamPrep,
            EffectiveMode::Vacation,
        ] {
            let decision = decide(MaterialType::EssayPrompt, mode);
            assert_eq!(decision.front_mode, FrontMode::FeedbackOnly);
            assert_eq!(decision.question_count, 0);
        }
    }

    #[test]
    fn unknown_material_gets_safe_default() {
        let decision = decide_str("comic_book", EffectiveMode::Vacation);
        assert_eq!(decision, LearningDecision::safe_default());
        assert_eq!(decision.focus_message, "已记录");
    }

    #[test]
    fn school_notice_is_saved_not_taught() {
        let decision = decide(MaterialType::SchoolNotice, EffectiveMode::DailyLight);
        assert_eq!(decision.front_mode, FrontMode::NoLearning);
        assert!(decision.should_save_to_memory);
    }

    #[test]
    fn matrix_respects_mode_ceilings() {
        let resolver = ScheduleResolver::default();
        for (_, mode, _, count, _, msg) in MATRIX {
            assert!(resolver.validate(msg, count, mode).is_empty(), "{msg}");
        }
    }

    #[test]
    fn dynamic_count_zero_base_stays_zero() {
        assert_eq!(dynamic_question_count(0, 0.0, 1.0, EffectiveMode::Vacation), 0);
    }

    #[test]
    fn dynamic_count_clamps_into_mode_range() {
        // 10 * 1.0 * 1.5 = 15, capped at 8
        assert_eq!(dynamic_question_count(10, 0.0, 1.0, EffectiveMode::DailyLight), 8);
        // 2 * 0.7 * 1.0 = 1.4 -> 1, raised to 6
        assert_eq!(dynamic_question_count(2, 1.0, 0.0, EffectiveMode::ExamPrep), 6);
        // 12 * 0.85 * 1.1 = 11.22 -> 11, inside the vacation range
        assert_eq!(dynamic_question_count(12, 0.5, 0.2, EffectiveMode::Vacation), 11);
    }

    #[test]
    fn dynamic_count_clamps_inputs() {
        assert_eq!(
            dynamic_question_count(5, 7.0, -3.0, EffectiveMode::WeekendReview),
            dynamic_question_count(5, 1.0, 0.0, EffectiveMode::WeekendReview)
        );
    }

    #[test]
    fn validate_reports_words_and_ceiling() {
        let resolver = ScheduleResolver::default();
        let violations = resolver.validate("你真笨，笨死了", 5, EffectiveMode::DailyLight);
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&Violation::ForbiddenWord {
            word: "笨".into(),
            occurrences: 2
        }));
        assert!(violations.contains(&Violation::CountExceeded {
            count: 5,
            ceiling: 3,
            mode: EffectiveMode::DailyLight
        }));
    }

    #[test]
    fn validate_is_case_insensitive_and_uses_extras() {
        let resolver = ScheduleResolver::new(HolidayCalendar::default(), vec!["Useless".into()]);
        let violations = resolver.validate("That was STUPID and useless", 3, EffectiveMode::WeekendReview);
        assert_eq!(violations.len(), 2);
        assert!(resolver.is_clean("great job"));
    }

    #[test]
    fn exam_prep_ceiling_is_twelve() {
        let resolver = ScheduleResolver::default();
        assert!(resolver.validate("", 12, EffectiveMode::ExamPrep).is_empty());
        assert_eq!(resolver.validate("", 13, EffectiveMode::ExamPrep).len(), 1);
        assert!(resolver.validate("", 40, EffectiveMode::WeekendReview).is_empty());
    }

    #[test]
    fn resolve_without_material_has_no_decision() {
        let resolver = ScheduleResolver::default();
        let res = resolver.resolve_schedule(LearningPeriod::School, date(2025, 3, 15), None);
        assert_eq!(res.effective_mode, EffectiveMode::WeekendReview);
        assert!(res.learning_decision.is_none());

        let res = resolver.resolve_schedule(LearningPeriod::School, date(2025, 3, 15), Some("completed_exam"));
        assert_eq!(res.learning_decision.unwrap().question_count, 8);
    }
}
