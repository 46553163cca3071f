//! Question options: the raw form values and the validated spec built from them.

use serde::{Deserialize, Serialize};

use crate::error::{WizardError, WizardResult};
use crate::quiz::profile::{FormProfile, OTHER_LEVEL};

/// Maximum length of the source text field.
pub const MAX_SOURCE_CHARS: usize = 50_000;
/// Maximum length of the learning objective field.
pub const MAX_OBJECTIVE_CHARS: usize = 1_000;

/// Allowed number of questions per request.
pub const QUESTION_COUNTS: std::ops::RangeInclusive<u8> = 1..=5;
/// Allowed number of correct answers per question.
pub const CORRECT_ANSWER_COUNTS: std::ops::RangeInclusive<u8> = 1..=4;
/// Allowed number of distractors per question.
pub const DISTRACTOR_COUNTS: std::ops::RangeInclusive<u8> = 1..=5;

/// How easy the wrong answers should be to rule out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistractorDifficulty {
    /// No extra guidance.
    #[default]
    Normal,
    /// Clearly wrong options.
    Obvious,
    /// Plausible but wrong options.
    Challenging,
}

/// Shape of the generated questions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Generic lettered template.
    #[default]
    PlainText,
    /// Board-exam style clinical vignette template.
    StructuredClinicalVignette,
    /// Learning platform markup (Open edX OLX).
    PlatformMarkup,
}

impl OutputFormat {
    /// Every format, in selector order.
    pub const ALL: [Self; 3] = [
        Self::PlainText,
        Self::StructuredClinicalVignette,
        Self::PlatformMarkup,
    ];

    /// Label shown in the form selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PlainText => "Plain Text",
            Self::StructuredClinicalVignette => "Clinical Vignette",
            Self::PlatformMarkup => "OLX",
        }
    }
}

/// Immutable, validated question options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionSpec {
    /// Number of questions, 1..=5.
    pub question_count: u8,
    /// Correct answers per question, 1..=4.
    pub correct_answers_per_question: u8,
    /// Resolved difficulty label (never empty).
    pub difficulty_level: String,
    /// Distractors per question, 1..=5.
    pub distractor_count: u8,
    /// Distractor guidance.
    pub distractor_difficulty: DistractorDifficulty,
    /// Restrict generation to the supplied text.
    pub content_only: bool,
    /// Optional learning objective.
    pub learning_objective: Option<String>,
    /// Ask for a feedback section per question.
    pub include_feedback: bool,
    /// Ask for a hint per question.
    pub include_hints: bool,
    /// Output template selection.
    pub output_format: OutputFormat,
    /// Content the questions are based on; may be empty.
    pub source_text: String,
}

/// Raw form values as submitted by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionForm {
    /// Selected question count.
    pub question_count: u8,
    /// Selected correct answer count.
    pub correct_answers_per_question: u8,
    /// Selected difficulty label, possibly `"Other"`.
    pub difficulty_level: String,
    /// Free-form level used when `"Other"` is selected.
    pub custom_level: Option<String>,
    /// Selected distractor count.
    pub distractor_count: u8,
    /// Selected distractor difficulty.
    pub distractor_difficulty: DistractorDifficulty,
    /// "Focus only on the provided text" toggle.
    pub content_only: bool,
    /// Learning objective text area.
    pub learning_objective: String,
    /// "Include learner feedback" toggle.
    pub include_feedback: bool,
    /// "Include hints" toggle.
    pub include_hints: bool,
    /// Selected output format.
    pub output_format: OutputFormat,
    /// Topic content text area.
    pub source_text: String,
}

impl Default for QuestionForm {
    fn default() -> Self {
        Self {
            question_count: 1,
            correct_answers_per_question: 1,
            difficulty_level: "University".to_string(),
            custom_level: None,
            distractor_count: 3,
            distractor_difficulty: DistractorDifficulty::Normal,
            content_only: false,
            learning_objective: String::new(),
            include_feedback: false,
            include_hints: false,
            output_format: OutputFormat::PlainText,
            source_text: String::new(),
        }
    }
}

impl QuestionForm {
    /// Validate the form against a profile and build the spec.
    ///
    /// # Errors
    /// Returns `ConfigurationInvalid` when a count is out of range, the difficulty or
    /// output format is not offered by the profile, or a text field is too long.
    pub fn resolve(&self, profile: &FormProfile) -> WizardResult<QuestionSpec> {
        check_range("question_count", self.question_count, &QUESTION_COUNTS)?;
        check_range(
            "correct_answers_per_question",
            self.correct_answers_per_question,
            &CORRECT_ANSWER_COUNTS,
        )?;
        check_range("distractor_count", self.distractor_count, &DISTRACTOR_COUNTS)?;
        check_len("source_text", &self.source_text, MAX_SOURCE_CHARS)?;
        check_len(
            "learning_objective",
            &self.learning_objective,
            MAX_OBJECTIVE_CHARS,
        )?;

        let difficulty_level = self.resolve_level(profile)?;

        if !profile.output_formats.contains(&self.output_format) {
            return Err(WizardError::invalid(format!(
                "output format '{}' is not offered by profile '{}'",
                self.output_format.label(),
                profile.name
            )));
        }

        let objective = self.learning_objective.trim();
        let learning_objective = (!objective.is_empty()).then(|| objective.to_string());

        Ok(QuestionSpec {
            question_count: self.question_count,
            correct_answers_per_question: self.correct_answers_per_question,
            difficulty_level,
            distractor_count: self.distractor_count,
            distractor_difficulty: self.distractor_difficulty,
            content_only: self.content_only,
            learning_objective,
            include_feedback: self.include_feedback,
            include_hints: self.include_hints,
            output_format: self.output_format,
            source_text: self.source_text.clone(),
        })
    }

    fn resolve_level(&self, profile: &FormProfile) -> WizardResult<String> {
        if self.difficulty_level == OTHER_LEVEL {
            let custom = self.custom_level.as_deref().map(str::trim).unwrap_or_default();
            if custom.is_empty() {
                return Err(WizardError::invalid(
                    "difficulty level 'Other' requires a custom level",
                ));
            }
            return Ok(custom.to_string());
        }

        if profile
            .difficulty_levels
            .iter()
            .any(|level| *level == self.difficulty_level)
        {
            Ok(self.difficulty_level.clone())
        } else {
            Err(WizardError::invalid(format!(
                "difficulty level '{}' is not offered by profile '{}'",
                self.difficulty_level, profile.name
            )))
        }
    }
}

fn check_range(field: &str, value: u8, range: &std::ops::RangeInclusive<u8>) -> WizardResult<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(WizardError::invalid(format!(
            "{field} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

fn check_len(field: &str, value: &str, max_chars: usize) -> WizardResult<()> {
    let len = value.chars().count();
    if len > max_chars {
        return Err(WizardError::invalid(format!(
            "{field} is limited to {max_chars} characters, got {len}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::profile::FormProfile;

    #[test]
    fn test_default_form_resolves() {
        let spec = QuestionForm::default()
            .resolve(&FormProfile::general())
            .expect("default form is valid");
        assert_eq!(spec.difficulty_level, "University");
        assert_eq!(spec.distractor_count, 3);
        assert!(spec.learning_objective.is_none());
    }

    #[test]
    fn test_out_of_range_counts_rejected() {
        let profile = FormProfile::general();
        let form = QuestionForm {
            question_count: 6,
            ..QuestionForm::default()
        };
        assert!(matches!(
            form.resolve(&profile),
            Err(WizardError::ConfigurationInvalid(_))
        ));

        let form = QuestionForm {
            distractor_count: 0,
            ..QuestionForm::default()
        };
        assert!(form.resolve(&profile).is_err());

        let form = QuestionForm {
            correct_answers_per_question: 5,
            ..QuestionForm::default()
        };
        assert!(form.resolve(&profile).is_err());
    }

    #[test]
    fn test_other_level_uses_custom_text() {
        let profile = FormProfile::general();
        let form = QuestionForm {
            difficulty_level: "Other".to_string(),
            custom_level: Some("  Graduate  ".to_string()),
            ..QuestionForm::default()
        };
        let spec = form.resolve(&profile).expect("custom level");
        assert_eq!(spec.difficulty_level, "Graduate");

        let form = QuestionForm {
            difficulty_level: "Other".to_string(),
            custom_level: None,
            ..QuestionForm::default()
        };
        assert!(form.resolve(&profile).is_err());
    }

    #[test]
    fn test_unknown_level_and_format_rejected() {
        let general = FormProfile::general();
        let form = QuestionForm {
            difficulty_level: "Kindergarten".to_string(),
            ..QuestionForm::default()
        };
        assert!(form.resolve(&general).is_err());

        let form = QuestionForm {
            output_format: OutputFormat::StructuredClinicalVignette,
            ..QuestionForm::default()
        };
        assert!(form.resolve(&general).is_err());
    }

    #[test]
    fn test_length_bounds() {
        let profile = FormProfile::general();
        let form = QuestionForm {
            learning_objective: "x".repeat(MAX_OBJECTIVE_CHARS + 1),
            ..QuestionForm::default()
        };
        assert!(form.resolve(&profile).is_err());

        let form = QuestionForm {
            source_text: "y".repeat(MAX_SOURCE_CHARS),
            ..QuestionForm::default()
        };
        assert!(form.resolve(&profile).is_ok());
    }

    #[test]
    fn test_form_deserializes_with_defaults() {
        let form: QuestionForm = serde_json::from_str(
            r#"{"question_count": 2, "distractor_difficulty": "challenging", "output_format": "platform_markup"}"#,
        )
        .expect("valid json");
        assert_eq!(form.question_count, 2);
        assert_eq!(form.distractor_count, 3);
        assert_eq!(form.distractor_difficulty, DistractorDifficulty::Challenging);
        assert_eq!(form.output_format, OutputFormat::PlatformMarkup);
    }
}
