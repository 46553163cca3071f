//! Prompt composer: renders a [`QuestionSpec`] into a single instruction string.
//!
//! Clause order matters; later clauses refine earlier ones.

use crate::quiz::spec::{DistractorDifficulty, OutputFormat, QuestionSpec};

const CONTENT_ONLY: &str = "Please create questions based solely on the provided text. \n";
const CONTENT_AND_KNOWLEDGE: &str = "Please create questions that incorporate both the provided text as well as your knowledge of the topic. \n";

const OBVIOUS_DISTRACTORS: &str = "Distractors should be obviously incorrect options. \n";
const CHALLENGING_DISTRACTORS: &str =
    "Distractors should sound like they could be plausible, but are ultimately incorrect. \n";

const FEEDBACK_INSTRUCTION: &str = "Please provide a feedback section for each question that says why the correct answer is the best answer and the other options are incorrect. \n";
const HINT_INSTRUCTION: &str = "Also, include a hint for each question.\n";

const PLATFORM_MARKUP_INSTRUCTION: &str = "Please write your MCQs in Open edX OLX format";

/// Generic lettered-answer template.
pub const GENERIC_TEMPLATE: &str = "
Format each question like the following:
Question: [Question Text] \n
A) [Answer A] \n
B) [Answer B] \n
....
N) [Answer N] \n

Solution: [Answer A, B...N]\n\n
";

/// Board-exam vignette template with a worked exemplar.
pub const CLINICAL_VIGNETTE_TEMPLATE: &str = "
Write every question as a clinical vignette in the style of a medical board examination item.
Each vignette must follow this structure exactly:

Vignette: [Patient age and sex, presenting complaint, relevant history, vital signs, physical examination findings, and pertinent laboratory or imaging results, written in the present tense] \n
Question: [A single focused lead-in, for example \"Which of the following is the most likely diagnosis?\" or \"Which of the following is the most appropriate next step in management?\"] \n
A) [Option A] \n
B) [Option B] \n
....
N) [Option N] \n

Solution: [Letter(s) of the correct option(s)]\n\n

Rules for the vignette:
- Options must be homogeneous (all diagnoses, all drugs, all tests, and so on) and listed in a logical order.
- The vignette must contain every finding needed to answer without revealing the answer in the lead-in.
- Avoid \"all of the above\", \"none of the above\" and negatively phrased lead-ins.

Example:
Vignette: A 58-year-old man comes to the emergency department because of crushing substernal chest pain that began 40 minutes ago while he was shovelling snow. He has hypertension and smokes one pack of cigarettes daily. His pulse is 104/min and blood pressure is 150/92 mm Hg. An ECG shows ST-segment elevation in leads II, III and aVF. \n
Question: Which of the following coronary arteries is most likely occluded? \n
A) Left anterior descending artery \n
B) Left circumflex artery \n
C) Right coronary artery \n
D) Left main coronary artery \n

Solution: [C]\n\n
";

const FEEDBACK_SLOT: &str = "Feedback: [Feedback]\n\n";
const HINT_SLOT: &str = "Hint: [Hint]\n\n";

/// Separator placed between the instructions and the source text.
pub const SOURCE_SEPARATOR: &str = "Here is the text: \n===============\n";

/// Render the spec into a prompt. Pure and deterministic.
#[must_use]
pub fn compose(spec: &QuestionSpec) -> String {
    let mut out = String::with_capacity(
        CLINICAL_VIGNETTE_TEMPLATE.len() + spec.source_text.len() + 1024,
    );

    out.push_str(&header(spec));

    out.push_str(if spec.content_only {
        CONTENT_ONLY
    } else {
        CONTENT_AND_KNOWLEDGE
    });

    match spec.distractor_difficulty {
        DistractorDifficulty::Normal => {}
        DistractorDifficulty::Obvious => out.push_str(OBVIOUS_DISTRACTORS),
        DistractorDifficulty::Challenging => out.push_str(CHALLENGING_DISTRACTORS),
    }

    if let Some(objective) = spec.learning_objective.as_deref().filter(|o| !o.is_empty()) {
        out.push_str("Focus on meeting the following learning objective(s) : ");
        out.push_str(objective);
        out.push_str(".\n");
    }

    if spec.include_feedback {
        out.push_str(FEEDBACK_INSTRUCTION);
    }
    if spec.include_hints {
        out.push_str(HINT_INSTRUCTION);
    }

    match spec.output_format {
        OutputFormat::StructuredClinicalVignette => out.push_str(CLINICAL_VIGNETTE_TEMPLATE),
        OutputFormat::PlatformMarkup => {
            out.push_str(PLATFORM_MARKUP_INSTRUCTION);
            out.push_str(GENERIC_TEMPLATE);
        }
        OutputFormat::PlainText => out.push_str(GENERIC_TEMPLATE),
    }

    if spec.include_feedback {
        out.push_str(FEEDBACK_SLOT);
    }
    if spec.include_hints {
        out.push_str(HINT_SLOT);
    }

    out.push_str(SOURCE_SEPARATOR);
    out.push_str(&spec.source_text);
    out
}

fn header(spec: &QuestionSpec) -> String {
    format!(
        "Please write {} {} level multiple-choice question(s), each with {} correct answer(s) and {} distractors, based on text that I will provide. \n",
        spec.question_count,
        spec.difficulty_level,
        spec.correct_answers_per_question,
        spec.distractor_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water_spec() -> QuestionSpec {
        QuestionSpec {
            question_count: 3,
            correct_answers_per_question: 1,
            difficulty_level: "High School".to_string(),
            distractor_count: 2,
            distractor_difficulty: DistractorDifficulty::Normal,
            content_only: true,
            learning_objective: None,
            include_feedback: false,
            include_hints: false,
            output_format: OutputFormat::PlainText,
            source_text: "Water boils at 100C.".to_string(),
        }
    }

    #[test]
    fn test_high_school_scenario() {
        let prompt = compose(&water_spec());
        let expected = format!(
            "Please write 3 High School level multiple-choice question(s), each with 1 correct answer(s) and 2 distractors, based on text that I will provide. \n{CONTENT_ONLY}{GENERIC_TEMPLATE}{SOURCE_SEPARATOR}Water boils at 100C."
        );
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_compose_is_deterministic() {
        let spec = QuestionSpec {
            include_feedback: true,
            include_hints: true,
            learning_objective: Some("Explain phase changes".to_string()),
            ..water_spec()
        };
        assert_eq!(compose(&spec), compose(&spec.clone()));
    }

    #[test]
    fn test_source_text_is_trailing_and_unmodified() {
        let source = "  Line one\n\tLine two with [brackets] and ===  ";
        let spec = QuestionSpec {
            source_text: source.to_string(),
            output_format: OutputFormat::StructuredClinicalVignette,
            ..water_spec()
        };
        assert!(compose(&spec).ends_with(&format!("{SOURCE_SEPARATOR}{source}")));
    }

    #[test]
    fn test_empty_source_still_well_formed() {
        let spec = QuestionSpec {
            source_text: String::new(),
            ..water_spec()
        };
        let prompt = compose(&spec);
        assert!(prompt.starts_with("Please write 3"));
        assert!(prompt.ends_with(SOURCE_SEPARATOR));
    }

    #[test]
    fn test_feedback_and_hint_slots_appear_once() {
        for (feedback, hints) in [(false, false), (true, false), (false, true), (true, true)] {
            for format in [
                OutputFormat::PlainText,
                OutputFormat::PlatformMarkup,
                OutputFormat::StructuredClinicalVignette,
            ] {
                let spec = QuestionSpec {
                    include_feedback: feedback,
                    include_hints: hints,
                    output_format: format,
                    ..water_spec()
                };
                let prompt = compose(&spec);
                assert_eq!(prompt.matches(FEEDBACK_SLOT).count(), usize::from(feedback));
                assert_eq!(prompt.matches(HINT_SLOT).count(), usize::from(hints));
                assert_eq!(
                    prompt.matches(FEEDBACK_INSTRUCTION).count(),
                    usize::from(feedback)
                );
                assert_eq!(prompt.matches(HINT_INSTRUCTION).count(), usize::from(hints));
            }
        }
    }

    #[test]
    fn test_vignette_replaces_generic_template() {
        let vignette = compose(&QuestionSpec {
            output_format: OutputFormat::StructuredClinicalVignette,
            ..water_spec()
        });
        assert!(vignette.contains(CLINICAL_VIGNETTE_TEMPLATE));
        assert!(!vignette.contains(GENERIC_TEMPLATE));

        for format in [OutputFormat::PlainText, OutputFormat::PlatformMarkup] {
            let prompt = compose(&QuestionSpec {
                output_format: format,
                ..water_spec()
            });
            assert!(!prompt.contains("clinical vignette"));
            assert!(prompt.contains(GENERIC_TEMPLATE));
        }
    }

    #[test]
    fn test_platform_markup_instruction() {
        let prompt = compose(&QuestionSpec {
            output_format: OutputFormat::PlatformMarkup,
            ..water_spec()
        });
        assert!(prompt.contains("Open edX OLX format\nFormat each question"));
    }

    #[test]
    fn test_distractor_guidance() {
        let normal = compose(&water_spec());
        assert!(!normal.contains("Distractors should"));

        let obvious = compose(&QuestionSpec {
            distractor_difficulty: DistractorDifficulty::Obvious,
            ..water_spec()
        });
        assert!(obvious.contains(OBVIOUS_DISTRACTORS));

        let challenging = compose(&QuestionSpec {
            distractor_difficulty: DistractorDifficulty::Challenging,
            content_only: false,
            ..water_spec()
        });
        assert!(challenging.contains(CHALLENGING_DISTRACTORS));
        assert!(challenging.contains(CONTENT_AND_KNOWLEDGE));
    }

    #[test]
    fn test_clause_order() {
        let prompt = compose(&QuestionSpec {
            distractor_difficulty: DistractorDifficulty::Obvious,
            learning_objective: Some("Name the boiling point".to_string()),
            include_feedback: true,
            include_hints: true,
            ..water_spec()
        });
        let positions: Vec<usize> = [
            CONTENT_ONLY,
            OBVIOUS_DISTRACTORS,
            "learning objective(s) : Name the boiling point.",
            FEEDBACK_INSTRUCTION,
            HINT_INSTRUCTION,
            "Format each question",
            FEEDBACK_SLOT,
            HINT_SLOT,
            SOURCE_SEPARATOR,
        ]
        .iter()
        .map(|clause| prompt.find(clause).expect("clause present"))
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
