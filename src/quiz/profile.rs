//! Form profiles: the option lists that distinguish one page variant from another.

use serde::{Deserialize, Serialize};

use crate::quiz::spec::OutputFormat;

/// Selector value that switches the difficulty to a free-form level.
pub const OTHER_LEVEL: &str = "Other";

/// Option lists offered by one variant of the question form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormProfile {
    /// Stable key used in requests.
    pub name: String,
    /// Page title.
    pub title: String,
    /// Difficulty labels, excluding `"Other"` which every profile accepts.
    pub difficulty_levels: Vec<String>,
    /// Index into `difficulty_levels` preselected by the form.
    pub default_difficulty: usize,
    /// Output formats offered by this profile.
    pub output_formats: Vec<OutputFormat>,
}

impl FormProfile {
    /// General-purpose question generator.
    #[must_use]
    pub fn general() -> Self {
        Self {
            name: "general".to_string(),
            title: "MCQ Generator".to_string(),
            difficulty_levels: vec![
                "Grade School".to_string(),
                "High School".to_string(),
                "University".to_string(),
            ],
            default_difficulty: 2,
            output_formats: vec![OutputFormat::PlainText, OutputFormat::PlatformMarkup],
        }
    }

    /// Medical exam question generator.
    #[must_use]
    pub fn clinical() -> Self {
        Self {
            name: "clinical".to_string(),
            title: "Clinical MCQ Generator".to_string(),
            difficulty_levels: vec![
                "Medical Student".to_string(),
                "Resident".to_string(),
                "Board Examination".to_string(),
            ],
            default_difficulty: 2,
            output_formats: vec![
                OutputFormat::PlainText,
                OutputFormat::StructuredClinicalVignette,
            ],
        }
    }

    /// Difficulty preselected by the form.
    #[must_use]
    pub fn default_level(&self) -> Option<&str> {
        self.difficulty_levels
            .get(self.default_difficulty)
            .map(String::as_str)
    }
}

/// Profiles shipped with the default configuration.
#[must_use]
pub fn default_profiles() -> Vec<FormProfile> {
    vec![FormProfile::general(), FormProfile::clinical()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_levels() {
        assert_eq!(FormProfile::general().default_level(), Some("University"));
        assert_eq!(
            FormProfile::clinical().default_level(),
            Some("Board Examination")
        );
    }

    #[test]
    fn test_profiles_differ_in_formats() {
        let profiles = default_profiles();
        assert_eq!(profiles.len(), 2);
        assert!(profiles[0].output_formats.contains(&OutputFormat::PlatformMarkup));
        assert!(
            profiles[1]
                .output_formats
                .contains(&OutputFormat::StructuredClinicalVignette)
        );
    }
}
