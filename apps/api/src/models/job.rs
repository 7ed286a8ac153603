use serde::{Deserialize, Serialize};

/// Base requirements of a job posting, as extracted upstream.
/// Read-only to the scoring core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequirements {
    #[serde(default, deserialize_with = "super::nullable_list")]
    pub must_have_skills: Vec<String>,
    #[serde(default, deserialize_with = "super::nullable_list")]
    pub nice_to_have_skills: Vec<String>,
    #[serde(default)]
    pub minimum_years_experience: Option<f64>,
    #[serde(default)]
    pub required_education: Option<RequiredEducation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequiredEducation {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl JobRequirements {
    /// Minimum years from the posting; a missing value counts as no requirement.
    pub fn base_min_years(&self) -> f64 {
        self.minimum_years_experience.unwrap_or(0.0)
    }

    pub fn education_required(&self) -> bool {
        self.required_education
            .as_ref()
            .map(|education| education.required)
            .unwrap_or(false)
    }

    pub fn required_level(&self) -> Option<&str> {
        self.required_education
            .as_ref()
            .and_then(|education| education.level.as_deref())
    }

    pub fn required_field(&self) -> Option<&str> {
        self.required_education
            .as_ref()
            .and_then(|education| education.field.as_deref())
    }
}
