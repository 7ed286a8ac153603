use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate's application to a job, pre-fetched by the caller.
/// `overall_score` is the original (pre-scenario) match score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    #[serde(default)]
    pub candidate_id: Option<i64>,
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub match_data: Option<MatchData>,
    #[serde(default, deserialize_with = "super::nullable_list")]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Structured LLM match output for one candidate-job pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchData {
    #[serde(default)]
    pub must_have_skills: Option<MatchBucket>,
    #[serde(default)]
    pub nice_to_have_skills: Option<MatchBucket>,
    #[serde(default)]
    pub minimum_years_experience: Option<ExperienceMatch>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceMatch {
    #[serde(default)]
    pub candidate_years: Option<f64>,
}

/// Per-bucket skill classification.
///
/// Older records only distinguish matched vs missing; those deserialize as
/// `Legacy` and cannot be scored under `full_only`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchBucket {
    Classified {
        full_matches: Vec<String>,
        partial_matches: Vec<String>,
        #[serde(default, deserialize_with = "super::nullable_list")]
        missing_skills: Vec<String>,
    },
    Legacy {
        #[serde(default, deserialize_with = "super::nullable_list")]
        matched_skills: Vec<String>,
        #[serde(default, deserialize_with = "super::nullable_list")]
        missing_skills: Vec<String>,
    },
}

/// How a single requirement skill is covered by the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillMatch {
    Full,
    Partial,
    Missing,
}

/// Lookup sets built once per bucket so classification is O(1) per skill.
pub struct BucketIndex<'a> {
    full: HashSet<&'a str>,
    partial: HashSet<&'a str>,
}

impl MatchBucket {
    pub fn is_legacy(&self) -> bool {
        matches!(self, MatchBucket::Legacy { .. })
    }

    pub fn index(&self) -> BucketIndex<'_> {
        match self {
            MatchBucket::Classified {
                full_matches,
                partial_matches,
                ..
            } => BucketIndex {
                full: full_matches.iter().map(String::as_str).collect(),
                partial: partial_matches.iter().map(String::as_str).collect(),
            },
            // Legacy matches are all treated as full; partials cannot be recovered.
            MatchBucket::Legacy { matched_skills, .. } => BucketIndex {
                full: matched_skills.iter().map(String::as_str).collect(),
                partial: HashSet::new(),
            },
        }
    }
}

impl BucketIndex<'_> {
    pub fn classify(&self, skill: &str) -> SkillMatch {
        if self.full.contains(skill) {
            SkillMatch::Full
        } else if self.partial.contains(skill) {
            SkillMatch::Partial
        } else {
            SkillMatch::Missing
        }
    }
}

/// One education record from the parsed resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(rename = "studyType", default)]
    pub study_type: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
}
