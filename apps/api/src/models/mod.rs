pub mod application;
pub mod job;

pub use application::{Application, EducationEntry, MatchBucket, MatchData, SkillMatch};
pub use job::{JobRequirements, RequiredEducation};

use serde::{Deserialize, Deserializer};

/// Accepts a missing, `null`, or array value for list fields produced upstream.
pub(crate) fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
