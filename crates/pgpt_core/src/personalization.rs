use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingLevel {
    Basic,
    #[default]
    Intermediate,
    Advanced,
}

impl ReadingLevel {
    pub const ALL: [ReadingLevel; 3] = [Self::Basic, Self::Intermediate, Self::Advanced];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for ReadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ReadingLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown reading level: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "18-25")]
    From18To25,
    #[serde(rename = "26-35")]
    From26To35,
    #[serde(rename = "36-50")]
    From36To50,
    #[serde(rename = "51+")]
    Over50,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 4] = [
        Self::From18To25,
        Self::From26To35,
        Self::From36To50,
        Self::Over50,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::From18To25 => "18-25",
            Self::From26To35 => "26-35",
            Self::From36To50 => "36-50",
            Self::Over50 => "51+",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AgeGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|group| group.code() == s.trim())
            .ok_or_else(|| format!("Unknown age group: {}", s))
    }
}

/// Reader profile used to tailor summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalizationConfig {
    pub reading_level: ReadingLevel,
    pub interests: BTreeSet<String>,
    pub age_group: Option<AgeGroup>,
}

impl PersonalizationConfig {
    /// True when any field differs from its default, i.e. the backend should personalize.
    pub fn is_in_use(&self) -> bool {
        self.reading_level != ReadingLevel::default()
            || !self.interests.is_empty()
            || self.age_group.is_some()
    }

    pub fn set_interest(&mut self, code: &str, checked: bool) {
        if checked {
            self.interests.insert(code.to_string());
        } else {
            self.interests.remove(code);
        }
    }

    /// Interest codes as the backend expects them: comma-joined.
    pub fn interests_field(&self) -> Option<String> {
        if self.interests.is_empty() {
            return None;
        }
        Some(self.interests.iter().map(String::as_str).collect::<Vec<_>>().join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_not_in_use() {
        let config = PersonalizationConfig::default();
        assert_eq!(config.reading_level, ReadingLevel::Intermediate);
        assert!(!config.is_in_use());
    }

    #[test]
    fn any_changed_field_puts_profile_in_use() {
        let mut config = PersonalizationConfig::default();
        config.reading_level = ReadingLevel::Basic;
        assert!(config.is_in_use());

        let mut config = PersonalizationConfig::default();
        config.set_interest("cost_savings", true);
        assert!(config.is_in_use());
        config.set_interest("cost_savings", false);
        assert!(!config.is_in_use());

        let config = PersonalizationConfig {
            age_group: Some(AgeGroup::Over50),
            ..Default::default()
        };
        assert!(config.is_in_use());
    }

    #[test]
    fn interests_are_joined_independent_of_insertion_order() {
        let mut a = PersonalizationConfig::default();
        a.set_interest("policy_exclusions", true);
        a.set_interest("claim_process", true);

        let mut b = PersonalizationConfig::default();
        b.set_interest("claim_process", true);
        b.set_interest("policy_exclusions", true);
        b.set_interest("claim_process", true);

        assert_eq!(a, b);
        assert_eq!(a.interests_field().as_deref(), Some("claim_process,policy_exclusions"));
    }

    #[test]
    fn codes_parse_back() {
        assert_eq!("Advanced".parse::<ReadingLevel>(), Ok(ReadingLevel::Advanced));
        assert_eq!("51+".parse::<AgeGroup>(), Ok(AgeGroup::Over50));
        assert!("60-70".parse::<AgeGroup>().is_err());
    }
}
