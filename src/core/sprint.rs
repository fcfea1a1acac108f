//! Sprint configuration.
//!
//! A sprint file fixes the shape of the sprint (`[TIME]`: days and reporting
//! periods) and the team's capacity (`[TEAM]`: developer name to committed
//! points). Every value is bounds-checked on load; the scrum guide does not
//! know six-week sprints.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

pub const MIN_DAYS: i64 = 0;
pub const MAX_DAYS: i64 = 20;
pub const MIN_PERIODS: i64 = 0;
pub const MAX_PERIODS: i64 = 4;
pub const MIN_POINTS: i64 = 0;
pub const MAX_POINTS: i64 = 340;

#[derive(Debug, Error)]
pub enum SprintError {
    #[error("illegal sprint value {key} = {value}, allowed {min}..={max}")]
    IllegalValue { key: String, value: i64, min: i64, max: i64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("sprint file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct SprintFile {
    #[serde(rename = "TIME")]
    time: TimeTable,
    #[serde(rename = "TEAM")]
    team: IndexMap<String, i64>,
}

#[derive(Debug, Deserialize)]
struct TimeTable {
    days: i64,
    periods: i64,
}

/// Sprint shape and team capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprintConfig {
    /// Sprint length in days; day 0 is the planning day.
    pub days: u32,
    /// Reporting periods for burndown summaries.
    pub periods: u32,
    /// Total points the team offers, summed over `[TEAM]`.
    pub capacity: u32,
}

impl SprintConfig {
    /// Load and bounds-check a sprint file.
    pub fn load(path: &Path) -> Result<Self, SprintError> {
        let raw = fs::read_to_string(path)?;
        let file: SprintFile = toml::from_str(&raw)?;

        let days = check("TIME.days", file.time.days, MIN_DAYS, MAX_DAYS)?;
        let periods = check("TIME.periods", file.time.periods, MIN_PERIODS, MAX_PERIODS)?;

        let mut capacity = 0;
        for (developer, points) in &file.team {
            capacity += check(&format!("TEAM.{developer}"), *points, MIN_POINTS, MAX_POINTS)?;
        }

        Ok(Self { days, periods, capacity })
    }

    /// Permissive fallback for runs that can work without a sprint file,
    /// such as task consolidation.
    pub fn permissive() -> Self {
        Self {
            days: MAX_DAYS as u32,
            periods: MAX_PERIODS as u32,
            capacity: MAX_POINTS as u32,
        }
    }
}

fn check(key: &str, value: i64, min: i64, max: i64) -> Result<u32, SprintError> {
    if value < min || value > max {
        return Err(SprintError::IllegalValue { key: key.to_string(), value, min, max });
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sprint(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_and_sums_capacity() {
        let file = write_sprint(
            "[TIME]\ndays = 10\nperiods = 4\n\n[TEAM]\nalice = 13\nbob = 8\n",
        );
        let sprint = SprintConfig::load(file.path()).unwrap();
        assert_eq!(sprint, SprintConfig { days: 10, periods: 4, capacity: 21 });
    }

    #[test]
    fn rejects_out_of_range_days() {
        let file = write_sprint("[TIME]\ndays = 21\nperiods = 2\n");
        let err = SprintConfig::load(file.path()).unwrap_err();
        assert!(
            matches!(err, SprintError::IllegalValue { ref key, value: 21, .. } if key == "TIME.days")
        );
    }

    #[test]
    fn rejects_out_of_range_periods() {
        let file = write_sprint("[TIME]\ndays = 10\nperiods = 5\n");
        assert!(matches!(
            SprintConfig::load(file.path()).unwrap_err(),
            SprintError::IllegalValue { .. }
        ));
    }

    #[test]
    fn rejects_out_of_range_developer_points() {
        let file = write_sprint("[TIME]\ndays = 10\nperiods = 2\n\n[TEAM]\nmallory = 341\n");
        let err = SprintConfig::load(file.path()).unwrap_err();
        assert!(
            matches!(err, SprintError::IllegalValue { ref key, .. } if key == "TEAM.mallory")
        );
    }

    #[test]
    fn missing_tables_are_a_parse_error() {
        let file = write_sprint("[TEAM]\nalice = 5\n");
        assert!(matches!(SprintConfig::load(file.path()).unwrap_err(), SprintError::Parse(_)));

        let file = write_sprint("[TIME]\ndays = 5\nperiods = 0\n");
        assert!(matches!(SprintConfig::load(file.path()).unwrap_err(), SprintError::Parse(_)));
    }

    #[test]
    fn empty_team_means_zero_capacity() {
        let file = write_sprint("[TIME]\ndays = 5\nperiods = 0\n\n[TEAM]\n");
        let sprint = SprintConfig::load(file.path()).unwrap();
        assert_eq!(sprint.capacity, 0);
    }
}
