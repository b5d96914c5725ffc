use std::path::Path;

use anyhow::{ensure, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upper bound for any day threshold; keeps day arithmetic inside chrono's range.
pub const MAX_THRESHOLD_DAYS: i64 = 36_500;

/// Silence and stage rules for one action-required panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub project_silence_days: i64,
    pub lead_silence_days: i64,
    /// Lead stages where a silent client counts as a risk.
    pub lead_active_stages: Vec<String>,
    /// Stages that usually wait on client feedback.
    pub bottleneck_stages: Vec<String>,
}

impl RiskThresholds {
    fn validate(&self, section: &str) -> anyhow::Result<()> {
        for (name, days) in [
            ("project_silence_days", self.project_silence_days),
            ("lead_silence_days", self.lead_silence_days),
        ] {
            ensure!(
                (0..=MAX_THRESHOLD_DAYS).contains(&days),
                "[{section}] {name} must be between 0 and {MAX_THRESHOLD_DAYS}, got {days}"
            );
        }
        Ok(())
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            project_silence_days: 3,
            lead_silence_days: 5,
            lead_active_stages: vec![
                "Pitched Lead".to_string(),
                "Requirement Discussion".to_string(),
            ],
            bottleneck_stages: vec!["Interviewing".to_string(), "Client Review".to_string()],
        }
    }
}

/// Day boundaries for the admin follow-up tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandThresholds {
    pub follow_up_days: i64,
    pub action_needed_days: i64,
    pub dormant_days: i64,
}

impl BandThresholds {
    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            0 <= self.follow_up_days
                && self.follow_up_days <= self.action_needed_days
                && self.action_needed_days <= self.dormant_days
                && self.dormant_days <= MAX_THRESHOLD_DAYS,
            "[tracker] expected 0 <= follow_up_days <= action_needed_days <= dormant_days \
             <= {MAX_THRESHOLD_DAYS}, got {}/{}/{}",
            self.follow_up_days,
            self.action_needed_days,
            self.dormant_days
        );
        Ok(())
    }
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            follow_up_days: 3,
            action_needed_days: 7,
            dormant_days: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub recruiter: RiskThresholds,
    pub sales: RiskThresholds,
    pub tracker: BandThresholds,
    pub holidays: Vec<NaiveDate>,
}

impl Config {
    /// Defaults when no path is given; an explicit path must exist, parse and validate.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.database.max_connections > 0,
            "[database] max_connections must be at least 1"
        );
        self.recruiter.validate("recruiter")?;
        self.sales.validate("sales")?;
        self.tracker.validate()
    }
}
