use crate::accumulator_builder::{AccumulatorBuilder, CandidateFilters, OddsCategory};
use crate::challenge::{
    DayBucketer, RolloverChallenge, DEFAULT_CHALLENGE_DAYS, DEFAULT_INITIAL_AMOUNT,
    DEFAULT_ROLLOVER_TARGET, DEFAULT_ROLLOVER_TOLERANCE,
};
use crate::combination_finder::{CombinationFinder, DEFAULT_MAX_RESULTS};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputCfg,
    #[serde(default)]
    pub engine: EngineCfg,
    #[serde(default)]
    pub rollover: RolloverCfg,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputCfg {
    #[serde(default = "default_predictions_path")]
    pub predictions_path: String,
}

impl Default for InputCfg {
    fn default() -> Self {
        Self {
            predictions_path: default_predictions_path(),
        }
    }
}

fn default_predictions_path() -> String {
    "predictions.json".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineCfg {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "OddsCategory::defaults")]
    pub categories: Vec<OddsCategory>,
    #[serde(default)]
    pub max_odds: Option<f64>,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            categories: OddsCategory::defaults(),
            max_odds: None,
        }
    }
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RolloverCfg {
    #[serde(default = "default_initial_amount")]
    pub initial_amount: f64,
    #[serde(default = "default_length")]
    pub length: u32,
    #[serde(default = "default_rollover_target")]
    pub target: f64,
    #[serde(default = "default_rollover_tolerance")]
    pub tolerance: f64,
    /// Minutes east of UTC used to cut predictions into days.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Earliest prediction day when unset.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

impl Default for RolloverCfg {
    fn default() -> Self {
        Self {
            initial_amount: default_initial_amount(),
            length: default_length(),
            target: default_rollover_target(),
            tolerance: default_rollover_tolerance(),
            utc_offset_minutes: 0,
            start_date: None,
        }
    }
}

fn default_initial_amount() -> f64 {
    DEFAULT_INITIAL_AMOUNT
}
fn default_length() -> u32 {
    DEFAULT_CHALLENGE_DAYS
}
fn default_rollover_target() -> f64 {
    DEFAULT_ROLLOVER_TARGET
}
fn default_rollover_tolerance() -> f64 {
    DEFAULT_ROLLOVER_TOLERANCE
}

impl AppConfig {
    /// Optional config file, overridden by `ROLLOVER__SECTION__KEY` env vars.
    pub fn load(path: &str) -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("ROLLOVER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("building config")?;

        let app: AppConfig = cfg.try_deserialize().context("deserializing config")?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.input.predictions_path.is_empty(),
            "input.predictions_path missing"
        );
        anyhow::ensure!(self.engine.max_results > 0, "engine.max_results must be > 0");
        anyhow::ensure!(
            !self.engine.categories.is_empty(),
            "engine.categories must not be empty"
        );
        for category in &self.engine.categories {
            anyhow::ensure!(
                category.target.is_finite() && category.target > 1.0,
                "category {} target must be > 1",
                category.name
            );
            anyhow::ensure!(
                category.tolerance.is_finite() && category.tolerance >= 0.0,
                "category {} tolerance must be >= 0",
                category.name
            );
        }
        anyhow::ensure!(
            self.rollover.initial_amount.is_finite() && self.rollover.initial_amount > 0.0,
            "rollover.initial_amount must be > 0"
        );
        anyhow::ensure!(self.rollover.length > 0, "rollover.length must be > 0");
        anyhow::ensure!(
            self.rollover.target.is_finite() && self.rollover.target > 1.0,
            "rollover.target must be > 1"
        );
        anyhow::ensure!(
            self.rollover.tolerance.is_finite() && self.rollover.tolerance >= 0.0,
            "rollover.tolerance must be >= 0"
        );
        self.bucketer()?;
        Ok(())
    }

    pub fn finder(&self) -> CombinationFinder {
        CombinationFinder::new().with_max_results(self.engine.max_results)
    }

    pub fn accumulator_builder(&self) -> AccumulatorBuilder {
        let filters = CandidateFilters {
            statuses: Vec::new(),
            max_odds: self.engine.max_odds,
        };
        AccumulatorBuilder::new(self.engine.categories.clone(), filters).with_finder(self.finder())
    }

    pub fn bucketer(&self) -> Result<DayBucketer> {
        DayBucketer::from_offset_minutes(self.rollover.utc_offset_minutes).with_context(|| {
            format!(
                "rollover.utc_offset_minutes {} out of range",
                self.rollover.utc_offset_minutes
            )
        })
    }

    pub fn challenge(&self, start_date: NaiveDate) -> Result<RolloverChallenge> {
        Ok(RolloverChallenge::new(start_date)
            .with_length(self.rollover.length)
            .with_target(self.rollover.target, self.rollover.tolerance)
            .with_initial_amount(self.rollover.initial_amount)
            .with_bucketer(self.bucketer()?)
            .with_finder(self.finder()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::env;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.engine.categories.len(), 3);
        assert_eq!(cfg.rollover.length, 10);
        assert_eq!(cfg.bucketer().unwrap(), DayBucketer::default());
    }

    #[test]
    fn test_toml_sections() {
        let raw = r#"
            [engine]
            max_results = 3

            [[engine.categories]]
            name = "3x"
            target = 3.0
            tolerance = 0.4

            [rollover]
            initial_amount = 25.0
            length = 7
            utc_offset_minutes = 120
            start_date = "2024-03-01"
        "#;

        let cfg: AppConfig = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.engine.max_results, 3);
        assert_eq!(cfg.engine.categories, vec![OddsCategory::new("3x", 3.0, 0.4)]);
        assert_eq!(cfg.rollover.length, 7);
        assert_eq!(cfg.rollover.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!((cfg.rollover.target - 2.0).abs() < 1e-9);
        assert_eq!(cfg.input.predictions_path, "predictions.json");

        let challenge = cfg.challenge(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).unwrap();
        assert_eq!(challenge.length, 7);
        assert!((challenge.initial_amount - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_validation_catches_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.rollover.utc_offset_minutes = 24 * 60;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.engine.categories.push(OddsCategory::new("flat", 1.0, 0.1));
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.rollover.initial_amount = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_env_var_override() {
        env::set_var("ROLLOVER__ROLLOVER__INITIAL_AMOUNT", "50");

        let cfg = AppConfig::load("does-not-exist").unwrap();
        assert!((cfg.rollover.initial_amount - 50.0).abs() < 1e-9);

        env::remove_var("ROLLOVER__ROLLOVER__INITIAL_AMOUNT");
    }
}
