use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Stores user preferences and the tunables of the insight engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "Config::default_locale")]
    pub locale: String,
    #[serde(default = "Config::default_currency")]
    pub currency: String,
    #[serde(default)]
    pub insights: InsightSettings,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for the JSON ledger store.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: Self::default_locale(),
            currency: Self::default_currency(),
            insights: InsightSettings::default(),
            data_dir: None,
        }
    }
}

impl Config {
    pub fn default_locale() -> String {
        "en-US".into()
    }

    pub fn default_currency() -> String {
        "USD".into()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "currency",
                reason: "must not be empty".into(),
            });
        }
        self.insights.validate()
    }

    /// Directory holding ledger collections. Defaults to `<data dir>/finsight`.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(path) = &self.data_dir {
            return path.clone();
        }

        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("finsight")
    }
}

/// Longest trailing window accepted for trends, ten years of months.
pub const MAX_TREND_WINDOW_MONTHS: u32 = 120;

/// Thresholds and windows used when deriving insights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightSettings {
    /// Current-month spend must exceed the trailing average by more than this to be flagged.
    #[serde(default = "InsightSettings::default_unusual_threshold")]
    pub unusual_spending_threshold_percent: f64,
    #[serde(default = "InsightSettings::default_trend_epsilon")]
    pub trend_epsilon_percent: f64,
    /// Trailing months considered for trends, including the current one.
    #[serde(default = "InsightSettings::default_trend_window")]
    pub trend_window_months: u32,
    #[serde(default = "InsightSettings::default_top_limit")]
    pub top_categories_limit: usize,
    #[serde(default)]
    pub include_pending: bool,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            unusual_spending_threshold_percent: Self::default_unusual_threshold(),
            trend_epsilon_percent: Self::default_trend_epsilon(),
            trend_window_months: Self::default_trend_window(),
            top_categories_limit: Self::default_top_limit(),
            include_pending: false,
        }
    }
}

impl InsightSettings {
    pub fn default_unusual_threshold() -> f64 {
        50.0
    }

    pub fn default_trend_epsilon() -> f64 {
        2.0
    }

    pub fn default_trend_window() -> u32 {
        6
    }

    pub fn default_top_limit() -> usize {
        5
    }

    pub fn with_unusual_threshold(mut self, percent: f64) -> Self {
        self.unusual_spending_threshold_percent = percent;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.unusual_spending_threshold_percent.is_finite()
            || self.unusual_spending_threshold_percent < 0.0
        {
            return Err(ConfigError::Invalid {
                field: "unusual_spending_threshold_percent",
                reason: "must be a non-negative number".into(),
            });
        }
        if !self.trend_epsilon_percent.is_finite() || self.trend_epsilon_percent < 0.0 {
            return Err(ConfigError::Invalid {
                field: "trend_epsilon_percent",
                reason: "must be a non-negative number".into(),
            });
        }
        if self.trend_window_months < 2 {
            return Err(ConfigError::Invalid {
                field: "trend_window_months",
                reason: "needs at least two months to compare".into(),
            });
        }
        if self.trend_window_months > MAX_TREND_WINDOW_MONTHS {
            return Err(ConfigError::Invalid {
                field: "trend_window_months",
                reason: format!("must be at most {MAX_TREND_WINDOW_MONTHS}"),
            });
        }
        if self.top_categories_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "top_categories_limit",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
