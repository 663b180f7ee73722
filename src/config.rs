use crate::error::{ReconcileError, Result};
use crate::period::Duration;
use chrono::NaiveDate;
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive day-count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DayBand {
    pub min: i64,
    pub max: i64,
}

impl DayBand {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, days: i64) -> bool {
        (self.min..=self.max).contains(&days)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DurationBands {
    #[schemars(description = "Span in days classified as a single quarter")]
    pub one_quarter: DayBand,

    #[schemars(description = "Span in days classified as a half year")]
    pub two_quarters: DayBand,

    #[schemars(description = "Span in days classified as nine months")]
    pub three_quarters: DayBand,

    #[schemars(description = "Span in days classified as a full fiscal year")]
    pub year: DayBand,
}

impl Default for DurationBands {
    fn default() -> Self {
        Self {
            one_quarter: DayBand::new(60, 120),
            two_quarters: DayBand::new(150, 210),
            three_quarters: DayBand::new(240, 300),
            year: DayBand::new(310, 400),
        }
    }
}

impl DurationBands {
    /// Maps a start-to-end day span onto a [`Duration`]. Spans outside every
    /// band are `Duration::Other`.
    pub fn classify(&self, days: i64) -> Duration {
        self.ranked()
            .into_iter()
            .find(|(_, band)| band.contains(days))
            .map(|(duration, _)| duration)
            .unwrap_or(Duration::Other)
    }

    fn ranked(&self) -> [(Duration, DayBand); 4] {
        [
            (Duration::OneQuarter, self.one_quarter),
            (Duration::TwoQuarters, self.two_quarters),
            (Duration::ThreeQuarters, self.three_quarters),
            (Duration::Year, self.year),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let ranked = self.ranked();

        for (duration, band) in &ranked {
            if band.min > band.max {
                return Err(ReconcileError::InvalidDurationBand {
                    name: duration.to_string(),
                    min: band.min,
                    max: band.max,
                });
            }
        }

        for pair in ranked.windows(2) {
            let (shorter, shorter_band) = pair[0];
            let (longer, longer_band) = pair[1];
            if shorter_band.max >= longer_band.min {
                return Err(ReconcileError::OverlappingDurationBands {
                    first: shorter.to_string(),
                    second: longer.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Where the period skeleton is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnchorSpec {
    pub taxonomy: String,
    pub tag: String,
    pub unit: String,
}

impl Default for AnchorSpec {
    fn default() -> Self {
        Self {
            taxonomy: "us-gaap".to_string(),
            tag: "Assets".to_string(),
            unit: "USD".to_string(),
        }
    }
}

impl AnchorSpec {
    pub fn path(&self) -> String {
        format!("facts/{}/{}/units/{}", self.taxonomy, self.tag, self.unit)
    }
}

/// Window, relative to a period end, inside which a point-in-time fact is
/// attributed to that period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InstantMatchWindow {
    pub days_before: i64,
    pub days_after: i64,
}

impl Default for InstantMatchWindow {
    fn default() -> Self {
        Self {
            days_before: 7,
            days_after: 60,
        }
    }
}

impl InstantMatchWindow {
    /// `offset` is fact end minus period end, in days.
    pub fn contains(&self, offset: i64) -> bool {
        (-self.days_before..=self.days_after).contains(&offset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ValidationConfig {
    #[schemars(description = "Only periods ending within this many years of `as_of` are checked")]
    pub recency_years: u32,

    #[schemars(
        description = "Number of earliest periods skipped; they lack the history needed for quarter derivation"
    )]
    pub warmup_periods: usize,

    #[schemars(
        description = "Reference date for the recency window. Defaults to the company's newest period end."
    )]
    pub as_of: Option<NaiveDate>,

    #[schemars(description = "CIKs with documented disclosure gaps that are never flagged")]
    pub exempt_ciks: BTreeSet<u64>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            recency_years: 10,
            warmup_periods: 2,
            as_of: None,
            exempt_ciks: BTreeSet::new(),
        }
    }
}

impl ValidationConfig {
    pub fn is_exempt(&self, cik: u64) -> bool {
        self.exempt_ciks.contains(&cik)
    }
}

/// Tunable thresholds for the reconciliation passes.
///
/// The day-count tolerances are empirical; every one of them can be
/// overridden from JSON, and unspecified fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReconcilerConfig {
    #[schemars(
        description = "Report forms accepted for both the skeleton and ingestion, e.g. 10-K, 10-Q"
    )]
    pub allowed_forms: Vec<String>,

    pub anchor: AnchorSpec,

    #[schemars(description = "Anchor end dates this close together are one period (filing noise)")]
    pub dedup_window_days: i64,

    #[schemars(
        description = "Largest gap between a chained quarter-end and a raw end date before the entry is re-snapped"
    )]
    pub alignment_tolerance_days: i64,

    pub duration_bands: DurationBands,

    pub instant_match_window: InstantMatchWindow,

    pub validation: ValidationConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            allowed_forms: vec!["10-K".to_string(), "10-Q".to_string()],
            anchor: AnchorSpec::default(),
            dedup_window_days: 1,
            alignment_tolerance_days: 180,
            duration_bands: DurationBands::default(),
            instant_match_window: InstantMatchWindow::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl ReconcilerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_allowed_form(&self, form: &str) -> bool {
        self.allowed_forms.iter().any(|f| f == form)
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_forms.is_empty() {
            return Err(ReconcileError::InvalidConfig(
                "allowed_forms must name at least one report form".to_string(),
            ));
        }

        if self.dedup_window_days < 0 {
            return Err(ReconcileError::InvalidConfig(format!(
                "dedup_window_days must be non-negative (got {})",
                self.dedup_window_days
            )));
        }

        if self.alignment_tolerance_days <= 0 {
            return Err(ReconcileError::InvalidConfig(format!(
                "alignment_tolerance_days must be positive (got {})",
                self.alignment_tolerance_days
            )));
        }

        let window = self.instant_match_window;
        if window.days_before < 0 || window.days_after < 0 {
            return Err(ReconcileError::InvalidConfig(format!(
                "instant_match_window bounds must be non-negative (got -{}..+{})",
                window.days_before, window.days_after
            )));
        }

        if self.validation.recency_years == 0 {
            return Err(ReconcileError::InvalidConfig(
                "validation.recency_years must be at least 1".to_string(),
            ));
        }

        if self.dedup_window_days >= 45 {
            warn!(
                "dedup_window_days of {} may merge distinct fiscal quarters",
                self.dedup_window_days
            );
        }

        self.duration_bands.validate()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReconcilerConfig)
    }

    pub fn schema_as_json() -> Result<String> {
        let schema = Self::generate_json_schema();
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}
