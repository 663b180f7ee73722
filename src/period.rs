use crate::concepts::{Alias, CanonicalConcept};
use crate::schema::FactEntry;
use crate::utils::format_cik;
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Span covered by a duration-bearing observation.
///
/// The four ranked variants are ordered by [`Duration::rank`]; `Other` has no
/// rank and never takes part in adjacency or derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Duration {
    OneQuarter,
    TwoQuarters,
    ThreeQuarters,
    Year,
    Other,
}

impl Duration {
    pub fn rank(self) -> Option<u8> {
        match self {
            Self::OneQuarter => Some(1),
            Self::TwoQuarters => Some(2),
            Self::ThreeQuarters => Some(3),
            Self::Year => Some(4),
            Self::Other => None,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(Self::OneQuarter),
            2 => Some(Self::TwoQuarters),
            3 => Some(Self::ThreeQuarters),
            4 => Some(Self::Year),
            _ => None,
        }
    }

    /// The duration whose rank is exactly one less, if any.
    pub fn shorter(self) -> Option<Self> {
        self.rank()
            .and_then(|r| r.checked_sub(1))
            .and_then(Self::from_rank)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OneQuarter => "OneQuarter",
            Self::TwoQuarters => "TwoQuarters",
            Self::ThreeQuarters => "ThreeQuarters",
            Self::Year => "Year",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum CalendarQuarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl CalendarQuarter {
    pub fn from_month(month: u32) -> Self {
        match month {
            1..=3 => Self::Q1,
            4..=6 => Self::Q2,
            7..=9 => Self::Q3,
            _ => Self::Q4,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        }
    }
}

impl fmt::Display for CalendarQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

/// Audit trail of a derived discrete quarter: the two cumulative totals it was
/// subtracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DerivationDetails {
    pub long_value: f64,
    pub long_duration: Duration,
    pub long_accession: Option<String>,
    pub short_value: f64,
    pub short_duration: Duration,
    pub short_accession: Option<String>,
    /// End date of the period the shorter total was taken from
    pub antecedent_end: NaiveDate,
    pub logic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "origin", rename_all = "PascalCase")]
pub enum ValueOrigin {
    /// Taken as filed
    Reported,
    /// Computed by subtracting consecutive cumulative totals
    Derived(DerivationDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialValue {
    pub concept: CanonicalConcept,
    pub taxonomy: String,
    pub alias: String,
    pub weight: u32,
    pub value: f64,
    /// `None` for point-in-time concepts
    pub duration: Option<Duration>,
    /// Fiscal year of the filing that disclosed the value; `None` when derived
    pub fiscal_year: Option<i32>,
    pub accession: Option<String>,
    pub origin: ValueOrigin,
}

impl FinancialValue {
    pub fn reported(alias: &Alias, entry: &FactEntry, duration: Option<Duration>) -> Self {
        Self {
            concept: alias.concept,
            taxonomy: alias.taxonomy.clone(),
            alias: alias.tag.clone(),
            weight: alias.weight,
            value: entry.val,
            duration,
            fiscal_year: entry.fy,
            accession: Some(entry.accn.clone()).filter(|a| !a.is_empty()),
            origin: ValueOrigin::Reported,
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.origin, ValueOrigin::Derived(_))
    }

    pub fn is_discrete_quarter(&self) -> bool {
        self.duration == Some(Duration::OneQuarter)
    }
}

/// One reporting period of one company, labelled with the calendar quarter its
/// end date was aligned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialPeriod {
    pub cik: u64,
    /// Reporting end date as filed by the company
    pub end: NaiveDate,
    /// End dates collapsed into this period as filing noise
    pub alternate_ends: Vec<NaiveDate>,
    /// Calendar-quarter-end the period was aligned to
    pub calendar_end: NaiveDate,
    pub calendar_year: i32,
    pub calendar_quarter: CalendarQuarter,
    pub fiscal_year: Option<i32>,
    pub fiscal_period: Option<String>,
    pub form: String,
    values: BTreeMap<CanonicalConcept, Vec<FinancialValue>>,
}

impl FinancialPeriod {
    pub fn new(cik: u64, end: NaiveDate, calendar_end: NaiveDate) -> Self {
        let values = CanonicalConcept::ALL
            .iter()
            .map(|&concept| (concept, Vec::new()))
            .collect();

        Self {
            cik,
            end,
            alternate_ends: Vec::new(),
            calendar_end,
            calendar_year: calendar_end.year(),
            calendar_quarter: CalendarQuarter::from_month(calendar_end.month()),
            fiscal_year: None,
            fiscal_period: None,
            form: String::new(),
            values,
        }
    }

    /// True if a duration fact ending on `date` belongs to this period.
    pub fn matches_end(&self, date: NaiveDate) -> bool {
        self.end == date || self.alternate_ends.contains(&date)
    }

    pub fn values(&self, concept: CanonicalConcept) -> &[FinancialValue] {
        self.values.get(&concept).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_values(&self) -> impl Iterator<Item = &FinancialValue> {
        self.values.values().flatten()
    }

    pub(crate) fn values_mut(&mut self, concept: CanonicalConcept) -> &mut Vec<FinancialValue> {
        self.values.entry(concept).or_default()
    }

    pub fn value_with_duration(
        &self,
        concept: CanonicalConcept,
        duration: Duration,
    ) -> Option<&FinancialValue> {
        self.values(concept)
            .iter()
            .find(|v| v.duration == Some(duration))
    }

    /// The discrete-quarter amount of a flow concept, or the balance of a
    /// point-in-time concept.
    pub fn quarter_value(&self, concept: CanonicalConcept) -> Option<f64> {
        if concept.is_point_in_time() {
            self.values(concept).first().map(|v| v.value)
        } else {
            self.value_with_duration(concept, Duration::OneQuarter)
                .map(|v| v.value)
        }
    }

    /// Calendar label such as `2023Q2`.
    pub fn label(&self) -> String {
        format!("{}{}", self.calendar_year, self.calendar_quarter)
    }
}

/// The finished, read-only period list of one company.
///
/// Produced once every mutating pass has run; from here on values can only be
/// read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReconciledCompany {
    cik: u64,
    entity_name: String,
    periods: Vec<FinancialPeriod>,
}

impl ReconciledCompany {
    pub(crate) fn freeze(cik: u64, entity_name: String, periods: Vec<FinancialPeriod>) -> Self {
        Self {
            cik,
            entity_name,
            periods,
        }
    }

    pub fn cik(&self) -> u64 {
        self.cik
    }

    pub fn cik_padded(&self) -> String {
        format_cik(self.cik)
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn periods(&self) -> &[FinancialPeriod] {
        &self.periods
    }

    pub fn into_periods(self) -> Vec<FinancialPeriod> {
        self.periods
    }

    /// First period labelled with the quarter. A transition period can share
    /// its calendar quarter with the next period.
    pub fn period_for_quarter(
        &self,
        calendar_year: i32,
        quarter: CalendarQuarter,
    ) -> Option<&FinancialPeriod> {
        self.periods
            .iter()
            .find(|p| p.calendar_year == calendar_year && p.calendar_quarter == quarter)
    }

    pub fn period_ending(&self, end: NaiveDate) -> Option<&FinancialPeriod> {
        self.periods.iter().find(|p| p.matches_end(end))
    }
}
