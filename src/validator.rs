use crate::concepts::CanonicalConcept;
use crate::config::ValidationConfig;
use crate::period::{Duration, FinancialPeriod, FinancialValue, ReconciledCompany};
use chrono::{Months, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// No value at all
    Missing,
    /// A balance kept more than one value; the resolver should have collapsed it
    MultiplePointInTime { count: usize },
    /// The single value held is cumulative (or unclassifiable)
    NoDiscreteQuarter { duration: Option<Duration> },
    /// Several cumulative values and no discrete quarter among them
    AmbiguousDurations { durations: Vec<Option<Duration>> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub period_end: NaiveDate,
    pub period_label: String,
    pub concept: CanonicalConcept,
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}: ", self.period_label, self.period_end, self.concept)?;
        match &self.kind {
            IssueKind::Missing => write!(f, "no values"),
            IssueKind::MultiplePointInTime { count } => {
                write!(f, "{} point-in-time values", count)
            }
            IssueKind::NoDiscreteQuarter { duration } => {
                write!(f, "only a {:?} value, no discrete quarter", duration)
            }
            IssueKind::AmbiguousDurations { durations } => {
                write!(f, "values {:?} but no discrete quarter", durations)
            }
        }
    }
}

/// Diagnostics for one reconciled company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub cik: u64,
    pub periods_checked: usize,
    /// Company is on the exemption list and is never flagged
    pub exempt: bool,
    pub issues: Vec<ValidationIssue>,
    /// Name of the raw company-facts document to retain for manual review,
    /// present only when the company is flagged
    pub source_handle: Option<String>,
}

impl ValidationReport {
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    pub fn is_flagged(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("## CIK {:0>10}\n\n", self.cik));
        output.push_str(&format!("**Periods checked:** {}\n\n", self.periods_checked));

        if self.exempt {
            output.push_str("Exempt from review.\n");
            return output;
        }

        if self.issues.is_empty() {
            output.push_str("No issues.\n");
            return output;
        }

        output.push_str(&format!("**Issues:** {}\n\n", self.issue_count()));
        for issue in &self.issues {
            output.push_str(&format!("- {}\n", issue));
        }
        if let Some(handle) = &self.source_handle {
            output.push_str(&format!("\nRetain `{}` for inspection.\n", handle));
        }

        output
    }
}

/// Post-hoc scan of a frozen company for concepts left unresolved.
pub struct Validator<'a> {
    config: &'a ValidationConfig,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, company: &ReconciledCompany) -> ValidationReport {
        let cik = company.cik();

        if self.config.is_exempt(cik) {
            debug!("CIK {}: exempt from validation", company.cik_padded());
            return ValidationReport {
                cik,
                periods_checked: 0,
                exempt: true,
                issues: Vec::new(),
                source_handle: None,
            };
        }

        let checked = self.periods_in_scope(company.periods());
        let issues: Vec<ValidationIssue> = checked
            .iter()
            .flat_map(|period| {
                CanonicalConcept::ALL
                    .into_iter()
                    .filter_map(move |concept| Self::check(period, concept))
            })
            .collect();

        let source_handle = (!issues.is_empty())
            .then(|| format!("CIK{}.json", company.cik_padded()));

        if !issues.is_empty() {
            info!(
                "CIK {}: {} unresolved (period, concept) pairs across {} periods",
                company.cik_padded(),
                issues.len(),
                checked.len()
            );
        }

        ValidationReport {
            cik,
            periods_checked: checked.len(),
            exempt: false,
            issues,
            source_handle,
        }
    }

    /// Periods inside the recency window, minus the warm-up periods at the
    /// start of the history.
    fn periods_in_scope<'p>(&self, periods: &'p [FinancialPeriod]) -> Vec<&'p FinancialPeriod> {
        let Some(as_of) = self.config.as_of.or_else(|| periods.last().map(|p| p.end)) else {
            return Vec::new();
        };
        let cutoff = as_of
            .checked_sub_months(Months::new(12 * self.config.recency_years))
            .unwrap_or(NaiveDate::MIN);

        periods
            .iter()
            .skip(self.config.warmup_periods)
            .filter(|p| p.end >= cutoff && p.end <= as_of)
            .collect()
    }

    fn check(period: &FinancialPeriod, concept: CanonicalConcept) -> Option<ValidationIssue> {
        let values = period.values(concept);

        let kind = if values.is_empty() {
            IssueKind::Missing
        } else if concept.is_point_in_time() {
            if values.len() == 1 {
                return None;
            }
            IssueKind::MultiplePointInTime {
                count: values.len(),
            }
        } else if values.iter().any(FinancialValue::is_discrete_quarter) {
            return None;
        } else if values.len() == 1 {
            IssueKind::NoDiscreteQuarter {
                duration: values[0].duration,
            }
        } else {
            IssueKind::AmbiguousDurations {
                durations: values.iter().map(|v| v.duration).collect(),
            }
        };

        Some(ValidationIssue {
            period_end: period.end,
            period_label: period.label(),
            concept,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::ValueOrigin;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn value(concept: CanonicalConcept, val: f64, duration: Option<Duration>) -> FinancialValue {
        FinancialValue {
            concept,
            taxonomy: "us-gaap".to_string(),
            alias: concept.name().to_string(),
            weight: 8,
            value: val,
            duration,
            fiscal_year: Some(2023),
            accession: None,
            origin: ValueOrigin::Reported,
        }
    }

    /// A period with a discrete quarter or a balance for every concept.
    fn complete_period(end: NaiveDate) -> FinancialPeriod {
        let mut period = FinancialPeriod::new(42, end, end);
        for concept in CanonicalConcept::ALL {
            let duration = (!concept.is_point_in_time()).then_some(Duration::OneQuarter);
            period
                .values_mut(concept)
                .push(value(concept, 1.0, duration));
        }
        period
    }

    fn quarterly_history(count: usize) -> Vec<FinancialPeriod> {
        let mut end = date(2021, 3, 31);
        let mut periods = Vec::new();
        for _ in 0..count {
            periods.push(complete_period(end));
            end = end
                .succ_opt()
                .and_then(|d| d.checked_add_months(Months::new(3)))
                .and_then(|d| d.pred_opt())
                .unwrap();
        }
        periods
    }

    fn company(periods: Vec<FinancialPeriod>) -> ReconciledCompany {
        ReconciledCompany::freeze(42, "Test Corp".to_string(), periods)
    }

    #[test]
    fn test_complete_company_has_no_issues() {
        let config = ValidationConfig::default();
        let report = Validator::new(&config).validate(&company(quarterly_history(6)));

        assert_eq!(report.periods_checked, 4);
        assert_eq!(report.issue_count(), 0);
        assert!(!report.is_flagged());
        assert!(report.source_handle.is_none());
    }

    #[test]
    fn test_each_issue_kind_is_reported() {
        let mut periods = quarterly_history(4);

        periods[2].values_mut(CanonicalConcept::NetIncome).clear();
        periods[2]
            .values_mut(CanonicalConcept::Assets)
            .push(value(CanonicalConcept::Assets, 2.0, None));

        let revenue = periods[3].values_mut(CanonicalConcept::Revenue);
        revenue.clear();
        revenue.push(value(CanonicalConcept::Revenue, 9.0, Some(Duration::Year)));

        let cash_flow = periods[3].values_mut(CanonicalConcept::CashFlowOperating);
        cash_flow.clear();
        cash_flow.push(value(
            CanonicalConcept::CashFlowOperating,
            3.0,
            Some(Duration::TwoQuarters),
        ));
        cash_flow.push(value(
            CanonicalConcept::CashFlowOperating,
            4.0,
            Some(Duration::Other),
        ));

        let config = ValidationConfig::default();
        let report = Validator::new(&config).validate(&company(periods));

        let kinds: Vec<(CanonicalConcept, IssueKind)> = report
            .issues
            .iter()
            .map(|i| (i.concept, i.kind.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (CanonicalConcept::NetIncome, IssueKind::Missing),
                (
                    CanonicalConcept::Assets,
                    IssueKind::MultiplePointInTime { count: 2 }
                ),
                (
                    CanonicalConcept::Revenue,
                    IssueKind::NoDiscreteQuarter {
                        duration: Some(Duration::Year)
                    }
                ),
                (
                    CanonicalConcept::CashFlowOperating,
                    IssueKind::AmbiguousDurations {
                        durations: vec![Some(Duration::TwoQuarters), Some(Duration::Other)]
                    }
                ),
            ]
        );
        assert_eq!(report.source_handle.as_deref(), Some("CIK0000000042.json"));
        assert!(report.to_markdown().contains("Retain `CIK0000000042.json`"));
    }

    #[test]
    fn test_warmup_periods_are_not_checked() {
        let mut periods = quarterly_history(3);
        periods[0].values_mut(CanonicalConcept::Revenue).clear();
        periods[1].values_mut(CanonicalConcept::Revenue).clear();

        let config = ValidationConfig::default();
        let report = Validator::new(&config).validate(&company(periods));

        assert_eq!(report.periods_checked, 1);
        assert!(!report.is_flagged());
    }

    #[test]
    fn test_old_periods_outside_recency_window() {
        let mut periods = quarterly_history(12);
        periods[3].values_mut(CanonicalConcept::Equity).clear();

        let config = ValidationConfig {
            recency_years: 1,
            ..ValidationConfig::default()
        };
        let report = Validator::new(&config).validate(&company(periods));

        // Newest end 2023-12-31; the window reaches back to 2022-12-31
        assert_eq!(report.periods_checked, 5);
        assert!(!report.is_flagged());
    }

    #[test]
    fn test_exempt_company_is_not_flagged() {
        let mut periods = quarterly_history(4);
        periods[3].values_mut(CanonicalConcept::Revenue).clear();

        let mut config = ValidationConfig::default();
        config.exempt_ciks.insert(42);
        assert!(config.is_exempt(42));
        let report = Validator::new(&config).validate(&company(periods));

        assert!(report.exempt);
        assert_eq!(report.periods_checked, 0);
        assert!(!report.is_flagged());
        assert!(report.source_handle.is_none());
        assert!(report.to_markdown().contains("Exempt"));
    }
}
