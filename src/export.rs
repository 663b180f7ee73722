use crate::concepts::CanonicalConcept;
use crate::error::{ReconcileError, Result};
use crate::period::{CalendarQuarter, Duration, ReconciledCompany, ValueOrigin};
use chrono::NaiveDate;
use csv::WriterBuilder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One (period, concept, value) row of a reconciled company, flattened for
/// spreadsheets and downstream loaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodRecord {
    pub cik: String,
    pub period_end: NaiveDate,
    pub calendar_end: NaiveDate,
    pub calendar_year: i32,
    pub calendar_quarter: CalendarQuarter,
    pub concept: CanonicalConcept,
    pub duration: Option<Duration>,
    pub value: f64,
    pub taxonomy: String,
    pub alias: String,
    pub fiscal_year: Option<i32>,
    pub accession: Option<String>,
    pub derived: bool,
    pub logic: Option<String>,
}

/// Rows in period order, then concept order.
pub fn records(company: &ReconciledCompany) -> Vec<PeriodRecord> {
    let cik = company.cik_padded();

    company
        .periods()
        .iter()
        .flat_map(|period| {
            let cik = cik.clone();
            period.all_values().map(move |value| PeriodRecord {
                cik: cik.clone(),
                period_end: period.end,
                calendar_end: period.calendar_end,
                calendar_year: period.calendar_year,
                calendar_quarter: period.calendar_quarter,
                concept: value.concept,
                duration: value.duration,
                value: value.value,
                taxonomy: value.taxonomy.clone(),
                alias: value.alias.clone(),
                fiscal_year: value.fiscal_year,
                accession: value.accession.clone(),
                derived: value.is_derived(),
                logic: match &value.origin {
                    ValueOrigin::Derived(details) => Some(details.logic.clone()),
                    ValueOrigin::Reported => None,
                },
            })
        })
        .collect()
}

pub fn to_json(company: &ReconciledCompany) -> Result<String> {
    Ok(serde_json::to_string_pretty(&records(company))?)
}

/// One header row named after the [`PeriodRecord`] fields, then one row per
/// record. A company without values yields an empty document.
pub fn to_csv(company: &ReconciledCompany) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    for record in records(company) {
        writer.serialize(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReconcileError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| {
        ReconcileError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{DerivationDetails, FinancialPeriod, FinancialValue};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn company() -> ReconciledCompany {
        let end = date(2023, 6, 30);
        let mut period = FinancialPeriod::new(320193, date(2023, 7, 1), end);
        period.values_mut(CanonicalConcept::Revenue).push(FinancialValue {
            concept: CanonicalConcept::Revenue,
            taxonomy: "us-gaap".to_string(),
            alias: "Revenues".to_string(),
            weight: 4,
            value: 120.0,
            duration: Some(Duration::OneQuarter),
            fiscal_year: None,
            accession: None,
            origin: ValueOrigin::Derived(DerivationDetails {
                long_value: 220.0,
                long_duration: Duration::TwoQuarters,
                long_accession: None,
                short_value: 100.0,
                short_duration: Duration::OneQuarter,
                short_accession: None,
                antecedent_end: date(2023, 4, 1),
                logic: "TwoQuarters Revenues minus OneQuarter ending 2023-04-01".to_string(),
            }),
        });
        period.values_mut(CanonicalConcept::Assets).push(FinancialValue {
            concept: CanonicalConcept::Assets,
            taxonomy: "us-gaap".to_string(),
            alias: "Assets".to_string(),
            weight: 8,
            value: 5_000.0,
            duration: None,
            fiscal_year: Some(2023),
            accession: Some("0000320193-23-000077".to_string()),
            origin: ValueOrigin::Reported,
        });

        ReconciledCompany::freeze(320193, "Apple Inc.".to_string(), vec![period])
    }

    #[test]
    fn test_records_follow_concept_order() {
        let rows = records(&company());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].concept, CanonicalConcept::Revenue);
        assert!(rows[0].derived);
        assert_eq!(rows[0].cik, "0000320193");
        assert_eq!(rows[0].period_end, date(2023, 7, 1));
        assert_eq!(rows[0].calendar_quarter, CalendarQuarter::Q2);
        assert_eq!(rows[1].concept, CanonicalConcept::Assets);
        assert_eq!(rows[1].logic, None);
    }

    fn read_back(csv: &str) -> (csv::StringRecord, Vec<PeriodRecord>) {
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<PeriodRecord>, _>>()
            .unwrap();
        (headers, rows)
    }

    #[test]
    fn test_csv_layout() {
        let csv = to_csv(&company()).unwrap();
        assert_eq!(csv.lines().count(), 3);

        let (headers, rows) = read_back(&csv);
        assert_eq!(headers.len(), 14);
        assert_eq!(&headers[0], "cik");
        assert_eq!(&headers[13], "logic");
        assert_eq!(rows, records(&company()));

        let first = csv.lines().nth(1).unwrap();
        assert!(first.starts_with("0000320193,2023-07-01,2023-06-30,2023,Q2,Revenue,"));
    }

    #[test]
    fn test_csv_quotes_every_text_field() {
        let mut periods = company().into_periods();
        let assets = periods[0].values_mut(CanonicalConcept::Assets);
        assets[0].accession = Some("a,b".to_string());
        assets[0].alias = "Assets \"as reported\"".to_string();
        let company = ReconciledCompany::freeze(320193, "Apple Inc.".to_string(), periods);

        let csv = to_csv(&company).unwrap();
        let (_, rows) = read_back(&csv);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].accession.as_deref(), Some("a,b"));
        assert_eq!(rows[1].alias, "Assets \"as reported\"");
        assert_eq!(rows[1].value, 5_000.0);
        assert!(!rows[1].derived);
    }

    #[test]
    fn test_empty_company_has_no_rows() {
        let company = ReconciledCompany::freeze(1, "Shell Co".to_string(), Vec::new());
        assert_eq!(to_csv(&company).unwrap(), "");
    }

    #[test]
    fn test_json_export() {
        let json = to_json(&company()).unwrap();
        let rows: Vec<PeriodRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(rows, records(&company()));
    }
}
