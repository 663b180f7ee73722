use crate::error::Result;
use crate::utils::format_cik;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One company's XBRL company-facts document, as exported by EDGAR at
/// `api/xbrl/companyfacts/CIK##########.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    #[schemars(description = "Central Index Key of the filer. EDGAR serializes it as an integer.")]
    pub cik: u64,

    #[serde(default)]
    #[schemars(description = "Registrant name as reported in the filing metadata")]
    pub entity_name: String,

    #[serde(default)]
    #[schemars(
        description = "Facts keyed by taxonomy (e.g. 'us-gaap', 'dei'), then by tag name (e.g. 'Assets')"
    )]
    pub facts: BTreeMap<String, BTreeMap<String, TagFacts>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TagFacts {
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    #[schemars(description = "Observations keyed by unit of measure (e.g. 'USD', 'shares')")]
    pub units: BTreeMap<String, Vec<FactEntry>>,
}

/// A single disclosed observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FactEntry {
    #[schemars(description = "Last day covered by the observation (YYYY-MM-DD)")]
    pub end: NaiveDate,

    #[serde(default)]
    #[schemars(
        description = "First day covered by the observation. Absent for point-in-time facts such as balances and share counts."
    )]
    pub start: Option<NaiveDate>,

    pub val: f64,

    #[serde(default)]
    #[schemars(description = "Accession number of the filing that disclosed the value")]
    pub accn: String,

    #[serde(default)]
    #[schemars(description = "Fiscal year of the filing (not necessarily of the observation)")]
    pub fy: Option<i32>,

    #[serde(default)]
    #[schemars(description = "Fiscal period label of the filing: FY, Q1, Q2, Q3")]
    pub fp: Option<String>,

    #[serde(default)]
    #[schemars(description = "Report form type, e.g. 10-K, 10-Q, 10-K/A")]
    pub form: String,

    #[serde(default)]
    pub filed: Option<NaiveDate>,

    #[serde(default)]
    pub frame: Option<String>,
}

impl FactEntry {
    /// Span in days between start and end, `None` for point-in-time facts.
    pub fn span_days(&self) -> Option<i64> {
        self.start.map(|start| (self.end - start).num_days())
    }
}

impl CompanyFacts {
    pub fn new(cik: u64, entity_name: impl Into<String>) -> Self {
        Self {
            cik,
            entity_name: entity_name.into(),
            facts: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Ten-digit, zero-padded CIK.
    pub fn cik_padded(&self) -> String {
        format_cik(self.cik)
    }

    /// Name of this company's member inside the bulk `companyfacts.zip` archive.
    pub fn source_document_name(&self) -> String {
        format!("CIK{}.json", self.cik_padded())
    }

    pub fn tag(&self, taxonomy: &str, tag: &str) -> Option<&TagFacts> {
        self.facts.get(taxonomy)?.get(tag)
    }

    /// The observation list at `taxonomy/tag/unit`, if every level is present.
    pub fn entries(&self, taxonomy: &str, tag: &str, unit: &str) -> Option<&[FactEntry]> {
        self.tag(taxonomy, tag)?.units.get(unit).map(Vec::as_slice)
    }

    /// Appends observations under `taxonomy/tag/unit`, creating levels as needed.
    pub fn insert_entries(
        &mut self,
        taxonomy: &str,
        tag: &str,
        unit: &str,
        entries: impl IntoIterator<Item = FactEntry>,
    ) {
        self.facts
            .entry(taxonomy.to_string())
            .or_default()
            .entry(tag.to_string())
            .or_default()
            .units
            .entry(unit.to_string())
            .or_default()
            .extend(entries);
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(CompanyFacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "cik": 320193,
        "entityName": "Apple Inc.",
        "facts": {
            "us-gaap": {
                "Assets": {
                    "label": "Assets",
                    "description": "Sum of the carrying amounts",
                    "units": {
                        "USD": [
                            {"end": "2023-07-01", "val": 335038000000,
                             "accn": "0000320193-23-000077", "fy": 2023, "fp": "Q3",
                             "form": "10-Q", "filed": "2023-08-04", "frame": "CY2023Q2I"}
                        ]
                    }
                },
                "Revenues": {
                    "units": {
                        "USD": [
                            {"start": "2023-04-02", "end": "2023-07-01", "val": 81797000000,
                             "accn": "0000320193-23-000077", "fy": 2023, "fp": "Q3", "form": "10-Q"}
                        ]
                    }
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_company_facts() {
        let facts = CompanyFacts::from_json(SAMPLE).unwrap();
        assert_eq!(facts.cik, 320193);
        assert_eq!(facts.entity_name, "Apple Inc.");

        let assets = facts.entries("us-gaap", "Assets", "USD").unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].end, NaiveDate::from_ymd_opt(2023, 7, 1).unwrap());
        assert!(assets[0].start.is_none());
        assert_eq!(assets[0].fy, Some(2023));

        let revenue = facts.entries("us-gaap", "Revenues", "USD").unwrap();
        assert_eq!(revenue[0].span_days(), Some(90));
    }

    #[test]
    fn test_missing_levels_return_none() {
        let facts = CompanyFacts::from_json(SAMPLE).unwrap();
        assert!(facts.entries("dei", "Assets", "USD").is_none());
        assert!(facts.entries("us-gaap", "NetIncomeLoss", "USD").is_none());
        assert!(facts.entries("us-gaap", "Assets", "EUR").is_none());
    }

    #[test]
    fn test_source_document_name() {
        let facts = CompanyFacts::new(320193, "Apple Inc.");
        assert_eq!(facts.cik_padded(), "0000320193");
        assert_eq!(facts.source_document_name(), "CIK0000320193.json");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = CompanyFacts::from_path("does/not/exist/CIK0000000000.json");
        assert!(matches!(result, Err(crate::error::ReconcileError::IoError(_))));
    }

    #[test]
    fn test_schema_generation() {
        let schema = CompanyFacts::generate_json_schema();
        let json = serde_json::to_string_pretty(&schema).unwrap();
        assert!(json.contains("entityName"));
        assert!(json.contains("units"));
    }
}
