//! # XBRL Period Reconciler
//!
//! Turns one company's raw XBRL "company facts" document into a clean,
//! chronologically ordered series of quarterly financial periods.
//!
//! ## Core Concepts
//!
//! - **Skeleton**: the period list, built from the anchor concept's 10-K/10-Q
//!   filings and aligned to calendar-quarter-ends so filers with 52/53-week
//!   calendars line up with everyone else
//! - **Canonical concepts**: a fixed vocabulary (Revenue, Assets, ...) that many
//!   filer-specific tag names resolve to, ranked by alias weight
//! - **Flow concepts**: duration values (Revenue, cash flows) classified as
//!   one, two or three quarters or a year; missing discrete quarters are derived
//!   by subtracting consecutive cumulative totals
//! - **Point-in-time concepts**: balances matched to the nearest period end
//! - **Validation**: a read-only pass flagging (period, concept) pairs still
//!   unresolved, with a handle to the raw document for manual review
//!
//! ## Example
//!
//! ```rust,ignore
//! use xbrl_period_reconciler::*;
//! use std::fs::File;
//!
//! let facts = CompanyFacts::from_reader(File::open("CIK0000320193.json")?)?;
//! let reconciler = PeriodReconciler::new(ReconcilerConfig::default())?;
//!
//! match reconciler.reconcile(&facts) {
//!     CompanyOutcome::Reconciled { company, report, .. } => {
//!         for period in company.periods() {
//!             let revenue = period.quarter_value(CanonicalConcept::Revenue);
//!             println!("{} revenue {:?}", period.label(), revenue);
//!         }
//!         println!("{}", report.to_markdown());
//!     }
//!     CompanyOutcome::Skipped { cik, reason } => eprintln!("{}: {}", cik, reason),
//! }
//! ```

pub mod calendar;
pub mod concepts;
pub mod config;
pub mod derivation;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod period;
pub mod resolver;
pub mod schema;
pub mod utils;
pub mod validator;

pub use calendar::PeriodCalendarAligner;
pub use concepts::{Alias, CanonicalConcept, ConceptCatalog};
pub use config::{
    AnchorSpec, DayBand, DurationBands, InstantMatchWindow, ReconcilerConfig, ValidationConfig,
};
pub use derivation::{DerivationStats, QuarterDeriver};
pub use error::{ReconcileError, Result, SkipReason};
pub use export::PeriodRecord;
pub use ingestion::{FactIngester, IngestionStats};
pub use period::*;
pub use resolver::{Resolution, ValueResolver};
pub use schema::*;
pub use utils::*;
pub use validator::{IssueKind, ValidationIssue, ValidationReport, Validator};

use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

/// Result of reconciling one company.
#[derive(Debug, Clone, PartialEq)]
pub enum CompanyOutcome {
    Reconciled {
        company: ReconciledCompany,
        report: ValidationReport,
        ingestion: IngestionStats,
        derivation: DerivationStats,
    },
    /// The document lacked the structure needed to build a skeleton
    Skipped { cik: u64, reason: SkipReason },
}

impl CompanyOutcome {
    pub fn cik(&self) -> u64 {
        match self {
            Self::Reconciled { company, .. } => company.cik(),
            Self::Skipped { cik, .. } => *cik,
        }
    }

    pub fn company(&self) -> Option<&ReconciledCompany> {
        match self {
            Self::Reconciled { company, .. } => Some(company),
            Self::Skipped { .. } => None,
        }
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Reconciled { report, .. } => Some(report),
            Self::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_flagged(&self) -> bool {
        self.report().is_some_and(ValidationReport::is_flagged)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub companies: usize,
    pub reconciled: usize,
    pub skipped: usize,
    pub flagged: usize,
}

impl BatchSummary {
    fn tally(outcomes: &[CompanyOutcome]) -> Self {
        outcomes.iter().fold(
            Self {
                companies: outcomes.len(),
                ..Self::default()
            },
            |mut summary, outcome| {
                if outcome.is_skipped() {
                    summary.skipped += 1;
                } else {
                    summary.reconciled += 1;
                }
                if outcome.is_flagged() {
                    summary.flagged += 1;
                }
                summary
            },
        )
    }
}

/// Outcomes in the same order as the input documents.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<CompanyOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    /// Source handles of every flagged company, for retention.
    pub fn flagged_sources(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(CompanyOutcome::report)
            .filter_map(|r| r.source_handle.clone())
            .collect()
    }
}

/// Runs the reconciliation passes in order: skeleton, ingestion, derivation,
/// freeze, validation.
#[derive(Debug, Clone, Default)]
pub struct PeriodReconciler {
    config: ReconcilerConfig,
    catalog: ConceptCatalog,
}

impl PeriodReconciler {
    pub fn new(config: ReconcilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            catalog: ConceptCatalog::standard(),
        })
    }

    pub fn with_catalog(mut self, catalog: ConceptCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ConceptCatalog {
        &self.catalog
    }

    pub fn reconcile(&self, facts: &CompanyFacts) -> CompanyOutcome {
        let cik = facts.cik;
        info!(
            "Reconciling CIK {} ({})",
            facts.cik_padded(),
            facts.entity_name
        );

        let mut periods = match PeriodCalendarAligner::new(&self.config).build_skeleton(facts) {
            Ok(periods) => periods,
            Err(reason) => {
                info!("Skipping CIK {}: {}", facts.cik_padded(), reason);
                return CompanyOutcome::Skipped { cik, reason };
            }
        };

        let ingestion = FactIngester::new(&self.config, &self.catalog).ingest(facts, &mut periods);
        let derivation = QuarterDeriver::derive(&mut periods);
        debug!(
            "CIK {}: derived {} discrete quarters, {} gaps remain",
            facts.cik_padded(),
            derivation.derived,
            derivation.gaps
        );

        let company = ReconciledCompany::freeze(cik, facts.entity_name.clone(), periods);
        let report = Validator::new(&self.config.validation).validate(&company);

        info!(
            "CIK {}: {} periods, {} facts matched, {} issues",
            company.cik_padded(),
            company.periods().len(),
            ingestion.matched(),
            report.issue_count()
        );

        CompanyOutcome::Reconciled {
            company,
            report,
            ingestion,
            derivation,
        }
    }

    /// Reconciles every document independently; a skipped company never stops
    /// the others.
    pub fn reconcile_batch(&self, documents: &[CompanyFacts]) -> BatchReport {
        #[cfg(feature = "parallel")]
        let outcomes: Vec<CompanyOutcome> =
            documents.par_iter().map(|f| self.reconcile(f)).collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<CompanyOutcome> = documents.iter().map(|f| self.reconcile(f)).collect();

        let summary = BatchSummary::tally(&outcomes);
        info!(
            "Batch of {}: {} reconciled, {} skipped, {} flagged",
            summary.companies, summary.reconciled, summary.skipped, summary.flagged
        );

        BatchReport { outcomes, summary }
    }
}

/// Reconciles one document with the default configuration and catalog.
pub fn reconcile_company(facts: &CompanyFacts) -> CompanyOutcome {
    PeriodReconciler::default().reconcile(facts)
}
