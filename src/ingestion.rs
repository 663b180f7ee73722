use crate::concepts::{Alias, CanonicalConcept, ConceptCatalog};
use crate::config::ReconcilerConfig;
use crate::period::{Duration, FinancialPeriod, FinancialValue};
use crate::resolver::{Resolution, ValueResolver};
use crate::schema::{CompanyFacts, FactEntry};
use crate::utils::days_between;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

/// Per-company tally of what happened to every scanned observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStats {
    pub scanned: usize,
    pub disallowed_form: usize,
    pub missing_start: usize,
    pub unmatched: usize,
    /// Duration facts whose span fell outside every band (kept as `Other`)
    pub unclassified: usize,
    pub appended: usize,
    pub replaced: usize,
    pub discarded: usize,
}

impl IngestionStats {
    pub fn matched(&self) -> usize {
        self.appended + self.replaced + self.discarded
    }

    fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Appended => self.appended += 1,
            Resolution::Replaced => self.replaced += 1,
            Resolution::Discarded => self.discarded += 1,
        }
    }
}

/// Populates a period skeleton with every catalogued observation.
pub struct FactIngester<'a> {
    config: &'a ReconcilerConfig,
    catalog: &'a ConceptCatalog,
}

impl<'a> FactIngester<'a> {
    pub fn new(config: &'a ReconcilerConfig, catalog: &'a ConceptCatalog) -> Self {
        Self { config, catalog }
    }

    pub fn ingest(&self, facts: &CompanyFacts, periods: &mut [FinancialPeriod]) -> IngestionStats {
        let mut stats = IngestionStats::default();

        for concept in CanonicalConcept::ALL {
            for alias in self.catalog.aliases_for(concept) {
                let Some(entries) = facts.entries(&alias.taxonomy, &alias.tag, concept.unit())
                else {
                    continue;
                };

                for entry in entries {
                    self.ingest_entry(alias, entry, periods, &mut stats);
                }
            }
        }

        debug!(
            "CIK {}: scanned {} facts, matched {}, unmatched {}, dropped {} by form, {} without start",
            facts.cik,
            stats.scanned,
            stats.matched(),
            stats.unmatched,
            stats.disallowed_form,
            stats.missing_start
        );

        stats
    }

    fn ingest_entry(
        &self,
        alias: &Alias,
        entry: &FactEntry,
        periods: &mut [FinancialPeriod],
        stats: &mut IngestionStats,
    ) {
        stats.scanned += 1;

        if !self.config.is_allowed_form(&entry.form) {
            stats.disallowed_form += 1;
            return;
        }

        let concept = alias.concept;
        let (target, duration) = if concept.is_point_in_time() {
            (self.match_instant(entry.end, periods), None)
        } else {
            let Some(days) = entry.span_days() else {
                debug!(
                    "{}:{} ending {} has no start date, skipping",
                    alias.taxonomy, alias.tag, entry.end
                );
                stats.missing_start += 1;
                return;
            };

            let duration = self.config.duration_bands.classify(days);
            if duration == Duration::Other {
                stats.unclassified += 1;
            }
            let target = periods.iter().position(|p| p.matches_end(entry.end));
            (target, Some(duration))
        };

        let Some(idx) = target else {
            stats.unmatched += 1;
            return;
        };

        let candidate = FinancialValue::reported(alias, entry, duration);
        let resolution = ValueResolver::resolve(periods[idx].values_mut(concept), candidate);
        stats.record(resolution);
    }

    /// Nearest period whose end lies inside the instant window around `end`.
    /// Equidistant candidates resolve to the earlier period.
    fn match_instant(&self, end: NaiveDate, periods: &[FinancialPeriod]) -> Option<usize> {
        let window = self.config.instant_match_window;

        periods
            .iter()
            .enumerate()
            .filter_map(|(idx, period)| {
                let offset = days_between(period.end, end);
                window
                    .contains(offset)
                    .then_some((offset.abs(), period.end, idx))
            })
            .min()
            .map(|(_, _, idx)| idx)
    }
}
