use crate::config::ReconcilerConfig;
use crate::error::SkipReason;
use crate::period::FinancialPeriod;
use crate::schema::{CompanyFacts, FactEntry};
use crate::utils::{
    days_between, is_quarter_end, previous_quarter_end, quarter_end_on_or_before,
};
use chrono::NaiveDate;
use log::{debug, warn};

/// Anchor entries that share (or nearly share) an end date.
struct AnchorCluster<'f> {
    /// Earliest filing reporting this end: the period's own report
    representative: &'f FactEntry,
    ends: Vec<NaiveDate>,
}

impl AnchorCluster<'_> {
    fn end(&self) -> NaiveDate {
        self.representative.end
    }

    fn alternate_ends(&self) -> Vec<NaiveDate> {
        self.ends
            .iter()
            .copied()
            .filter(|d| *d != self.end())
            .collect()
    }
}

/// Builds a company's chronological period skeleton from the anchor concept's
/// filings, aligning every reporting end to a calendar-quarter-end.
pub struct PeriodCalendarAligner<'a> {
    config: &'a ReconcilerConfig,
}

impl<'a> PeriodCalendarAligner<'a> {
    pub fn new(config: &'a ReconcilerConfig) -> Self {
        Self { config }
    }

    pub fn build_skeleton(
        &self,
        facts: &CompanyFacts,
    ) -> std::result::Result<Vec<FinancialPeriod>, SkipReason> {
        let entries = self.anchor_entries(facts)?;

        let qualifying: Vec<&FactEntry> = entries
            .iter()
            .filter(|e| self.config.is_allowed_form(&e.form))
            .collect();

        if qualifying.is_empty() {
            return Err(SkipReason::NoQualifyingFilings {
                inspected: entries.len(),
            });
        }

        let qualifying_count = qualifying.len();
        let clusters = self.deduplicate(qualifying);
        let mut periods = Vec::with_capacity(clusters.len());
        let mut prev_snapped: Option<NaiveDate> = None;

        for cluster in clusters.iter().rev() {
            let snapped = match prev_snapped {
                None => quarter_end_on_or_before(cluster.end()),
                Some(prev) => self.chain(cluster.end(), prev),
            };

            let Some(snapped) = snapped else {
                warn!(
                    "CIK {}: could not align anchor end {} to a quarter-end",
                    facts.cik,
                    cluster.end()
                );
                continue;
            };
            if prev_snapped == Some(snapped) {
                debug!(
                    "CIK {}: end {} shares calendar quarter {} with a newer period",
                    facts.cik,
                    cluster.end(),
                    snapped
                );
            }
            prev_snapped = Some(snapped);

            let entry = cluster.representative;
            if !is_quarter_end(entry.end) {
                debug!("CIK {}: end {} aligned to {}", facts.cik, entry.end, snapped);
            }
            let mut period = FinancialPeriod::new(facts.cik, entry.end, snapped);
            period.alternate_ends = cluster.alternate_ends();
            period.fiscal_year = entry.fy;
            period.fiscal_period = entry.fp.clone();
            period.form = entry.form.clone();
            periods.push(period);
        }

        periods.reverse();

        debug!(
            "CIK {}: {} anchor entries, {} qualifying, {} periods",
            facts.cik,
            entries.len(),
            qualifying_count,
            periods.len()
        );

        Ok(periods)
    }

    fn anchor_entries<'f>(
        &self,
        facts: &'f CompanyFacts,
    ) -> std::result::Result<&'f [FactEntry], SkipReason> {
        let anchor = &self.config.anchor;

        let Some(tags) = facts.facts.get(&anchor.taxonomy) else {
            return Err(SkipReason::MissingStructure {
                path: format!("facts/{}", anchor.taxonomy),
            });
        };
        let Some(tag) = tags.get(&anchor.tag) else {
            return Err(SkipReason::MissingStructure {
                path: format!("facts/{}/{}", anchor.taxonomy, anchor.tag),
            });
        };
        tag.units
            .get(&anchor.unit)
            .map(Vec::as_slice)
            .ok_or_else(|| SkipReason::MissingStructure {
                path: anchor.path(),
            })
    }

    /// Groups entries whose end dates fall within the dedup window of the
    /// earliest end in their group, so the window never chains. Returned
    /// clusters are in ascending end-date order.
    fn deduplicate<'f>(&self, mut entries: Vec<&'f FactEntry>) -> Vec<AnchorCluster<'f>> {
        entries.sort_by_key(|e| e.end);

        let mut groups: Vec<Vec<&'f FactEntry>> = Vec::new();
        for entry in entries {
            let joins_last = groups
                .last()
                .and_then(|group| group.first())
                .is_some_and(|first| {
                    days_between(first.end, entry.end) <= self.config.dedup_window_days
                });

            if joins_last {
                if let Some(group) = groups.last_mut() {
                    group.push(entry);
                    continue;
                }
            }
            groups.push(vec![entry]);
        }

        groups
            .into_iter()
            .filter_map(|group| {
                let representative = *group
                    .iter()
                    .min_by_key(|e| (e.filed.is_none(), e.filed, e.fy, e.end))?;
                let mut ends: Vec<NaiveDate> = group.iter().map(|e| e.end).collect();
                ends.dedup();
                Some(AnchorCluster {
                    representative,
                    ends,
                })
            })
            .collect()
    }

    /// Aligns an older entry given the quarter-end its newer neighbour was
    /// aligned to.
    ///
    /// Entries that cannot be chained are re-snapped from their own raw end.
    /// A re-snap never lands later than `prev_snapped`; it may equal it when
    /// two ends fall in one calendar quarter (a transition period), and the
    /// walk then continues from that quarter so older labels are unaffected.
    fn chain(&self, raw_end: NaiveDate, prev_snapped: NaiveDate) -> Option<NaiveDate> {
        let candidate = previous_quarter_end(prev_snapped)?;
        let gap = days_between(raw_end, candidate);

        if (0..=self.config.alignment_tolerance_days).contains(&gap) {
            return Some(candidate);
        }

        quarter_end_on_or_before(raw_end)
    }
}
