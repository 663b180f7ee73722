use crate::concepts::CanonicalConcept;
use crate::period::{
    DerivationDetails, Duration, FinancialPeriod, FinancialValue, ValueOrigin,
};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationStats {
    /// Discrete quarters computed from cumulative totals
    pub derived: usize,
    /// (period, concept) pairs lacking a discrete quarter and an antecedent
    pub gaps: usize,
}

/// Recovers undisclosed discrete quarters by subtracting consecutive
/// cumulative totals (e.g. nine-month minus half-year).
pub struct QuarterDeriver;

impl QuarterDeriver {
    /// One forward pass over chronologically ordered periods. Each period only
    /// reads the period immediately before it, which is already final.
    pub fn derive(periods: &mut [FinancialPeriod]) -> DerivationStats {
        let mut stats = DerivationStats::default();

        for idx in 1..periods.len() {
            let (before, rest) = periods.split_at_mut(idx);
            let previous = &before[idx - 1];
            let current = &mut rest[0];

            for concept in CanonicalConcept::ALL {
                if !Self::needs_derivation(current, concept) {
                    continue;
                }

                match Self::derive_concept(previous, current, concept) {
                    Some(derived) => {
                        debug!(
                            "{} {}: derived discrete quarter {}",
                            current.label(),
                            concept,
                            derived.value
                        );
                        current.values_mut(concept).push(derived);
                        stats.derived += 1;
                    }
                    None => stats.gaps += 1,
                }
            }
        }

        stats
    }

    fn needs_derivation(period: &FinancialPeriod, concept: CanonicalConcept) -> bool {
        let values = period.values(concept);
        !concept.is_point_in_time()
            && !values.is_empty()
            && !values.iter().any(FinancialValue::is_discrete_quarter)
    }

    /// Tries the cumulative values of `current` shortest first and stops at the
    /// first one whose one-rank-shorter counterpart exists in `previous`.
    fn derive_concept(
        previous: &FinancialPeriod,
        current: &FinancialPeriod,
        concept: CanonicalConcept,
    ) -> Option<FinancialValue> {
        let mut cumulative: Vec<(u8, &FinancialValue)> = current
            .values(concept)
            .iter()
            .filter_map(|v| {
                let rank = v.duration?.rank()?;
                Some((rank, v))
            })
            .collect();
        cumulative.sort_by_key(|(rank, _)| *rank);

        cumulative.into_iter().find_map(|(_, long)| {
            let long_duration = long.duration?;
            let short_duration = long_duration.shorter()?;
            let short = previous.value_with_duration(concept, short_duration)?;
            Some(Self::subtract(previous, long, long_duration, short, short_duration))
        })
    }

    fn subtract(
        previous: &FinancialPeriod,
        long: &FinancialValue,
        long_duration: Duration,
        short: &FinancialValue,
        short_duration: Duration,
    ) -> FinancialValue {
        FinancialValue {
            concept: long.concept,
            taxonomy: long.taxonomy.clone(),
            alias: long.alias.clone(),
            weight: long.weight,
            value: long.value - short.value,
            duration: Some(Duration::OneQuarter),
            fiscal_year: None,
            accession: None,
            origin: ValueOrigin::Derived(DerivationDetails {
                long_value: long.value,
                long_duration,
                long_accession: long.accession.clone(),
                short_value: short.value,
                short_duration,
                short_accession: short.accession.clone(),
                antecedent_end: previous.end,
                logic: format!(
                    "{} {} minus {} ending {}",
                    long_duration, long.alias, short_duration, previous.end
                ),
            }),
        }
    }
}
