use crate::period::FinancialValue;
use log::debug;

/// What happened to a candidate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Appended,
    Replaced,
    Discarded,
}

/// Conflict rules for values competing for the same (period, concept).
pub struct ValueResolver;

impl ValueResolver {
    /// Merges `candidate` into the values already held for one (period,
    /// concept). Point-in-time concepts keep only their largest observation;
    /// duration concepts keep one value per [`Duration`](crate::period::Duration).
    pub fn resolve(existing: &mut Vec<FinancialValue>, candidate: FinancialValue) -> Resolution {
        if existing.is_empty() {
            existing.push(candidate);
            return Resolution::Appended;
        }

        if candidate.concept.is_point_in_time() {
            return Self::resolve_point_in_time(existing, candidate);
        }

        match existing
            .iter()
            .position(|v| v.duration == candidate.duration)
        {
            None => {
                existing.push(candidate);
                Resolution::Appended
            }
            Some(idx) if Self::supersedes(&candidate, &existing[idx]) => {
                debug!(
                    "{} {:?}: {} (fy {:?}, weight {}) replaces {} (fy {:?}, weight {})",
                    candidate.concept,
                    candidate.duration,
                    candidate.alias,
                    candidate.fiscal_year,
                    candidate.weight,
                    existing[idx].alias,
                    existing[idx].fiscal_year,
                    existing[idx].weight
                );
                existing[idx] = candidate;
                Resolution::Replaced
            }
            Some(_) => Resolution::Discarded,
        }
    }

    fn resolve_point_in_time(
        existing: &mut Vec<FinancialValue>,
        candidate: FinancialValue,
    ) -> Resolution {
        let current_max = existing
            .iter()
            .map(|v| v.value)
            .fold(f64::NEG_INFINITY, f64::max);

        if candidate.value >= current_max {
            existing.clear();
            existing.push(candidate);
            Resolution::Replaced
        } else {
            Resolution::Discarded
        }
    }

    /// A later filing fiscal year always wins; within the same year the
    /// heavier (or equally weighted) alias wins.
    pub fn supersedes(candidate: &FinancialValue, current: &FinancialValue) -> bool {
        match (candidate.fiscal_year, current.fiscal_year) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(new), Some(old)) if new > old => true,
            (Some(new), Some(old)) if new == old => candidate.weight >= current.weight,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concepts::CanonicalConcept;
    use crate::period::{Duration, ValueOrigin};

    fn value(
        concept: CanonicalConcept,
        alias: &str,
        weight: u32,
        val: f64,
        duration: Option<Duration>,
        fiscal_year: Option<i32>,
    ) -> FinancialValue {
        FinancialValue {
            concept,
            taxonomy: "us-gaap".to_string(),
            alias: alias.to_string(),
            weight,
            value: val,
            duration,
            fiscal_year,
            accession: None,
            origin: ValueOrigin::Reported,
        }
    }

    fn revenue(alias: &str, weight: u32, val: f64, fy: i32) -> FinancialValue {
        value(
            CanonicalConcept::Revenue,
            alias,
            weight,
            val,
            Some(Duration::OneQuarter),
            Some(fy),
        )
    }

    #[test]
    fn test_empty_always_appends() {
        let mut values = Vec::new();
        let result = ValueResolver::resolve(&mut values, revenue("Revenues", 4, 10.0, 2023));
        assert_eq!(result, Resolution::Appended);
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_recency_wins_regardless_of_weight() {
        let mut values = vec![revenue("Heavy", 8, 10.0, 2021)];
        let result = ValueResolver::resolve(&mut values, revenue("Light", 4, 11.0, 2022));
        assert_eq!(result, Resolution::Replaced);
        assert_eq!(values[0].alias, "Light");

        // Order of arrival does not matter
        let mut values = vec![revenue("Light", 4, 11.0, 2022)];
        let result = ValueResolver::resolve(&mut values, revenue("Heavy", 8, 10.0, 2021));
        assert_eq!(result, Resolution::Discarded);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].alias, "Light");
    }

    #[test]
    fn test_weight_breaks_fiscal_year_tie() {
        let mut values = vec![revenue("Light", 4, 10.0, 2022)];
        assert_eq!(
            ValueResolver::resolve(&mut values, revenue("Heavy", 8, 12.0, 2022)),
            Resolution::Replaced
        );
        assert_eq!(values[0].alias, "Heavy");

        let mut values = vec![revenue("Heavy", 8, 12.0, 2022)];
        assert_eq!(
            ValueResolver::resolve(&mut values, revenue("Light", 4, 10.0, 2022)),
            Resolution::Discarded
        );
        assert_eq!(values[0].alias, "Heavy");
    }

    #[test]
    fn test_equal_weight_candidate_wins() {
        let mut values = vec![revenue("Revenues", 4, 10.0, 2022)];
        ValueResolver::resolve(&mut values, revenue("Revenues", 4, 10.5, 2022));
        assert_eq!(values[0].value, 10.5);
    }

    #[test]
    fn test_missing_fiscal_year_is_replaced() {
        let mut values = vec![value(
            CanonicalConcept::Revenue,
            "Revenues",
            8,
            10.0,
            Some(Duration::Year),
            None,
        )];
        let candidate = value(
            CanonicalConcept::Revenue,
            "SalesRevenueNet",
            2,
            9.0,
            Some(Duration::Year),
            Some(2019),
        );
        assert_eq!(
            ValueResolver::resolve(&mut values, candidate),
            Resolution::Replaced
        );
        assert_eq!(values[0].fiscal_year, Some(2019));
    }

    #[test]
    fn test_different_durations_coexist() {
        let mut values = vec![revenue("Revenues", 4, 100.0, 2023)];
        let half_year = value(
            CanonicalConcept::Revenue,
            "Revenues",
            4,
            220.0,
            Some(Duration::TwoQuarters),
            Some(2023),
        );
        assert_eq!(
            ValueResolver::resolve(&mut values, half_year),
            Resolution::Appended
        );
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_point_in_time_keeps_maximum() {
        let mut values = Vec::new();
        for (val, fy) in [(100.0, 2023), (150.0, 2021), (120.0, 2024)] {
            let shares = value(
                CanonicalConcept::SharesOutstanding,
                "EntityCommonStockSharesOutstanding",
                8,
                val,
                None,
                Some(fy),
            );
            ValueResolver::resolve(&mut values, shares);
        }

        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, 150.0);
    }

    #[test]
    fn test_point_in_time_equal_value_replaces() {
        let mut values = vec![value(
            CanonicalConcept::Assets,
            "Assets",
            8,
            500.0,
            None,
            Some(2022),
        )];
        let restated = value(
            CanonicalConcept::Assets,
            "Assets",
            8,
            500.0,
            None,
            Some(2023),
        );
        assert_eq!(
            ValueResolver::resolve(&mut values, restated),
            Resolution::Replaced
        );
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].fiscal_year, Some(2023));
    }
}
