use crate::error::{ReconcileError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const US_GAAP: &str = "us-gaap";
pub const DEI: &str = "dei";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum CanonicalConcept {
    Revenue,
    NetIncome,
    CashFlowOperating,
    CashFlowInvesting,
    CashFlowFinancing,
    Assets,
    Equity,
    SharesOutstanding,
    CashAndEquivalents,
    ShortTermDebt,
    LongTermDebt,
}

impl CanonicalConcept {
    pub const ALL: [Self; 11] = [
        Self::Revenue,
        Self::NetIncome,
        Self::CashFlowOperating,
        Self::CashFlowInvesting,
        Self::CashFlowFinancing,
        Self::Assets,
        Self::Equity,
        Self::SharesOutstanding,
        Self::CashAndEquivalents,
        Self::ShortTermDebt,
        Self::LongTermDebt,
    ];

    /// Balances and share counts are measured at an instant; flows cover a span.
    pub fn is_point_in_time(self) -> bool {
        !matches!(
            self,
            Self::Revenue
                | Self::NetIncome
                | Self::CashFlowOperating
                | Self::CashFlowInvesting
                | Self::CashFlowFinancing
        )
    }

    /// XBRL unit the concept is read from.
    pub fn unit(self) -> &'static str {
        match self {
            Self::SharesOutstanding => "shares",
            _ => "USD",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Revenue => "Revenue",
            Self::NetIncome => "NetIncome",
            Self::CashFlowOperating => "CashFlowOperating",
            Self::CashFlowInvesting => "CashFlowInvesting",
            Self::CashFlowFinancing => "CashFlowFinancing",
            Self::Assets => "Assets",
            Self::Equity => "Equity",
            Self::SharesOutstanding => "SharesOutstanding",
            Self::CashAndEquivalents => "CashAndEquivalents",
            Self::ShortTermDebt => "ShortTermDebt",
            Self::LongTermDebt => "LongTermDebt",
        }
    }
}

impl fmt::Display for CanonicalConcept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A filer-facing tag name that resolves to a canonical concept. The weight
/// only breaks ties between synonyms filed in the same fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Alias {
    pub taxonomy: String,
    pub tag: String,
    pub concept: CanonicalConcept,
    pub weight: u32,
}

impl Alias {
    pub fn new(
        taxonomy: impl Into<String>,
        tag: impl Into<String>,
        concept: CanonicalConcept,
        weight: u32,
    ) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            tag: tag.into(),
            concept,
            weight,
        }
    }
}

const STANDARD_ALIASES: &[(&str, &str, CanonicalConcept, u32)] = &[
    (US_GAAP, "RevenueFromContractWithCustomerExcludingAssessedTax", CanonicalConcept::Revenue, 8),
    (US_GAAP, "Revenues", CanonicalConcept::Revenue, 4),
    (US_GAAP, "SalesRevenueNet", CanonicalConcept::Revenue, 2),
    (US_GAAP, "RevenueFromContractWithCustomerIncludingAssessedTax", CanonicalConcept::Revenue, 1),
    (US_GAAP, "NetIncomeLoss", CanonicalConcept::NetIncome, 8),
    (US_GAAP, "ProfitLoss", CanonicalConcept::NetIncome, 4),
    (US_GAAP, "NetIncomeLossAvailableToCommonStockholdersBasic", CanonicalConcept::NetIncome, 2),
    (US_GAAP, "NetCashProvidedByUsedInOperatingActivities", CanonicalConcept::CashFlowOperating, 8),
    (
        US_GAAP,
        "NetCashProvidedByUsedInOperatingActivitiesContinuingOperations",
        CanonicalConcept::CashFlowOperating,
        4,
    ),
    (US_GAAP, "NetCashProvidedByUsedInInvestingActivities", CanonicalConcept::CashFlowInvesting, 8),
    (
        US_GAAP,
        "NetCashProvidedByUsedInInvestingActivitiesContinuingOperations",
        CanonicalConcept::CashFlowInvesting,
        4,
    ),
    (US_GAAP, "NetCashProvidedByUsedInFinancingActivities", CanonicalConcept::CashFlowFinancing, 8),
    (
        US_GAAP,
        "NetCashProvidedByUsedInFinancingActivitiesContinuingOperations",
        CanonicalConcept::CashFlowFinancing,
        4,
    ),
    (US_GAAP, "Assets", CanonicalConcept::Assets, 8),
    (US_GAAP, "StockholdersEquity", CanonicalConcept::Equity, 8),
    (
        US_GAAP,
        "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
        CanonicalConcept::Equity,
        4,
    ),
    (DEI, "EntityCommonStockSharesOutstanding", CanonicalConcept::SharesOutstanding, 8),
    (US_GAAP, "CommonStockSharesOutstanding", CanonicalConcept::SharesOutstanding, 4),
    (US_GAAP, "CashAndCashEquivalentsAtCarryingValue", CanonicalConcept::CashAndEquivalents, 8),
    (
        US_GAAP,
        "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalents",
        CanonicalConcept::CashAndEquivalents,
        4,
    ),
    (US_GAAP, "Cash", CanonicalConcept::CashAndEquivalents, 2),
    (US_GAAP, "DebtCurrent", CanonicalConcept::ShortTermDebt, 8),
    (US_GAAP, "ShortTermBorrowings", CanonicalConcept::ShortTermDebt, 4),
    (US_GAAP, "LongTermDebtCurrent", CanonicalConcept::ShortTermDebt, 2),
    (US_GAAP, "LongTermDebtNoncurrent", CanonicalConcept::LongTermDebt, 8),
    (US_GAAP, "LongTermDebt", CanonicalConcept::LongTermDebt, 4),
    (US_GAAP, "LongTermDebtAndCapitalLeaseObligations", CanonicalConcept::LongTermDebt, 2),
];

/// Alias table mapping raw tags to canonical concepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptCatalog {
    aliases: Vec<Alias>,
}

impl Default for ConceptCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ConceptCatalog {
    pub fn standard() -> Self {
        let aliases = STANDARD_ALIASES
            .iter()
            .map(|&(taxonomy, tag, concept, weight)| Alias::new(taxonomy, tag, concept, weight))
            .collect();
        Self { aliases }
    }

    pub fn empty() -> Self {
        Self {
            aliases: Vec::new(),
        }
    }

    /// Registers an extra synonym. A tag may only belong to one concept.
    pub fn add_alias(&mut self, alias: Alias) -> Result<()> {
        if let Some(existing) = self.lookup(&alias.taxonomy, &alias.tag) {
            return Err(ReconcileError::InvalidConfig(format!(
                "Alias {}:{} is already mapped to {}",
                alias.taxonomy, alias.tag, existing.concept
            )));
        }
        self.aliases.push(alias);
        Ok(())
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    /// Aliases of `concept`, highest weight first, then by tag name.
    pub fn aliases_for(&self, concept: CanonicalConcept) -> Vec<&Alias> {
        let mut aliases: Vec<&Alias> = self
            .aliases
            .iter()
            .filter(|a| a.concept == concept)
            .collect();
        aliases.sort_by(|a, b| {
            b.weight
                .cmp(&a.weight)
                .then_with(|| a.taxonomy.cmp(&b.taxonomy))
                .then_with(|| a.tag.cmp(&b.tag))
        });
        aliases
    }

    pub fn lookup(&self, taxonomy: &str, tag: &str) -> Option<&Alias> {
        self.aliases
            .iter()
            .find(|a| a.taxonomy == taxonomy && a.tag == tag)
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("# Concept Catalog\n\n");

        for concept in CanonicalConcept::ALL {
            let kind = if concept.is_point_in_time() {
                "point-in-time"
            } else {
                "duration"
            };
            output.push_str(&format!(
                "## {} ({}, {})\n\n",
                concept,
                kind,
                concept.unit()
            ));
            for alias in self.aliases_for(concept) {
                output.push_str(&format!(
                    "- {}:{} (weight {})\n",
                    alias.taxonomy, alias.tag, alias.weight
                ));
            }
            output.push('\n');
        }

        output
    }
}
