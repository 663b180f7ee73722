use std::error::Error;
use xbrl_period_reconciler::*;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        return Err(
            "usage: reconcile_company <CIK##########.json> [config.json] [as-of YYYY-MM-DD]".into(),
        );
    };

    let mut config = match args.next() {
        Some(config_path) => ReconcilerConfig::from_json(&std::fs::read_to_string(config_path)?)?,
        None => ReconcilerConfig::default(),
    };
    if let Some(as_of) = args.next() {
        config.validation.as_of = Some(parse_iso_date(&as_of)?);
    }

    let facts = CompanyFacts::from_path(&path)?;
    println!(
        "📂 Loaded {} (CIK {}) from {}\n",
        facts.entity_name,
        facts.cik_padded(),
        path
    );

    let reconciler = PeriodReconciler::new(config)?;
    match reconciler.reconcile(&facts) {
        CompanyOutcome::Skipped { cik, reason } => {
            println!("⏭️  Skipped CIK {}: {}", format_cik(cik), reason);
        }
        CompanyOutcome::Reconciled {
            company,
            report,
            ingestion,
            derivation,
        } => {
            println!("📋 Periods:");
            println!(
                "  {:<8} {:<12} {:>16} {:>16} {:>18}",
                "Quarter", "End", "Revenue", "Net income", "Assets"
            );
            for period in company.periods() {
                let cell = |concept: CanonicalConcept| {
                    period
                        .quarter_value(concept)
                        .map(|v| format!("{:.0}", v))
                        .unwrap_or_else(|| "-".to_string())
                };
                println!(
                    "  {:<8} {:<12} {:>16} {:>16} {:>18}",
                    period.label(),
                    period.end.to_string(),
                    cell(CanonicalConcept::Revenue),
                    cell(CanonicalConcept::NetIncome),
                    cell(CanonicalConcept::Assets)
                );
            }

            println!("\n🔄 Ingestion:");
            println!("  Scanned:   {}", ingestion.scanned);
            println!("  Matched:   {}", ingestion.matched());
            println!("  Unmatched: {}", ingestion.unmatched);
            println!("  Derived quarters: {}", derivation.derived);
            println!("  Remaining gaps:   {}", derivation.gaps);

            println!("\n✅ Validation:\n");
            println!("{}", report.to_markdown());
        }
    }

    Ok(())
}
