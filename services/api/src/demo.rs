use crate::infra::{InMemoryFirmDirectory, InMemoryReviewRepository, InMemoryScoreStore};
use clap::Args;
use prop_trust::config::AppConfig;
use prop_trust::error::AppError;
use prop_trust::scoring::{
    DeductionEngine, FirmId, FirmProfile, Pillar, ReviewId, ReviewService, ReviewStatus,
    ScoreModel, ScoreRecord, ScoreStore,
};
use std::sync::Arc;
use tracing::warn;

const DEMO_FIRMS: [(&str, &str, f64); 4] = [
    ("apex-funded", "Apex Funded", 60_000_000.0),
    ("summit-traders", "Summit Traders", 12_000_000.0),
    ("harbor-prop", "Harbor Prop", 5_000_000.0),
    ("fresh-start", "Fresh Start Capital", 250_000.0),
];

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Sub-factor the complaint is tagged with (e.g. payout_cycle)
    #[arg(long)]
    pub(crate) sub_factor: String,
    /// Firm lifetime payout volume used to pick the slab
    #[arg(long, default_value_t = 0.0)]
    pub(crate) total_payout: f64,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Demo firm that receives the complaints.
    #[arg(long, default_value = "harbor-prop")]
    pub(crate) firm: String,
    /// Sub-factor tags of the complaints to approve, in order. Repeatable.
    #[arg(long = "complaint")]
    pub(crate) complaints: Vec<String>,
}

/// Register the demo firms with full-marks score records. Returns how many
/// firms were added.
pub(crate) fn seed_demo_firms(
    model: &ScoreModel,
    firms: &InMemoryFirmDirectory,
    scores: &InMemoryScoreStore,
) -> usize {
    let mut seeded = 0;
    for (id, name, payout) in DEMO_FIRMS {
        let firm_id = FirmId(id.to_string());
        firms.upsert(FirmProfile::new(firm_id.clone(), name, payout));
        match scores.insert(ScoreRecord::full_marks(firm_id, model)) {
            Ok(()) => seeded += 1,
            Err(err) => warn!(firm = id, error = %err, "demo firm not seeded"),
        }
    }
    seeded
}

pub(crate) fn run_model(config: &AppConfig) -> Result<(), AppError> {
    let model = config.scoring.load_model()?;
    render_model(&model);
    Ok(())
}

pub(crate) fn run_quote(config: &AppConfig, args: QuoteArgs) -> Result<(), AppError> {
    let model = config.scoring.load_model()?;
    match model.quote(&args.sub_factor, args.total_payout) {
        Some(quote) => {
            println!("Sub-factor: {}", quote.path);
            println!(
                "Slab {} (rate {:.2}) for payout {:.0}",
                quote.slab.label(),
                quote.rate,
                args.total_payout
            );
            println!(
                "Category ceiling {:.2} -> deduction {:.4} points per approved complaint",
                quote.category_max_points, quote.amount
            );
        }
        None => println!("Unknown sub-factor '{}'", args.sub_factor),
    }
    Ok(())
}

pub(crate) fn run_demo(config: &AppConfig, args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { firm, complaints } = args;
    let complaints = if complaints.is_empty() {
        vec![
            "payout_cycle".to_string(),
            "payout_cycle".to_string(),
            "fair_spreads".to_string(),
            "retired_factor".to_string(),
        ]
    } else {
        complaints
    };

    let model = Arc::new(config.scoring.load_model()?);
    let firms = InMemoryFirmDirectory::default();
    let scores = InMemoryScoreStore::default();
    seed_demo_firms(&model, &firms, &scores);

    let scores = Arc::new(scores);
    let engine = Arc::new(DeductionEngine::new(
        model.clone(),
        Arc::new(firms),
        scores.clone(),
    ));
    let service = ReviewService::new(Arc::new(InMemoryReviewRepository::default()), engine);
    let firm_id = FirmId(firm);

    println!("Prop Trust Index demo for {firm_id}");
    print_totals(scores.as_ref(), &firm_id);

    for (index, sub_factor) in complaints.iter().enumerate() {
        let review_id = ReviewId(format!("demo-{:03}", index + 1));
        if let Err(err) = service.submit(
            review_id.clone(),
            firm_id.clone(),
            Some(sub_factor.clone()),
        ) {
            println!("- {review_id}: submission failed ({err})");
            continue;
        }

        match service.update_status(&review_id, ReviewStatus::Approved) {
            Ok(transition) => match transition.deduction {
                Some(outcome) => println!(
                    "- {review_id} [{sub_factor}] slab {} -{:.4}: {:.4} -> {:.4}, PTI {:.3}",
                    outcome.slab.label(),
                    outcome.deduction,
                    outcome.previous_score,
                    outcome.new_score,
                    outcome.composite.pti_score
                ),
                None => println!("- {review_id} [{sub_factor}] approved, no deduction applied"),
            },
            Err(err) => println!("- {review_id}: approval failed ({err})"),
        }
    }

    if let Some(first) = complaints.first() {
        let review_id = ReviewId("demo-001".to_string());
        if let Ok(transition) = service.update_status(&review_id, ReviewStatus::Approved) {
            println!(
                "\nRe-approving {review_id} [{first}]: {}",
                if transition.deduction.is_some() {
                    "deducted again"
                } else {
                    "no additional deduction"
                }
            );
        }
    }

    println!();
    print_totals(scores.as_ref(), &firm_id);
    Ok(())
}

fn print_totals(scores: &InMemoryScoreStore, firm_id: &FirmId) {
    match scores.score_record(firm_id) {
        Ok(Some(record)) => {
            for pillar in Pillar::ALL {
                println!(
                    "  {:<28} {:>6.3} / 10",
                    pillar.label(),
                    record.pillar(pillar).score
                );
            }
            println!("  {:<28} {:>6.3}", "PTI", record.pti_score);
        }
        Ok(None) => println!("  no score record for {firm_id}"),
        Err(err) => println!("  score store unavailable: {err}"),
    }
}

fn render_model(model: &ScoreModel) {
    println!("Prop Trust Index score model");
    for pillar in Pillar::ALL {
        println!(
            "\n{} (weight {:.2})",
            pillar.label(),
            model.weights().weight(pillar)
        );
        for category in model.categories_in(pillar) {
            println!("- {} (max {:.2})", category.name, category.max_points);
            for name in &category.sub_factors {
                if let Some(sub_factor) = model.sub_factor(name) {
                    println!("    - {} (max {:.2})", sub_factor.name, sub_factor.max_points);
                }
            }
        }
    }

    println!("\nDeduction slabs");
    for threshold in model.schedule().thresholds() {
        println!(
            "- {}: payout >= {:.0} -> rate {:.2}",
            threshold.slab.label(),
            threshold.min_payout,
            threshold.rate
        );
    }
}
