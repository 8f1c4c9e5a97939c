use super::common::*;
use crate::scoring::aggregate::{recalculate_composite, round3};
use crate::scoring::domain::Pillar;
use crate::scoring::record::{ScoreNode, ScoreRecord};
use serde_json::json;

#[test]
fn full_marks_record_scores_ten_everywhere() {
    let model = model();
    let record = ScoreRecord::full_marks(firm_id("full"), &model);

    let composite = recalculate_composite(&record, model.weights());
    assert_eq!(composite.credibility_total, 10.0);
    assert_eq!(composite.trading_total, 10.0);
    assert_eq!(composite.payout_total, 10.0);
    assert_eq!(composite.pti_score, 10.0);
    assert_eq!(record.pti_score, 10.0);
}

#[test]
fn composite_weights_pillars_and_rounds() {
    let model = model();
    let mut record = ScoreRecord::empty(firm_id("weighted"));
    record.set_sub_factor(&path(&model, "registered_company"), 0.9876);
    record.set_sub_factor(&path(&model, "fair_spreads"), 0.5);
    record.set_sub_factor(&path(&model, "payout_cycle"), 0.25);

    let composite = recalculate_composite(&record, model.weights());
    assert_eq!(composite.credibility_total, 0.988);
    assert_eq!(composite.trading_total, 0.5);
    assert_eq!(composite.payout_total, 0.25);
    assert_eq!(
        composite.pti_score,
        round3(0.35 * 0.9876 + 0.30 * 0.5 + 0.35 * 0.25)
    );
}

#[test]
fn composite_ignores_cached_totals_and_corrupt_leaves() {
    let model = model();
    let mut record = ScoreRecord::empty(firm_id("corrupt"));
    record.set_sub_factor(&path(&model, "payout_cycle"), 1.0);
    record.payout_payment_reliability.score = 99.0;
    record.pti_score = 42.0;
    record.payout_payment_reliability.categories.insert(
        "payment_methods".to_string(),
        ScoreNode::Group(
            [
                ("payment_options".to_string(), ScoreNode::Unscored(json!("n/a"))),
                ("withdrawal_fees".to_string(), ScoreNode::Points(f64::NAN)),
                ("processing_speed".to_string(), ScoreNode::Points(0.5)),
            ]
            .into_iter()
            .collect(),
        ),
    );

    let composite = recalculate_composite(&record, model.weights());
    assert_eq!(composite.payout_total, 1.5);
    assert_eq!(composite.pti_score, round3(0.35 * 1.5));
}

#[test]
fn composite_sums_nested_groups_generically() {
    let model = model();
    let mut record = ScoreRecord::empty(firm_id("nested"));
    record.trading_experience.categories.insert(
        "experimental".to_string(),
        ScoreNode::Group(
            [(
                "inner".to_string(),
                ScoreNode::Group([("leaf".to_string(), ScoreNode::Points(0.75))].into_iter().collect()),
            )]
            .into_iter()
            .collect(),
        ),
    );

    let composite = recalculate_composite(&record, model.weights());
    assert_eq!(composite.trading_total, 0.75);
    assert_eq!(record.pillar(Pillar::TradingExperience).leaf_total(), 0.75);
}
