use serde::{Deserialize, Serialize};

/// Payout-volume tier deciding how heavily a single complaint is penalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeductionSlab {
    S1,
    S2,
    S3,
    S4,
}

impl DeductionSlab {
    pub fn label(&self) -> &'static str {
        match self {
            DeductionSlab::S1 => "S1",
            DeductionSlab::S2 => "S2",
            DeductionSlab::S3 => "S3",
            DeductionSlab::S4 => "S4",
        }
    }
}

/// Lower payout bound (inclusive) and the rate charged from that bound upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlabThreshold {
    pub slab: DeductionSlab,
    pub min_payout: f64,
    pub rate: f64,
}

/// Strictest standard slab, charged when a table has no threshold to offer.
const STANDARD_FLOOR: SlabThreshold = SlabThreshold {
    slab: DeductionSlab::S1,
    min_payout: 0.0,
    rate: 0.20,
};

/// Ordered slab table, highest threshold first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionSchedule {
    thresholds: Vec<SlabThreshold>,
}

impl DeductionSchedule {
    pub fn new(mut thresholds: Vec<SlabThreshold>) -> Self {
        thresholds.sort_by(|a, b| b.min_payout.total_cmp(&a.min_payout));
        Self { thresholds }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            SlabThreshold {
                slab: DeductionSlab::S4,
                min_payout: 50_000_000.0,
                rate: 0.10,
            },
            SlabThreshold {
                slab: DeductionSlab::S3,
                min_payout: 10_000_000.0,
                rate: 0.12,
            },
            SlabThreshold {
                slab: DeductionSlab::S2,
                min_payout: 2_000_000.0,
                rate: 0.16,
            },
            STANDARD_FLOOR,
        ])
    }

    pub fn thresholds(&self) -> &[SlabThreshold] {
        &self.thresholds
    }

    /// First threshold the payout clears, scanning from the top. Payouts that
    /// clear nothing (including NaN) fall into the lowest slab.
    pub fn slab_for(&self, total_payout: f64) -> Option<&SlabThreshold> {
        self.thresholds
            .iter()
            .find(|threshold| total_payout >= threshold.min_payout)
            .or_else(|| self.thresholds.last())
    }

    /// Like [`slab_for`](Self::slab_for), but an empty table charges the
    /// standard floor rather than nothing.
    pub fn threshold_for(&self, total_payout: f64) -> SlabThreshold {
        self.slab_for(total_payout)
            .copied()
            .unwrap_or(STANDARD_FLOOR)
    }

    pub fn deduction_rate_for_slab(&self, total_payout: f64) -> f64 {
        self.threshold_for(total_payout).rate
    }
}

impl Default for DeductionSchedule {
    fn default() -> Self {
        Self::standard()
    }
}
