//! Customer segment taxonomy and the (r, f, m) → segment decision table.
//!
//! The table is a 5×5 grid indexed by the recency score and the combined
//! frequency/monetary score `fm = round_half_up((f + m) / 2)`. Every one of
//! the 125 (r, f, m) triples lands on exactly one grid cell, so the mapping
//! is total by construction.
//!
//! Downstream queries filter by label substring ("At Risk", "Lost",
//! "Champion"). Labels are part of the stored contract: never rename one.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    Champions,
    LoyalCustomers,
    PotentialLoyalists,
    NewCustomers,
    Promising,
    NeedAttention,
    AboutToSleep,
    AtRisk,
    CantLose,
    Hibernating,
    Lost,
}

impl Segment {
    pub const ALL: [Segment; 11] = [
        Segment::Champions,
        Segment::LoyalCustomers,
        Segment::PotentialLoyalists,
        Segment::NewCustomers,
        Segment::Promising,
        Segment::NeedAttention,
        Segment::AboutToSleep,
        Segment::AtRisk,
        Segment::CantLose,
        Segment::Hibernating,
        Segment::Lost,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Champions          => "Champions",
            Self::LoyalCustomers     => "Loyal Customers",
            Self::PotentialLoyalists => "Potential Loyalists",
            Self::NewCustomers       => "New Customers",
            Self::Promising          => "Promising",
            Self::NeedAttention      => "Need Attention",
            Self::AboutToSleep       => "About to Sleep",
            Self::AtRisk             => "At Risk",
            Self::CantLose           => "Can't Lose",
            Self::Hibernating        => "Hibernating",
            Self::Lost               => "Lost",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

use Segment::*;

/// Rows: r_score 1..=5. Columns: fm 1..=5.
const SEGMENT_GRID: [[Segment; 5]; 5] = [
    /* r=1 */ [Lost,         Lost,               AtRisk,             AtRisk,         CantLose],
    /* r=2 */ [Hibernating,  Hibernating,        AtRisk,             AtRisk,         CantLose],
    /* r=3 */ [AboutToSleep, AboutToSleep,       NeedAttention,      LoyalCustomers, LoyalCustomers],
    /* r=4 */ [Promising,    PotentialLoyalists, PotentialLoyalists, LoyalCustomers, Champions],
    /* r=5 */ [NewCustomers, PotentialLoyalists, PotentialLoyalists, Champions,      Champions],
];

/// Combined frequency/monetary score, rounding halves up.
pub fn fm_score(f_score: u8, m_score: u8) -> u8 {
    (f_score + m_score).div_ceil(2)
}

/// Map a score triple to its segment. Scores outside 1..=5 are clamped
/// into range first; the engine never produces them.
pub fn assign_segment(r_score: u8, f_score: u8, m_score: u8) -> Segment {
    let r = r_score.clamp(1, 5);
    let fm = fm_score(f_score.clamp(1, 5), m_score.clamp(1, 5));
    SEGMENT_GRID[(r - 1) as usize][(fm - 1) as usize]
}

/// Composite score with strict R > F > M priority.
pub fn composite_score(r_score: u8, f_score: u8, m_score: u8) -> u16 {
    r_score as u16 * 100 + f_score as u16 * 10 + m_score as u16
}
