use std::collections::HashMap;
use std::hash::Hash;

use crate::series::TimeSeries;

/// Places ranked per pass; everything past this gets no tier.
pub const TOP_N: usize = 10;

/// Periods between the two points of a year-over-year lift.
pub const TREND_LAG: usize = 52;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    Top,
    Mid,
    Low,
    None,
}

impl Tier {
    /// Band for a 0-based position in the ranked top list:
    /// 0..3 Top, 3..6 Mid, 6..10 Low.
    pub fn for_rank(index: usize) -> Tier {
        match index {
            0..=2 => Tier::Top,
            3..=5 => Tier::Mid,
            6..=9 => Tier::Low,
            _ => Tier::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Top => "top",
            Tier::Mid => "mid",
            Tier::Low => "low",
            Tier::None => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RankMode {
    /// By cumulative total.
    #[default]
    Rank,
    /// By latest value minus the value `TREND_LAG` periods earlier.
    Trend,
}

impl RankMode {
    pub fn toggle(self) -> Self {
        match self {
            RankMode::Rank => RankMode::Trend,
            RankMode::Trend => RankMode::Rank,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RankMode::Rank => "total",
            RankMode::Trend => "year-over-year",
        }
    }
}

/// A place offered for ranking. `total` is `None` when the summary store has
/// no record for it.
#[derive(Clone, Debug)]
pub struct Candidate<'a, K> {
    pub key: K,
    pub total: Option<f64>,
    pub series: Option<&'a TimeSeries>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankedRow<K> {
    pub key: K,
    /// Total in rank mode, lift in trend mode.
    pub score: f64,
    pub tier: Tier,
}

/// `latest - value TREND_LAG periods before latest`; `None` under 53 points.
pub fn lift(series: &TimeSeries) -> Option<f64> {
    let values = series.values();
    let n = values.len();
    if n <= TREND_LAG {
        return None;
    }
    Some(values[n - 1] - values[n - 1 - TREND_LAG])
}

/// Ranked top list, at most `limit` rows. The sort is stable, so ties keep
/// candidate order.
pub fn rank<K: Clone>(mode: RankMode, candidates: &[Candidate<'_, K>], limit: usize) -> Vec<RankedRow<K>> {
    let mut scored: Vec<(&K, f64)> = candidates
        .iter()
        .filter_map(|c| {
            let score = match mode {
                RankMode::Rank => c.total?,
                RankMode::Trend => lift(c.series?)?,
            };
            Some((&c.key, score))
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (key, score))| RankedRow { key: key.clone(), score, tier: Tier::for_rank(i) })
        .collect()
}

/// Tier per ranked place. Places missing from the map are [`Tier::None`].
pub fn compute_tiers<K>(mode: RankMode, candidates: &[Candidate<'_, K>]) -> HashMap<K, Tier>
where
    K: Clone + Eq + Hash,
{
    rank(mode, candidates, TOP_N)
        .into_iter()
        .map(|row| (row.key, row.tier))
        .collect()
}

pub fn tier_of<K: Eq + Hash>(tiers: &HashMap<K, Tier>, key: &K) -> Tier {
    tiers.get(key).copied().unwrap_or(Tier::None)
}
