use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::matrix::{KeyCollision, MatrixIndex, WideMatrix};
use crate::normalize::{UNKNOWN_KEY, normalize};
use crate::region::RegionCode;
use crate::series::{SeriesCache, SeriesKey, TimeSeries};
use crate::summary::SummaryStore;
use crate::tiers::{Candidate, RankMode, RankedRow, TOP_N, Tier, compute_tiers, rank};

/// Rows shown for the SPA layer, which has eight places.
pub const SPA_TOP_N: usize = 8;

/// Join, series and ranking state for one session. Built once from the two
/// upstream sources; read-only afterwards apart from the series memo.
pub struct Engine {
    index: MatrixIndex,
    summaries: SummaryStore,
    cache: SeriesCache,
}

impl Engine {
    pub fn new(matrix: WideMatrix, summaries: SummaryStore) -> Self {
        let index = MatrixIndex::build(matrix);
        for c in index.collisions() {
            debug!(region = %c.region, key = %c.key, kept = %c.kept, replaced = %c.replaced, "county key collision");
        }
        info!(
            series = index.all_region_series().len(),
            regions_with_totals = summaries.regions().len(),
            "engine ready"
        );
        Self { index, summaries, cache: SeriesCache::new() }
    }

    /// No tiers and no series; what a host falls back to when both loads fail.
    pub fn empty() -> Self {
        Self::new(WideMatrix::default(), SummaryStore::default())
    }

    pub fn summaries(&self) -> &SummaryStore {
        &self.summaries
    }

    pub fn index(&self) -> &MatrixIndex {
        &self.index
    }

    pub fn collisions(&self) -> &[KeyCollision] {
        self.index.collisions()
    }

    pub fn region_series(&self, code: RegionCode) -> Option<&TimeSeries> {
        self.index.region_series(code)
    }

    /// County series by free-text name, memoized per normalized name.
    /// `None` is the common case for names the matrix does not carry.
    pub fn sub_region_series(&self, code: RegionCode, name: &str) -> Option<Arc<TimeSeries>> {
        let key = normalize(name);
        if key == UNKNOWN_KEY {
            return None;
        }
        let found = self.cache.get_or_insert_with(
            SeriesKey { region: code, name: key.clone() },
            || self.index.county_series(code, &key),
        );
        if found.is_none() {
            debug!(region = %code, name = %name, key = %key, "no matrix column for county");
        }
        found
    }

    pub fn cached_series(&self) -> usize {
        self.cache.len()
    }

    fn region_candidates(&self) -> Vec<Candidate<'_, RegionCode>> {
        let mut codes: Vec<RegionCode> = self.summaries.regions().keys().copied().collect();
        for code in self.index.all_region_series().keys() {
            if !codes.contains(code) {
                codes.push(*code);
            }
        }
        codes
            .into_iter()
            .map(|code| Candidate {
                key: code,
                total: self.summaries.region(code).map(|r| r.total_till_date),
                series: self.index.region_series(code),
            })
            .collect()
    }

    pub fn region_tiers(&self, mode: RankMode) -> HashMap<RegionCode, Tier> {
        compute_tiers(mode, &self.region_candidates())
    }

    pub fn top_regions(&self, mode: RankMode) -> Vec<RankedRow<RegionCode>> {
        rank(mode, &self.region_candidates(), TOP_N)
    }

    // Series are looked up by county name, so they are held here for the
    // lifetime of the candidate list.
    fn county_series(&self, code: RegionCode) -> Vec<(String, Option<Arc<TimeSeries>>)> {
        self.summaries
            .counties(code)
            .into_iter()
            .flatten()
            .map(|(fips, rec)| (fips.clone(), self.sub_region_series(code, &rec.name)))
            .collect()
    }

    fn county_candidates<'a>(
        &self,
        code: RegionCode,
        series: &'a [(String, Option<Arc<TimeSeries>>)],
    ) -> Vec<Candidate<'a, String>> {
        series
            .iter()
            .map(|(fips, s)| Candidate {
                key: fips.clone(),
                total: self.summaries.county(code, fips).map(|r| r.total_till_date),
                series: s.as_deref(),
            })
            .collect()
    }

    /// Tiers for the counties of `code`, keyed by 5-digit FIPS.
    pub fn county_tiers(&self, code: RegionCode, mode: RankMode) -> HashMap<String, Tier> {
        let series = self.county_series(code);
        compute_tiers(mode, &self.county_candidates(code, &series))
    }

    pub fn top_counties(&self, code: RegionCode, mode: RankMode) -> Vec<RankedRow<String>> {
        let series = self.county_series(code);
        rank(mode, &self.county_candidates(code, &series), TOP_N)
    }

    fn spa_candidates(&self) -> Vec<Candidate<'_, String>> {
        self.summaries
            .spas()
            .iter()
            .map(|(key, rec)| Candidate { key: key.clone(), total: Some(rec.total_till_date), series: None })
            .collect()
    }

    /// SPA tiers keyed by SPA slug. SPAs have no weekly series, so trend
    /// mode yields an empty map.
    pub fn spa_tiers(&self, mode: RankMode) -> HashMap<String, Tier> {
        compute_tiers(mode, &self.spa_candidates())
    }

    pub fn top_spas(&self, mode: RankMode) -> Vec<RankedRow<String>> {
        rank(mode, &self.spa_candidates(), SPA_TOP_N)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::RawStore;
    use serde_json::json;

    fn ca() -> RegionCode {
        RegionCode::parse("CA").unwrap()
    }

    fn matrix(csv: &str) -> WideMatrix {
        WideMatrix::from_reader(csv.as_bytes(), "week_start").unwrap()
    }

    fn store(v: serde_json::Value) -> SummaryStore {
        let raw: RawStore = serde_json::from_value(v).unwrap();
        SummaryStore::from_raw(&raw)
    }

    fn weekly_csv(weeks: usize) -> String {
        let mut csv = String::from("week_start,CA|Los Angeles,CA|Orange,CA|Kern,TX|Harris\n");
        for w in 0..weeks {
            // LA grows, Orange shrinks, Kern flat, Harris grows fastest.
            csv.push_str(&format!("w{w},{},{},5,{}\n", w, 100 - w.min(100), 2 * w));
        }
        csv
    }

    #[test]
    fn county_lookup_is_spelling_insensitive_and_cached() {
        let engine = Engine::new(
            matrix("week_start,CA|Los Angeles,CA|Orange\n2020-01-01,5,3\n2020-01-08,1,4\n"),
            SummaryStore::default(),
        );
        let a = engine.sub_region_series(ca(), "Orange County").unwrap();
        let b = engine.sub_region_series(ca(), "orange").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.values(), &[3.0, 4.0]);
        assert_eq!(engine.cached_series(), 1);

        assert!(engine.sub_region_series(ca(), "Alameda").is_none());
        assert!(engine.sub_region_series(ca(), "").is_none());
        assert_eq!(engine.cached_series(), 1);
        assert_eq!(engine.region_series(ca()).unwrap().values(), &[8.0, 5.0]);
    }

    #[test]
    fn empty_engine_degrades_to_nothing() {
        let engine = Engine::empty();
        assert!(engine.region_tiers(RankMode::Rank).is_empty());
        assert!(engine.region_tiers(RankMode::Trend).is_empty());
        assert!(engine.county_tiers(ca(), RankMode::Rank).is_empty());
        assert!(engine.sub_region_series(ca(), "Orange").is_none());
        assert!(engine.top_spas(RankMode::Rank).is_empty());
    }

    #[test]
    fn region_rank_uses_store_totals() {
        let engine = Engine::new(
            matrix(&weekly_csv(3)),
            store(json!({ "states": {
                "TX": { "total_till_date": 10 },
                "CA": { "total_till_date": 30 },
                "NV": { "total_till_date": 20 }
            }})),
        );
        let rows = engine.top_regions(RankMode::Rank);
        let codes: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(codes, ["CA", "NV", "TX"]);
        assert!(rows.iter().all(|r| r.tier == Tier::Top));
    }

    #[test]
    fn region_trend_uses_matrix_series() {
        let engine = Engine::new(
            matrix(&weekly_csv(60)),
            store(json!({ "states": { "NV": { "total_till_date": 1e6 } } })),
        );
        let tiers = engine.region_tiers(RankMode::Trend);
        let tx = RegionCode::parse("TX").unwrap();
        let nv = RegionCode::parse("NV").unwrap();
        // TX lift = 2*52; CA lift = 52 - 52 + 0 = 0.
        let rows = engine.top_regions(RankMode::Trend);
        assert_eq!(rows[0].key, tx);
        assert_eq!(rows[0].score, 104.0);
        assert_eq!(rows[1].key, ca());
        assert_eq!(rows[1].score, 0.0);
        assert!(!tiers.contains_key(&nv));
    }

    #[test]
    fn county_tiers_join_store_names_to_matrix_headers() {
        let engine = Engine::new(
            matrix(&weekly_csv(60)),
            store(json!({ "counties": { "CA": {
                "6037": { "county_name": "Los Angeles County", "total_till_date": 10 },
                "06059": { "county_name": "Orange County", "total_till_date": 30 },
                "06029": { "county_name": "Kern County", "total_till_date": 20 },
                "06001": { "county_name": "Alameda County", "total_till_date": 99 }
            }}})),
        );

        let by_total = engine.top_counties(ca(), RankMode::Rank);
        let keys: Vec<_> = by_total.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["06001", "06059", "06029", "06037"]);
        assert_eq!(by_total[3].tier, Tier::Mid);

        let trend = engine.county_tiers(ca(), RankMode::Trend);
        assert_eq!(trend.len(), 3);
        assert!(!trend.contains_key("06001"));
        let by_lift = engine.top_counties(ca(), RankMode::Trend);
        assert_eq!(by_lift[0].key, "06037");
        assert_eq!(by_lift[0].score, 52.0);
    }

    #[test]
    fn spa_tiers_rank_by_total_only() {
        let engine = Engine::new(
            WideMatrix::default(),
            store(json!({ "spas": {
                "a": { "spa_name": "South Bay", "total_till_date": 3 },
                "b": { "spa_name": "San Fernando Va", "total_till_date": 9 }
            }})),
        );
        let rows = engine.top_spas(RankMode::Rank);
        assert_eq!(rows[0].key, "san-fernando-valley");
        assert!(engine.spa_tiers(RankMode::Trend).is_empty());
    }

    #[test]
    fn collisions_are_exposed() {
        let engine = Engine::new(
            matrix("week_start,MO|St. Louis,MO|St. Louis city\n2020-01-01,1,2\n"),
            SummaryStore::default(),
        );
        assert_eq!(engine.collisions().len(), 1);
    }
}
