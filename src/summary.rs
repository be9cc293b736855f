//! Per-place summary records ("TLDR") from the summary store.
//!
//! The store is loosely typed: fields come and go, counts arrive as numbers,
//! numeric strings or null, and older documents use `last_week_*` where newer
//! ones use `last_obs_week_*`. Everything is folded into [`SummaryRecord`]
//! once, here, so read sites never probe raw JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::normalize::normalize_spa_name;
use crate::region::{RegionCode, pad_fips};

/// Fill for places with no colour of their own.
pub const GRAY_FILL: &str = "#d1d5db";

/// Observation or forecast window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Window {
    pub start: String,
    pub end: String,
    pub count: f64,
}

impl Window {
    /// "start – end", whichever side exists, or "n/a".
    pub fn range_label(&self) -> String {
        match (self.start.is_empty(), self.end.is_empty()) {
            (false, false) => format!("{} – {}", self.start, self.end),
            (false, true) => self.start.clone(),
            (true, false) => self.end.clone(),
            (true, true) => "n/a".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryRecord {
    /// Display name (county or SPA name); empty for region records.
    pub name: String,
    pub total_till_date: f64,
    pub color: String,
    pub last_obs_week: Window,
    pub last_obs_month: Window,
    pub next_week_forecast: Window,
    pub next_month_forecast: Window,
}

impl SummaryRecord {
    fn has_numbers(&self) -> bool {
        self.total_till_date > 0.0
            || self.last_obs_week.count > 0.0
            || self.last_obs_month.count > 0.0
            || self.next_week_forecast.count > 0.0
            || self.next_month_forecast.count > 0.0
    }

    /// Hex fill for the store's own colour tag.
    pub fn fill_hex(&self) -> &str {
        color_hex(&self.color)
    }
}

/// `r`/`g`/`y` shorthands to hex; anything else is taken as a colour
/// already; empty means no data.
pub fn color_hex(tag: &str) -> &str {
    match tag.trim().to_ascii_lowercase().as_str() {
        "" => GRAY_FILL,
        "r" => "#ef4444",
        "g" => "#10b981",
        "y" => "#facc15",
        _ => tag.trim(),
    }
}

/// A store document as it arrives. Every field is optional and untyped.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    county_name: Option<Value>,
    spa_name: Option<Value>,
    spa_id: Option<Value>,
    total_till_date: Option<Value>,
    color: Option<Value>,

    last_obs_week_start: Option<Value>,
    last_obs_week_end: Option<Value>,
    last_obs_week_count: Option<Value>,
    last_week_start: Option<Value>,
    last_week_end: Option<Value>,
    last_week_count: Option<Value>,

    last_obs_month_start: Option<Value>,
    last_obs_month_end: Option<Value>,
    last_obs_month_count: Option<Value>,
    last_month_start: Option<Value>,
    last_month_end: Option<Value>,
    last_month_count: Option<Value>,

    next_week_start: Option<Value>,
    next_week_end: Option<Value>,
    next_week_forecast: Option<Value>,
    next_month_start: Option<Value>,
    next_month_end: Option<Value>,
    next_month_forecast: Option<Value>,
}

// Present-and-not-null wins, even when it is 0.
fn num(primary: &Option<Value>, fallback: &Option<Value>) -> f64 {
    let value = match primary {
        Some(v) if !v.is_null() => Some(v),
        _ => fallback.as_ref().filter(|v| !v.is_null()),
    };
    value.map_or(0.0, coerce_number)
}

fn coerce_number(v: &Value) -> f64 {
    let n = match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

// Non-empty wins.
fn text(primary: &Option<Value>, fallback: &Option<Value>) -> String {
    let s = coerce_text(primary);
    if s.is_empty() { coerce_text(fallback) } else { s }
}

fn coerce_text(v: &Option<Value>) -> String {
    match v {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

const NONE: Option<Value> = None;

impl RawRecord {
    /// Typed record, or `None` when every count is zero or missing.
    pub fn normalize(&self) -> Option<SummaryRecord> {
        let rec = SummaryRecord {
            name: text(&self.county_name, &self.spa_name),
            total_till_date: num(&self.total_till_date, &NONE),
            color: text(&self.color, &NONE),
            last_obs_week: Window {
                start: text(&self.last_obs_week_start, &self.last_week_start),
                end: text(&self.last_obs_week_end, &self.last_week_end),
                count: num(&self.last_obs_week_count, &self.last_week_count),
            },
            last_obs_month: Window {
                start: text(&self.last_obs_month_start, &self.last_month_start),
                end: text(&self.last_obs_month_end, &self.last_month_end),
                count: num(&self.last_obs_month_count, &self.last_month_count),
            },
            next_week_forecast: Window {
                start: text(&self.next_week_start, &NONE),
                end: text(&self.next_week_end, &NONE),
                count: num(&self.next_week_forecast, &NONE),
            },
            next_month_forecast: Window {
                start: text(&self.next_month_start, &NONE),
                end: text(&self.next_month_end, &NONE),
                count: num(&self.next_month_forecast, &NONE),
            },
        };
        rec.has_numbers().then_some(rec)
    }

    /// SPA key: the slug of the explicit id, else of the SPA name.
    pub fn spa_key(&self) -> String {
        normalize_spa_name(&text(&self.spa_id, &self.spa_name))
    }
}

/// Region record built from its counties when the region document itself
/// carries no numbers. County totals fall back to the last-month count.
/// Counties without numbers are skipped, and a roll-up that still has none
/// is absent.
pub fn roll_up<'a, I>(counties: I) -> Option<SummaryRecord>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    let mut rec = SummaryRecord::default();
    for c in counties.into_iter().filter(|c| c.normalize().is_some()) {
        rec.total_till_date += num(&c.total_till_date, &c.last_obs_month_count);
        rec.last_obs_week.count += num(&c.last_obs_week_count, &NONE);
        rec.last_obs_month.count += num(&c.last_obs_month_count, &NONE);
        rec.next_week_forecast.count += num(&c.next_week_forecast, &NONE);
        rec.next_month_forecast.count += num(&c.next_month_forecast, &NONE);

        for (slot, field) in [
            (&mut rec.last_obs_week.end, &c.last_obs_week_end),
            (&mut rec.last_obs_month.end, &c.last_obs_month_end),
            (&mut rec.next_week_forecast.end, &c.next_week_end),
            (&mut rec.next_month_forecast.end, &c.next_month_end),
        ] {
            let end = coerce_text(field);
            if !end.is_empty() {
                *slot = end;
            }
        }

        let color = coerce_text(&c.color);
        if rec.color.is_empty() && !color.is_empty() {
            rec.color = color;
        }
    }
    rec.has_numbers().then_some(rec)
}

/// On-disk dump of the summary store.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawStore {
    pub states: BTreeMap<String, RawRecord>,
    pub counties: BTreeMap<String, BTreeMap<String, RawRecord>>,
    pub spas: BTreeMap<String, RawRecord>,
}

/// Normalized summary store. Maps iterate in key order, which is the order
/// candidates are enumerated for ranking ties.
#[derive(Clone, Debug, Default)]
pub struct SummaryStore {
    regions: BTreeMap<RegionCode, SummaryRecord>,
    counties: BTreeMap<RegionCode, BTreeMap<String, SummaryRecord>>,
    spas: BTreeMap<String, SummaryRecord>,
}

impl SummaryStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let raw: RawStore = serde_json::from_str(&text)?;
        Ok(Self::from_raw(&raw))
    }

    pub fn from_raw(raw: &RawStore) -> Self {
        let mut counties: BTreeMap<RegionCode, BTreeMap<String, SummaryRecord>> = BTreeMap::new();
        for (code, docs) in &raw.counties {
            let Some(region) = RegionCode::parse(code) else {
                debug!(code = %code, "skipping counties of unknown region");
                continue;
            };
            let by_fips = counties.entry(region).or_default();
            for (fips, doc) in docs {
                if let Some(rec) = doc.normalize() {
                    by_fips.insert(pad_fips(fips), rec);
                }
            }
        }

        let mut regions = BTreeMap::new();
        let codes = raw.states.keys().chain(raw.counties.keys());
        for code in codes {
            let Some(region) = RegionCode::parse(code) else {
                debug!(code = %code, "skipping record of unknown region");
                continue;
            };
            if regions.contains_key(&region) {
                continue;
            }
            let direct = raw.states.get(code).and_then(RawRecord::normalize);
            let rec = direct.or_else(|| roll_up(raw.counties.get(code).into_iter().flat_map(|m| m.values())));
            if let Some(rec) = rec {
                regions.insert(region, rec);
            }
        }

        let spas = raw
            .spas
            .iter()
            .filter_map(|(id, doc)| {
                let rec = doc.normalize()?;
                let key = match doc.spa_key().as_str() {
                    "spa" => normalize_spa_name(id),
                    key => key.to_string(),
                };
                Some((key, rec))
            })
            .collect::<BTreeMap<_, _>>();

        info!(
            regions = regions.len(),
            counties = counties.values().map(BTreeMap::len).sum::<usize>(),
            spas = spas.len(),
            "loaded summary store"
        );

        Self { regions, counties, spas }
    }

    pub fn region(&self, code: RegionCode) -> Option<&SummaryRecord> {
        self.regions.get(&code)
    }

    pub fn regions(&self) -> &BTreeMap<RegionCode, SummaryRecord> {
        &self.regions
    }

    /// County records of `code`, keyed by 5-digit FIPS.
    pub fn counties(&self, code: RegionCode) -> Option<&BTreeMap<String, SummaryRecord>> {
        self.counties.get(&code)
    }

    pub fn county(&self, code: RegionCode, fips: &str) -> Option<&SummaryRecord> {
        self.counties.get(&code)?.get(&pad_fips(fips))
    }

    pub fn spas(&self) -> &BTreeMap<String, SummaryRecord> {
        &self.spas
    }

    /// Sum of region totals.
    pub fn national_total(&self) -> f64 {
        self.regions.values().map(|r| r.total_till_date).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::spa_feature_key;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> RawRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn aliases_and_coercion() {
        let rec = raw(json!({
            "total_till_date": "120",
            "last_week_start": "2024-06-02",
            "last_week_end": "2024-06-08",
            "last_week_count": 4,
            "last_obs_month_count": null,
            "last_month_count": "17",
            "next_week_forecast": 2.5,
            "color": "r"
        }))
        .normalize()
        .unwrap();
        assert_eq!(rec.total_till_date, 120.0);
        assert_eq!(rec.last_obs_week.count, 4.0);
        assert_eq!(rec.last_obs_week.range_label(), "2024-06-02 – 2024-06-08");
        assert_eq!(rec.last_obs_month.count, 17.0);
        assert_eq!(rec.next_week_forecast.count, 2.5);
        assert_eq!(rec.next_month_forecast.range_label(), "n/a");
        assert_eq!(rec.fill_hex(), "#ef4444");
    }

    #[test]
    fn present_zero_beats_fallback() {
        let rec = raw(json!({
            "total_till_date": 1,
            "last_obs_week_count": 0,
            "last_week_count": 9
        }))
        .normalize()
        .unwrap();
        assert_eq!(rec.last_obs_week.count, 0.0);
    }

    #[test]
    fn records_without_numbers_are_absent() {
        assert!(raw(json!({ "county_name": "Orange", "total_till_date": "abc" })).normalize().is_none());
        assert!(raw(json!({})).normalize().is_none());
    }

    #[test]
    fn colour_tags() {
        assert_eq!(color_hex("G"), "#10b981");
        assert_eq!(color_hex(""), GRAY_FILL);
        assert_eq!(color_hex("#123456"), "#123456");
    }

    #[test]
    fn region_falls_back_to_county_roll_up() {
        let store: RawStore = serde_json::from_value(json!({
            "states": {
                "ca": { "total_till_date": 50 },
                "NV": { "color": "g" }
            },
            "counties": {
                "NV": {
                    "32003": { "total_till_date": 10, "last_obs_week_count": 1, "last_obs_week_end": "2024-06-08", "color": "r" },
                    "32031": { "last_obs_month_count": 6, "last_obs_week_count": 2, "color": "g" }
                },
                "ZZ": { "1": { "total_till_date": 999 } }
            }
        }))
        .unwrap();
        let store = SummaryStore::from_raw(&store);
        let ca = RegionCode::parse("CA").unwrap();
        let nv = RegionCode::parse("NV").unwrap();
        assert_eq!(store.region(ca).unwrap().total_till_date, 50.0);

        let nv_rec = store.region(nv).unwrap();
        assert_eq!(nv_rec.total_till_date, 16.0);
        assert_eq!(nv_rec.last_obs_week.count, 3.0);
        assert_eq!(nv_rec.last_obs_week.end, "2024-06-08");
        assert_eq!(nv_rec.color, "r");

        assert_eq!(store.regions().len(), 2);
        assert_eq!(store.national_total(), 66.0);
        assert_eq!(store.counties(nv).unwrap().len(), 2);
    }

    #[test]
    fn region_with_only_empty_counties_is_absent() {
        let store: RawStore = serde_json::from_value(json!({
            "states": { "CA": { "total_till_date": 5 } },
            "counties": { "NV": {
                "32003": { "county_name": "Clark" },
                "32031": { "county_name": "Washoe", "last_obs_week_end": "2024-06-08" }
            }}
        }))
        .unwrap();
        let store = SummaryStore::from_raw(&store);
        let nv = RegionCode::parse("NV").unwrap();
        assert!(store.region(nv).is_none());
        assert!(store.counties(nv).unwrap().is_empty());
        assert_eq!(store.regions().len(), 1);
        assert!(roll_up(std::iter::empty::<&RawRecord>()).is_none());
    }

    #[test]
    fn roll_up_ignores_dates_of_empty_counties() {
        let counties: Vec<RawRecord> = vec![
            raw(json!({ "total_till_date": 3, "last_obs_week_end": "2024-06-01" })),
            raw(json!({ "county_name": "Empty", "last_obs_week_end": "2024-06-08" })),
        ];
        let rec = roll_up(&counties).unwrap();
        assert_eq!(rec.total_till_date, 3.0);
        assert_eq!(rec.last_obs_week.end, "2024-06-01");
    }

    #[test]
    fn county_ids_are_padded() {
        let store: RawStore = serde_json::from_value(json!({
            "counties": { "CA": { "6037": { "county_name": "Los Angeles", "total_till_date": 3 } } }
        }))
        .unwrap();
        let store = SummaryStore::from_raw(&store);
        let ca = RegionCode::parse("CA").unwrap();
        assert_eq!(store.county(ca, "06037").unwrap().name, "Los Angeles");
        assert!(store.county(ca, "6037").is_some());
    }

    #[test]
    fn spa_records_key_by_id_or_name() {
        let store: RawStore = serde_json::from_value(json!({
            "spas": {
                "doc1": { "spa_name": "San Fernando Va", "total_till_date": 5 },
                "doc2": { "spa_id": "south-bay", "spa_name": "South Bay", "total_till_date": 2 },
                "doc3": { "spa_name": "Empty" }
            }
        }))
        .unwrap();
        let store = SummaryStore::from_raw(&store);
        let keys: Vec<_> = store.spas().keys().cloned().collect();
        assert_eq!(keys, ["san-fernando-valley", "south-bay"]);
        assert_eq!(store.spas()["san-fernando-valley"].name, "San Fernando Va");
    }

    #[test]
    fn spa_ids_are_slugged_to_match_polygon_keys() {
        let store: RawStore = serde_json::from_value(json!({
            "spas": { "doc": { "spa_id": "Metro L.A.", "spa_name": "Metro", "total_till_date": 4 } }
        }))
        .unwrap();
        let store = SummaryStore::from_raw(&store);
        assert!(store.spas().contains_key(&spa_feature_key("Metro Los Angeles")));
        assert!(store.spas().contains_key("metro-l-a"));
    }

    #[test]
    fn loads_store_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.json");
        fs::write(&path, r#"{ "states": { "TX": { "total_till_date": 7 } } }"#).unwrap();
        let store = SummaryStore::load(&path).unwrap();
        assert_eq!(store.national_total(), 7.0);
        assert!(SummaryStore::load(dir.path().join("missing.json")).is_err());
    }
}
