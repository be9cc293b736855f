use std::collections::HashMap;

use crossterm::event::KeyCode;
use fire_atlas::summary::SummaryRecord;
use fire_atlas::tiers::{RankedRow, tier_of};
use fire_atlas::{Engine, RankMode, RegionCode, Tier};

use crate::data::{DataCache, GeoLevel, Place};
use crate::map_draw::MapView;

/// Row of the top-10 table.
pub struct TopRow {
    pub rank: usize,
    pub name: String,
    pub score: f64,
    pub tier: Tier,
}

/// Trimmed weekly series of the selected place, ready to plot.
pub struct ChartData {
    pub title: String,
    pub points: Vec<(f64, f64)>,
    pub first_label: String,
    pub last_label: String,
    pub max: f64,
}

pub struct AppState {
    pub cache: DataCache,
    pub engine: Engine,
    pub level: GeoLevel,
    pub mode: RankMode,
    pub list_items: Vec<Place>,
    pub selected: usize,
    pub history: Vec<(GeoLevel, usize)>,
    pub map: Option<MapView>,
    pub tiers: HashMap<String, Tier>,
    pub top_rows: Vec<TopRow>,
    pub chart: Option<ChartData>,
}

impl AppState {
    pub const HELP_TEXT: &'static str = "\
↑/↓: move
Enter: drill down (nation→state→county)
Esc / Backspace: back
m: colour by total / year-over-year
q: quit";

    pub fn new(cache: DataCache, engine: Engine) -> Self {
        let mut state = Self {
            cache,
            engine,
            level: GeoLevel::Nation,
            mode: RankMode::Rank,
            list_items: Vec::new(),
            selected: 0,
            history: Vec::new(),
            map: None,
            tiers: HashMap::new(),
            top_rows: Vec::new(),
            chart: None,
        };
        state.enter(GeoLevel::Nation, 0);
        state
    }

    fn enter(&mut self, level: GeoLevel, selected: usize) {
        self.list_items = self.cache.places(&level, &self.engine);
        self.map = MapView::new(&self.list_items);
        self.level = level;
        self.selected = selected.min(self.list_items.len().saturating_sub(1));
        self.refresh_tiers();
        self.refresh_chart();
    }

    /// Recomputed on every level change and colour-mode toggle.
    pub fn refresh_tiers(&mut self) {
        let mode = self.mode;
        let engine = &self.engine;
        let (tiers, rows): (HashMap<String, Tier>, Vec<RankedRow<String>>) = match &self.level {
            GeoLevel::Nation => {
                let tiers = engine.region_tiers(mode).into_iter().map(|(k, t)| (k.to_string(), t)).collect();
                let rows = engine
                    .top_regions(mode)
                    .into_iter()
                    .map(|r| RankedRow { key: r.key.to_string(), score: r.score, tier: r.tier })
                    .collect();
                (tiers, rows)
            }
            GeoLevel::State(code) => (engine.county_tiers(*code, mode), engine.top_counties(*code, mode)),
            GeoLevel::Spa { .. } => (engine.spa_tiers(mode), engine.top_spas(mode)),
        };
        self.top_rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, r)| TopRow { rank: i + 1, name: self.display_name(&r.key), score: r.score, tier: r.tier })
            .collect();
        self.tiers = tiers;
    }

    fn display_name(&self, id: &str) -> String {
        match &self.level {
            GeoLevel::Nation => match RegionCode::parse(id) {
                Some(code) => format!("{code} — {}", code.name()),
                None => id.to_string(),
            },
            _ => self
                .list_items
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.name.clone())
                .or_else(|| self.record_for(id).map(|r| r.name.clone()).filter(|n| !n.is_empty()))
                .unwrap_or_else(|| id.to_string()),
        }
    }

    pub fn tier_of(&self, id: &str) -> Tier {
        tier_of(&self.tiers, &id.to_string())
    }

    pub fn selected_place(&self) -> Option<&Place> {
        self.list_items.get(self.selected)
    }

    fn record_for(&self, id: &str) -> Option<&SummaryRecord> {
        let summaries = self.engine.summaries();
        match &self.level {
            GeoLevel::Nation => summaries.region(RegionCode::parse(id)?),
            GeoLevel::State(code) => summaries.county(*code, id),
            GeoLevel::Spa { .. } => summaries.spas().get(id),
        }
    }

    pub fn selected_record(&self) -> Option<&SummaryRecord> {
        self.record_for(&self.selected_place()?.id)
    }

    /// Chart for the selected place: region series at nation level, county
    /// series (joined by name) at state level, nothing for SPAs.
    pub fn refresh_chart(&mut self) {
        let config = self.cache.config();
        let (threshold, tail) = (config.trim_threshold, config.fallback_tail);
        self.chart = self.selected_place().and_then(|place| match &self.level {
            GeoLevel::Nation => {
                let code = RegionCode::parse(&place.id)?;
                let series = self.engine.region_series(code)?;
                Some(chart_data(
                    format!("{code} — {}", code.name()),
                    series.trim(threshold, tail),
                ))
            }
            GeoLevel::State(code) => {
                let name = self
                    .engine
                    .summaries()
                    .county(*code, &place.id)
                    .map(|r| r.name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| place.name.clone());
                let series = self.engine.sub_region_series(*code, &name)?;
                Some(chart_data(format!("{name}, {code}"), series.trim(threshold, tail)))
            }
            GeoLevel::Spa { .. } => None,
        });
    }

    /// Returns true when the app should exit.
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        use KeyCode::*;
        match key {
            Char('q') => return true,
            Char('m') => {
                self.mode = self.mode.toggle();
                self.refresh_tiers();
            }
            Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.refresh_chart();
                }
            }
            Down => {
                if self.selected + 1 < self.list_items.len() {
                    self.selected += 1;
                    self.refresh_chart();
                }
            }
            Enter => {
                let child = self.selected_place().and_then(|p| self.level.child(p));
                if let Some(child) = child {
                    self.history.push((self.level.clone(), self.selected));
                    self.enter(child, 0);
                }
            }
            Backspace | Esc => {
                if let Some((level, selected)) = self.history.pop() {
                    self.enter(level, selected);
                }
            }
            _ => {}
        }
        false
    }
}

fn chart_data(title: String, window: fire_atlas::SeriesWindow<'_>) -> ChartData {
    ChartData {
        title: format!("{title} (from {})", window.first_label().unwrap_or("n/a")),
        points: window.values.iter().enumerate().map(|(i, v)| (i as f64, *v)).collect(),
        first_label: window.first_label().unwrap_or_default().to_string(),
        last_label: window.last_label().unwrap_or_default().to_string(),
        max: window.max(),
    }
}
