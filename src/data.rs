use std::collections::BTreeMap;
use std::fs;
use std::str::FromStr;

use fire_atlas::config::Config;
use fire_atlas::matrix::WideMatrix;
use fire_atlas::normalize::spa_feature_key;
use fire_atlas::region::pad_fips;
use fire_atlas::summary::SummaryStore;
use fire_atlas::{AtlasError, Engine, RegionCode};
use geo::{Geometry, MultiPolygon};
use geojson::feature::Id;
use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use tracing::{info, warn};

/// County that drills down into SPAs (Los Angeles County).
pub const SPA_COUNTY: (&str, &str) = ("CA", "06037");

/// Drill levels: nation (states) → state (counties) → county (SPAs)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeoLevel {
    Nation,
    State(RegionCode),
    Spa { state: RegionCode, county: String },
}

impl GeoLevel {
    /// Level reached by drilling into `place` from here, if any.
    pub fn child(&self, place: &Place) -> Option<GeoLevel> {
        match self {
            GeoLevel::Nation => RegionCode::parse(&place.id).map(GeoLevel::State),
            GeoLevel::State(code) => {
                (code.as_str() == SPA_COUNTY.0 && place.id == SPA_COUNTY.1).then(|| GeoLevel::Spa {
                    state: *code,
                    county: place.id.clone(),
                })
            }
            GeoLevel::Spa { .. } => None,
        }
    }
}

/// One selectable place at the current level. `id` is the join key the
/// tier maps use: region code, 5-digit county FIPS or SPA slug.
#[derive(Clone, Debug)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub shape: Option<MultiPolygon<f64>>,
}

/// Reads and memoizes the geometry files of the data directory.
pub struct DataCache {
    config: Config,
    geojson: BTreeMap<String, GeoJson>,
}

impl DataCache {
    pub fn new(config: Config) -> Self {
        Self { config, geojson: BTreeMap::new() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn load_geojson(&mut self, file: &str) -> Result<&GeoJson, AtlasError> {
        if !self.geojson.contains_key(file) {
            let txt = fs::read_to_string(self.config.path(file))?;
            self.geojson.insert(file.to_string(), GeoJson::from_str(&txt)?);
        }
        Ok(&self.geojson[file])
    }

    fn features(&mut self, file: &str) -> Vec<Feature> {
        match self.load_geojson(file) {
            Ok(GeoJson::FeatureCollection(fc)) => fc.features.clone(),
            Ok(GeoJson::Feature(f)) => vec![f.clone()],
            Ok(GeoJson::Geometry(_)) => Vec::new(),
            Err(e) => {
                warn!(file = %file, error = %e, "geometry unavailable, listing places without shapes");
                Vec::new()
            }
        }
    }

    /// Places at `level`, sorted by name. Without geometry the list falls
    /// back to what the summary store knows.
    pub fn places(&mut self, level: &GeoLevel, engine: &Engine) -> Vec<Place> {
        let summaries = engine.summaries();
        let mut places: Vec<Place> = match level {
            GeoLevel::Nation => {
                let file = self.config.states_geojson.clone();
                let from_file: Vec<Place> = self
                    .features(&file)
                    .iter()
                    .filter_map(|f| {
                        let code = RegionCode::parse(&feature_id(f)?)?;
                        Some(Place { id: code.to_string(), name: code.name().to_string(), shape: shape_of(f) })
                    })
                    .collect();
                if from_file.is_empty() {
                    RegionCode::all()
                        .map(|code| Place { id: code.to_string(), name: code.name().to_string(), shape: None })
                        .collect()
                } else {
                    from_file
                }
            }
            GeoLevel::State(code) => {
                let file = self.config.counties_geojson.clone();
                let from_file: Vec<Place> = self
                    .features(&file)
                    .iter()
                    .filter_map(|f| {
                        let fips = pad_fips(&feature_id(f)?);
                        if !code.contains_fips(&fips) {
                            return None;
                        }
                        let name = summaries
                            .county(*code, &fips)
                            .map(|r| r.name.clone())
                            .filter(|n| !n.is_empty())
                            .or_else(|| prop_str(f.properties.as_ref()?, &["NAME", "name"]))
                            .unwrap_or_else(|| fips.clone());
                        Some(Place { id: fips, name, shape: shape_of(f) })
                    })
                    .collect();
                if from_file.is_empty() {
                    summaries
                        .counties(*code)
                        .into_iter()
                        .flatten()
                        .map(|(fips, rec)| Place {
                            id: fips.clone(),
                            name: if rec.name.is_empty() { fips.clone() } else { rec.name.clone() },
                            shape: None,
                        })
                        .collect()
                } else {
                    from_file
                }
            }
            GeoLevel::Spa { .. } => {
                let file = self.config.spas_geojson.clone();
                let from_file: Vec<Place> = self
                    .features(&file)
                    .iter()
                    .map(|f| {
                        let label = f.properties.as_ref().map(spa_label).unwrap_or_default();
                        Place { id: spa_feature_key(&label), name: label, shape: shape_of(f) }
                    })
                    .collect();
                if from_file.is_empty() {
                    summaries
                        .spas()
                        .iter()
                        .map(|(key, rec)| Place { id: key.clone(), name: rec.name.clone(), shape: None })
                        .collect()
                } else {
                    from_file
                }
            }
        };
        places.sort_by(|a, b| a.name.cmp(&b.name));
        places
    }
}

/// Feature id, else `GEOID`, else `COUNTYFP`.
pub fn feature_id(feature: &Feature) -> Option<String> {
    match &feature.id {
        Some(Id::String(s)) if !s.trim().is_empty() => Some(s.trim().to_uppercase()),
        Some(Id::Number(n)) => Some(n.to_string()),
        _ => prop_str(feature.properties.as_ref()?, &["GEOID", "COUNTYFP"]),
    }
}

/// First of `keys` holding a non-empty string or a number.
pub fn prop_str(props: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match props.get(*k)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// SPA display label from the planning-area layer's properties.
pub fn spa_label(props: &JsonObject) -> String {
    prop_str(props, &["SPA_Name", "SPA_NAM", "SPA_NAME"]).unwrap_or_else(|| {
        let number = prop_str(props, &["SPA"]).unwrap_or_default();
        format!("SPA {number}")
    })
}

fn shape_of(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let value = feature.geometry.as_ref()?.value.clone();
    match Geometry::<f64>::try_from(value).ok()? {
        Geometry::Polygon(p) => Some(p.into()),
        Geometry::MultiPolygon(m) => Some(m),
        _ => None,
    }
}

/// Builds the engine from the data directory. Either source failing is
/// logged and replaced by an empty input rather than aborting.
pub fn load_engine(config: &Config) -> Engine {
    let summaries = SummaryStore::load(config.path(&config.summary_file)).unwrap_or_else(|e| {
        warn!(file = %config.summary_file, error = %e, "summary store unavailable");
        SummaryStore::default()
    });
    let matrix = WideMatrix::from_path(config.path(&config.matrix_file), &config.time_column)
        .unwrap_or_else(|e| {
            warn!(file = %config.matrix_file, error = %e, "weekly matrix unavailable");
            WideMatrix::empty(&config.time_column)
        });
    info!(
        national_total = summaries.national_total(),
        weeks = matrix.row_count(),
        "data loaded"
    );
    Engine::new(matrix, summaries)
}
