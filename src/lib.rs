//! Joins wildfire incident summaries to a weekly county matrix and ranks
//! places for a drill-down choropleth (nation, state, county, SPA).

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod matrix;
pub mod normalize;
pub mod region;
pub mod series;
pub mod summary;
pub mod tiers;

pub use engine::Engine;
pub use error::{AtlasError, Result};
pub use region::RegionCode;
pub use series::{SeriesWindow, TimeSeries};
pub use tiers::{RankMode, Tier};
