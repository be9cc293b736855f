use std::str::FromStr;

use fire_atlas::Tier;
use geo::{Area, MultiPolygon, Polygon};
use ratatui::layout::Rect as TuiRect;
use ratatui::style::Color;
use ratatui::widgets::canvas::{Canvas, Line};
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;

use crate::data::Place;

// Islands and slivers under a fifth of the largest part are dropped.
fn drop_fragments(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if mp.0.len() <= 1 {
        return mp.clone();
    }
    let areas: Vec<f64> = mp.0.iter().map(|p| p.unsigned_area()).collect();
    let threshold = areas.iter().cloned().fold(0.0, f64::max) * 0.20;
    let kept: Vec<Polygon<f64>> = mp
        .0
        .iter()
        .zip(areas)
        .filter(|(_, area)| *area >= threshold)
        .map(|(poly, _)| poly.clone())
        .collect();
    if kept.is_empty() { mp.clone() } else { MultiPolygon(kept) }
}

pub fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::Top => Color::Rgb(0xef, 0x44, 0x44),
        Tier::Mid => Color::Rgb(0xf9, 0x73, 0x16),
        Tier::Low => Color::Rgb(0xfa, 0xcc, 0x15),
        Tier::None => Color::Rgb(0xd1, 0xd5, 0xdb),
    }
}

/// Parses `#rrggbb` (or a named colour); unknown strings are gray.
pub fn hex_color(hex: &str) -> Color {
    Color::from_str(hex).unwrap_or(Color::Gray)
}

/// Outlines of the places at the current level, coloured per place.
pub struct MapView {
    items: Vec<(String, MultiPolygon<f64>)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

impl MapView {
    /// `None` when no place carries geometry.
    pub fn new(places: &[Place]) -> Option<Self> {
        let items: Vec<(String, MultiPolygon<f64>)> = places
            .iter()
            .filter_map(|p| Some((p.id.clone(), drop_fragments(p.shape.as_ref()?))))
            .collect();

        let (mut minx, mut miny, mut maxx, mut maxy) =
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (_, mp) in &items {
            for poly in &mp.0 {
                for coord in poly.exterior().0.iter() {
                    minx = minx.min(coord.x);
                    miny = miny.min(coord.y);
                    maxx = maxx.max(coord.x);
                    maxy = maxy.max(coord.y);
                }
            }
        }
        if !(minx.is_finite() && maxx.is_finite()) {
            return None;
        }

        Some(Self { items, x_bounds: [minx, maxx], y_bounds: [miny, maxy] })
    }

    /// Draws every outline in its place colour, then the highlighted place
    /// in white on top.
    pub fn render<F>(&self, f: &mut Frame, area: TuiRect, title: &str, highlight: Option<&str>, color_of: F)
    where
        F: Fn(&str) -> Color,
    {
        let canvas = Canvas::default()
            .block(Block::default().title(title.to_string()).borders(Borders::ALL))
            .x_bounds(self.x_bounds)
            .y_bounds(self.y_bounds)
            .paint(|ctx| {
                for (id, mp) in &self.items {
                    draw_outline(ctx, mp, color_of(id));
                }
                if let Some(sel) = highlight {
                    for (_, mp) in self.items.iter().filter(|(id, _)| id == sel) {
                        draw_outline(ctx, mp, Color::White);
                    }
                }
            });
        f.render_widget(canvas, area);
    }
}

fn draw_outline(ctx: &mut ratatui::widgets::canvas::Context<'_>, mp: &MultiPolygon<f64>, color: Color) {
    for poly in &mp.0 {
        let ring = &poly.exterior().0;
        for window in ring.windows(2) {
            let (a, b) = (window[0], window[1]);
            ctx.draw(&Line { x1: a.x, y1: a.y, x2: b.x, y2: b.y, color });
        }
        if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
            ctx.draw(&Line { x1: last.x, y1: last.y, x2: first.x, y2: first.y, color });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, size: f64) -> Polygon<f64> {
        polygon![(x: x, y: 0.0), (x: x + size, y: 0.0), (x: x + size, y: size), (x: x, y: size), (x: x, y: 0.0)]
    }

    #[test]
    fn small_fragments_are_dropped() {
        let mp = MultiPolygon(vec![square(0.0, 10.0), square(20.0, 1.0)]);
        assert_eq!(drop_fragments(&mp).0.len(), 1);
        assert_eq!(drop_fragments(&MultiPolygon(vec![square(0.0, 4.0), square(9.0, 2.0)])).0.len(), 2);
    }

    #[test]
    fn bounds_cover_all_shapes() {
        let places = vec![
            Place { id: "A".into(), name: "A".into(), shape: Some(square(0.0, 1.0).into()) },
            Place { id: "B".into(), name: "B".into(), shape: Some(square(5.0, 2.0).into()) },
            Place { id: "C".into(), name: "C".into(), shape: None },
        ];
        let view = MapView::new(&places).unwrap();
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.x_bounds, [0.0, 7.0]);
        assert_eq!(view.y_bounds, [0.0, 2.0]);
        assert!(MapView::new(&places[2..]).is_none());
    }

    #[test]
    fn colours() {
        assert_eq!(hex_color("#ef4444"), Color::Rgb(0xef, 0x44, 0x44));
        assert_eq!(hex_color("not a colour"), Color::Gray);
        assert_ne!(tier_color(Tier::Top), tier_color(Tier::None));
    }
}
