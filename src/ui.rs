use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph, Wrap},
};

use fire_atlas::summary::SummaryRecord;

use crate::data::GeoLevel;
use crate::map_draw::{hex_color, tier_color};
use crate::state::{AppState, TopRow};

fn top_row_text(row: &TopRow) -> String {
    format!("{:>2}. {} {} [{}]", row.rank, row.name, fmt_count(row.score), row.tier.label())
}

/// Thousands-separated count; fractions (forecasts) keep one decimal.
pub fn fmt_count(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    let rounded = (n * 10.0).round() / 10.0;
    let whole = rounded.trunc().abs() as u64;
    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    let frac = (rounded.fract().abs() * 10.0).round() as u64;
    if frac == 0 { format!("{sign}{grouped}") } else { format!("{sign}{grouped}.{frac}") }
}

fn level_title(state: &AppState) -> String {
    match &state.level {
        GeoLevel::Nation => "United States".to_string(),
        GeoLevel::State(code) => code.name().to_string(),
        GeoLevel::Spa { .. } => "Los Angeles County — Service Planning Areas".to_string(),
    }
}

fn tldr_lines(title: &str, rec: Option<&SummaryRecord>) -> Vec<Line<'static>> {
    let Some(rec) = rec else {
        return vec![
            Line::from(Span::styled(format!("{title} TLDR"), Style::default().add_modifier(Modifier::BOLD))),
            Line::from("No data"),
        ];
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(title.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" ({})", fmt_count(rec.total_till_date))),
        Span::styled(" ■", Style::default().fg(hex_color(rec.fill_hex()))),
    ])];
    for (label, window) in [
        ("Last observed week", &rec.last_obs_week),
        ("Last observed month", &rec.last_obs_month),
        ("Next week forecast", &rec.next_week_forecast),
        ("Next month forecast", &rec.next_month_forecast),
    ] {
        lines.push(Line::from(format!(
            "{label}: {} | {}",
            window.range_label(),
            fmt_count(window.count)
        )));
    }
    if !rec.last_obs_week.start.is_empty() {
        lines.push(Line::from(format!("Coverage through → {}", rec.last_obs_week.start)));
    }
    lines
}

pub fn draw(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(20), Constraint::Percentage(55), Constraint::Percentage(25)])
        .split(f.area());

    // Left: places at this level, coloured by tier
    let items: Vec<ListItem> = state
        .list_items
        .iter()
        .map(|p| ListItem::new(p.name.clone()).style(Style::default().fg(tier_color(state.tier_of(&p.id)))))
        .collect();
    let mut list_state = ListState::default();
    list_state.select(Some(state.selected));
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(level_title(state)))
        .highlight_symbol(">> ")
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, chunks[0], &mut list_state);

    // Centre: map over chart
    let centre = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);
    let selected_id = state.selected_place().map(|p| p.id.clone());
    match &state.map {
        Some(map) => {
            let title = format!("Map — colour by {}", state.mode.label());
            map.render(f, centre[0], &title, selected_id.as_deref(), |id| tier_color(state.tier_of(id)));
        }
        None => {
            let txt = Paragraph::new("No geometry for this level")
                .block(Block::default().borders(Borders::ALL).title("Map"))
                .wrap(Wrap { trim: true });
            f.render_widget(txt, centre[0]);
        }
    }
    draw_chart(f, centre[1], state);

    // Right: TLDR + top table
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    let mut info = match &state.level {
        GeoLevel::Nation => vec![Line::from(format!(
            "US total: {}",
            fmt_count(state.engine.summaries().national_total())
        ))],
        _ => Vec::new(),
    };
    let name = state.selected_place().map(|p| p.name.clone()).unwrap_or_default();
    info.extend(tldr_lines(&name, state.selected_record()));
    info.push(Line::from(""));
    info.extend(AppState::HELP_TEXT.lines().map(|l| Line::from(l.to_string())));
    let info_paragraph = Paragraph::new(info)
        .block(Block::default().borders(Borders::ALL).title("Info"))
        .wrap(Wrap { trim: true });
    f.render_widget(info_paragraph, right[0]);

    let rows: Vec<ListItem> = state
        .top_rows
        .iter()
        .map(|r| {
            ListItem::new(top_row_text(r))
                .style(Style::default().fg(tier_color(r.tier)))
        })
        .collect();
    let top = List::new(rows).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Top {} (by {})", state.top_rows.len(), state.mode.label())),
    );
    f.render_widget(top, right[1]);
}

fn draw_chart(f: &mut Frame, area: Rect, state: &AppState) {
    let Some(chart) = &state.chart else {
        let txt = Paragraph::new("No weekly series for this place")
            .block(Block::default().borders(Borders::ALL).title("Weekly incidents"));
        f.render_widget(txt, area);
        return;
    };
    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&chart.points);
    let x_max = (chart.points.len().saturating_sub(1)).max(1) as f64;
    let y_max = chart.max.max(1.0);
    let widget = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(chart.title.clone()))
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels([chart.first_label.clone(), chart.last_label.clone()]),
        )
        .y_axis(Axis::default().bounds([0.0, y_max]).labels(["0".to_string(), fmt_count(y_max)]));
    f.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fire_atlas::Tier;

    #[test]
    fn counts_are_grouped() {
        assert_eq!(fmt_count(0.0), "0");
        assert_eq!(fmt_count(999.0), "999");
        assert_eq!(fmt_count(1234567.0), "1,234,567");
        assert_eq!(fmt_count(2.5), "2.5");
        assert_eq!(fmt_count(-1200.0), "-1,200");
        assert_eq!(fmt_count(f64::NAN), "0");
    }

    #[test]
    fn top_rows_show_their_tier() {
        let row = TopRow { rank: 4, name: "Kern County".into(), score: 1500.0, tier: Tier::Mid };
        assert_eq!(top_row_text(&row), " 4. Kern County 1,500 [mid]");
    }

    #[test]
    fn tldr_without_record_says_no_data() {
        let lines = tldr_lines("Orange", None);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn tldr_lists_four_windows() {
        let mut rec = SummaryRecord { total_till_date: 12.0, ..Default::default() };
        rec.last_obs_week.start = "2024-06-02".into();
        let lines = tldr_lines("Orange", Some(&rec));
        assert_eq!(lines.len(), 6);
    }
}
