mod data;
mod map_draw;
mod state;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::Context;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use fire_atlas::config::Config;
use fire_atlas::logging;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use data::{DataCache, load_engine};
use state::AppState;

fn main() -> anyhow::Result<()> {
    let data_dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let config = Config::load(&data_dir).with_context(|| format!("reading config in {data_dir}"))?;
    let _guard = logging::init(&config).context("starting log writer")?;
    info!(data_dir = %data_dir, "starting");

    let engine = load_engine(&config);
    let mut state = AppState::new(DataCache::new(config), engine);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    info!(cached_series = state.engine.cached_series(), "exiting");
    result
}

fn run<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, state: &mut AppState) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, state))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) = event::read()? {
                if state.handle_input(code) {
                    return Ok(());
                }
            }
        }
    }
}
