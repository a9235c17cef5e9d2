use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gdp_atlas::{
    catalog::{Catalog, ModelId},
    config::AtlasConfig,
    data::{FileSource, SeriesSource},
    engine::aggregate,
    selection::FilterSelection,
    state::AppState,
    store::SeriesStore,
    ui,
};
use log::{error, info};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{env, fs::File, io, sync::Arc, time::Duration};
use tokio::sync::mpsc;

fn init_logger(config: &AtlasConfig, to_file: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.rust_log);
    // the terminal owns stdout/stderr while the UI runs
    if to_file {
        let file = File::create(&config.log_file)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// `--dump <ISO>`: print both tables for one country as JSON
async fn dump(source: Arc<dyn SeriesSource>, iso: &str) -> Result<(), Box<dyn std::error::Error>> {
    let countries = source.list_countries().await?;
    let country = countries
        .iter()
        .find(|c| c.iso_code.eq_ignore_ascii_case(iso))
        .ok_or_else(|| format!("unknown country '{}'", iso))?;

    let mut store = SeriesStore::new(source);
    let fetched = store.fetch_country_data(country.id).await?;
    for w in &fetched.warnings {
        eprintln!("warning: {}", w);
    }

    let mut selection = FilterSelection::default();
    for model in ModelId::ALL {
        selection.toggle_model(model);
    }
    let out = aggregate(&fetched.series, &selection, &Catalog::builtin());
    let doc = serde_json::json!({
        "country": country,
        "merged": out.merged,
        "indicator_years": out.indicator_years,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AtlasConfig::from_env()?;
    let args: Vec<String> = env::args().collect();
    let source: Arc<dyn SeriesSource> =
        Arc::new(FileSource::new(&config.data_dir).with_latency(config.fetch_latency));

    if let Some(idx) = args.iter().position(|a| a == "--dump") {
        init_logger(&config, false)?;
        let iso = args.get(idx + 1).map(String::as_str).unwrap_or(&config.default_country);
        return dump(source, iso).await;
    }

    init_logger(&config, true)?;
    info!("starting with data from {}", config.data_dir.display());

    let countries = match source.list_countries().await {
        Ok(list) => list,
        Err(e) => {
            error!("cannot load country list: {}", e);
            Vec::new()
        }
    };
    let mut state = AppState::new(SeriesStore::new(source), countries, &config.default_country);
    if state.countries.is_empty() {
        state.message = Some("Failed to load metadata from database.".to_string());
    }
    let (tx, mut rx) = mpsc::unbounded_channel();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        for ticket in state.take_pending() {
            let source = state.store.source();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = SeriesStore::run(source, ticket).await;
                let _ = tx.send(outcome);
            });
        }
        while let Ok(outcome) = rx.try_recv() {
            state.apply(outcome);
        }

        terminal.draw(|f| ui::draw(f, &mut state))?;

        let ready = tokio::task::block_in_place(|| event::poll(Duration::from_millis(100)))?;
        if ready {
            if let Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) = event::read()? {
                if state.handle_input(code) {
                    break;
                }
            }
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
