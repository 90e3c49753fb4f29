use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use clima::config::ClimaConfig;
use clima::dashboard::{AppState, Dashboard, LoadOutcome, WatchEvent, stored_daily};
use clima::effects::{EffectKind, Frame, ParticleSystem};
use clima::geolocation::{LocationInput, LocationService, provider_from_config};
use clima::render::Renderer;
use clima::storage::Storage;
use clima::theme::{Theme, ThemeController};
use clima::{WeatherApiClient, logging};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "clima", version, about = "Terminal weather dashboard for your current location")]
struct Cli {
    /// Configuration file (defaults to the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show this place instead of the detected position ("lat,lon" or a city)
    #[arg(short, long, global = true)]
    location: Option<String>,

    /// Do not read or write the persistent store
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Current conditions and the daily forecast (default)
    Now {
        /// Print the dashboard state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Detailed daily forecast
    Forecast {
        /// Number of days to show
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=7))]
        days: Option<u8>,
        /// Quick stats and bars instead of the day list
        #[arg(long)]
        chart: bool,
    },
    /// Keep the dashboard on screen, refreshing periodically
    Watch,
    /// Preview a weather effect
    Effect {
        /// rain, thunder, snow, wind or clear
        kind: EffectKind,
        #[arg(long, default_value_t = 40)]
        frames: usize,
        #[arg(long, default_value_t = 60)]
        width: u16,
        #[arg(long, default_value_t = 16)]
        height: u16,
    },
    /// Show or toggle the light/dark theme
    Theme {
        #[arg(long)]
        toggle: bool,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClimaConfig::load_from_path(cli.config.clone())?;
    logging::init(&config.logging, cli.verbose);

    for issue in config.api_key_issues() {
        warn!("{}", issue);
    }

    let storage = open_storage(&config, cli.no_cache);

    match cli.command.unwrap_or(Command::Now { json: false }) {
        Command::Now { json } => {
            let dashboard = build_dashboard(&config, cli.location.as_deref(), storage)?;
            dashboard.initialize_theme().await;
            let outcome = dashboard.load(false).await;
            let state = dashboard.snapshot().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
                exit_on_failure(&outcome, None);
            } else {
                let renderer = renderer_for(&config, state.theme);
                exit_on_failure(&outcome, Some(&renderer));
                println!("{}", render_dashboard(&renderer, &state));
            }
        }
        Command::Forecast { days, chart } => {
            if let Some(days) = days {
                config.dashboard.forecast_days = usize::from(days);
            }

            let stored = match (&storage, chart && cli.location.is_none()) {
                (Some(storage), true) => stored_daily(storage, &config).await,
                _ => None,
            };
            if let Some(days) = stored {
                debug!("Using stored chart data");
                let renderer = renderer_for(&config, Theme::default());
                println!("{}", renderer.chart(&days, Utc::now().date_naive()));
                return Ok(());
            }

            let dashboard = build_dashboard(&config, cli.location.as_deref(), storage)?;
            let theme = dashboard.initialize_theme().await;
            let renderer = renderer_for(&config, theme);
            let outcome = dashboard.load(false).await;
            exit_on_failure(&outcome, Some(&renderer));

            let state = dashboard.snapshot().await;
            let today = local_today(&state);
            if chart {
                println!("{}", renderer.chart(&state.daily, today));
            } else {
                println!("{}", renderer.detailed_days(&state.daily, today));
            }
        }
        Command::Watch => {
            let dashboard = build_dashboard(&config, cli.location.as_deref(), storage)?;
            dashboard.initialize_theme().await;
            run_watch(&config, &dashboard).await;
        }
        Command::Effect {
            kind,
            frames,
            width,
            height,
        } => {
            let mut controller = ThemeController::default();
            controller.update(Utc::now());
            preview_effect(kind, controller.theme(), frames, width, height, &config).await;
        }
        Command::Theme { toggle } => {
            let mut controller = ThemeController::default();
            let theme = match &storage {
                Some(storage) => controller.initialize(storage, Utc::now()).await,
                None => {
                    controller.update(Utc::now());
                    controller.theme()
                }
            };
            if toggle {
                let theme = controller.toggle(storage.as_ref()).await;
                println!("Theme switched to {theme}");
            } else {
                println!("Current theme: {theme}");
            }
        }
        Command::Config => {
            let path = cli
                .config
                .clone()
                .or_else(ClimaConfig::get_config_path)
                .unwrap_or_else(|| PathBuf::from("config.toml"));
            println!("Config file: {}", path.display());
            println!("Storage:     {}", config.storage_path().display());

            let mut shown = config.clone();
            if shown.api.api_key.is_some() {
                shown.api.api_key = Some("********".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);

            for issue in config.api_key_issues() {
                println!("⚠️  {issue}");
            }
        }
    }

    Ok(())
}

fn open_storage(config: &ClimaConfig, disabled: bool) -> Option<Storage> {
    if disabled {
        return None;
    }
    match Storage::open(config.storage_path()) {
        Ok(storage) => Some(storage),
        Err(err) => {
            warn!("Persistent storage unavailable: {:#}", err);
            None
        }
    }
}

fn build_dashboard(
    config: &ClimaConfig,
    location: Option<&str>,
    storage: Option<Storage>,
) -> Result<Dashboard> {
    let api = Arc::new(WeatherApiClient::new(config).context("Failed to create weather API client")?);
    let provider = provider_from_config(&config.location)?;
    let locator = LocationService::new(provider, Arc::clone(&api), &config.location);

    let dashboard = Dashboard::new(config, api, locator, storage);
    Ok(match location {
        Some(input) => dashboard.with_location(LocationInput::parse(input)?),
        None => dashboard,
    })
}

fn renderer_for(config: &ClimaConfig, theme: Theme) -> Renderer {
    let renderer = Renderer::new(config.api.units);
    if std::io::stdout().is_terminal() {
        renderer.with_palette(theme.palette())
    } else {
        renderer
    }
}

fn exit_on_failure(outcome: &LoadOutcome, renderer: Option<&Renderer>) {
    if let LoadOutcome::Failed {
        error,
        retry_offered,
    } = outcome
    {
        match renderer {
            Some(renderer) => eprintln!("{}", renderer.error_panel(error, *retry_offered)),
            None => eprintln!("{}", error.user_message()),
        }
        std::process::exit(1);
    }
}

/// Calendar date at the shown place
fn local_today(state: &AppState) -> NaiveDate {
    let offset = state
        .weather
        .as_ref()
        .map(|w| w.timezone_offset)
        .unwrap_or_default();
    match FixedOffset::east_opt(offset) {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Utc::now().date_naive(),
    }
}

fn render_dashboard(renderer: &Renderer, state: &AppState) -> String {
    let Some(weather) = &state.weather else {
        return renderer.loading(&state.status);
    };

    let mut sections = vec![
        renderer.location(weather),
        renderer.current_card(weather),
        renderer.additional_info(weather),
        renderer.forecast_strip(&state.daily, local_today(state)),
    ];
    if let Some(updated) = state.last_update {
        sections.push(format!("Updated {}", updated.with_timezone(&chrono::Local).format("%H:%M")));
    }
    if let Some(error) = &state.last_error {
        sections.push(format!("⚠️  {error}"));
    }
    sections.join("\n\n")
}

async fn run_watch(config: &ClimaConfig, dashboard: &Dashboard) {
    let (width, height) = (72, 12);
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    let mut state = dashboard.snapshot().await;
    let mut screen = String::new();

    info!("Watching, press Ctrl-C to stop");

    dashboard
        .run_watch(shutdown, width, height, |event| match event {
            WatchEvent::Loaded { outcome, state: loaded } => {
                state = *loaded;
                let renderer = renderer_for(config, state.theme);
                screen = match &outcome {
                    LoadOutcome::Failed {
                        error,
                        retry_offered,
                    } => renderer.error_panel(error, *retry_offered),
                    _ => render_dashboard(&renderer, &state),
                };
                print!("\x1b[2J\x1b[H{screen}\n");
            }
            WatchEvent::ThemeChanged(theme) => {
                state.theme = theme;
                screen = render_dashboard(&renderer_for(config, theme), &state);
                print!("\x1b[2J\x1b[H{screen}\n");
            }
            WatchEvent::Frame { frame, effect } => {
                print!("\x1b[H{}\n{screen}\n", frame.to_ansi(effect, state.theme));
            }
        })
        .await;
}

async fn preview_effect(
    kind: EffectKind,
    theme: Theme,
    frames: usize,
    width: u16,
    height: u16,
    config: &ClimaConfig,
) {
    let mut system = ParticleSystem::new(kind, f64::from(width), f64::from(height));
    let mut tick = tokio::time::interval(Duration::from_millis(config.dashboard.frame_millis));

    print!("\x1b[2J");
    for _ in 0..frames {
        tick.tick().await;
        system.step();
        let frame = Frame::capture(&system);
        print!("\x1b[H{}\n", frame.to_ansi(kind, theme));
    }
    println!("{} ({} particles)", kind.style().name, system.particles().len());
}
