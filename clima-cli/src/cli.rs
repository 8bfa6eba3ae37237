use std::{io::IsTerminal, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use clima_core::{
    ChatRateLimiter, ChatSession, CityConfig, CohereClient, Config, FileStore, KeyValueStore,
    MemoryStore, OpenMeteoProvider, WeatherFetcher, city, derive_window,
    window::current_hour_at,
};
use inquire::{CustomType, InquireError, Password, PasswordDisplayMode, Select, Text};
use tracing::debug;

use crate::render;

const EXIT_COMMAND: &str = "/salir";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "clima", version, about = "Dashboard del clima para ciudades de Ecuador")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the chat API key, prompt limit and default city.
    Configure,

    /// List the available cities.
    Cities,

    /// Show indicators, chart and hourly table for a city.
    Show {
        /// City key, e.g. "quito". Prompts for one when absent.
        #[arg(long)]
        city: Option<String>,
    },

    /// Chat with the travel assistant using the city's weather as context.
    Chat {
        /// City key, e.g. "quito". Prompts for one when absent.
        #[arg(long)]
        city: Option<String>,

        /// Keep the request throttle in memory instead of on disk.
        #[arg(long)]
        ephemeral: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            // Edit the file as stored, without environment overrides baked in.
            Command::Configure => configure(Config::load()?),
            Command::Cities => {
                for c in city::cities() {
                    println!("{:<10} {:<10} ({}, {})", c.key, c.name, c.latitude, c.longitude);
                }
                Ok(())
            }
            Command::Show { city } => {
                let config = Config::load_with_env()?;
                let city = resolve_city(&config, city.as_deref())?;
                show(&config, city).await
            }
            Command::Chat { city, ephemeral } => {
                let config = Config::load_with_env()?;
                let city = resolve_city(&config, city.as_deref())?;
                if ephemeral {
                    chat(&config, city, MemoryStore::new()).await
                } else {
                    let store = FileStore::new(Config::rate_limit_file_path()?);
                    debug!(path = %store.path().display(), "Using durable rate limit log");
                    chat(&config, city, store).await
                }
            }
        }
    }
}

/// Use the explicit key, else ask interactively, else fall back to the configured default.
fn resolve_city(config: &Config, key: Option<&str>) -> anyhow::Result<&'static CityConfig> {
    if let Some(key) = key {
        return city::city(key);
    }

    let default = config.default_city()?;
    if !std::io::stdin().is_terminal() {
        return Ok(default);
    }

    let options: Vec<&'static CityConfig> = city::cities().iter().collect();
    let cursor = options.iter().position(|c| c.key == default.key).unwrap_or(0);

    Select::new("Ciudad", options)
        .with_starting_cursor(cursor)
        .prompt()
        .context("No se seleccionó ninguna ciudad")
}

async fn show(config: &Config, city: &'static CityConfig) -> anyhow::Result<()> {
    let fetcher = WeatherFetcher::new(OpenMeteoProvider::new(&config.weather)?);

    if let Some(status) = render::fetch_status(&fetcher.state()) {
        println!("{status}");
    }
    fetcher.fetch_city(city).await;

    let state = fetcher.state();
    match state.snapshot() {
        Some(snapshot) => {
            let hour = current_hour_at(snapshot.utc_offset_seconds);
            let window = derive_window(&snapshot.hourly, hour);
            println!("{}", render::dashboard(city, snapshot, &window));
        }
        None => {
            if let Some(status) = render::fetch_status(&state) {
                println!("{status}");
            }
        }
    }

    Ok(())
}

async fn chat<S>(config: &Config, city: &'static CityConfig, store: S) -> anyhow::Result<()>
where
    S: KeyValueStore,
{
    let fetcher = Arc::new(WeatherFetcher::new(OpenMeteoProvider::new(&config.weather)?));
    let background = Arc::clone(&fetcher);
    tokio::spawn(async move {
        background.fetch_city(city).await;
    });

    let client = CohereClient::new(&config.chat)?;
    let limiter = ChatRateLimiter::new(store, config.max_prompts_per_minute());
    let mut session = ChatSession::new(client, limiter);

    println!("✈️ OserTravel IA · Tu asistente de viajes personal ({})", city.name);
    println!("¡Hola! Pregúntame sobre destinos, clima o paquetes turísticos.");
    println!("Escribe {EXIT_COMMAND} para terminar.");

    loop {
        let line = match Text::new("Tú:").prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("No se pudo leer el mensaje"),
        };

        if line.trim() == EXIT_COMMAND {
            break;
        }

        let snapshot = fetcher.snapshot();
        if !line.trim().is_empty() {
            println!("Escribiendo...");
        }

        match session.send(&line, snapshot.as_deref()).await {
            Ok(Some(reply)) => println!("OserTravel: {}", reply.content),
            Ok(None) => {}
            Err(err) => println!("{err}"),
        }
    }

    Ok(())
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("API Key de Cohere (vacío para conservar la actual):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key);
    }

    config.chat.max_prompts_per_minute = CustomType::<u32>::new("Máximo de mensajes por minuto:")
        .with_default(config.max_prompts_per_minute())
        .with_error_message("Ingresa un número entero positivo")
        .prompt()?;

    let options: Vec<&'static CityConfig> = city::cities().iter().collect();
    let current = config.default_city()?.key;
    let cursor = options.iter().position(|c| c.key == current).unwrap_or(0);
    let selected = Select::new("Ciudad por defecto:", options)
        .with_starting_cursor(cursor)
        .prompt()?;
    config.set_default_city(selected.key)?;

    config.save()?;
    println!("Configuración guardada en {}", Config::config_file_path()?.display());

    Ok(())
}
