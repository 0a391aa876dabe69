use color_eyre::{eyre::eyre, Result};
use gesture_dispatch::producer::gamepad::GilrsBackend;
use gesture_dispatch::{Engine, EngineConfig, ShortcutOutput, TriggeredAction};
use std::io::BufRead;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = load_config().await?;
    let (action_tx, mut action_rx) = mpsc::channel(config.dispatcher.action_capacity);

    let engine = match Engine::start(config.clone(), GilrsBackend::new, action_tx.clone()).await {
        Ok(engine) => engine,
        Err(e) if config.gamepad.enabled => {
            warn!("Starting without gamepad support: {}", e);
            let mut fallback = config;
            fallback.gamepad.enabled = false;
            Engine::start(fallback, GilrsBackend::new, action_tx.clone())
                .await
                .map_err(|e| eyre!("Failed to start engine: {}", e))?
        }
        Err(e) => return Err(eyre!("Failed to start engine: {}", e)),
    };
    drop(action_tx);

    // stdin acts as the device protocol transport. A plain thread keeps the
    // runtime from waiting on a blocked read during shutdown.
    let mut device = engine.device_protocol();
    std::thread::Builder::new()
        .name("device-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        device.parse(&line);
                    }
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
            debug!("Device protocol input closed");
        })?;

    let printer = tokio::spawn(async move {
        while let Some(action) = action_rx.recv().await {
            log_action(&action);
        }
        debug!("Action channel closed");
    });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    let stats = engine
        .shutdown()
        .await
        .map_err(|e| eyre!("Engine shutdown failed: {}", e))?;
    info!(
        "Processed {} gestures, triggered {} actions",
        stats.gestures, stats.actions
    );

    if let Err(e) = printer.await {
        error!("Action printer panicked: {}", e);
    }
    Ok(())
}

fn log_action(action: &TriggeredAction) {
    match action.output {
        ShortcutOutput::Fired => info!(
            "[{}] {} ({} via {})",
            action.timestamp.format("%H:%M:%S%.3f"),
            action.action,
            action.descriptor,
            action.binding
        ),
        ShortcutOutput::Value(value) => info!(
            "[{}] {} = {:.3} ({} via {})",
            action.timestamp.format("%H:%M:%S%.3f"),
            action.action,
            value,
            action.descriptor,
            action.binding
        ),
    }
}

/// `--config <path>` wins, then the per-user config file, then defaults.
async fn load_config() -> Result<EngineConfig> {
    let mut args = std::env::args().skip(1);
    let explicit = match args.next().as_deref() {
        Some("--config") => Some(PathBuf::from(
            args.next().ok_or_else(|| eyre!("--config requires a path"))?,
        )),
        Some(other) => return Err(eyre!("Unknown argument: {}", other)),
        None => None,
    };

    let path = match explicit {
        Some(path) => path,
        None => match dirs::config_dir() {
            Some(dir) => {
                let path = dir.join("gesture-dispatch").join("config.toml");
                if !path.exists() {
                    info!("No config at {}, using defaults", path.display());
                    return Ok(EngineConfig::default());
                }
                path
            }
            None => {
                warn!("No config directory available, using defaults");
                return Ok(EngineConfig::default());
            }
        },
    };

    info!("Loading config from {}", path.display());
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
    Ok(EngineConfig::from_toml_str(&text)?)
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
