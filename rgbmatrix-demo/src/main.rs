//! rgbmatrix-demo: play an animation on the LED matrix.
//!
//! ```text
//! rgbmatrix-demo                              Snake in the browser preview
//! rgbmatrix-demo --transport uart --port COM6 Play on the board
//! rgbmatrix-demo --animation zigzag           Pick an animation
//! rgbmatrix-demo --gen-config [PATH]          Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rgbmatrix_core::{Display, MatrixError, PreviewServerTransport, Rgb, UartTransport};
use rgbmatrix_demo::animation::Animation;
use rgbmatrix_demo::config::{DemoConfig, TransportKind};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rgbmatrix-demo", about = "8x8 RGB LED matrix demo animations")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rgbmatrix-demo.toml")]
    config: PathBuf,

    /// Output backend (overrides config).
    #[arg(short, long, value_enum)]
    transport: Option<TransportKind>,

    /// Serial port for the board (overrides config). Example: COM6
    #[arg(short, long)]
    port: Option<String>,

    /// Animation to play (overrides config).
    #[arg(short, long, value_enum)]
    animation: Option<Animation>,

    /// Paint color as `r,g,b` or a name such as `red` (overrides config).
    #[arg(long)]
    color: Option<Rgb>,

    /// Frame delay in milliseconds (overrides config).
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Write the default configuration to PATH, or stdout without one, and exit.
    #[arg(long, value_name = "PATH")]
    gen_config: Option<Option<PathBuf>>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.gen_config {
        Some(Some(path)) => {
            DemoConfig::write_default(&path)?;
            println!("wrote {}", path.display());
            return Ok(());
        }
        Some(None) => {
            println!("{}", DemoConfig::default_toml()?);
            return Ok(());
        }
        None => {}
    }

    // Problems are reported once logging is up.
    let loaded = DemoConfig::read(&cli.config);
    let mut config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => DemoConfig::default(),
    };
    if let Some(kind) = cli.transport {
        config.transport.kind = kind;
    }
    if let Some(port) = cli.port {
        config.uart.port = port;
    }
    if let Some(animation) = cli.animation {
        config.animation.name = animation;
    }
    if let Some(color) = cli.color {
        config.animation.color = Some(color);
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.animation.delay_ms = Some(delay_ms);
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rgbmatrix-demo v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(Some(_)) => info!("config loaded from {}", cli.config.display()),
        Ok(None) => info!("no config at {}; using defaults", cli.config.display()),
        Err(e) => warn!("{e}; using defaults"),
    }

    if let Err(e) = play(&config).await {
        error!("{e}");
        if e.is_fatal() {
            std::process::exit(1);
        }
        return Err(e.into());
    }
    Ok(())
}

/// Open the configured display, play the animation and close it again.
async fn play(config: &DemoConfig) -> Result<(), MatrixError> {
    let background = config.animation.background;
    let mut display = match config.transport.kind {
        TransportKind::Uart => Display::with_default_color(
            UartTransport::new(config.uart.port.clone()),
            background,
        ),
        TransportKind::Preview => Display::with_default_color(
            PreviewServerTransport::new(config.preview.clone()),
            background,
        ),
    };

    display.open().await?;

    let animation = &config.animation;
    let played = tokio::select! {
        result = animation.name.run(&mut display, animation.color(), animation.delay()) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted");
            Ok(())
        }
    };

    // Close even when the animation failed.
    let closed = display.close().await;
    played?;
    closed
}
