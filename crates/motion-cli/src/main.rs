//! `motion-cli` – interactive shell over a simulated motion-sensor device.
//!
//! This binary wires the whole stack together.  It:
//!
//! 1. Loads `~/.motion_sensors/config.toml`, writing the defaults on first run.
//! 2. Builds a [`SensorRegistry`][motion_hal::SensorRegistry] backed by
//!    simulated sources and starts the background driver that feeds them.
//! 3. Exposes the registry through a [`MotionBridge`] and drops the user into
//!    an **interactive REPL** (`/sensors`, `/listen`, `/interval`, `/call`, …).
//! 4. Intercepts **Ctrl-C** to stop the driver and exit cleanly.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use motion_hal::sim::{SimDriver, SimRegistry};
use motion_middleware::{METHOD_CHANNEL, MotionBridge};
use motion_types::{SensorKind, UpdateInterval};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info").  Set
    // MOTION_SENSORS_LOG_FORMAT=json for newline-delimited JSON logs.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("MOTION_SENSORS_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save(&config::Config::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    // ── Simulated device ──────────────────────────────────────────────────
    let (registry, feeds) = cfg
        .unavailable
        .iter()
        .fold(SimRegistry::new(), |builder, &kind| builder.with_unavailable(kind))
        .with_live_interval_updates(cfg.live_interval_updates)
        .build();

    for kind in SensorKind::ALL {
        let Some(micros) = cfg.intervals.get(kind) else {
            continue;
        };
        match UpdateInterval::from_micros(micros) {
            Ok(interval) => registry.set_sensor_update_interval(kind, interval),
            Err(e) => warn!(sensor = %kind, error = %e, "ignoring configured interval"),
        }
    }

    let bridge = MotionBridge::new(Arc::new(registry));

    let driver = match SimDriver::spawn(feeds) {
        Ok(driver) => Some(driver),
        Err(e) => {
            warn!(error = %e, "failed to start simulated driver; sensors will stay silent");
            None
        }
    };

    print_summary(&bridge);
    info!(method_channel = METHOD_CHANNEL, "motion sensors ready");

    println!();
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&bridge, &cfg, shutdown);

    if let Some(driver) = driver {
        driver.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║            Motion Sensors            ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!(
        "  {} {}",
        "motion-sensors".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Accelerometer, gyroscope and magnetometer streams");
    println!();
}

fn print_summary(bridge: &MotionBridge) {
    println!();
    for name in MotionBridge::event_channel_names() {
        let Some(channel) = bridge.event_channel(name) else {
            continue;
        };
        let status = if bridge.registry().is_sensor_available(channel.kind()) {
            "available".green()
        } else {
            "unavailable".red()
        };
        println!("  {:<36} {}", name.dimmed(), status);
    }
}
