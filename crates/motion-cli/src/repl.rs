//! REPL – Read-Eval-Print Loop for the motion-sensors shell.
//!
//! Supported slash-commands:
//!   /help                     – show this list
//!   /sensors                  – availability, interval and state of every kind
//!   /available <kind>         – query availability over the control channel
//!   /interval <kind> <µs>     – set a sampling interval over the control channel
//!   /listen <kind> [count]    – print readings from a kind's event channel
//!   /call <json>              – send a raw method-call envelope
//!   /quit | /exit             – exit the CLI

use colored::Colorize;
use futures_util::StreamExt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use motion_middleware::{MethodCall, MethodResponse, MotionBridge, protocol};
use motion_types::SensorKind;
use serde_json::json;

use crate::config::Config;

const DEFAULT_LISTEN_COUNT: usize = 5;

/// A parsed REPL command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Sensors,
    Available(SensorKind),
    Interval(SensorKind, i64),
    Listen(SensorKind, usize),
    Call(String),
    Quit,
}

/// Parse one input line.  `Err` carries the message shown to the user.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let args: Vec<&str> = rest.split_whitespace().collect();
    let kind = |i: usize| -> Result<SensorKind, String> {
        args.get(i)
            .ok_or_else(|| format!("{head} needs a sensor kind"))?
            .parse::<SensorKind>()
            .map_err(|e| e.to_string())
    };

    match head {
        "/help" => Ok(Command::Help),
        "/sensors" => Ok(Command::Sensors),
        "/available" => Ok(Command::Available(kind(0)?)),
        "/interval" => {
            let micros = args
                .get(1)
                .ok_or("/interval needs a value in microseconds")?
                .parse::<i64>()
                .map_err(|e| format!("bad interval: {e}"))?;
            Ok(Command::Interval(kind(0)?, micros))
        }
        "/listen" => {
            let count = match args.get(1) {
                Some(n) => n.parse::<usize>().map_err(|e| format!("bad count: {e}"))?,
                None => DEFAULT_LISTEN_COUNT,
            };
            Ok(Command::Listen(kind(0)?, count))
        }
        "/call" if !rest.trim().is_empty() => Ok(Command::Call(rest.trim().to_string())),
        "/call" => Err("/call needs a JSON method call".to_string()),
        "/quit" | "/exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command: '{other}'")),
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration and while listening; when set the
/// REPL exits cleanly.
pub fn run(bridge: &MotionBridge, cfg: &Config, shutdown: Arc<AtomicBool>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start runtime".red(), e);
            return;
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "motion>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Help) => cmd_help(),
            Ok(Command::Sensors) => cmd_sensors(bridge),
            Ok(Command::Available(kind)) => cmd_available(bridge, kind),
            Ok(Command::Interval(kind, micros)) => cmd_interval(bridge, kind, micros),
            Ok(Command::Listen(kind, count)) => {
                let timeout = Duration::from_millis(cfg.listen_timeout_ms);
                runtime.block_on(cmd_listen(bridge, kind, count, timeout, &shutdown));
            }
            Ok(Command::Call(raw)) => cmd_call(bridge, &raw),
            Ok(Command::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(msg) => {
                println!(
                    "{} Type {} for available commands.",
                    msg.red(),
                    "/help".bold()
                );
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Motion Sensors Commands".bold().underline());
    println!("  {}                – sensor overview", "/sensors".bold().cyan());
    println!("  {}       – is a sensor available?", "/available <kind>".bold().cyan());
    println!("  {}  – set sampling interval", "/interval <kind> <µs>".bold().cyan());
    println!("  {}   – print readings", "/listen <kind> [count]".bold().cyan());
    println!("  {}            – raw method call", "/call <json>".bold().cyan());
    println!("  {}            – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
    println!(
        "  Kinds: {}",
        SensorKind::ALL
            .iter()
            .map(|k| format!("{k} ({})", k.code()))
            .collect::<Vec<_>>()
            .join(", ")
            .dimmed()
    );
    println!();
}

fn cmd_sensors(bridge: &MotionBridge) {
    println!();
    for handler in bridge.registry().handlers() {
        let available = if handler.is_available() {
            "available".green()
        } else {
            "unavailable".red()
        };
        let interval = handler
            .update_interval()
            .map(|i| format!("{} µs", i.micros()))
            .unwrap_or_else(|| "default".to_string());
        let state = if handler.is_active() { "active" } else { "idle" };
        println!(
            "  {:<20} {:<12} interval {:<12} {} ({} subscriber(s))",
            handler.kind().to_string().bold(),
            available,
            interval,
            state,
            handler.subscriber_count()
        );
    }
    println!();
}

fn print_response(response: &MethodResponse) {
    match response {
        MethodResponse::Success { result } => println!("  {} {}", "✓".green(), result),
        MethodResponse::NotImplemented => println!("  {}", "not implemented".yellow()),
        MethodResponse::Error { code, message } => {
            println!("  {} {}: {}", "✗".red(), code.red(), message)
        }
    }
}

fn cmd_available(bridge: &MotionBridge, kind: SensorKind) {
    let call = MethodCall::new(protocol::IS_SENSOR_AVAILABLE, json!(kind.code()));
    print_response(&bridge.control().handle(&call));
}

fn cmd_interval(bridge: &MotionBridge, kind: SensorKind, micros: i64) {
    let call = MethodCall::new(
        protocol::SET_SENSOR_UPDATE_INTERVAL,
        json!({"sensorType": kind.code(), "interval": micros}),
    );
    print_response(&bridge.control().handle(&call));
}

fn cmd_call(bridge: &MotionBridge, raw: &str) {
    match bridge.control().handle_json(raw) {
        Ok(response) => println!("  {response}"),
        Err(e) => println!("  {}: {}", "Bad call".red(), e),
    }
}

async fn cmd_listen(
    bridge: &MotionBridge,
    kind: SensorKind,
    count: usize,
    timeout: Duration,
    shutdown: &AtomicBool,
) {
    let channel = bridge.event_channel_for(kind);
    println!("  Listening on {} …", channel.name().bold());
    let mut stream = channel.listen_encoded();

    let mut received = 0;
    while received < count && !shutdown.load(Ordering::SeqCst) {
        match tokio::time::timeout(timeout, stream.next()).await {
            Ok(Some(reading)) => {
                received += 1;
                println!("  {reading}");
            }
            Ok(None) => break,
            Err(_) => {
                println!(
                    "  {}",
                    format!("no reading within {} ms", timeout.as_millis()).yellow()
                );
                break;
            }
        }
    }
    println!("  {} after {} reading(s).", "Cancelled".dimmed(), received);
}
