//! `simbridge-cli` – Vehicle Bridge Command Line Interface
//!
//! This binary is the host process of the bridge.  It:
//!
//! 1. Loads `~/.simbridge/config.toml`, writing the defaults on first run,
//!    then applies `SIMBRIDGE_*` environment overrides.
//! 2. Wires the telemetry bus, command channel, autonomy feedback cell and
//!    sensor ingest into a [`Bridge`].
//! 3. Runs the bridge on a multi-threaded Tokio runtime while a console on
//!    its own thread forwards operator input.
//! 4. Intercepts **Ctrl-C** to cancel every task and exit cleanly.
//!
//! The exit code is non-zero when the bridge stops on a fatal error.

mod config;
mod repl;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use simbridge_middleware::{EventBus, command_channel, latest};
use simbridge_runtime::{Bridge, BridgeConfig, SensorIngest, init_tracing};
use simbridge_types::AutonomyFeedback;

fn main() -> ExitCode {
    let _tracing = init_tracing("simbridge");

    print_banner();

    let mut cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => first_run(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            BridgeConfig::default()
        }
    };
    config::apply_env_overrides(&mut cfg);
    if let Err(e) = cfg.validate() {
        eprintln!("{}: {}", "Invalid configuration".red().bold(), e);
        return ExitCode::FAILURE;
    }

    // ── Shared cancellation ───────────────────────────────────────────────
    let cancel = CancellationToken::new();
    let ctrlc_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping bridge …".yellow().bold());
        ctrlc_token.cancel();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Wiring ────────────────────────────────────────────────────────────
    let bus = EventBus::new(cfg.bus_capacity);
    let (commands, receiver) = command_channel();
    let (feedback, feedback_rx) = latest(AutonomyFeedback::default());
    let feedback = Arc::new(feedback);
    let sensors = SensorIngest::new(bus.clone(), cfg.vehicle_speed_mps);

    let mut bridge = match Bridge::new(cfg, bus, receiver, feedback_rx, sensors.kinematics()) {
        Ok(bridge) => bridge,
        Err(e) => {
            eprintln!("{}: {}", "Bridge setup failed".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("simbridge")
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start Tokio runtime".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    // ── Console ───────────────────────────────────────────────────────────
    let console = repl::Console {
        commands,
        feedback: Arc::clone(&feedback),
        state: bridge.vehicle_state(),
        cancel: cancel.clone(),
    };
    println!(
        "\n  Bridge running at {} Hz. Type {} for a list of commands.\n",
        bridge.config().rate_hz,
        "/help".bold().cyan()
    );
    // Detached: a console blocked on stdin must not keep the process alive.
    std::thread::spawn(move || repl::run(console));

    let result = runtime.block_on(bridge.run(&cancel));
    drop(sensors);

    match result {
        Ok(exit) => {
            println!("{} ({:?})", "  ✓ Bridge stopped.".green(), exit);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Bridge failed".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Write the default config so the operator has a file to edit.
fn first_run() -> BridgeConfig {
    let cfg = BridgeConfig::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _____ _         ____       _     __         "#.bold().cyan());
    println!("{}", r#"  / ___/(_)___ ___/ __ )_____(_)___/ /___ ____ "#.bold().cyan());
    println!("{}", r#"  \__ \/ / __ `__ \ __  / ___/ / __  / __ `/ _ \"#.bold().cyan());
    println!("{}", r#" ___/ / / / / / / /_/ / /  / / /_/ / /_/ /  __/"#.bold().cyan());
    println!("{}", r#"/____/_/_/ /_/ /_/_____/_/  /_/\__,_/\__, /\___/ "#.bold().cyan());
    println!("{}", r#"                                    /____/       "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "SimBridge".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Control arbitration and telemetry bridge");
    println!();
}
