//! svlte-sim-device
//!
//! Replays a power scenario against a fully simulated SVLTE device and
//! reports the final modem states. Useful for eyeballing engine behaviour
//! and for replaying field-captured scenarios.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use rand::RngExt;
use tracing_subscriber::EnvFilter;

use svlte_power::PowerConfig;
use svlte_sim::device::SimDevice;
use svlte_sim::scenario::{apply, Scenario};

/// Simulated SVLTE device scenario runner.
#[derive(Parser, Debug)]
#[command(name = "svlte-sim-device", about = "Replay a power scenario on a simulated device")]
struct Cli {
    /// Scenario JSON file. Omit to run the built-in boot scenario.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Retry interval used by the engine (ms).
    #[arg(long, default_value_t = 200)]
    retry_interval_ms: u64,

    /// Replay in real time, sleeping between steps.
    #[arg(long, default_value_t = false)]
    pace: bool,

    /// Print the selected scenario as JSON and exit.
    #[arg(long, default_value_t = false)]
    dump: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let scenario = match &cli.scenario {
        Some(path) => Scenario::load(path)?,
        None => {
            let mut rng = rand::rng();
            Scenario::boot_and_attach(random_iccid(&mut rng), random_iccid(&mut rng))
        }
    };

    if cli.dump {
        println!("{}", serde_json::to_string_pretty(&scenario)?);
        return Ok(());
    }

    tracing::info!(
        scenario = %scenario.name,
        steps = scenario.steps.len(),
        "starting replay"
    );

    let mut device = SimDevice::svlte(PowerConfig {
        retry_interval_ms: cli.retry_interval_ms,
        ..PowerConfig::default()
    });

    let mut elapsed = 0u64;
    for step in &scenario.steps {
        if cli.pace && step.at_ms > elapsed {
            thread::sleep(Duration::from_millis(step.at_ms - elapsed));
        }
        elapsed = step.at_ms;
        apply(&mut device, &step.action);
    }

    // Let any remaining deferred operations run their course.
    if !device.settle(16) {
        tracing::warn!(
            pending = device.pending_retries(),
            "retries still pending after settling"
        );
    }

    for (&(phone, kind), modem) in device.modems() {
        tracing::info!(
            phone = %phone,
            kind = %kind,
            modem = ?modem.modem_power(),
            radio = ?modem.radio_power(),
            "final state"
        );
    }
    if !device.exhausted().is_empty() {
        tracing::warn!(count = device.exhausted().len(), "operations abandoned");
    }

    Ok(())
}

fn random_iccid(rng: &mut impl Rng) -> String {
    let tail: String = (0..12).map(|_| rng.random_range(0..10).to_string()).collect();
    format!("898600{tail}")
}
