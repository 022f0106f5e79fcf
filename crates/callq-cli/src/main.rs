//! # callq CLI Entry Point
//!
//! Runs a JavaScript file on an embedded Boa engine while a background task
//! marshals calls onto the engine thread.
//!
//! ## Usage
//!
//! ```bash
//! # Run main.js with the default producer calling `test` every 250ms
//! callq run
//!
//! # Run another script, with a faster producer calling `onTick`
//! callq run -s game.js --producer-interval-ms 50 --producer-callee onTick
//!
//! # Only check that the script defines main() and loop()
//! callq check -s game.js
//! ```
//!
//! ## Script Contract
//!
//! The script must define `main()` and `loop()`. `main` runs once, then
//! `loop` runs until it returns a falsy value. Pending cross-thread calls are
//! drained before every `loop()` call and whenever the script calls
//! `processCalls()`.

use anyhow::Result;
use argh::FromArgs;
use callq_runtime::{CallQueue, HostConfig, ProducerConfig, ScriptHost};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;


/// Environment variable consulted when `--script` is not given.
const SCRIPT_ENV_VAR: &str = "CALLQ_SCRIPT";
const DEFAULT_SCRIPT: &str = "main.js";

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// callq - run a script with cross-thread call marshaling
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Run(RunArgs),
    Check(CheckArgs),
}

/// Arguments for running a script.
///
/// # Example
///
/// ```bash
/// callq run -s main.js --sleep-ms 10 --max-iterations 1000
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "run")]
/// run a script's main() and loop()
struct RunArgs {
    /// path to the JavaScript file to run (default: $CALLQ_SCRIPT, then main.js)
    #[argh(option, short = 's')]
    script: Option<String>,

    /// pause between loop iterations in milliseconds, unless the script sets sleepInterval
    #[argh(option, long = "sleep-ms", default = "5")]
    sleep_ms: u64,

    /// stop after this many loop iterations
    #[argh(option, long = "max-iterations")]
    max_iterations: Option<u64>,

    /// interval between background producer calls in milliseconds
    #[argh(option, long = "producer-interval-ms", default = "250")]
    producer_interval_ms: u64,

    /// global function the background producer calls
    #[argh(option, long = "producer-callee", default = "\"test\".into()")]
    producer_callee: String,

    /// do not start the background producer
    #[argh(switch, long = "no-producer")]
    no_producer: bool,
}

/// Arguments for checking a script without running it.
#[derive(FromArgs)]
#[argh(subcommand, name = "check")]
/// load a script and verify it defines main() and loop()
struct CheckArgs {
    /// path to the JavaScript file to check
    #[argh(option, short = 's')]
    script: Option<String>,
}

/// Resolve the script path: explicit flag, then environment, then default.
fn resolve_script(flag: Option<String>) -> PathBuf {
    flag.or_else(|| std::env::var(SCRIPT_ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_SCRIPT.to_string())
        .into()
}

impl RunArgs {
    fn host_config(&self) -> HostConfig {
        let config = HostConfig::new().with_default_sleep(Duration::from_millis(self.sleep_ms));
        match self.max_iterations {
            Some(max) => config.with_max_iterations(max),
            None => config,
        }
    }

    fn producer_config(&self) -> Option<ProducerConfig> {
        if self.no_producer {
            return None;
        }
        Some(
            ProducerConfig::new(self.producer_callee.clone())
                .with_interval(Duration::from_millis(self.producer_interval_ms)),
        )
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let script = resolve_script(args.script.clone());
    let host_config = args.host_config();
    host_config.validate()?;

    tracing::info!("Running script: {}", script.display());

    let queue = Arc::new(CallQueue::new());

    let producer = match args.producer_config() {
        Some(config) => Some(callq_runtime::spawn_producer(Arc::clone(&queue), config)?),
        None => {
            tracing::info!("Background producer disabled");
            None
        }
    };

    // The Boa context is !Send, so it is created on the blocking thread that
    // runs it and never leaves that thread.
    let engine = tokio::task::spawn_blocking(move || -> callq_common::Result<u64> {
        let mut host = ScriptHost::new(queue, host_config)?;
        host.load_file(&script)?;
        host.run()
    });

    let result = engine.await?;

    if let Some(producer) = producer {
        producer.abort();
    }

    let iterations = result?;
    tracing::info!(iterations, "Script finished");
    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let script = resolve_script(args.script);
    let mut host = ScriptHost::new(Arc::new(CallQueue::new()), HostConfig::default())?;
    host.load_file(&script)?;
    host.check()?;
    tracing::info!("{} defines main() and loop()", script.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Default to INFO, RUST_LOG overrides.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let outcome = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Check(args) => check(args),
    };

    if let Err(e) = &outcome {
        tracing::error!("{:#}", e);
    }
    outcome
}
