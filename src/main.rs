//! Cyclist Fall Alert CLI
//!
//! Fall detection for riders with an SMS alert to an emergency contact.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cyclist_fall_alert::{
    alert::{
        normalize_phone_number, AlertOutcome, AlertTransport, GeoPoint, LocationCache,
        LocationFix, LogTransport, OutboxTransport, DEFAULT_MAP_CENTER,
    },
    collector::{
        load_trace, parse_line, PushCollector, ReplayCollector, ReplayPacing, SamplePusher,
        SampleSource,
    },
    config::Config,
    core::{
        analyze_trace, threshold_for_sensitivity, ClassifierConfig, FallClassifier,
        DEFAULT_FACTORS,
    },
    host::{DetectionHost, CONTROL_POLL_INTERVAL},
    monitor::{create_shared_log_with_persistence, DetectionLog},
    AlertDispatcher, EmergencyContact, SharedClassifier, SAFETY_NOTICE, VERSION,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fall-alert")]
#[command(version = VERSION)]
#[command(about = "Fall detection with emergency SMS alerts for cyclists", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start fall detection
    Start {
        /// Recorded trace to replay (CSV or JSON Lines); reads stdin if omitted
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Replay with the recorded timing instead of as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Playback speed for --realtime
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Sensitivity for this session only (overrides the config)
        #[arg(long)]
        sensitivity: Option<f64>,

        /// Log alerts instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Pause detection in a running session
    Pause,

    /// Resume detection in a running session
    Resume,

    /// Show detector status and cumulative statistics
    Status,

    /// Show or set the sensitivity factor
    Sensitivity {
        /// New factor (1.0 = nominal, lower = more sensitive)
        factor: Option<f64>,
    },

    /// Set the emergency contact
    SetContact {
        #[arg(long)]
        name: String,

        #[arg(long)]
        number: String,
    },

    /// Set the fallback location used when no fix is available ("lat,lon")
    SetLocation {
        location: String,
    },

    /// Analyze a recorded trace across sensitivity factors
    Analyze {
        #[arg(long, short)]
        input: PathBuf,

        /// Comma-separated sensitivity factors
        #[arg(long, value_delimiter = ',')]
        factors: Vec<f64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config,

    /// Display the safety notice
    Safety,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            input,
            realtime,
            speed,
            sensitivity,
            dry_run,
        } => cmd_start(input, realtime, speed, sensitivity, dry_run),
        Commands::Pause => cmd_pause(),
        Commands::Resume => cmd_resume(),
        Commands::Status => cmd_status(),
        Commands::Sensitivity { factor } => cmd_sensitivity(factor),
        Commands::SetContact { name, number } => cmd_set_contact(&name, &number),
        Commands::SetLocation { location } => cmd_set_location(&location),
        Commands::Analyze {
            input,
            factors,
            json,
        } => cmd_analyze(&input, factors, json),
        Commands::Config => cmd_config(),
        Commands::Safety => {
            println!("{SAFETY_NOTICE}");
            Ok(())
        }
    }
}

fn cmd_start(
    input: Option<PathBuf>,
    realtime: bool,
    speed: f64,
    sensitivity: Option<f64>,
    dry_run: bool,
) -> Result<()> {
    println!("Cyclist Fall Alert v{VERSION}");
    println!();

    let config = Config::load().context("Could not load configuration")?;
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let factor = sensitivity.unwrap_or(config.sensitivity);
    let classifier = SharedClassifier::new(FallClassifier::with_config(
        ClassifierConfig::for_sensitivity(factor),
    ));

    let mut stdin_pusher = None;
    let source: Box<dyn SampleSource> = match input {
        Some(ref path) => {
            let pacing = if realtime {
                ReplayPacing::Realtime { speed }
            } else {
                ReplayPacing::AsFastAsPossible
            };
            let collector = ReplayCollector::from_path(path, pacing)
                .with_context(|| format!("Could not load trace {}", path.display()))?;
            println!("  Input: {} ({} samples)", path.display(), collector.pending());
            Box::new(collector)
        }
        None => {
            println!("  Input: stdin (timestamp_ms,x,y,z or JSON per line)");
            let (collector, pusher) = stdin_collector();
            stdin_pusher = Some(pusher);
            Box::new(collector)
        }
    };

    println!(
        "  Sensitivity: {factor} (impact threshold {:.1} m/s²)",
        classifier.config().fall_threshold
    );
    match config.contact {
        Some(ref contact) => println!("  Contact: {} <{}>", contact.name, contact.number),
        None => {
            eprintln!("Warning: No emergency contact configured. Falls will not be reported.");
            eprintln!("Run `fall-alert set-contact --name NAME --number NUMBER`.");
        }
    }

    let transport: Box<dyn AlertTransport> = if dry_run {
        Box::new(LogTransport)
    } else {
        create_transport(&config)?
    };
    println!("  Alerts via: {}", transport.name());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let location = match config.last_location {
        Some(point) => LocationCache::with_fix(LocationFix {
            point,
            at: chrono::Utc::now(),
        }),
        None => LocationCache::new(),
    };
    let log = create_shared_log_with_persistence(config.stats_path());
    let dispatcher = AlertDispatcher::spawn(
        transport,
        config.dispatcher_settings(),
        location.clone(),
        log.clone(),
    );

    let mut host = DetectionHost::new(source, classifier, dispatcher, location, log.clone())
        .with_control_file(Config::config_path(), config.clone(), CONTROL_POLL_INTERVAL)
        .with_notifier(Box::new(|outcome: &AlertOutcome| {
            println!(
                "[{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                outcome.message()
            );
        }));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    if host.is_paused() {
        println!("Detection is currently paused.");
        println!("Run `fall-alert resume` to start detecting.");
        println!();
    }
    host.start().context("Error starting sample source")?;
    if let Some(pusher) = stdin_pusher {
        spawn_stdin_reader(pusher);
    }
    let result = host.run_until(&running);

    println!();
    println!("Stopping detection...");
    let summary = host.finish();
    println!(
        "Processed {} samples, {} fall(s) detected",
        summary.samples,
        summary.events.len()
    );
    println!();
    println!("{}", log.summary());

    result.context("Detection stopped with an error")
}

/// Push collector whose only sender is the returned pusher.
fn stdin_collector() -> (PushCollector, SamplePusher) {
    let mut collector = PushCollector::new();
    let pusher = collector.pusher();
    collector.close();
    (collector, pusher)
}

/// Feed stdin lines to `pusher` until EOF. The collector must already be
/// running. Dropping the pusher at EOF ends the detection loop.
fn spawn_stdin_reader(pusher: SamplePusher) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for (index, line) in stdin.lock().lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("stdin read failed: {e}");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line, index + 1) {
                Ok(sample) => {
                    pusher.push_blocking(sample);
                }
                Err(e) => tracing::debug!("Skipping input: {e}"),
            }
        }
        tracing::info!("stdin closed");
    });
}

#[cfg(feature = "gateway")]
fn create_transport(config: &Config) -> Result<Box<dyn AlertTransport>> {
    use cyclist_fall_alert::SmsGatewayTransport;

    if let Some(ref gateway) = config.gateway {
        let transport = SmsGatewayTransport::new(gateway.clone())
            .context("Gateway initialization failed")?;
        match transport.test_connection() {
            Ok(true) => println!("  Gateway connection: OK"),
            Ok(false) => eprintln!("Warning: Gateway health check failed"),
            Err(e) => eprintln!("Warning: Could not connect to gateway: {e}"),
        }
        return Ok(Box::new(transport));
    }
    Ok(Box::new(OutboxTransport::new(config.outbox_path.clone())))
}

#[cfg(not(feature = "gateway"))]
fn create_transport(config: &Config) -> Result<Box<dyn AlertTransport>> {
    if config.gateway.is_some() {
        eprintln!("Warning: gateway configured but the gateway feature is not enabled");
        eprintln!("Alerts will be written to {}", config.outbox_path.display());
    }
    Ok(Box::new(OutboxTransport::new(config.outbox_path.clone())))
}

fn cmd_pause() -> Result<()> {
    let mut config = Config::load()?;
    config.paused = true;
    config.save().context("Error saving config")?;
    println!("Detection paused. Use 'fall-alert resume' to continue.");
    Ok(())
}

fn cmd_resume() -> Result<()> {
    let mut config = Config::load()?;
    config.paused = false;
    config.save().context("Error saving config")?;
    println!("Detection resumed.");
    Ok(())
}

fn cmd_status() -> Result<()> {
    let config = Config::load()?;

    println!("Cyclist Fall Alert Status");
    println!("=========================");
    println!();

    println!("Configuration:");
    println!(
        "  Sensitivity: {} (impact threshold {:.1} m/s²)",
        config.sensitivity,
        threshold_for_sensitivity(config.sensitivity)
    );
    match config.contact {
        Some(ref contact) => println!("  Contact: {} <{}>", contact.name, contact.number),
        None => println!("  Contact: not set ✗"),
    }
    match config.last_location {
        Some(point) => println!("  Fallback location: {}, {}", point.latitude, point.longitude),
        None => println!(
            "  Fallback location: not set (maps open at {}, {})",
            DEFAULT_MAP_CENTER.latitude, DEFAULT_MAP_CENTER.longitude
        ),
    }
    println!("  Timezone: {}", config.timezone());
    println!("  Paused: {}", config.paused);
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        let stats = DetectionLog::with_persistence(stats_path).stats();
        println!("Cumulative Statistics:");
        println!("  Samples observed: {}", stats.samples_observed);
        println!("  Samples dropped: {}", stats.samples_dropped);
        println!("  Falls detected: {}", stats.falls_detected);
        println!("  Alerts sent: {}", stats.alerts_sent);
        println!("  Alerts failed: {}", stats.alerts_failed);
    } else {
        println!("No previous session data found.");
    }
    Ok(())
}

fn cmd_sensitivity(factor: Option<f64>) -> Result<()> {
    let mut config = Config::load()?;

    if let Some(factor) = factor {
        config.set_sensitivity(factor)?;
        config.save().context("Error saving config")?;
    }

    println!(
        "Sensitivity: {} (impact threshold {:.1} m/s²)",
        config.sensitivity,
        threshold_for_sensitivity(config.sensitivity)
    );
    Ok(())
}

fn cmd_set_contact(name: &str, number: &str) -> Result<()> {
    let mut config = Config::load()?;

    let name = name.trim();
    if name.is_empty() {
        bail!("Contact name must not be empty");
    }
    let number = normalize_phone_number(number, &config.country_prefix)?;

    config.contact = Some(EmergencyContact::new(name, number.clone()));
    config.save().context("Error saving config")?;
    println!("Emergency contact set: {name} <{number}>");
    Ok(())
}

fn cmd_set_location(location: &str) -> Result<()> {
    let point = GeoPoint::parse(location)
        .with_context(|| format!("Expected \"lat,lon\" within range, got \"{location}\""))?;

    let mut config = Config::load()?;
    config.last_location = Some(point);
    config.save().context("Error saving config")?;
    println!("Fallback location set: {}, {}", point.latitude, point.longitude);
    Ok(())
}

fn cmd_analyze(input: &Path, factors: Vec<f64>, json: bool) -> Result<()> {
    let trace =
        load_trace(input).with_context(|| format!("Could not load trace {}", input.display()))?;
    if trace.skipped > 0 {
        eprintln!("Warning: {} malformed line(s) skipped", trace.skipped);
    }

    let factors = if factors.is_empty() {
        DEFAULT_FACTORS.to_vec()
    } else {
        factors
    };
    let report = analyze_trace(&trace.samples, &factors);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
