//! Activity Recorder CLI
//!
//! Records keystrokes, window changes, and screenshots into one
//! chronological activity log.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use activity_recorder::{
    config::{OutputMode, RecorderConfig, SourceToggles, TimingMode},
    platform::{PlatformDesktopQuery, PlatformKeyTranslator},
    sources::{KeystrokeSource, ScreenshotSource, TimingStrategy, WindowFocusSource},
    EventSink, HookRegistry, SessionStats, VERSION,
};

#[derive(Parser)]
#[command(name = "activity-recorder")]
#[command(version = VERSION)]
#[command(about = "Desktop activity recorder producing an LLM-friendly log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start recording activity
    Start {
        /// Capture sources to activate (keyboard, focus, screenshots, or all)
        #[arg(long, default_value = "all")]
        sources: String,

        /// Activity log file (overrides the configured path)
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Seconds between interval screenshots (floor 1)
        #[arg(long)]
        interval: Option<u32>,

        /// Pause screenshots after this many seconds of inactivity
        #[arg(long)]
        idle_pause: Option<u32>,

        /// Minimum seconds between window-change screenshots
        #[arg(long)]
        change_debounce: Option<u32>,

        /// Seconds to wait after a window change before capturing
        #[arg(long)]
        capture_delay: Option<u32>,

        /// Screenshot timing strategy (fixed-interval or window-change)
        #[arg(long)]
        timing: Option<String>,

        /// Embed screenshots inline as base64 instead of PNG files
        #[arg(long)]
        base64: bool,

        /// Directory for screenshot PNG files
        #[arg(long)]
        screenshot_dir: Option<PathBuf>,
    },

    /// Show the current configuration and output locations
    Status,

    /// Print the configuration as JSON
    Config,

    /// Run-length encode a finished activity log
    Encode {
        /// Log file to encode
        input: PathBuf,

        /// Output file (defaults to <input>_encoded)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            sources,
            log_file,
            interval,
            idle_pause,
            change_debounce,
            capture_delay,
            timing,
            base64,
            screenshot_dir,
        } => {
            cmd_start(StartOptions {
                sources,
                log_file,
                interval,
                idle_pause,
                change_debounce,
                capture_delay,
                timing,
                base64,
                screenshot_dir,
            });
        }
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
        Commands::Encode { input, output } => cmd_encode(input, output),
    }
}

struct StartOptions {
    sources: String,
    log_file: Option<PathBuf>,
    interval: Option<u32>,
    idle_pause: Option<u32>,
    change_debounce: Option<u32>,
    capture_delay: Option<u32>,
    timing: Option<String>,
    base64: bool,
    screenshot_dir: Option<PathBuf>,
}

fn cmd_start(opts: StartOptions) {
    println!("Activity Recorder v{VERSION}");
    println!();

    let toggles = SourceToggles::from_csv(&opts.sources);
    if !toggles.any_enabled() {
        eprintln!("Error: at least one source must be enabled (keyboard, focus, screenshots)");
        std::process::exit(1);
    }

    let mut config = match RecorderConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: could not load configuration ({e}); using defaults");
            RecorderConfig::default()
        }
    };
    apply_overrides(&mut config, &opts);
    let config = config.normalized();

    if let Err(e) = config.ensure_directories() {
        eprintln!("Error: could not create output directories: {e}");
        std::process::exit(1);
    }

    println!("Recording to {}", config.log_path.display());
    println!(
        "  Keyboard: {}",
        if toggles.keyboard { "enabled" } else { "disabled" }
    );
    println!(
        "  Window focus: {}",
        if toggles.window_focus {
            "enabled"
        } else {
            "disabled"
        }
    );
    if toggles.screenshots {
        println!(
            "  Screenshots: every {}s ({}, {})",
            config.screenshots.interval_secs,
            match config.screenshots.timing {
                TimingMode::FixedInterval => "fixed interval",
                TimingMode::WindowChange => "window change + interval backup",
            },
            match config.screenshots.output {
                OutputMode::FilePath => "PNG files",
                OutputMode::Base64 => "inline base64",
            }
        );
    } else {
        println!("  Screenshots: disabled");
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats = SessionStats::shared();
    let registry = Arc::new(HookRegistry::new());

    let sink = match EventSink::create(&config.log_path, config.flush_threshold, stats.clone()) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if toggles.keyboard {
        let source = Arc::new(KeystrokeSource::new(
            registry.clone(),
            Arc::new(PlatformKeyTranslator::default()),
            stats.clone(),
        ));
        if let Err(e) = sink.add_source(source) {
            eprintln!("Error: could not start keyboard capture: {e}");
            std::process::exit(1);
        }
    }

    if toggles.window_focus {
        let source = Arc::new(WindowFocusSource::new(
            registry.clone(),
            Arc::new(PlatformDesktopQuery::default()),
            stats.clone(),
        ));
        if let Err(e) = sink.add_source(source) {
            eprintln!("Error: could not start window-focus capture: {e}");
            std::process::exit(1);
        }
    }

    if toggles.screenshots {
        let mut builder = ScreenshotSource::builder(registry.clone(), stats.clone())
            .interval_secs(config.screenshots.interval_secs)
            .idle_pause_secs(config.screenshots.idle_pause_secs)
            .change_debounce_secs(config.screenshots.change_debounce_secs)
            .capture_delay_secs(config.screenshots.capture_delay_secs)
            .timing(match config.screenshots.timing {
                TimingMode::FixedInterval => TimingStrategy::FixedInterval,
                TimingMode::WindowChange => TimingStrategy::WindowChange,
            });
        builder = match config.screenshots.output {
            OutputMode::FilePath => builder.file_output(config.screenshots.output_dir.clone()),
            OutputMode::Base64 => builder.base64_output(),
        };

        let source = match builder.build() {
            Ok(source) => Arc::new(source),
            Err(e) => {
                eprintln!("Error: could not configure screenshot capture: {e}");
                std::process::exit(1);
            }
        };
        if let Err(e) = sink.add_source(source) {
            eprintln!("Error: could not start screenshot capture: {e}");
            std::process::exit(1);
        }
    }

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    println!();
    println!("Stopping recording...");
    sink.shutdown();

    println!();
    println!("{}", stats.summary());
}

fn apply_overrides(config: &mut RecorderConfig, opts: &StartOptions) {
    if let Some(path) = &opts.log_file {
        config.log_path = path.clone();
    }
    if let Some(interval) = opts.interval {
        config.screenshots.interval_secs = interval;
    }
    if let Some(idle_pause) = opts.idle_pause {
        config.screenshots.idle_pause_secs = idle_pause;
    }
    if let Some(debounce) = opts.change_debounce {
        config.screenshots.change_debounce_secs = debounce;
    }
    if let Some(delay) = opts.capture_delay {
        config.screenshots.capture_delay_secs = delay;
    }
    if let Some(timing) = &opts.timing {
        match TimingMode::parse(timing) {
            Some(mode) => config.screenshots.timing = mode,
            None => {
                eprintln!(
                    "Error: unknown timing strategy '{timing}' (expected fixed-interval or window-change)"
                );
                std::process::exit(1);
            }
        }
    }
    if opts.base64 {
        config.screenshots.output = OutputMode::Base64;
    }
    if let Some(dir) = &opts.screenshot_dir {
        config.screenshots.output_dir = dir.clone();
    }
}

fn cmd_status() {
    let config = RecorderConfig::load().unwrap_or_default();

    println!("Activity Recorder Status");
    println!("========================");
    println!();
    println!("Config file: {}", RecorderConfig::config_path().display());
    println!("Activity log: {}", config.log_path.display());
    println!();
    println!("Configuration:");
    println!(
        "  Keyboard capture: {}",
        if config.sources.keyboard {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Window-focus capture: {}",
        if config.sources.window_focus {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Screenshot capture: {}",
        if config.sources.screenshots {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Screenshot interval: {}s",
        config.screenshots.interval_secs
    );
    println!(
        "  Idle pause threshold: {}s",
        config.screenshots.idle_pause_secs
    );
    println!(
        "  Screenshot directory: {}",
        config.screenshots.output_dir.display()
    );

    if config.log_path.exists() {
        if let Ok(meta) = std::fs::metadata(&config.log_path) {
            println!();
            println!("Activity log size: {} bytes", meta.len());
        }
    } else {
        println!();
        println!("No activity log recorded yet.");
    }
}

fn cmd_config() {
    let config = RecorderConfig::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {}", RecorderConfig::config_path().display());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_encode(input: PathBuf, output: Option<PathBuf>) {
    match activity_recorder::encoder::encode_file(&input, output) {
        Ok(report) => {
            println!("Original length: {}", report.original_len);
            println!("Encoded length: {}", report.encoded_len);
            println!("Percent change: {:.2}%", report.percent_change());
            println!(
                "Encoded content written to: {}",
                report.output_path.display()
            );
        }
        Err(e) => {
            eprintln!("Error encoding {}: {e}", input.display());
            std::process::exit(1);
        }
    }
}
