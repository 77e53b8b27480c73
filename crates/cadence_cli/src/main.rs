//! Cadence CLI
//!
//! Inspect easing curves and drive animations on the background scheduler.

use anyhow::{Context, Result};
use cadence_animation::{Animation, AnimationScheduler, Curve, Frequency, Interpolation, TimeUnit};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::CadenceConfig;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cadence animation engine CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./cadence.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the preset easing curves
    Curves,

    /// Print the effective configuration as TOML
    Config,

    /// Print sampled values of a curve
    Sample {
        /// Curve name (see `cadence curves`)
        curve: Curve,

        /// Number of intervals between progress 0 and 1
        #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        steps: u32,

        /// Start value
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        from: f64,

        /// End value
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        to: f64,

        /// Play the curve backwards
        #[arg(long)]
        reverse: bool,

        /// Use the mirrored curve (ease-in becomes ease-out)
        #[arg(long)]
        opposite: bool,

        /// Go out and come back within one run
        #[arg(long)]
        rewind: bool,

        /// Clamp outputs into the start/end range
        #[arg(long)]
        clamped: bool,
    },

    /// Run an animation on the background scheduler
    Play {
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        from: f64,

        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        to: f64,

        /// Duration of one run in milliseconds
        #[arg(short, long, default_value_t = 1000)]
        duration_ms: i64,

        #[arg(long, default_value_t = Curve::Linear)]
        curve: Curve,

        /// Playback speed (negative plays backwards)
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        speed: f64,

        /// Loop this many times before exiting (0 plays once)
        #[arg(short, long, default_value_t = 0)]
        loops: u32,

        /// Interval between value reports
        #[arg(short, long, default_value_t = 100)]
        report_ms: u64,

        /// Give up after this long
        #[arg(long, default_value_t = 60_000)]
        timeout_ms: u64,
    },

    /// Smoothly chase a target value until it arrives
    Chase {
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        from: f64,

        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        to: f64,

        /// Fraction of the remaining distance covered per tick
        #[arg(long)]
        ratio: Option<f64>,

        /// Tick period in milliseconds
        #[arg(long)]
        period_ms: Option<u64>,

        /// Interval between value reports
        #[arg(short, long, default_value_t = 100)]
        report_ms: u64,

        /// Give up after this long
        #[arg(long, default_value_t = 60_000)]
        timeout_ms: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Curves => cmd_curves(),

        Commands::Config => cmd_config(cli.config.as_deref()),

        Commands::Sample {
            curve,
            steps,
            from,
            to,
            reverse,
            opposite,
            rewind,
            clamped,
        } => cmd_sample(
            curve,
            steps,
            from,
            to,
            SampleModifiers {
                reverse,
                opposite,
                rewind,
                clamped,
            },
        ),

        Commands::Play {
            from,
            to,
            duration_ms,
            curve,
            speed,
            loops,
            report_ms,
            timeout_ms,
        } => {
            let config = CadenceConfig::load(cli.config.as_deref())?;
            cmd_play(
                &config,
                PlayArgs {
                    from,
                    to,
                    duration_ms,
                    curve,
                    speed,
                    loops,
                },
                Duration::from_millis(report_ms.max(1)),
                Duration::from_millis(timeout_ms),
            )
        }

        Commands::Chase {
            from,
            to,
            ratio,
            period_ms,
            report_ms,
            timeout_ms,
        } => {
            let mut config = CadenceConfig::load(cli.config.as_deref())?;
            if let Some(ratio) = ratio {
                config.interpolation.ratio = ratio;
            }
            if let Some(period_ms) = period_ms {
                config.interpolation.period = Duration::from_millis(period_ms);
            }
            cmd_chase(
                &config,
                from,
                to,
                Duration::from_millis(report_ms.max(1)),
                Duration::from_millis(timeout_ms),
            )
        }
    }
}

fn cmd_curves() -> Result<()> {
    for curve in Curve::ALL {
        if curve.overshoots() {
            println!("{curve}  (overshoots)");
        } else {
            println!("{curve}");
        }
    }
    Ok(())
}

fn cmd_config(path: Option<&Path>) -> Result<()> {
    let config = CadenceConfig::load(path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

struct SampleModifiers {
    reverse: bool,
    opposite: bool,
    rewind: bool,
    clamped: bool,
}

fn cmd_sample(curve: Curve, steps: u32, from: f64, to: f64, modifiers: SampleModifiers) -> Result<()> {
    let mut easing = curve.easing();
    if modifiers.opposite {
        easing = easing.opposite();
    }
    if modifiers.reverse {
        easing = easing.reverse();
    }
    if modifiers.rewind {
        easing = easing.rewind();
    }

    debug!("Sampling {} with {} steps from {} to {}", curve, steps, from, to);

    for i in 0..=steps {
        let progress = f64::from(i) / f64::from(steps);
        let value = if modifiers.clamped {
            easing.apply_clamped(from, to, progress)
        } else {
            easing.apply(from, to, progress)
        };
        println!("{progress:>6.3}  {value:>12.6}");
    }

    Ok(())
}

struct PlayArgs {
    from: f64,
    to: f64,
    duration_ms: i64,
    curve: Curve,
    speed: f64,
    loops: u32,
}

fn cmd_play(config: &CadenceConfig, args: PlayArgs, report: Duration, timeout: Duration) -> Result<()> {
    let mut scheduler = AnimationScheduler::with_config(config.scheduler.clone());
    scheduler
        .start_background()
        .context("Failed to start the animation scheduler")?;

    let frequency = Frequency::new(args.speed, args.duration_ms, TimeUnit::Milliseconds);
    let animation = Animation::with_frequency(scheduler.handle(), args.from, args.to, frequency, args.curve);
    animation.set_looping(args.loops > 0);

    let (tx, rx) = mpsc::channel();

    let done = tx.clone();
    let _complete = animation.on_complete(move || {
        let _ = done.send(());
    });

    let loops = args.loops;
    let counter = Arc::new(AtomicU32::new(0));
    let loop_counter = Arc::clone(&counter);
    let _looped = animation.on_loop(move || {
        let seen = loop_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if loops > 0 && seen >= loops {
            let _ = tx.send(());
        }
    });

    info!(
        "Playing {} -> {} over {}ms ({}, speed {})",
        args.from, args.to, args.duration_ms, args.curve, args.speed
    );

    animation.start();
    wait_reporting(&rx, report, timeout, || {
        println!("{:>6.3}  {:>12.6}", animation.progress(), animation.value());
    })?;
    animation.terminate();

    println!("{:>6.3}  {:>12.6}", animation.progress(), animation.value());
    info!(
        "Finished after {} loop(s), {} dropped tick(s)",
        counter.load(Ordering::Relaxed),
        scheduler.dropped_ticks()
    );

    scheduler.stop_background();
    Ok(())
}

fn cmd_chase(config: &CadenceConfig, from: f64, to: f64, report: Duration, timeout: Duration) -> Result<()> {
    let mut scheduler = AnimationScheduler::with_config(config.scheduler.clone());
    scheduler
        .start_background()
        .context("Failed to start the animation scheduler")?;

    let interpolation = Interpolation::with_options(scheduler.handle(), from, config.interpolation);

    let (tx, rx) = mpsc::channel();
    let _complete = interpolation.on_complete(move || {
        let _ = tx.send(());
    });

    info!(
        "Chasing {} -> {} (ratio {}, period {:?})",
        from,
        to,
        interpolation.ratio(),
        interpolation.period()
    );

    let started = Instant::now();
    interpolation.set_target(to);
    wait_reporting(&rx, report, timeout, || {
        println!("{:>12.6}", interpolation.value());
    })?;
    interpolation.pause();

    println!("{:>12.6}", interpolation.value());
    info!("Arrived after {:?}", started.elapsed());

    scheduler.stop_background();
    Ok(())
}

/// Block until `done` fires, calling `report` every `interval`
fn wait_reporting(
    done: &mpsc::Receiver<()>,
    interval: Duration,
    timeout: Duration,
    mut report: impl FnMut(),
) -> Result<()> {
    let started = Instant::now();
    loop {
        match done.recv_timeout(interval) {
            Ok(()) => return Ok(()),
            Err(RecvTimeoutError::Timeout) => {
                report();
                if started.elapsed() >= timeout {
                    anyhow::bail!("Timed out after {:?}", timeout);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("Notification channel closed before completion")
            }
        }
    }
}
