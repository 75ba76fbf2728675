mod audio;
mod cli;
mod config;
mod history;
mod meter;
mod regulation;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;

use audio::spectrum::SpectrumSource;
use cli::Cli;
use history::{HistoryStore, MeasurementRecord};
use config::MeterConfig;
use meter::{DisplaySmoother, LevelAggregator, WeightingMode};
use regulation::{NoiseBand, Period, Regulation};

/// Final reading of one session.
#[derive(Debug, Serialize)]
struct Summary {
    source: String,
    weighting: WeightingMode,
    frames: u64,
    duration: f32,
    level: f64,
    leq: f64,
    peak: f64,
    band: NoiseBand,
    period: Period,
    limit: f64,
    violation: bool,
}

impl Summary {
    fn new(
        source: String,
        weighting: WeightingMode,
        duration: f32,
        level: f64,
        aggregator: &LevelAggregator,
        regulation: Regulation,
    ) -> Self {
        Self {
            source,
            weighting,
            frames: aggregator.frames(),
            duration,
            level,
            leq: aggregator.leq(),
            peak: aggregator.peak(),
            band: NoiseBand::classify(level),
            period: regulation.period,
            limit: regulation.limit,
            violation: regulation.is_violation(level),
        }
    }

    fn print(&self) {
        let unit = self.weighting.unit();
        println!("{}", self.source);
        println!("  Level: {:6.1} {}  ({:?})", self.level, unit, self.band);
        println!("  Leq:   {:6.1} {}", self.leq, unit);
        println!("  Peak:  {:6.1} {}", self.peak, unit);
        println!("  Frames: {} ({:.1}s)", self.frames, self.duration);
        println!(
            "  {}: limit {:.0} dB{}",
            self.period,
            self.limit,
            if self.violation { "  ** EXCEEDED **" } else { "" }
        );
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(config::find_config);
    let cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                config::Config::default()
            }
        },
        None => config::Config::default(),
    };
    let mut settings = cfg.meter;
    settings.apply_cli(&cli);

    let history_path = cfg
        .history
        .path
        .clone()
        .unwrap_or_else(history::default_history_path);

    if cli.history {
        let store = HistoryStore::open(&history_path, cfg.history.capacity)?;
        print_history(&store);
        return Ok(());
    }

    if cli.inputs.is_empty() {
        anyhow::bail!("At least one input audio file is required");
    }

    if !settings.offset.is_finite() {
        anyhow::bail!("Calibration offset must be finite, got {}", settings.offset);
    }
    log::info!(
        "Weighting: {}, offset: {:+.1} dB, smoothing: {}, fft_size: {}, {} fps",
        settings.weighting,
        settings.offset,
        settings.smoothing,
        settings.fft_size,
        settings.fps
    );

    let mut smoother = DisplaySmoother::new(settings.smoothing)?;
    let mut aggregator: Option<LevelAggregator> = None;
    let mut summaries: Vec<Summary> = Vec::new();

    for input in &cli.inputs {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
        let audio = audio::decode::decode_audio(input)?;

        // Curves only need rebuilding when the sample rate changes
        let agg = match aggregator.take() {
            Some(mut agg)
                if agg.weighting().sample_rate() == audio.sample_rate
                    && agg.weighting().fft_size() == settings.fft_size =>
            {
                if cli.reset_between {
                    agg.reset();
                }
                agg
            }
            Some(agg) => {
                if !cli.reset_between {
                    log::warn!(
                        "Sample rate changed ({}Hz -> {}Hz); starting a new session",
                        agg.weighting().sample_rate(),
                        audio.sample_rate
                    );
                }
                LevelAggregator::new(audio.sample_rate, settings.fft_size)?
            }
            None => LevelAggregator::new(audio.sample_rate, settings.fft_size)?,
        };
        let agg = aggregator.insert(agg);

        let level = measure(input, &audio, agg, &mut smoother, &settings, &cli)?;

        let regulation = cfg.regulation.current();
        summaries.push(Summary::new(
            input.display().to_string(),
            settings.weighting,
            audio.duration(),
            level,
            agg,
            regulation,
        ));
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            summary.print();
        }
    }

    if cli.save {
        save_reading(&history_path, cfg.history.capacity, &summaries)?;
    }

    Ok(())
}

/// Runs every frame of `audio` through the meter and returns the displayed level.
fn measure(
    input: &Path,
    audio: &audio::decode::AudioData,
    aggregator: &mut LevelAggregator,
    smoother: &mut DisplaySmoother,
    settings: &MeterConfig,
    cli: &Cli,
) -> Result<f64> {
    let source = SpectrumSource::new(audio.sample_rate, settings.fft_size, settings.fps)?;

    let pb = if cli.trace || cli.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(source.frame_count(audio) as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames {msg}")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );

    let frames = source.chunks(audio).flatten();
    for (frame_idx, frame) in frames.enumerate() {
        let spl = aggregator
            .process_frame(&frame.bins, settings.weighting, settings.offset)
            .with_context(|| format!("Frame {} of {}", frame_idx, input.display()))?;
        let displayed = smoother.update(spl);

        if cli.trace {
            println!(
                "{:9.3}s  spl {:6.1}  level {:6.1}  leq {:6.1}  peak {:6.1}",
                frame.time,
                spl,
                displayed,
                aggregator.leq(),
                aggregator.peak()
            );
        }
        if frame_idx % 30 == 0 {
            pb.set_message(format!("{:.1} {}", displayed, settings.weighting.unit()));
        }
        pb.set_position(frame_idx as u64 + 1);
    }
    pb.finish_and_clear();

    log::info!(
        "{}: {} frames, Leq {:.1}, peak {:.1}",
        input.display(),
        aggregator.frames(),
        aggregator.leq(),
        aggregator.peak()
    );
    log::debug!("Session energy sum: {:.4e}", aggregator.state().energy_sum);

    Ok(smoother.value())
}

fn save_reading(path: &Path, capacity: usize, summaries: &[Summary]) -> Result<()> {
    let Some(last) = summaries.last() else {
        return Ok(());
    };
    if last.level <= 0.0 {
        log::warn!("Not saving a reading of {:.1} dB", last.level);
        return Ok(());
    }

    let mut store = HistoryStore::open(path, capacity)?;
    store.push(MeasurementRecord::new(
        last.level,
        last.leq,
        last.peak,
        last.weighting,
        Some(last.source.clone()),
    ))?;
    log::info!(
        "Saved reading to {} (keeping latest {})",
        path.display(),
        capacity
    );
    Ok(())
}

fn print_history(store: &HistoryStore) {
    if store.records().is_empty() {
        println!("No saved measurements.");
        return;
    }
    println!("Saved measurements (newest first):");
    for r in store.records() {
        println!(
            "  {}  {:>3} {}  Leq {:>3}  Peak {:>3}  {}",
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.db,
            r.weighting.unit(),
            r.leq,
            r.peak,
            r.source.as_deref().unwrap_or("-")
        );
    }
}

