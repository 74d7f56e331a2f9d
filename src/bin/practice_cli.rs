use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use practice_trainer::config::AppConfig;
use practice_trainer::detector::AnalysisLoop;
use practice_trainer::metronome::{render_pattern, ClickStyle};
use practice_trainer::progression::{roll_rarity, CatalogItem, Rarity};
use practice_trainer::session::{SessionHandle, TickOutcome};
use practice_trainer::storage::{JsonFileRepository, ProfileRepository};

#[derive(Parser, Debug)]
#[command(
    name = "practice_cli",
    about = "Practice companion: activity-tracked sessions, metronome, loot"
)]
struct Cli {
    /// Override path of the JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a practice session end to end (microphone required)
    Practice {
        #[arg(long, default_value = "default")]
        profile: String,
        /// Session length in minutes
        #[arg(long, default_value_t = 30)]
        minutes: u32,
        #[arg(long, default_value_t = 100)]
        bpm: u32,
        /// Drive the metronome during the session
        #[arg(long, default_value_t = false)]
        metronome: bool,
        #[arg(long, value_enum, default_value = "pulse")]
        style: StyleArg,
        /// Catalog JSON file; a built-in demo catalog is used when omitted
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Run the metronome standalone for a number of bars
    Metronome {
        #[arg(long, default_value_t = 100)]
        bpm: u32,
        #[arg(long, default_value_t = 8)]
        bars: u32,
        #[arg(long, value_enum, default_value = "pulse")]
        style: StyleArg,
    },
    /// Render a click pattern to a WAV file for inspection
    RenderClick {
        #[arg(long, default_value_t = 100)]
        bpm: u32,
        #[arg(long, default_value_t = 2)]
        bars: u32,
        #[arg(long, value_enum, default_value = "pulse")]
        style: StyleArg,
        #[arg(long)]
        out: PathBuf,
    },
    /// Run a WAV file through the activity detector DSP
    Analyze {
        input: PathBuf,
    },
    /// Sample the reward roll distribution at a given streak
    RollStats {
        #[arg(long, default_value_t = 100_000)]
        draws: u32,
        #[arg(long, default_value_t = 0)]
        streak: u32,
    },
    /// Print a profile's stored record
    Inventory {
        #[arg(long, default_value = "default")]
        profile: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    Pulse,
    Wood,
}

impl From<StyleArg> for ClickStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Pulse => ClickStyle::Pulse,
            StyleArg::Wood => ClickStyle::Wood,
        }
    }
}

fn main() -> ExitCode {
    practice_trainer::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Practice {
            profile,
            minutes,
            bpm,
            metronome,
            style,
            catalog,
        } => run_practice(config, &profile, minutes, bpm, metronome, style.into(), catalog),
        Commands::Metronome { bpm, bars, style } => run_metronome(config, bpm, bars, style.into()),
        Commands::RenderClick {
            bpm,
            bars,
            style,
            out,
        } => render_click_wav(bpm, bars, style.into(), &out),
        Commands::Analyze { input } => analyze_wav(config, &input),
        Commands::RollStats { draws, streak } => roll_stats(draws, streak),
        Commands::Inventory { profile } => print_inventory(config, &profile),
    }
}

fn run_practice(
    config: AppConfig,
    profile: &str,
    minutes: u32,
    bpm: u32,
    metronome: bool,
    style: ClickStyle,
    catalog_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let catalog = match catalog_path {
        Some(path) => load_catalog(&path)?,
        None => demo_catalog(),
    };

    let mut session = SessionHandle::new(config, profile, style);
    session
        .start_session(minutes * 60, metronome, bpm)
        .context("failed to start session")?;

    println!(
        "Practicing for {} minutes on profile '{}'. Timer runs while you play.",
        minutes, profile
    );

    loop {
        std::thread::sleep(Duration::from_secs(1));
        match session.tick_second() {
            Some(TickOutcome::Completed) => break,
            Some(TickOutcome::Advanced { elapsed_secs }) => {
                if elapsed_secs % 60 == 0 {
                    println!("{} of {} minutes done", elapsed_secs / 60, minutes);
                }
            }
            Some(TickOutcome::Paused) => {}
            None => bail!("session stopped unexpectedly"),
        }
    }

    let today = chrono::Local::now().date_naive();
    let summary = session
        .complete_session(&catalog, today, chrono::Utc::now())
        .context("failed to complete session")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::SUCCESS)
}

fn run_metronome(config: AppConfig, bpm: u32, bars: u32, style: ClickStyle) -> Result<ExitCode> {
    use practice_trainer::metronome::{Metronome, BEATS_PER_BAR};

    let mut metronome = Metronome::new(config.metronome, style);
    let mut ticks = metronome.subscribe();
    metronome.start(bpm).context("failed to start metronome")?;

    let total = bars * BEATS_PER_BAR as u32;
    for _ in 0..total {
        let tick = ticks.blocking_recv().context("beat stream closed")?;
        if tick.beat == 0 {
            println!("TICK  (bar)");
        } else {
            println!("tick");
        }
    }

    metronome.stop().context("failed to stop metronome")?;
    Ok(ExitCode::SUCCESS)
}

fn render_click_wav(bpm: u32, bars: u32, style: ClickStyle, out: &PathBuf) -> Result<ExitCode> {
    const SAMPLE_RATE: u32 = 48000;

    let samples = render_pattern(style, bpm, bars, SAMPLE_RATE);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(out, spec)
        .with_context(|| format!("failed to create {:?}", out))?;
    for sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    println!("Wrote {} bars at {} BPM to {:?}", bars, bpm, out);
    Ok(ExitCode::SUCCESS)
}

fn analyze_wav(config: AppConfig, input: &PathBuf) -> Result<ExitCode> {
    let mut reader =
        hound::WavReader::open(input).with_context(|| format!("failed to open {:?}", input))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    // First channel only, normalized to f32
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(channels)
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .step_by(channels)
                .map(|s| s.map(|s| s as f32 / max))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let mut analysis = AnalysisLoop::new(&config.detector);
    let chunk = (spec.sample_rate as u64 * config.detector.analysis_interval_ms / 1000) as usize;
    let chunk = chunk.max(1);

    let mut was_active = false;
    let mut active_ms = 0u64;
    for (index, block) in samples.chunks(chunk).enumerate() {
        let now_ms = index as u64 * config.detector.analysis_interval_ms;
        let state = analysis.process_block(block, now_ms);
        if state.is_active {
            active_ms += config.detector.analysis_interval_ms;
        }
        if state.is_active != was_active {
            println!(
                "{:>8} ms  {}",
                now_ms,
                if state.is_active { "ACTIVE" } else { "silent" }
            );
            was_active = state.is_active;
        }
    }

    println!(
        "Active for {:.1}s of {:.1}s",
        active_ms as f64 / 1000.0,
        samples.len() as f64 / spec.sample_rate as f64
    );
    Ok(ExitCode::SUCCESS)
}

fn roll_stats(draws: u32, streak: u32) -> Result<ExitCode> {
    use std::collections::BTreeMap;

    let mut rng = rand::thread_rng();
    let mut counts: BTreeMap<Rarity, u32> = BTreeMap::new();
    for _ in 0..draws {
        *counts.entry(roll_rarity(streak, &mut rng)).or_insert(0) += 1;
    }

    println!("{} draws at streak {}:", draws, streak);
    for &tier in &Rarity::ORDER {
        let count = counts.get(&tier).copied().unwrap_or(0);
        println!(
            "{:>10}: {:>8}  ({:.2}%)",
            tier.name(),
            count,
            100.0 * count as f64 / draws as f64
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn print_inventory(config: AppConfig, profile: &str) -> Result<ExitCode> {
    let repository = JsonFileRepository::from_config(&config.storage);
    match repository.load(profile) {
        Ok(Some(record)) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Ok(None) => {
            println!("No record for profile '{}'", profile);
        }
        Err(err) => bail!("failed to read profile store: {}", err),
    }
    Ok(ExitCode::SUCCESS)
}

fn load_catalog(path: &PathBuf) -> Result<Vec<CatalogItem>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
    let catalog: Vec<CatalogItem> =
        serde_json::from_str(&contents).with_context(|| format!("invalid catalog {:?}", path))?;
    Ok(catalog)
}

/// Built-in catalog so the CLI works without a theme file
fn demo_catalog() -> Vec<CatalogItem> {
    let items = [
        ("pt_c1", "Guitar Pick", Rarity::Common, Some("hand")),
        ("pt_c2", "Practice Sticker", Rarity::Common, None),
        ("pt_c3", "Rosin Block", Rarity::Common, None),
        ("pt_u1", "Neon Wristband", Rarity::Uncommon, Some("hand")),
        ("pt_u2", "Studio Headphones", Rarity::Uncommon, Some("head")),
        ("pt_r1", "Silver Tuning Fork", Rarity::Rare, Some("hand")),
        ("pt_r2", "Signed Setlist", Rarity::Rare, None),
        ("pt_e1", "Golden Metronome", Rarity::Epic, Some("hand")),
        ("pt_e2", "Stage Cape", Rarity::Epic, Some("back")),
        ("pt_l1", "Maestro's Baton", Rarity::Legendary, Some("hand")),
    ];

    items
        .into_iter()
        .map(|(id, name, rarity, slot)| CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            rarity,
            equip_slot: slot.map(str::to_string),
            emoji: None,
        })
        .collect()
}
