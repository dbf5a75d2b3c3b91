pub mod config;
pub mod errors;
pub mod hotkeys;
pub mod input;
pub mod logging;
pub mod playback;
pub mod race;
pub mod replay;
pub mod runtime;
pub mod snapshot;
pub mod sort;
pub mod tui;

use clap::{error::ErrorKind, Parser, ValueEnum};
use config::{load_config, render_default_config, AppConfig, CliOverrides};
use errors::SortraceError;
use hotkeys::{action_for_key, ControlPanel, PanelEffect};
use input::{generate_array, Distribution, SizePolicy};
use logging::{clear_run_logger, init_run_logger};
use playback::PlaybackReport;
use race::SortRace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use replay::recorder::RaceRecorder;
use replay::replayer::RaceRecording;
use runtime::{CrosstermKeys, KeySource, ProductionRuntime};
use snapshot::Value;
use tui::{interactive_legend, render_race, RaceView, TerminalPresenter};

#[derive(Debug, Clone, Parser)]
#[command(name = "sortrace")]
#[command(about = "Race quicksort against mergesort over the same array, step by step")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    #[arg(long, value_enum)]
    pub distribution: Option<CliDistribution>,
    #[arg(long, value_enum)]
    pub size: Option<CliSize>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub quicksort_delay_ms: Option<u64>,
    #[arg(long)]
    pub mergesort_delay_ms: Option<u64>,
    /// Write every played snapshot to a JSONL recording.
    #[arg(long)]
    pub record: Option<std::path::PathBuf>,
    /// Play a recording instead of sorting a fresh array.
    #[arg(long, conflicts_with_all = ["record", "interactive"])]
    pub replay: Option<std::path::PathBuf>,
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,
    #[arg(long, default_value_t = false)]
    pub interactive: bool,
    /// Write the default configuration to this path and exit.
    #[arg(long)]
    pub init_config: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliDistribution {
    Random,
    Reversed,
    AlmostSorted,
}

impl From<CliDistribution> for Distribution {
    fn from(value: CliDistribution) -> Self {
        match value {
            CliDistribution::Random => Distribution::Random,
            CliDistribution::Reversed => Distribution::Reversed,
            CliDistribution::AlmostSorted => Distribution::AlmostSorted,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliSize {
    Low,
    Medium,
    High,
}

impl From<CliSize> for SizePolicy {
    fn from(value: CliSize) -> Self {
        match value {
            CliSize::Low => SizePolicy::Low,
            CliSize::Medium => SizePolicy::Medium,
            CliSize::High => SizePolicy::High,
        }
    }
}

pub fn run() -> Result<i32, SortraceError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    runtime: &ProductionRuntime,
) -> Result<i32, SortraceError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(SortraceError::Cli(error.to_string())),
        },
    };

    if let Some(path) = &cli.init_config {
        runtime
            .file_system
            .write_string(path, &render_default_config()?)?;
        runtime
            .terminal
            .write_line(&format!("wrote default config to {}", path.display()))?;
        return Ok(0);
    }

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        distribution: cli.distribution.map(Into::into),
        size: cli.size.map(Into::into),
        seed: cli.seed,
        quicksort_delay_ms: cli.quicksort_delay_ms,
        mergesort_delay_ms: cli.mergesort_delay_ms,
        log_path: cli.log_path.clone(),
        record_path: cli.record.clone(),
    };
    let cfg = load_config(&overrides, runtime.file_system.as_ref())?;
    if let Some(path) = &cfg.output.log_path {
        init_run_logger(path);
    }

    let result = run_configured(runtime, &cli, &cfg);
    if cfg.output.log_path.is_some() {
        clear_run_logger();
    }
    result
}

fn run_configured(
    runtime: &ProductionRuntime,
    cli: &Cli,
    cfg: &AppConfig,
) -> Result<i32, SortraceError> {
    let race = SortRace::new(runtime.clock.clone(), cfg.race_settings());
    let mut rng = match cfg.input.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if let Some(path) = &cli.replay {
        return run_replay(runtime, &race, path);
    }
    if cli.interactive {
        return run_interactive(runtime, &race, cfg, &mut rng);
    }

    let input = generate_array(cfg.input.distribution, cfg.input.size, &mut rng);
    let presenter = TerminalPresenter::new(runtime.terminal.clone(), &input, race.state_handle());
    let report = race_once(&race, cfg, &input, &presenter)?;
    runtime
        .terminal
        .write_line(&summary_line("race complete", &report))?;
    Ok(0)
}

fn race_once(
    race: &SortRace,
    cfg: &AppConfig,
    input: &[Value],
    presenter: &TerminalPresenter,
) -> Result<PlaybackReport, SortraceError> {
    presenter.redraw()?;
    let outcome = match &cfg.output.record_path {
        Some(path) => {
            let recorder = RaceRecorder::create(
                path,
                input,
                Some((cfg.input.distribution, cfg.input.size)),
                presenter,
            )?;
            race.run(input, &recorder)?
        }
        None => race.run(input, presenter)?,
    };
    presenter.redraw()?;
    Ok(outcome.playback)
}

fn run_replay(
    runtime: &ProductionRuntime,
    race: &SortRace,
    path: &std::path::Path,
) -> Result<i32, SortraceError> {
    let recording = RaceRecording::load(path)?;
    let presenter = TerminalPresenter::new(
        runtime.terminal.clone(),
        &recording.header.input,
        race.state_handle(),
    );
    presenter.redraw()?;
    let report = race.replay(&recording.quicksort, &recording.mergesort, &presenter)?;
    presenter.redraw()?;

    if !recording.finished.is_empty() {
        let recorded = recording
            .finished
            .iter()
            .map(|done| format!("{}_ms={}", done.algorithm.as_str(), done.elapsed_ms))
            .collect::<Vec<_>>()
            .join(" ");
        runtime
            .terminal
            .write_line(&format!("recorded race: {recorded}"))?;
    }
    runtime
        .terminal
        .write_line(&summary_line("replay complete", &report))?;
    Ok(0)
}

fn run_interactive<R: Rng + ?Sized>(
    runtime: &ProductionRuntime,
    race: &SortRace,
    cfg: &AppConfig,
    rng: &mut R,
) -> Result<i32, SortraceError> {
    if !runtime.terminal.stdin_is_tty() {
        return Err(SortraceError::Cli(
            "--interactive requires an interactive terminal.".to_string(),
        ));
    }

    let _raw = RawModeGuard::enable()?;
    let mut panel = ControlPanel::new(cfg.input.distribution, cfg.input.size, rng);
    run_controls(runtime, race, cfg, &mut panel, &mut CrosstermKeys, rng)?;
    Ok(0)
}

/// What happened during one interactive session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlsReport {
    pub races: usize,
    pub refused_sorts: usize,
    pub ignored_keys: usize,
}

/// Interactive key loop; returns on `q` or when `keys` runs dry.
///
/// A race blocks this loop until both streams finish. Keys typed meanwhile
/// are applied afterwards as if the race were still running, so a queued
/// `s` is refused and queued selections leave the array alone.
pub fn run_controls<R: Rng + ?Sized>(
    runtime: &ProductionRuntime,
    race: &SortRace,
    cfg: &AppConfig,
    panel: &mut ControlPanel,
    keys: &mut dyn KeySource,
    rng: &mut R,
) -> Result<ControlsReport, SortraceError> {
    let mut report = ControlsReport::default();
    let mut view = RaceView::new(&panel.array);
    loop {
        view.state = race.state();
        view.controls = Some(interactive_legend(
            panel.distribution.label(),
            panel.size.as_str(),
        ));
        runtime.terminal.draw(&render_race(&view, 120, 30)?)?;

        let Some(key) = keys.next_key()? else {
            return Ok(report);
        };
        let Some(action) = action_for_key(key) else {
            continue;
        };

        match panel.apply(action, race.state().busy, rng) {
            PanelEffect::Quit => return Ok(report),
            PanelEffect::Regenerated => view = RaceView::new(&panel.array),
            PanelEffect::StartSort => {
                let presenter = TerminalPresenter::new(
                    runtime.terminal.clone(),
                    &panel.array,
                    race.state_handle(),
                )
                .with_controls(interactive_legend(
                    panel.distribution.label(),
                    panel.size.as_str(),
                ));
                race_once(race, cfg, &panel.array, &presenter)?;
                report.races += 1;
                let finished = presenter.view();
                view.quicksort = finished.quicksort;
                view.mergesort = finished.mergesort;

                for key in keys.pending_keys()? {
                    let Some(action) = action_for_key(key) else {
                        continue;
                    };
                    match panel.apply(action, true, rng) {
                        PanelEffect::Quit => return Ok(report),
                        PanelEffect::SortRefused => report.refused_sorts += 1,
                        _ => report.ignored_keys += 1,
                    }
                }
            }
            PanelEffect::SortRefused => report.refused_sorts += 1,
            PanelEffect::None => {}
        }
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self, SortraceError> {
        crossterm::terminal::enable_raw_mode().map_err(|e| SortraceError::Io(e.to_string()))?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

pub fn summary_line(prefix: &str, report: &PlaybackReport) -> String {
    format!(
        "{prefix}: quicksort_ms={} mergesort_ms={} quicksort_steps={} mergesort_steps={}",
        report.quicksort.elapsed_ms,
        report.mergesort.elapsed_ms,
        report.quicksort.emitted,
        report.mergesort.emitted
    )
}
