use crate::errors::SortraceError;
use crate::input::{Distribution, SizePolicy};
use crate::race::RaceSettings;
use crate::runtime::FileSystem;
use crate::sort::RecordingPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub distribution: Option<Distribution>,
    pub size: Option<SizePolicy>,
    pub seed: Option<u64>,
    pub quicksort_delay_ms: Option<u64>,
    pub mergesort_delay_ms: Option<u64>,
    pub log_path: Option<PathBuf>,
    pub record_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub input: InputConfig,
    pub playback: PlaybackConfig,
    pub recording: RecordingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputConfig {
    pub distribution: Distribution,
    pub size: SizePolicy,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackConfig {
    pub quicksort_delay_ms: u64,
    pub mergesort_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingConfig {
    pub merge_snapshot_interval: u32,
    pub periodic_snapshot_max_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    pub log_path: Option<PathBuf>,
    pub record_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let policy = RecordingPolicy::default();
        Self {
            input: InputConfig {
                distribution: Distribution::Random,
                size: SizePolicy::Low,
                seed: None,
            },
            playback: PlaybackConfig {
                quicksort_delay_ms: 10,
                mergesort_delay_ms: 20,
            },
            recording: RecordingConfig {
                merge_snapshot_interval: policy.merge_snapshot_interval,
                periodic_snapshot_max_len: policy.periodic_snapshot_max_len,
            },
            output: OutputConfig {
                log_path: None,
                record_path: None,
            },
        }
    }
}

impl AppConfig {
    pub fn race_settings(&self) -> RaceSettings {
        RaceSettings {
            quicksort_delay: Duration::from_millis(self.playback.quicksort_delay_ms),
            mergesort_delay: Duration::from_millis(self.playback.mergesort_delay_ms),
            policy: RecordingPolicy {
                merge_snapshot_interval: self.recording.merge_snapshot_interval,
                periodic_snapshot_max_len: self.recording.periodic_snapshot_max_len,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    input: Option<PartialInputConfig>,
    playback: Option<PartialPlaybackConfig>,
    recording: Option<PartialRecordingConfig>,
    output: Option<PartialOutputConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialInputConfig {
    distribution: Option<Distribution>,
    size: Option<SizePolicy>,
    seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialPlaybackConfig {
    quicksort_delay_ms: Option<u64>,
    mergesort_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialRecordingConfig {
    merge_snapshot_interval: Option<u32>,
    periodic_snapshot_max_len: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    log_path: Option<PathBuf>,
    record_path: Option<PathBuf>,
}

pub fn load_config(
    overrides: &CliOverrides,
    fs: &dyn FileSystem,
) -> Result<AppConfig, SortraceError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| SortraceError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn render_default_config() -> Result<String, SortraceError> {
    toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| SortraceError::ConfigParse(e.to_string()))
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(input) = partial.input {
        if let Some(value) = input.distribution {
            cfg.input.distribution = value;
        }
        if let Some(value) = input.size {
            cfg.input.size = value;
        }
        if input.seed.is_some() {
            cfg.input.seed = input.seed;
        }
    }

    if let Some(playback) = partial.playback {
        if let Some(value) = playback.quicksort_delay_ms {
            cfg.playback.quicksort_delay_ms = value;
        }
        if let Some(value) = playback.mergesort_delay_ms {
            cfg.playback.mergesort_delay_ms = value;
        }
    }

    if let Some(recording) = partial.recording {
        if let Some(value) = recording.merge_snapshot_interval {
            cfg.recording.merge_snapshot_interval = value;
        }
        if let Some(value) = recording.periodic_snapshot_max_len {
            cfg.recording.periodic_snapshot_max_len = value;
        }
    }

    if let Some(output) = partial.output {
        if output.log_path.is_some() {
            cfg.output.log_path = output.log_path;
        }
        if output.record_path.is_some() {
            cfg.output.record_path = output.record_path;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(distribution) = overrides.distribution {
        cfg.input.distribution = distribution;
    }
    if let Some(size) = overrides.size {
        cfg.input.size = size;
    }
    if overrides.seed.is_some() {
        cfg.input.seed = overrides.seed;
    }
    if let Some(value) = overrides.quicksort_delay_ms {
        cfg.playback.quicksort_delay_ms = value;
    }
    if let Some(value) = overrides.mergesort_delay_ms {
        cfg.playback.mergesort_delay_ms = value;
    }
    if overrides.log_path.is_some() {
        cfg.output.log_path = overrides.log_path.clone();
    }
    if overrides.record_path.is_some() {
        cfg.output.record_path = overrides.record_path.clone();
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), SortraceError> {
    if cfg.recording.merge_snapshot_interval == 0 {
        return Err(SortraceError::InvalidConfig(
            "recording.merge_snapshot_interval must be greater than zero".to_string(),
        ));
    }

    // Beyond a minute per step the race is indistinguishable from a hang.
    const MAX_STEP_DELAY_MS: u64 = 60_000;
    for (key, value) in [
        ("playback.quicksort_delay_ms", cfg.playback.quicksort_delay_ms),
        ("playback.mergesort_delay_ms", cfg.playback.mergesort_delay_ms),
    ] {
        if value > MAX_STEP_DELAY_MS {
            return Err(SortraceError::InvalidConfig(format!(
                "{key} must be at most {MAX_STEP_DELAY_MS}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_config, render_default_config, AppConfig, CliOverrides};
    use crate::errors::SortraceError;
    use crate::input::{Distribution, SizePolicy};
    use crate::runtime::FakeFileSystem;
    use std::path::PathBuf;
    use std::time::Duration;

    fn overrides_for(path: &str) -> CliOverrides {
        CliOverrides {
            config_path: Some(PathBuf::from(path)),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn missing_sections_keep_defaults() {
        let fs = FakeFileSystem::with_file("/cfg.toml", "[input]\nsize = \"high\"\n");
        let cfg = load_config(&overrides_for("/cfg.toml"), &fs).expect("config");

        assert_eq!(cfg.input.size, SizePolicy::High);
        assert_eq!(cfg.input.distribution, Distribution::Random);
        assert_eq!(cfg.playback, AppConfig::default().playback);
        assert_eq!(cfg.recording.merge_snapshot_interval, 5);
    }

    #[test]
    fn cli_overrides_win_over_file_values() {
        let fs = FakeFileSystem::with_file(
            "/cfg.toml",
            "[input]\ndistribution = \"almostSorted\"\nseed = 3\n\n[playback]\nquicksort_delay_ms = 1\n",
        );
        let mut overrides = overrides_for("/cfg.toml");
        overrides.distribution = Some(Distribution::Reversed);
        overrides.seed = Some(9);
        overrides.mergesort_delay_ms = Some(2);

        let cfg = load_config(&overrides, &fs).expect("config");
        assert_eq!(cfg.input.distribution, Distribution::Reversed);
        assert_eq!(cfg.input.seed, Some(9));

        let settings = cfg.race_settings();
        assert_eq!(settings.quicksort_delay, Duration::from_millis(1));
        assert_eq!(settings.mergesort_delay, Duration::from_millis(2));
    }

    #[test]
    fn zero_merge_interval_is_rejected() {
        let fs = FakeFileSystem::with_file(
            "/cfg.toml",
            "[recording]\nmerge_snapshot_interval = 0\n",
        );
        let err = load_config(&overrides_for("/cfg.toml"), &fs).expect_err("invalid");
        assert!(matches!(err, SortraceError::InvalidConfig(_)));
    }

    #[test]
    fn unknown_keys_and_bad_names_fail_to_parse() {
        let fs = FakeFileSystem::with_file("/cfg.toml", "[input]\nsize = \"huge\"\n");
        let err = load_config(&overrides_for("/cfg.toml"), &fs).expect_err("parse");
        assert!(matches!(err, SortraceError::ConfigParse(_)));

        let fs = FakeFileSystem::with_file("/cfg.toml", "[playback]\nspeed = 2\n");
        let err = load_config(&overrides_for("/cfg.toml"), &fs).expect_err("parse");
        assert!(matches!(err, SortraceError::ConfigParse(_)));
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let fs = FakeFileSystem::default();
        let err = load_config(&overrides_for("/nope.toml"), &fs).expect_err("missing");
        assert!(matches!(err, SortraceError::Io(_)));
    }

    #[test]
    fn default_config_renders_and_parses_back() {
        let text = render_default_config().expect("render");
        assert!(text.contains("[playback]"));
        assert!(text.contains("quicksort_delay_ms = 10"));

        let fs = FakeFileSystem::with_file("/cfg.toml", text);
        let cfg = load_config(&overrides_for("/cfg.toml"), &fs).expect("config");
        assert_eq!(cfg, AppConfig::default());
    }
}
