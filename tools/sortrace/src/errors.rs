use thiserror::Error;

#[derive(Debug, Error)]
pub enum SortraceError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error("a race is already in progress")]
    RunInProgress,
    #[error("recording error: {0}")]
    Recording(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("playback error: {0}")]
    Playback(String),
}
