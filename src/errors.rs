use thiserror::Error;

/// Timecode encoding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("Unsupported timecode byte width: {0} (expected 4 or 8)")]
    UnsupportedWidth(usize),
    #[error("Unsupported timecode format: {0}")]
    UnsupportedTimecodeFormat(String),
    #[error("Frame number {frame_number} does not fit in {byte_width} bytes")]
    FrameNumberOverflow { frame_number: i64, byte_width: usize },
}

/// Post-recording trim failures
///
/// Whatever the variant, the original container is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrimError {
    #[error("Not a movie container: {0}")]
    NotAMovieContainer(String),
    #[error("Failed to read container: {0}")]
    Read(String),
    #[error("Failed to copy time range: {0}")]
    Copy(String),
    #[error("Failed to write movie header: {0}")]
    HeaderWrite(String),
}

/// Configuration load/save/validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Recording session failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Recording session is stopped")]
    Stopped,
    #[error("Writer failed: {0}")]
    Writer(String),
    #[error("Video worker panicked")]
    WorkerPanicked,
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),
    #[error("Writer dropped the finalize completion")]
    FinalizeDropped,
    #[error("Trim worker exited without a result")]
    TrimAborted,
    #[error("Blocking wait called from inside an async runtime; await `finished` instead")]
    BlockingInRuntime,
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Trim(#[from] TrimError),
}
