use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the SummarizeIt server.
#[derive(Debug)]
pub struct Config {
    /// Hugging Face Hub identifier of the sequence-to-sequence model.
    pub model_id: String,
    /// Hub revision (branch or commit) to fetch model files from.
    pub model_revision: String,
    /// Device the model runs on.
    pub device: DevicePreference,
    /// Numeric precision used for model weights and activations.
    pub precision: PrecisionPreference,
    /// Model input window in words; inputs longer than this are chunked.
    pub input_window: usize,
    /// Beam width used during generation.
    pub num_beams: usize,
    /// Maximum number of generation calls allowed to run at once.
    pub max_concurrent: usize,
    /// CORS origin allow-list; `None` means any origin is accepted.
    pub allowed_origins: Option<Vec<String>>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Compute device selection for model inference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DevicePreference {
    /// Use CUDA when available, otherwise fall back to the CPU.
    Auto,
    /// Force CPU inference.
    Cpu,
    /// Require a CUDA device.
    Cuda,
}

/// Numeric precision selection for model inference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrecisionPreference {
    /// Half precision on CUDA, full precision on CPU.
    Auto,
    /// Always run in 32-bit floats.
    Full,
    /// Always run in 16-bit floats.
    Half,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            model_id: load_env_or("SUMMARIZEIT_MODEL_ID", "t5-small"),
            model_revision: load_env_or("SUMMARIZEIT_MODEL_REVISION", "main"),
            device: parse_env("SUMMARIZEIT_DEVICE", DevicePreference::Auto)?,
            precision: parse_env("SUMMARIZEIT_PRECISION", PrecisionPreference::Auto)?,
            input_window: parse_env("SUMMARIZEIT_INPUT_WINDOW", 1024)?,
            num_beams: parse_env("SUMMARIZEIT_NUM_BEAMS", 4)?,
            max_concurrent: parse_env("SUMMARIZEIT_MAX_CONCURRENT", 1)?,
            allowed_origins: load_env_optional("SUMMARIZEIT_ALLOWED_ORIGINS")
                .map(parse_origin_list)
                .filter(|origins| !origins.is_empty()),
            server_port: load_env_optional("SUMMARIZEIT_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SUMMARIZEIT_PORT".into()))
                })
                .transpose()?,
        };
        if config.input_window == 0 {
            return Err(ConfigError::InvalidValue("SUMMARIZEIT_INPUT_WINDOW".into()));
        }
        if config.num_beams == 0 {
            return Err(ConfigError::InvalidValue("SUMMARIZEIT_NUM_BEAMS".into()));
        }
        if config.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue("SUMMARIZEIT_MAX_CONCURRENT".into()));
        }
        Ok(config)
    }
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn parse_origin_list(value: String) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

impl std::str::FromStr for DevicePreference {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for PrecisionPreference {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "full" | "f32" => Ok(Self::Full),
            "half" | "f16" => Ok(Self::Half),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        model = %config.model_id,
        device = ?config.device,
        precision = ?config.precision,
        input_window = config.input_window,
        num_beams = config.num_beams,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
