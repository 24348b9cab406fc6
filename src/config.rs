use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

const API_KEY_VARIABLES: [&str; 3] = ["GOOGLE_API_KEY", "GEMINI_API_KEY", "NANO_BANANA_API_KEY"];
const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
const DEFAULT_VISION_MODEL: &str = "gemini-1.5-pro";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_WORKERS: usize = 50;

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingApiKey,
    Invalid { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(
                f,
                "no API key found, set one of {} in the environment",
                API_KEY_VARIABLES.join(", ")
            ),
            Self::Invalid { name, value } => write!(f, "invalid value for {name}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    pub image_model: String,
    pub vision_model: String,
    pub base_url: String,
    pub user_agent: Option<String>,
    pub image_generation: bool,
    pub address: SocketAddr,
    pub workers: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let api_key = API_KEY_VARIABLES
            .iter()
            .find_map(|name| var(name))
            .ok_or(ConfigError::MissingApiKey)?;

        let host = parse(var("HOST"), "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = parse(var("PORT"), "PORT", DEFAULT_PORT)?;
        let workers = parse(var("WORKERS"), "WORKERS", DEFAULT_WORKERS)?;
        let image_generation = parse(var("IMAGE_GENERATION"), "IMAGE_GENERATION", true)?;

        if workers == 0 {
            return Err(ConfigError::Invalid { name: "WORKERS", value: "0".into() });
        }

        Ok(Self {
            api_key,
            image_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.into()),
            vision_model: var("VISION_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.into()),
            base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            user_agent: var("USER_AGENT"),
            image_generation,
            address: SocketAddr::new(host, port),
            workers,
        })
    }
}

fn parse<T: FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
