// Application configuration loaded from the environment

use std::time::Duration;

/// Configuration errors raised while reading the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Which external geocoding service resolves addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocoderProvider {
    Google { api_key: String },
    Nominatim { base_url: String, user_agent: String },
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub geocoder: GeocoderProvider,
    pub geocoder_timeout: Duration,
    /// Search radius used when a beneficiary does not give one
    pub default_radius_km: f64,
    /// `None` means any origin is allowed
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parsed("PORT", 8080u16)?;

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            access_ttl_secs: parsed("ACCESS_TOKEN_TTL_SECS", 900i64)?,
            refresh_ttl_secs: parsed("REFRESH_TOKEN_TTL_SECS", 604_800i64)?,
        };

        let geocoder = match std::env::var("GEOCODER")
            .unwrap_or_else(|_| "nominatim".to_string())
            .to_lowercase()
            .as_str()
        {
            "google" => GeocoderProvider::Google {
                api_key: required("GOOGLE_API_KEY")?,
            },
            "nominatim" => GeocoderProvider::Nominatim {
                base_url: std::env::var("NOMINATIM_URL")
                    .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
                user_agent: std::env::var("NOMINATIM_USER_AGENT")
                    .unwrap_or_else(|_| "volunteer-hub/0.1".to_string()),
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "GEOCODER",
                    value: other.to_string(),
                })
            }
        };

        let geocoder_timeout = Duration::from_secs(parsed("GEOCODER_TIMEOUT_SECS", 5u64)?);

        let default_radius_km = parsed("DEFAULT_RADIUS_KM", 10.0f64)?;
        if !(default_radius_km.is_finite() && default_radius_km > 0.0) {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_RADIUS_KM",
                value: default_radius_km.to_string(),
            });
        }

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .and_then(|raw| parse_origins(&raw));

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            geocoder,
            geocoder_timeout,
            default_radius_km,
            cors_allowed_origins,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Splits a comma separated origin list. `*` or an empty list means "any origin".
fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        None
    } else {
        Some(origins)
    }
}
