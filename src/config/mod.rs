use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub visitor: VisitorConfig,
    pub geo: GeoConfig,
    #[serde(default)]
    pub forward: Option<ForwardConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Directory containing the built site pages
    /// If None, serves the embedded pages
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorConfig {
    /// Log visitors at all
    pub enabled: bool,
    /// Look up geolocation for each visitor
    pub enrichment: bool,
    /// Echo the resolved IP/country/city back as x-debug-* response headers
    pub debug_headers: bool,
    /// Path prefixes the middleware ignores (assets, favicon, API routes)
    pub excluded_paths: Vec<String>,
}

impl VisitorConfig {
    pub fn default_excluded_paths() -> Vec<String> {
        ["/api", "/_next/static", "/_next/image", "/favicon.ico"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enrichment: true,
            debug_headers: false,
            excluded_paths: Self::default_excluded_paths(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoProvider {
    #[serde(rename = "ip-api")]
    IpApi,
    #[serde(rename = "maxmind")]
    MaxMind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    pub provider: GeoProvider,
    /// Base URL of the JSON lookup endpoint; the IP is appended as a path segment
    pub api_url: String,
    pub user_agent: String,
    /// Upper bound on a single lookup
    #[serde(default = "GeoConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Per-IP result cache lifetime; 0 disables caching
    #[serde(default)]
    pub cache_ttl_secs: u64,
    #[serde(default = "GeoConfig::default_cache_max_entries")]
    pub cache_max_entries: u64,
    #[serde(default)]
    pub city_db_path: Option<String>,
    #[serde(default)]
    pub asn_db_path: Option<String>,
}

impl GeoConfig {
    const fn default_cache_max_entries() -> u64 {
        10_000
    }

    const fn default_timeout_secs() -> u64 {
        10
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            provider: GeoProvider::IpApi,
            api_url: "http://ip-api.com/json".to_string(),
            user_agent: concat!("visitor-log-geolocation/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: Self::default_timeout_secs(),
            cache_ttl_secs: 0,
            cache_max_entries: Self::default_cache_max_entries(),
            city_db_path: None,
            asn_db_path: None,
        }
    }
}

/// Internal analytics endpoint that receives a copy of every record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardConfig {
    pub endpoint: String,
    pub secret: String,
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_path_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse an optional numeric setting; a present but malformed value is an error
fn parse_u64(name: &str, value: Option<String>, default: u64) -> anyhow::Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{name} must be a non-negative whole number, got '{v}'")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("SITE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("SITE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SITE_PORT must be a valid port number")?;

        let static_dir = std::env::var("SITE_STATIC_DIR").ok();

        let excluded_paths = std::env::var("VISITOR_EXCLUDE_PATHS")
            .map(|v| parse_path_list(&v))
            .unwrap_or_else(|_| VisitorConfig::default_excluded_paths());

        let visitor = VisitorConfig {
            enabled: env_bool("VISITOR_LOG_ENABLED", true),
            enrichment: env_bool("VISITOR_ENRICHMENT", true),
            debug_headers: env_bool("VISITOR_DEBUG_HEADERS", false),
            excluded_paths,
        };

        let defaults = GeoConfig::default();

        let provider = match std::env::var("GEO_PROVIDER")
            .unwrap_or_else(|_| "ip-api".to_string())
            .to_lowercase()
            .as_str()
        {
            "ip-api" | "ipapi" => GeoProvider::IpApi,
            "maxmind" => GeoProvider::MaxMind,
            other => {
                tracing::warn!(
                    "Unknown GEO_PROVIDER '{other}', falling back to 'ip-api'. Supported values: ip-api, maxmind"
                );
                GeoProvider::IpApi
            }
        };

        let timeout_secs = parse_u64(
            "GEO_TIMEOUT_SECS",
            std::env::var("GEO_TIMEOUT_SECS").ok(),
            defaults.timeout_secs,
        )?;
        let cache_ttl_secs = parse_u64(
            "GEO_CACHE_TTL_SECS",
            std::env::var("GEO_CACHE_TTL_SECS").ok(),
            defaults.cache_ttl_secs,
        )?;
        let cache_max_entries = parse_u64(
            "GEO_CACHE_MAX_ENTRIES",
            std::env::var("GEO_CACHE_MAX_ENTRIES").ok(),
            defaults.cache_max_entries,
        )?;

        let city_db_path = std::env::var("GEOIP_CITY_DB_PATH").ok();
        let asn_db_path = std::env::var("GEOIP_ASN_DB_PATH").ok();

        if provider == GeoProvider::MaxMind && city_db_path.is_none() && asn_db_path.is_none() {
            anyhow::bail!(
                "GEOIP_CITY_DB_PATH or GEOIP_ASN_DB_PATH must be set when GEO_PROVIDER=maxmind"
            );
        }

        let geo = GeoConfig {
            provider,
            api_url: std::env::var("GEO_API_URL").unwrap_or(defaults.api_url),
            user_agent: std::env::var("GEO_USER_AGENT").unwrap_or(defaults.user_agent),
            timeout_secs,
            cache_ttl_secs,
            cache_max_entries,
            city_db_path,
            asn_db_path,
        };

        let forward = match std::env::var("ANALYTICS_ENDPOINT") {
            Ok(endpoint) => {
                let secret = std::env::var("ANALYTICS_SECRET")
                    .context("ANALYTICS_SECRET must be set when ANALYTICS_ENDPOINT is set")?;
                Some(ForwardConfig { endpoint, secret })
            }
            Err(_) => None,
        };

        Ok(Config {
            server: ServerConfig { host, port },
            site: SiteConfig { static_dir },
            visitor,
            geo,
            forward,
        })
    }
}
