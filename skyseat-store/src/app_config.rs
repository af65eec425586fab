use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 5000 }

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GateConfig {
    /// Upper bound on waiting for the seat map. Unset means wait forever.
    pub acquire_timeout_ms: Option<u64>,
}

impl GateConfig {
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FleetConfig {
    #[serde(default = "default_flights")]
    pub flights: Vec<FlightSeed>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self { flights: default_flights() }
    }
}

/// One flight to create at startup, either with explicit seat ids or with a
/// generated cabin layout.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FlightSeed {
    pub id: String,
    #[serde(default)]
    pub seats: Vec<String>,
    #[serde(default)]
    pub layout: Option<CabinLayout>,
}

/// `rows` × `seats_per_row` cabin with ids like `1A`, `1B`, ... `12F`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CabinLayout {
    pub rows: u32,
    pub seats_per_row: u32,
}

fn default_flights() -> Vec<FlightSeed> {
    vec![FlightSeed {
        id: "vuelo_123".into(),
        seats: ["A1", "A2", "A3", "B1", "B2", "B3"]
            .into_iter()
            .map(String::from)
            .collect(),
        layout: None,
    }]
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Defaults ship in config/default.toml, but every key also has a
            // built-in fallback so the file is optional.
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `SKYSEAT__SERVER__PORT=8080`
            .add_source(
                config::Environment::with_prefix("SKYSEAT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // Hosting platforms hand out the listen port as plain `PORT`
            .set_override_option("server.port", env::var("PORT").ok())?
            .build()?;

        s.try_deserialize()
    }

    /// Parses a TOML document on its own, without files or environment.
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_falls_back_to_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.gate.acquire_timeout(), None);
        assert_eq!(config.fleet.flights, default_flights());
    }

    #[test]
    fn test_full_document() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 5001

            [gate]
            acquire_timeout_ms = 250

            [[fleet.flights]]
            id = "KT123"
            layout = { rows = 15, seats_per_row = 6 }

            [[fleet.flights]]
            id = "vuelo_123"
            seats = ["A1", "A2"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.gate.acquire_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.fleet.flights.len(), 2);
        assert_eq!(
            config.fleet.flights[0].layout,
            Some(CabinLayout { rows: 15, seats_per_row: 6 })
        );
        assert_eq!(config.fleet.flights[1].seats, vec!["A1", "A2"]);
    }

    #[test]
    fn test_bad_port_is_a_config_error() {
        assert!(Config::from_toml("[server]\nport = \"not-a-port\"").is_err());
    }
}
