use anyhow::{bail, Context, Result};
use negotiation::{AgentId, CfpConfig, Day, RaisePolicy};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// One technician taking part in the market.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TechnicianSpec {
    pub name: String,
    /// Repair skill advertised in the directory
    pub skill: String,
    /// Bid offered when answering a repair call for proposals
    pub bid: i64,
}

/// Top-level market configuration.
///
/// Precedence, lowest first: built-in defaults, `MARKET_*` environment
/// variables, the TOML file, command-line flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Name of the single employer
    pub company: String,
    /// Name of the agent issuing repair calls
    pub repair_client: String,
    pub technicians: Vec<TechnicianSpec>,
    /// Number of simulated days
    pub days: u32,
    /// First simulated day
    pub start_day: Day,
    /// Wall-clock pause between two clock ticks
    pub tick_ms: u64,
    /// How long to wait for every technician to finish a tick
    pub tick_ack_timeout_ms: u64,
    /// How long to wait for all technicians to be hired before the clock starts
    pub hiring_timeout_ms: u64,
    /// Term of the contract granted on subscribe
    pub initial_term_days: u32,
    pub starting_salary: u64,
    pub renewal: RaisePolicy,
    /// Issue a repair call every N days (0 disables repairs)
    pub repair_every_days: u32,
    pub cfp_response_timeout_ms: u64,
    pub cfp_inform_timeout_ms: u64,
    /// Responder names that are never registered anywhere
    pub phantom_responders: Vec<String>,
    /// Pause after the last tick before actors are stopped
    pub shutdown_grace_ms: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            company: std::env::var("MARKET_COMPANY").unwrap_or_else(|_| "company".into()),
            repair_client: std::env::var("MARKET_REPAIR_CLIENT")
                .unwrap_or_else(|_| "repair-client".into()),
            technicians: vec![
                TechnicianSpec {
                    name: "alice".into(),
                    skill: "plumbing".into(),
                    bid: 40,
                },
                TechnicianSpec {
                    name: "bob".into(),
                    skill: "wiring".into(),
                    bid: 55,
                },
                TechnicianSpec {
                    name: "carol".into(),
                    skill: "heating".into(),
                    bid: 55,
                },
            ],
            days: env_parse("MARKET_DAYS").unwrap_or(14),
            start_day: 0,
            tick_ms: env_parse("MARKET_TICK_MS").unwrap_or(100),
            tick_ack_timeout_ms: 2_000,
            hiring_timeout_ms: 5_000,
            initial_term_days: env_parse("MARKET_INITIAL_TERM_DAYS").unwrap_or(5),
            starting_salary: env_parse("MARKET_STARTING_SALARY").unwrap_or(100),
            renewal: RaisePolicy::default(),
            repair_every_days: env_parse("MARKET_REPAIR_EVERY_DAYS").unwrap_or(2),
            cfp_response_timeout_ms: env_parse("CFP_RESPONSE_TIMEOUT_MS").unwrap_or(500),
            cfp_inform_timeout_ms: env_parse("CFP_INFORM_TIMEOUT_MS").unwrap_or(500),
            phantom_responders: vec!["ghost-technician".into()],
            shutdown_grace_ms: 200,
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok()?.trim().parse().ok()
}

impl MarketConfig {
    /// Load from `path` if given, else use defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded values.
    pub fn with_overrides(mut self, days: Option<u32>, tick_ms: Option<u64>) -> Result<Self> {
        if let Some(days) = days {
            self.days = days;
        }
        if let Some(tick_ms) = tick_ms {
            self.tick_ms = tick_ms;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.days == 0 {
            bail!("days must be at least 1");
        }
        if self.initial_term_days == 0 {
            bail!("initial_term_days must be at least 1");
        }
        if self.technicians.is_empty() {
            bail!("at least one technician is required");
        }

        let mut names = HashSet::new();
        for name in self
            .technicians
            .iter()
            .map(|t| t.name.as_str())
            .chain([self.company.as_str(), self.repair_client.as_str()])
        {
            if name.is_empty() || name.contains(';') || name.contains('=') {
                bail!("agent name {name:?} is empty or contains ';' or '='");
            }
            if AgentId::new(name).is_platform() {
                bail!("agent name {name:?} is reserved for the platform");
            }
            if !names.insert(name) {
                bail!("agent name {name:?} is used twice");
            }
        }
        for phantom in &self.phantom_responders {
            if names.contains(phantom.as_str()) {
                bail!("phantom responder {phantom:?} collides with a real agent");
            }
        }
        Ok(())
    }

    pub fn cfp(&self) -> CfpConfig {
        CfpConfig {
            response_timeout: Duration::from_millis(self.cfp_response_timeout_ms),
            inform_timeout: Duration::from_millis(self.cfp_inform_timeout_ms),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn tick_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.tick_ack_timeout_ms)
    }

    pub fn hiring_timeout(&self) -> Duration {
        Duration::from_millis(self.hiring_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MarketConfig::default();
        config.validate().unwrap();
        assert!(!config.technicians.is_empty());
        assert_eq!(config.renewal, RaisePolicy::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: MarketConfig = toml::from_str(
            r#"
            days = 3

            [[technicians]]
            name = "dave"
            skill = "roofing"
            bid = 12

            [renewal]
            raise_percent = 20
            term_days = 4
            lead_days = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.days, 3);
        assert_eq!(config.technicians.len(), 1);
        assert_eq!(config.technicians[0].bid, 12);
        assert_eq!(config.renewal.raise_percent, 20);
        assert_eq!(config.shutdown_grace_ms, MarketConfig::default().shutdown_grace_ms);
    }

    #[test]
    fn test_rejects_reserved_and_duplicate_names() {
        let mut config = MarketConfig::default();
        config.technicians[0].name = "a;b".into();
        assert!(config.validate().is_err());

        let mut config = MarketConfig::default();
        config.technicians[1].name = config.company.clone();
        assert!(config.validate().is_err());

        let mut config = MarketConfig::default();
        config.phantom_responders = vec![config.technicians[0].name.clone()];
        assert!(config.validate().is_err());

        let mut config = MarketConfig::default();
        config.technicians[2].name = AgentId::platform().to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reserved for the platform"));
    }

    #[test]
    fn test_overrides() {
        let config = MarketConfig::default()
            .with_overrides(Some(2), Some(7))
            .unwrap();
        assert_eq!(config.days, 2);
        assert_eq!(config.tick_interval(), Duration::from_millis(7));

        assert!(MarketConfig::default().with_overrides(Some(0), None).is_err());
    }
}
