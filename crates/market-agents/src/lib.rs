//! Labor market actors
//!
//! Runs the negotiation core as a small market:
//! - a company that hires, pays nightly and accepts renewals
//! - technicians following the employment lifecycle and bidding on repairs
//! - a repair client issuing calls for proposals through the directory
//!
//! # Usage
//!
//! ```bash
//! # Defaults: three technicians, 14 days
//! market-agents
//!
//! # Custom configuration and a JSON report
//! MARKET_TICK_MS=20 market-agents --config market.toml --days 30 --report run.json
//! ```

pub mod agents;
pub mod config;
pub mod report;
pub mod simulation;

pub use config::{MarketConfig, TechnicianSpec};
pub use report::{AgentFailure, MarketReport};
pub use simulation::run_market;
