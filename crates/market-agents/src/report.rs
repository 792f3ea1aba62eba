use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use negotiation::TechnicianSnapshot;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::agents::{CompanyReport, RepairRound};

/// An actor that ended on an error
#[derive(Debug, Clone, Serialize)]
pub struct AgentFailure {
    pub agent: String,
    pub error: String,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct MarketReport {
    pub generated_at: DateTime<Utc>,
    pub days: u32,
    pub company: Option<CompanyReport>,
    pub technicians: Vec<TechnicianSnapshot>,
    pub repair_rounds: Vec<RepairRound>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AgentFailure>,
}

impl MarketReport {
    pub fn new(days: u32) -> Self {
        Self {
            generated_at: Utc::now(),
            days,
            company: None,
            technicians: Vec::new(),
            repair_rounds: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Sum of what every technician recorded as earned
    pub fn total_earned(&self) -> u64 {
        self.technicians.iter().map(|t| t.total_earned).sum()
    }

    /// Human-readable multi-line summary
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Market run: {} days", self.days);

        for tech in &self.technicians {
            let _ = writeln!(
                out,
                "  {:<12} {:<10} worked {:>3} days, earned {:>6}, {} contracts, {} transitions",
                tech.technician.as_str(),
                tech.state.to_string(),
                tech.days_worked,
                tech.total_earned,
                tech.signed.len(),
                tech.transitions.len(),
            );
        }

        if let Some(company) = &self.company {
            let _ = writeln!(
                out,
                "  {} signed {} contracts ({} renewals), paid {} in {} payments",
                company.company,
                company.contracts_signed,
                company.renewals_accepted,
                company.total_paid,
                company.payments_made,
            );
        }

        let awarded = self
            .repair_rounds
            .iter()
            .filter(|r| r.outcome.winner.is_some())
            .count();
        let _ = writeln!(
            out,
            "  repair rounds: {} ({} awarded)",
            self.repair_rounds.len(),
            awarded
        );

        for failure in &self.failures {
            let _ = writeln!(out, "  FAILED {}: {}", failure.agent, failure.error);
        }
        out
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), "Wrote market report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_summary() {
        let report = MarketReport::new(3);
        let summary = report.summary();
        assert!(summary.starts_with("Market run: 3 days"));
        assert!(summary.contains("repair rounds: 0 (0 awarded)"));
        assert_eq!(report.total_earned(), 0);
    }

    #[test]
    fn test_failures_listed_and_serialized() {
        let mut report = MarketReport::new(1);
        report.failures.push(AgentFailure {
            agent: "bob".into(),
            error: "lifecycle: boom".into(),
        });
        assert!(report.summary().contains("FAILED bob: lifecycle: boom"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["agent"], "bob");
        assert!(json.get("company").is_some());
    }
}
