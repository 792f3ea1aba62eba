//! Market bootstrap and clock driving.
//!
//! ```text
//!   spawn company ──▶ spawn technicians ──▶ wait until all hired
//!        │
//!        ▼
//!   spawn repair client ──▶ for each phase: advance clock,
//!                           wait for every live technician's ack,
//!                           pause one tick interval
//!        │
//!        ▼
//!   grace period ──▶ cancel ──▶ join actors ──▶ MarketReport
//! ```
//!
//! Technicians acknowledge a tick only after its phase is fully handled
//! (payment received, renewal answered), so the next phase never overtakes
//! a negotiation still in flight.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use negotiation::{
    AgentContext, AgentId, ClockTick, Postman, ServiceDirectory, TechnicianLifecycle, WorldClock,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agents::{Company, HiringTerms, RepairClient, TechnicianAgent, TickAck};
use crate::config::MarketConfig;
use crate::report::{AgentFailure, MarketReport};

/// Run a whole market simulation and collect its report.
pub async fn run_market(
    config: &MarketConfig,
    directory: Arc<dyn ServiceDirectory>,
) -> Result<MarketReport> {
    let postman = Postman::new().shared();
    let clock = WorldClock::new(config.start_day).shared();
    let cancel = CancellationToken::new();

    let company_id = AgentId::new(config.company.as_str());
    let company_ctx = AgentContext::join(company_id.clone(), postman.clone(), clock.clone())?;
    let company = tokio::spawn(
        Company::new(
            company_ctx,
            HiringTerms {
                term_days: config.initial_term_days,
                salary: config.starting_salary,
            },
        )
        .run(cancel.clone()),
    );

    let (ack_tx, mut ack_rx) = mpsc::unbounded_channel();
    let (hired_tx, mut hired_rx) = mpsc::unbounded_channel();
    let mut technicians = Vec::with_capacity(config.technicians.len());
    for spec in &config.technicians {
        let id = AgentId::new(spec.name.as_str());
        let ctx = AgentContext::join(id.clone(), postman.clone(), clock.clone())?;
        let lifecycle = TechnicianLifecycle::new(id.clone(), company_id.clone(), config.renewal);
        let agent = TechnicianAgent::new(ctx, spec, lifecycle, directory.clone(), ack_tx.clone());
        let handle = tokio::spawn(agent.run(hired_tx.clone(), cancel.clone()));
        technicians.push((id, handle));
    }
    drop(hired_tx);
    drop(ack_tx);

    let hired = wait_for_hiring(&mut hired_rx, technicians.len(), config.hiring_timeout()).await;
    info!(hired, technicians = technicians.len(), "Hiring complete, starting clock");

    let client_ctx = AgentContext::join(
        AgentId::new(config.repair_client.as_str()),
        postman.clone(),
        clock.clone(),
    )?;
    let phantoms = config
        .phantom_responders
        .iter()
        .map(|name| AgentId::new(name.as_str()))
        .collect();
    let client = tokio::spawn(
        RepairClient::new(
            client_ctx,
            directory.clone(),
            phantoms,
            config.cfp(),
            config.repair_every_days,
        )
        .run(cancel.clone()),
    );

    for _ in 0..config.days.saturating_mul(2) {
        let tick = clock.advance();
        let alive = technicians.iter().filter(|(_, h)| !h.is_finished()).count();
        collect_acks(&mut ack_rx, &tick, alive, config.tick_ack_timeout()).await;
        tokio::time::sleep(config.tick_interval()).await;
    }

    tokio::time::sleep(config.shutdown_grace()).await;
    let last_day = clock.last_tick().map(|tick| tick.day);
    info!(last_day = ?last_day, "Simulation finished, stopping actors");
    cancel.cancel();

    let mut report = MarketReport::new(config.days);

    match company.await {
        Ok(Ok(company_report)) => report.company = Some(company_report),
        Ok(Err(e)) => report.failures.push(failure(&company_id, e)),
        Err(e) => report.failures.push(failure(&company_id, e)),
    }

    for (id, handle) in technicians {
        match handle.await {
            Ok(Ok(snapshot)) => report.technicians.push(snapshot),
            Ok(Err(e)) => report.failures.push(failure(&id, e)),
            Err(e) => report.failures.push(failure(&id, e)),
        }
    }

    match client.await {
        Ok(Ok(rounds)) => report.repair_rounds = rounds,
        Ok(Err(e)) => report.failures.push(failure(&config.repair_client, e)),
        Err(e) => report.failures.push(failure(&config.repair_client, e)),
    }

    Ok(report)
}

fn failure(agent: &impl std::fmt::Display, error: impl std::fmt::Display) -> AgentFailure {
    AgentFailure {
        agent: agent.to_string(),
        error: error.to_string(),
    }
}

/// Wait until `expected` technicians are hired; returns how many were
async fn wait_for_hiring(
    hired_rx: &mut mpsc::UnboundedReceiver<AgentId>,
    expected: usize,
    timeout: Duration,
) -> usize {
    let deadline = Instant::now() + timeout;
    let mut hired = 0;
    while hired < expected {
        match tokio::time::timeout_at(deadline, hired_rx.recv()).await {
            Ok(Some(id)) => {
                debug!(technician = %id, "Technician hired");
                hired += 1;
            }
            Ok(None) => break,
            Err(_) => {
                warn!(hired, expected, "Hiring timed out");
                break;
            }
        }
    }
    hired
}

/// Wait until `expected` technicians acknowledged `tick`; returns how many did
async fn collect_acks(
    ack_rx: &mut mpsc::UnboundedReceiver<TickAck>,
    tick: &ClockTick,
    expected: usize,
    timeout: Duration,
) -> usize {
    let deadline = Instant::now() + timeout;
    let mut acked = 0;
    while acked < expected {
        match tokio::time::timeout_at(deadline, ack_rx.recv()).await {
            Ok(Some(ack)) if ack.day == tick.day && ack.phase == tick.phase => acked += 1,
            Ok(Some(ack)) => {
                debug!(agent = %ack.agent, day = ack.day, phase = %ack.phase, "Stale tick ack");
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    day = tick.day,
                    phase = %tick.phase,
                    acked,
                    expected,
                    "Tick acknowledgements timed out"
                );
                break;
            }
        }
    }
    acked
}
