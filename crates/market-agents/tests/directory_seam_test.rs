//! Market runs against a mocked service directory.

use std::sync::Arc;

use market_agents::{run_market, MarketConfig, TechnicianSpec};
use mockall::mock;
use negotiation::{
    AgentId, DirectoryError, FailureCause, RaisePolicy, ServiceDescription, ServiceDirectory,
    TECH_REPAIRS,
};

mock! {
    pub Directory {}

    impl ServiceDirectory for Directory {
        fn register(&self, agent: &AgentId, service: ServiceDescription) -> Result<(), DirectoryError>;
        fn deregister(&self, agent: &AgentId) -> Result<(), DirectoryError>;
        fn search(&self, service_type: &str) -> Vec<AgentId>;
    }
}

fn market(days: u32, repair_every_days: u32) -> MarketConfig {
    MarketConfig {
        company: "acme".into(),
        repair_client: "landlord".into(),
        technicians: ["alice", "bob", "carol"]
            .into_iter()
            .map(|name| TechnicianSpec {
                name: name.into(),
                skill: "general".into(),
                bid: 10,
            })
            .collect(),
        days,
        start_day: 0,
        tick_ms: 10,
        tick_ack_timeout_ms: 1_000,
        hiring_timeout_ms: 1_000,
        initial_term_days: 5,
        starting_salary: 50,
        renewal: RaisePolicy::default(),
        repair_every_days,
        cfp_response_timeout_ms: 100,
        cfp_inform_timeout_ms: 100,
        phantom_responders: vec!["ghost".into()],
        shutdown_grace_ms: 50,
    }
}

#[tokio::test(start_paused = true)]
async fn technicians_register_and_deregister_once() {
    let mut directory = MockDirectory::new();
    directory
        .expect_register()
        .withf(|_, service| service.service_type == TECH_REPAIRS && service.name == "general")
        .times(3)
        .returning(|_, _| Ok(()));
    directory
        .expect_deregister()
        .times(3)
        .returning(|_| Ok(()));
    // Nobody is listed, so rounds only reach the phantom
    directory
        .expect_search()
        .withf(|service_type| service_type == TECH_REPAIRS)
        .times(2)
        .returning(|_| Vec::new());

    let report = run_market(&market(3, 2), Arc::new(directory)).await.unwrap();

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.repair_rounds.len(), 2);
    for round in &report.repair_rounds {
        assert!(round.outcome.winner.is_none());
        assert!(round.result.is_none());
        assert_eq!(round.outcome.failures.len(), 1);
        assert_eq!(round.outcome.failures[0].cause, FailureCause::TargetAbsent);
    }
}

#[tokio::test(start_paused = true)]
async fn registration_failure_stops_only_that_technician() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let mut directory = MockDirectory::new();
    directory
        .expect_register()
        .times(3)
        .returning(|agent, _| {
            if agent.as_str() == "bob" {
                Err(DirectoryError::AlreadyRegistered(agent.clone()))
            } else {
                Ok(())
            }
        });
    directory
        .expect_deregister()
        .withf(|agent| agent.as_str() != "bob")
        .times(2)
        .returning(|_| Ok(()));
    directory.expect_search().never();

    let report = run_market(&market(2, 0), Arc::new(directory)).await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].agent, "bob");
    assert!(report.failures[0].error.contains("already registered"));

    let survivors: Vec<_> = report
        .technicians
        .iter()
        .map(|t| t.technician.as_str())
        .collect();
    assert_eq!(survivors, vec!["alice", "carol"]);
    for tech in &report.technicians {
        assert_eq!(tech.days_worked, 2);
        assert_eq!(tech.total_earned, 100);
    }
}
