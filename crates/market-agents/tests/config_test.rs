use std::io::Write;

use market_agents::MarketConfig;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_market_from_toml_file() {
    let file = config_file(
        r#"
        company = "acme"
        days = 9
        repair_every_days = 3
        phantom_responders = []

        [[technicians]]
        name = "erin"
        skill = "glazing"
        bid = 30

        [[technicians]]
        name = "frank"
        skill = "roofing"
        bid = 35
        "#,
    );

    let config = MarketConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.company, "acme");
    assert_eq!(config.days, 9);
    assert_eq!(config.repair_every_days, 3);
    assert!(config.phantom_responders.is_empty());

    let names: Vec<_> = config.technicians.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["erin", "frank"]);
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = MarketConfig::load(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("absent.toml"));
}

#[test]
fn malformed_toml_is_rejected() {
    let file = config_file("days = \"many\"\n");
    let err = MarketConfig::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().starts_with("Failed to parse config"));
}

#[test]
fn loaded_file_is_validated() {
    let file = config_file(
        r#"
        [[technicians]]
        name = "twin"
        skill = "a"
        bid = 1

        [[technicians]]
        name = "twin"
        skill = "b"
        bid = 2
        "#,
    );
    let err = MarketConfig::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("used twice"));
}
