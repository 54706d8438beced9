//! End-to-end: TOML run config + CSV partitions on disk, through the
//! gateway and engine, down to the summarized result.

use std::path::Path;

use chrono::NaiveDate;

use fieldtally_cli::config::CliConfig;
use fieldtally_cli::data::{CsvDirectory, CsvGateway};
use fieldtally_engine::orchestrate::{run_estates, CancelFlag, EstateUnit};

const CONFIG: &str = r#"
name = "Close of May"

[roles.tags]
P1 = "creator"
P2 = "verifier_primary"
P5 = "verifier_secondary"

[comparison]
fields = ["ripe", "unripe", "loose_fruit"]

[status_filter]
window_start = "2025-05-01"
window_end = "2025-05-31"
required_status = "704"

[[estates]]
id = "EST01"
name = "North Estate"
status_filter = true

[[estates]]
id = "EST02"
name = "South Estate"

[data]
dir = "data"
employees = "employees.csv"

[data.columns]
record_id = "SCANID"
employee_id = "EMPID"
tag = "RECORDTYPE"
transaction_number = "TRANSNO"
date = "TRANSDATE"
status = "TRANSSTATUS"
field_id = "FIELDNO"
division_id = "DIVISION"

[data.measurements]
ripe = "RIPE_BCH"
unripe = "UNRIPE_BCH"
loose_fruit = "LOOSE_FRUIT"

[data.divisions]
D01 = "Division 1"
"#;

const MAY_CSV: &str = "\
SCANID,EMPID,RECORDTYPE,TRANSNO,TRANSDATE,TRANSSTATUS,FIELDNO,DIVISION,RIPE_BCH,UNRIPE_BCH,LOOSE_FRUIT
1,E1,P1,T001,2025-05-10,700,F01,D01,10,2,5
2,E2,P2,T001,2025-05-10,704,F01,D01,10,2,5
3,E1,P1,T002,2025-05-12,700,F01,D01,7,1,2
4,E1,P1,T003,2025-05-14,700,F02,D01,9,0,1
5,E2,P2,T003,2025-05-14,700,F02,D01,9,0,1
";

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn write_tree(root: &Path) -> CliConfig {
    let config_path = root.join("harvest.toml");
    std::fs::write(&config_path, CONFIG).unwrap();
    std::fs::write(root.join("employees.csv"), "id,name\nE1,Ana Clerk\nE2,Budi Checker\n").unwrap();
    std::fs::create_dir_all(root.join("data/EST01")).unwrap();
    std::fs::write(root.join("data/EST01/2025-05.csv"), MAY_CSV).unwrap();
    // EST02 has no directory at all: its connection test fails.

    let mut config = CliConfig::from_toml(CONFIG).unwrap();
    config.resolve_paths(&config_path);
    config
}

#[test]
fn full_run_from_files() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_tree(tmp.path());

    let directory = CsvDirectory::load(config.data.employees.as_ref().unwrap()).unwrap();
    let gateways: Vec<CsvGateway> = config
        .engine
        .estates
        .iter()
        .map(|estate| CsvGateway::new(&config.data, &estate.id))
        .collect();
    let units: Vec<EstateUnit<'_>> = config
        .engine
        .estates
        .iter()
        .zip(gateways.iter())
        .map(|(estate, gateway)| EstateUnit { estate, gateway })
        .collect();

    let result = run_estates(
        &units,
        &config.engine,
        &directory,
        d("2025-05-01"),
        d("2025-05-31"),
        &CancelFlag::new(),
    )
    .unwrap();

    // EST02 skipped, EST01 reconciled.
    assert_eq!(result.estates.len(), 1);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].estate_id, "EST02");

    let estate = &result.estates[0];
    assert!(estate.status_filter_active);
    assert_eq!(estate.divisions.len(), 1);

    let division = &estate.divisions[0];
    assert_eq!(division.division_name, "Division 1");
    let e1 = &division.employees["E1"];
    assert_eq!(e1.name, "Ana Clerk");
    assert_eq!(e1.created_count, 3);
    // T001's verifier carries status 704 and counts; T003's does not.
    assert_eq!(e1.verified_count, 1);
    assert_eq!(e1.difference_count, 0);

    // The result serializes as the stable read-only contract.
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["config_name"], "Close of May");
    assert_eq!(value["estates"][0]["periods"][0], "2025-05");
}
