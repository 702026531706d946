//! Runs the `netclear` binary against markets on disk.

use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

struct Workdir(PathBuf);

impl Workdir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("netclear-cli-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.0.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn netclear(market: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_netclear"))
        .arg(market)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

const MATCHABLE: &str = r#"{
    "nodes": [{"id": 0}, {"id": 1}, {"id": 2}, {"id": 3}],
    "links": [
        {"source": 2, "target": 0, "valuation": 5},
        {"source": 3, "target": 0, "valuation": 5},
        {"source": 3, "target": 1, "valuation": 1}
    ]
}"#;

const CONTENDED: &str = r#"{
    "nodes": [{"id": 0}, {"id": 1}, {"id": 2}, {"id": 3}],
    "links": [
        {"source": 2, "target": 0, "valuation": 5},
        {"source": 3, "target": 0, "valuation": 3}
    ]
}"#;

#[test]
fn cleared_market_exits_zero_and_prints_prices() {
    let dir = Workdir::new();
    let market = dir.file("market.json", MATCHABLE);
    let out = netclear(&market, &["--interactive"]);

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("--- Round 1 ---"));
    assert!(stdout.contains("Outcome: CLEARED"));
    assert!(stdout.contains("Seller 0: price = 0"));
    assert!(stdout.contains("Seller 1: price = 0"));
}

#[test]
fn round_ceiling_exits_two_and_still_writes_outputs() {
    let dir = Workdir::new();
    let market = dir.file("market.json", CONTENDED);
    let output = dir.path("out.json");
    let report = dir.path("report.json");
    let out = netclear(
        &market,
        &[
            "--max-rounds",
            "3",
            "--output",
            output.to_str().unwrap(),
            "--report",
            report.to_str().unwrap(),
        ],
    );

    assert_eq!(out.status.code(), Some(2));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(saved["nodes"][1]["price"], 3.0);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["state"], "STOPPED_MAX_ROUNDS");
    assert_eq!(report["rounds"], 3);
    assert_eq!(report["history"].as_array().unwrap().len(), 3);
}

#[test]
fn no_progress_exits_three() {
    let dir = Workdir::new();
    let market = dir.file(
        "market.json",
        r#"{
            "nodes": [{"id": 0}, {"id": 4}, {"id": 5}, {"id": 6}],
            "links": [
                {"source": 4, "target": 0, "valuation": 3},
                {"source": 5, "target": 0, "valuation": 2}
            ]
        }"#,
    );
    assert_eq!(netclear(&market, &[]).status.code(), Some(3));
}

#[test]
fn input_errors_exit_one() {
    let dir = Workdir::new();

    let odd = dir.file("odd.json", r#"{"nodes": [{"id": 0}, {"id": 1}, {"id": 2}]}"#);
    let out = netclear(&odd, &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8(out.stderr).unwrap().contains("NC_ERR_101"));

    let missing = dir.file(
        "missing.json",
        r#"{"nodes": [{"id": 0}, {"id": 1}], "links": [{"source": 1, "target": 0}]}"#,
    );
    let out = netclear(&missing, &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        String::from_utf8(out.stderr)
            .unwrap()
            .contains("missing 'valuation' attribute")
    );

    let out = netclear(&dir.path("absent.json"), &[]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn config_file_is_honored() {
    let dir = Workdir::new();
    let market = dir.file("market.json", CONTENDED);
    let config = dir.file("config.json", r#"{"max_rounds": 2, "price_increment": 0.5}"#);
    let output = dir.path("out.json");
    let out = netclear(
        &market,
        &[
            "--config",
            config.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ],
    );

    assert_eq!(out.status.code(), Some(2));
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(saved["nodes"][1]["price"], 1.0);
}
