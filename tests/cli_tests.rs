//! CLI integration tests using assert_cmd.
//!
//! Every test runs the real binary. Results are read from stdout, which
//! carries nothing but the requested number.

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn primepi() -> Command {
    let mut cmd = Command::cargo_bin("primepi").unwrap();
    cmd.env_remove("PRIMEPI_THREADS")
        .env_remove("PRIMEPI_CONFIG")
        .env("RUST_LOG", "warn");
    cmd
}

// --- Help and arg validation ---

#[test]
fn help_shows_all_subcommands() {
    primepi().arg("--help").assert().success().stdout(
        predicate::str::contains("pi")
            .and(predicate::str::contains("s2"))
            .and(predicate::str::contains("phi"))
            .and(predicate::str::contains("legendre"))
            .and(predicate::str::contains("cluster"))
            .and(predicate::str::contains("--threads"))
            .and(predicate::str::contains("--alpha")),
    );
}

#[test]
fn help_cluster_shows_args() {
    primepi()
        .args(["cluster", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--workers")
                .and(predicate::str::contains("--transport"))
                .and(predicate::str::contains("--worker-timeout"))
                .and(predicate::str::contains("--checkpoint")),
        );
}

#[test]
fn missing_x_fails() {
    primepi().arg("pi").assert().failure();
}

#[test]
fn garbage_x_fails() {
    primepi()
        .args(["pi", "ten"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid expression"));
}

#[test]
fn alpha_below_one_fails() {
    primepi()
        .args(["--alpha", "0.5", "pi", "1000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("alpha"));
}

// --- Counting ---

#[test]
fn pi_of_a_million() {
    primepi()
        .args(["pi", "1000000"])
        .assert()
        .success()
        .stdout("78498\n");
}

#[test]
fn pi_accepts_expressions() {
    primepi()
        .args(["--threads", "2", "pi", "10^8"])
        .assert()
        .success()
        .stdout("5761455\n");
}

#[test]
fn pi_small_x() {
    primepi().args(["pi", "100"]).assert().success().stdout("25\n");
}

#[test]
fn legendre_agrees() {
    primepi()
        .args(["legendre", "10^6"])
        .assert()
        .success()
        .stdout("78498\n");
}

#[test]
fn phi_value() {
    // Integers <= 30 coprime to 2, 3 and 5.
    primepi().args(["phi", "30", "3"]).assert().success().stdout("8\n");
}

#[test]
fn s2_rejects_y_out_of_range() {
    primepi()
        .args(["s2", "10^9", "--y", "50000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("y must lie in"));
}

// --- Cluster ---

#[test]
fn cluster_local_matches_pi() {
    primepi()
        .args(["cluster", "10^8", "--workers", "3"])
        .assert()
        .success()
        .stdout("5761455\n");
}

#[test]
fn cluster_process_workers() {
    primepi()
        .args([
            "cluster",
            "10^8",
            "--workers",
            "2",
            "--threads-per-worker",
            "1",
            "--transport",
            "process",
        ])
        .assert()
        .success()
        .stdout("5761455\n");
}

#[test]
fn cluster_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("primepi.toml");
    let checkpoint = dir.path().join("s2.checkpoint");
    std::fs::write(
        &config,
        format!(
            "status_interval_secs = 0\n[cluster]\nworkers = 2\ncheckpoint = {:?}\n",
            checkpoint.display().to_string()
        ),
    )
    .unwrap();

    primepi()
        .arg("--config")
        .arg(&config)
        .args(["cluster", "1e7"])
        .assert()
        .success()
        .stdout("664579\n");
    assert!(checkpoint.exists());
}

#[test]
fn bad_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("primepi.toml");
    std::fs::write(&config, "[cluster]\nworkers = 0\n").unwrap();
    primepi()
        .arg("--config")
        .arg(&config)
        .args(["pi", "1000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workers"));
}
