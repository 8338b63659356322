extern crate assert_cmd;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn renders_the_julia_scenario_to_a_graymap() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("julia.pgm");
    Command::cargo_bin("qjulia")
        .unwrap()
        .args(&["-o", out.to_str().unwrap()])
        .args(&["--size", "10x10", "--map", "Quadratic"])
        .args(&["--coefficients", "-0.8,0.156"])
        .assert()
        .success()
        .stdout(predicate::str::contains("of 100 points"));

    let bytes = fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"P5"));
    // header plus one byte per pixel
    assert!(bytes.len() > 100);
}

#[test]
fn renders_a_two_qubit_mating_with_threads() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("mating.pgm");
    Command::cargo_bin("qjulia")
        .unwrap()
        .args(&["-o", out.to_str().unwrap(), "-s", "16x12", "-q", "2", "-t", "1"])
        .args(&["-k", "0.5,0;0,0.5;0.5,0;0,-0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("of 192 points"));
    assert!(out.exists());
}

#[test]
fn short_statevector_is_a_failure() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("never.pgm");
    Command::cargo_bin("qjulia")
        .unwrap()
        .args(&["-o", out.to_str().unwrap(), "-q", "2", "-k", "0.5,0;0,0.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("coefficient vector too short"));
    assert!(!out.exists());
}

#[test]
fn unknown_map_is_rejected_by_the_parser() {
    Command::cargo_bin("qjulia")
        .unwrap()
        .args(&["-o", "unused.pgm", "-m", "cubic", "-k", "0,0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown map"));
}

#[test]
fn out_of_range_qubit_count_names_the_limits() {
    Command::cargo_bin("qjulia")
        .unwrap()
        .args(&["-o", "unused.pgm", "-q", "30", "-k", "0,0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Qubit count must be between 1 and 24"));
}
