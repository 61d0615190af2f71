//! `kiln test` command implementation.
//!
//! Loads the test-runner configuration, lists discovered test files, and
//! applies the coverage gate to a runner-produced summary. Test
//! execution itself is delegated to the JS runner; this command owns the
//! configuration and the gate.

use kiln_core::testconf::{CoverageSummary, TestConfig};
use kiln_core::Config;
use miette::{miette, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct TestPlanJson {
    ok: bool,
    tests: Vec<String>,
    coverage_gate: GateJson,
}

#[derive(Serialize)]
struct GateJson {
    checked: bool,
    violations: Vec<String>,
}

/// Run the test command.
pub fn run(config: &Config, coverage: Option<&Path>, json: bool) -> Result<()> {
    let test_config = TestConfig::load(&config.cwd).map_err(|e| miette!("{e}"))?;
    let tests = test_config
        .discover(&config.cwd)
        .map_err(|e| miette!("{e}"))?;

    let mut violations = Vec::new();
    let checked = coverage.is_some();

    if let Some(summary_path) = coverage {
        let summary = CoverageSummary::from_json_file(summary_path).map_err(|e| miette!("{e}"))?;
        violations = test_config
            .coverage
            .check(&summary)
            .iter()
            .map(ToString::to_string)
            .collect();
    }

    if json {
        let plan = TestPlanJson {
            ok: violations.is_empty(),
            tests: tests.iter().map(|p| p.display().to_string()).collect(),
            coverage_gate: GateJson {
                checked,
                violations: violations.clone(),
            },
        };
        println!("{}", serde_json::to_string(&plan).unwrap());
    } else {
        if tests.is_empty() {
            println!("  no test files found");
        } else {
            println!("  {} test file(s):", tests.len());
            for test in &tests {
                println!("    {}", test.display());
            }
        }
        for violation in &violations {
            eprintln!("  {violation}");
        }
    }

    if !violations.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
