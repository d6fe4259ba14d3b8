//! End-to-end tests for the `pgm` binary.
//!
//! Models are written to temp files; the config search path is pinned to an
//! empty temp dir so the host's own config never leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value as Json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn model(&self, name: &str, model: &Json) -> PathBuf {
        self.write(name, &serde_json::to_string_pretty(model).unwrap())
    }

    fn pgm(&self) -> Command {
        let mut cmd = Command::cargo_bin("pgm").expect("pgm binary should exist");
        cmd.env("XDG_CONFIG_HOME", self.dir.path().join("xdg"))
            .env_remove("PGM_CONFIG")
            .env_remove("PGM_CONFIG_DIR")
            .env_remove("PGM_LOG")
            .env_remove("PGM_LOG_FORMAT")
            .env_remove("RUST_LOG");
        cmd
    }
}

fn bools(n: usize) -> Vec<Vec<bool>> {
    (0..1usize << n)
        .map(|bits| (0..n).map(|i| bits & (1 << (n - 1 - i)) == 0).collect())
        .collect()
}

/// Explicit table over boolean variables.
fn table(id: &str, scope: &[&str], f: impl Fn(&[bool]) -> f64) -> Json {
    let entries: Vec<Json> = bools(scope.len())
        .into_iter()
        .map(|row| {
            let assignment: serde_json::Map<String, Json> = scope
                .iter()
                .zip(&row)
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect();
            json!({"assignment": assignment, "value": f(&row)})
        })
        .collect();
    json!({"id": id, "scope": scope, "entries": entries})
}

fn bool_vars(ids: &[&str]) -> Json {
    Json::Array(
        ids.iter()
            .map(|id| json!({"id": id, "values": [true, false]}))
            .collect(),
    )
}

/// a → b → c.
fn chain_model() -> Json {
    json!({
        "name": "chain",
        "variables": bool_vars(&["a", "b", "c"]),
        "edges": [{"start": "a", "end": "b"}, {"start": "b", "end": "c"}],
        "factors": [
            table("a_f", &["a"], |r| if r[0] { 0.6 } else { 0.4 }),
            table("ba_f", &["a", "b"], |r| match (r[0], r[1]) {
                (true, true) => 0.9,
                (true, false) => 0.1,
                (false, true) => 0.2,
                (false, false) => 0.8,
            }),
            table("cb_f", &["b", "c"], |r| match (r[0], r[1]) {
                (true, true) => 0.3,
                (true, false) => 0.7,
                (false, _) => 0.5,
            }),
        ]
    })
}

/// I, J → X; J → Y; X, Y → O.
fn mpe_model() -> Json {
    json!({
        "variables": bool_vars(&["I", "J", "X", "Y", "O"]),
        "factors": [
            table("I_f", &["I"], |_| 0.5),
            table("J_f", &["J"], |_| 0.5),
            table("JY_f", &["J", "Y"], |r| if r[0] == r[1] { 0.01 } else { 0.99 }),
            table("IJX_f", &["I", "J", "X"], |r| if (r[0] && r[1]) == r[2] { 0.95 } else { 0.05 }),
            table("XYO_f", &["X", "Y", "O"], |r| if (r[0] || r[1]) == r[2] { 0.98 } else { 0.02 }),
        ]
    })
}

/// Two factors sharing two free variables.
fn sprinkler_model() -> Json {
    json!({
        "variables": bool_vars(&["rain", "sprink", "grass"]),
        "factors": [
            table("rain_sprink", &["rain", "sprink"], |_| 0.25),
            table("grass_wet", &["rain", "sprink", "grass"], |r| if r[2] { 0.9 } else { 0.1 }),
        ]
    })
}

fn stdout_json(output: &std::process::Output) -> Json {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn probability_of(report: &Json, id: &str, value: f64) -> f64 {
    report["distribution"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["assignment"][id].as_f64() == Some(value))
        .and_then(|row| row["probability"].as_f64())
        .unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

mod query {
    use super::*;

    #[test]
    fn prior_marginal_json() {
        let fx = Fixture::new();
        let model = fx.model("chain.json", &chain_model());
        let out = fx
            .pgm()
            .args(["query", model.to_str().unwrap(), "c"])
            .output()
            .unwrap();
        assert!(out.status.success());

        let report = stdout_json(&out);
        assert_eq!(report["command"], "query");
        assert!(report["run_id"].as_str().unwrap().starts_with("run-"));
        assert!(close(report["alpha"].as_f64().unwrap(), 1.0));
        assert!(close(probability_of(&report, "c", 1.0), 0.376));
        assert!(close(probability_of(&report, "c", 0.0), 0.624));
        assert_eq!(report["steps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn evidence_sets_alpha() {
        let fx = Fixture::new();
        let model = fx.model("chain.json", &chain_model());
        let out = fx
            .pgm()
            .args(["query", model.to_str().unwrap(), "c", "-e", "a=true"])
            .output()
            .unwrap();
        assert!(out.status.success());

        let report = stdout_json(&out);
        assert!(close(report["alpha"].as_f64().unwrap(), 0.6));
        assert!((probability_of(&report, "c", 1.0) - 0.32).abs() < 1e-9);
        assert_eq!(report["evidence"]["a"].as_f64(), Some(1.0));
    }

    #[test]
    fn unmatched_evidence_is_reported() {
        let fx = Fixture::new();
        let model = fx.model("chain.json", &chain_model());
        let out = fx
            .pgm()
            .args(["query", model.to_str().unwrap(), "c", "-e", "a=true,zz=1"])
            .output()
            .unwrap();
        assert!(out.status.success());

        let report = stdout_json(&out);
        assert_eq!(report["unused_evidence"], json!({"zz": 1.0}));
        assert!(close(report["alpha"].as_f64().unwrap(), 0.6));
    }

    #[test]
    fn human_format() {
        let fx = Fixture::new();
        let model = fx.model("chain.json", &chain_model());
        fx.pgm()
            .args(["-f", "human", "query", model.to_str().unwrap(), "c", "-e", "a=t"])
            .assert()
            .success()
            .stdout(predicate::str::contains("P(c | {a=1})"))
            .stdout(predicate::str::contains("0.320000"));
    }

    #[test]
    fn missing_query_vars_is_usage_error() {
        let fx = Fixture::new();
        let model = fx.model("chain.json", &chain_model());
        fx.pgm()
            .args(["query", model.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("required"));
    }
}

mod mpe {
    use super::*;

    #[test]
    fn explicit_order() {
        let fx = Fixture::new();
        let model = fx.model("mpe.json", &mpe_model());
        let out = fx
            .pgm()
            .args([
                "mpe",
                model.to_str().unwrap(),
                "--order",
                "I,X,Y,J,O",
                "-e",
                "J=true,O=false",
            ])
            .output()
            .unwrap();
        assert!(out.status.success());

        let report = stdout_json(&out);
        assert!(close(report["probability"].as_f64().unwrap(), 0.2304225));
        let a = &report["assignment"];
        for (id, v) in [("I", 0.0), ("J", 1.0), ("X", 0.0), ("Y", 0.0), ("O", 0.0)] {
            assert_eq!(a[id].as_f64(), Some(v), "{id}");
        }
        assert_eq!(report["order"], json!(["I", "X", "Y", "J", "O"]));
    }

    #[test]
    fn heuristic_order_conflict_exits_inference_error() {
        let fx = Fixture::new();
        let model = fx.model("mpe.json", &mpe_model());
        fx.pgm()
            .args(["mpe", model.to_str().unwrap(), "-e", "J=true,O=false"])
            .assert()
            .code(13)
            .stdout(predicate::str::contains("ERR_INFERENCE"));
    }
}

mod order {
    use super::*;

    #[test]
    fn min_neighbors_on_chain() {
        let fx = Fixture::new();
        let model = fx.model("chain.json", &chain_model());
        let out = fx
            .pgm()
            .args([
                "order",
                model.to_str().unwrap(),
                "--heuristic",
                "min-neighbors",
                "--vars",
                "a,b",
            ])
            .output()
            .unwrap();
        assert!(out.status.success());

        let report = stdout_json(&out);
        assert_eq!(report["heuristic"], "min_neighbors");
        assert_eq!(report["order"], json!(["a", "b"]));
    }

    #[test]
    fn defaults_to_every_variable() {
        let fx = Fixture::new();
        let model = fx.model("chain.json", &chain_model());
        let out = fx
            .pgm()
            .args(["order", model.to_str().unwrap(), "--heuristic", "max-cardinality"])
            .output()
            .unwrap();
        assert!(out.status.success());

        let report = stdout_json(&out);
        let mut order: Vec<String> =
            serde_json::from_value(report["order"].clone()).unwrap();
        order.sort();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}

mod config {
    use super::*;

    #[test]
    fn show_builtin_default() {
        let fx = Fixture::new();
        let out = fx.pgm().args(["config", "show"]).output().unwrap();
        assert!(out.status.success());

        let report = stdout_json(&out);
        if report["path"].is_null() {
            assert_eq!(report["source"], "builtin default");
            assert_eq!(report["config"]["heuristic"], "min_neighbors");
        }
    }

    #[test]
    fn show_cli_file() {
        let fx = Fixture::new();
        let path = fx.write("engine.toml", "heuristic = \"max_cardinality\"\nprecision = 3\n");
        let out = fx
            .pgm()
            .args(["config", "show", "--config", path.to_str().unwrap()])
            .output()
            .unwrap();
        assert!(out.status.success());

        let report = stdout_json(&out);
        assert_eq!(report["source"], "CLI argument");
        assert_eq!(report["config"]["heuristic"], "max_cardinality");
        assert_eq!(report["config"]["precision"], 3);
    }

    #[test]
    fn show_human_is_toml() {
        let fx = Fixture::new();
        let path = fx.write("engine.toml", "rescale = false\n");
        fx.pgm()
            .args(["-f", "human", "config", "show", "--config", path.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("# source: CLI argument"))
            .stdout(predicate::str::contains("rescale = false"));
    }

    #[test]
    fn env_var_path() {
        let fx = Fixture::new();
        let path = fx.write("custom.json", r#"{"heuristic": "max_cardinality"}"#);
        let out = fx
            .pgm()
            .env("PGM_CONFIG", &path)
            .args(["config", "show"])
            .output()
            .unwrap();
        assert!(out.status.success());
        assert_eq!(stdout_json(&out)["source"], "environment variable");
    }
}

mod errors {
    use super::*;

    fn chain(fx: &Fixture) -> PathBuf {
        fx.model("chain.json", &chain_model())
    }

    fn run(fx: &Fixture, args: &[&str], model: &Path) -> assert_cmd::assert::Assert {
        let mut full = vec![args[0], model.to_str().unwrap()];
        full.extend_from_slice(&args[1..]);
        fx.pgm().args(full).assert()
    }

    #[test]
    fn malformed_evidence_is_args_error() {
        let fx = Fixture::new();
        run(&fx, &["query", "c", "-e", "a"], &chain(&fx))
            .code(10)
            .stdout(predicate::str::contains("ERR_ARGS"));
    }

    #[test]
    fn duplicate_evidence_is_args_error() {
        let fx = Fixture::new();
        run(&fx, &["query", "c", "-e", "a=true,a=false"], &chain(&fx)).code(10);
    }

    #[test]
    fn unknown_query_variable_is_model_error() {
        let fx = Fixture::new();
        run(&fx, &["query", "zzz"], &chain(&fx))
            .code(12)
            .stdout(predicate::str::contains("ERR_MODEL"))
            .stdout(predicate::str::contains("zzz"));
    }

    #[test]
    fn evidence_out_of_domain_is_inference_error() {
        let fx = Fixture::new();
        run(&fx, &["query", "c", "-e", "a=5"], &chain(&fx)).code(13);
    }

    #[test]
    fn scope_conflict_is_inference_error() {
        let fx = Fixture::new();
        let model = fx.model("sprinkler.json", &sprinkler_model());
        let out = fx
            .pgm()
            .args(["query", model.to_str().unwrap(), "grass"])
            .output()
            .unwrap();
        assert_eq!(out.status.code(), Some(13));
        let report = stdout_json(&out);
        assert_eq!(report["exit_code"], "ERR_INFERENCE");
        assert_eq!(report["error"]["code"], 20);
    }

    #[test]
    fn missing_config_is_config_error() {
        let fx = Fixture::new();
        let missing = fx.dir.path().join("nope.toml");
        fx.pgm()
            .args(["config", "show", "--config", missing.to_str().unwrap()])
            .assert()
            .code(11)
            .stdout(predicate::str::contains("ERR_CONFIG"));
    }

    #[test]
    fn invalid_config_is_config_error() {
        let fx = Fixture::new();
        let path = fx.write("engine.toml", "unknown_key = 1\n");
        fx.pgm()
            .args(["config", "show", "--config", path.to_str().unwrap()])
            .assert()
            .code(11);
    }

    #[test]
    fn missing_model_is_io_error() {
        let fx = Fixture::new();
        let missing = fx.dir.path().join("absent.json");
        run(&fx, &["query", "c"], &missing)
            .code(14)
            .stdout(predicate::str::contains("ERR_IO"));
    }

    #[test]
    fn malformed_model_is_io_error() {
        let fx = Fixture::new();
        let path = fx.write("broken.json", "{\"variables\": [");
        run(&fx, &["query", "c"], &path).code(14);
    }

    #[test]
    fn human_errors_go_to_stderr() {
        let fx = Fixture::new();
        fx.pgm()
            .args(["-f", "human", "--no-color", "query"])
            .arg(chain(&fx))
            .arg("zzz")
            .assert()
            .code(12)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("zzz"));
    }
}

#[test]
fn completions_bash() {
    Fixture::new()
        .pgm()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pgm"));
}

#[test]
fn version_flag() {
    Fixture::new()
        .pgm()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pgm"));
}
