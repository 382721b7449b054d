use std::{fs, os::unix::fs::PermissionsExt, path::Path};

use model_server::{
    ModelHandler,
    handlers::{ForecastHandler, InterferenceHandler, OuHandler},
};
use serde_json::{Map, Value, json};

fn data(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

fn write_opunit(dir: &Path, name: &str, rows: usize) {
    let mut csv = String::from("num_rows,cardinality,elapsed_us\n");
    for i in 0..rows {
        let (a, b) = (i as f32, (i % 5) as f32);
        csv.push_str(&format!("{a},{b},{}\n", 3.0 * a - b + 2.0));
    }
    fs::write(dir.join(format!("{name}.csv")), csv).unwrap();
}

/// Trains an operating-unit model map on SEQ_SCAN and TXN_BEGIN data.
fn train_ou(dir: &Path) -> std::path::PathBuf {
    let input = dir.join("ou_data");
    fs::create_dir_all(&input).unwrap();
    write_opunit(&input, "SEQ_SCAN", 30);
    write_opunit(&input, "TXN_BEGIN", 30);
    fs::write(input.join("NOT_AN_OPUNIT.csv"), "a\n1\n").unwrap();

    let save_path = dir.join("ou").join("ou_model.json");
    let mut handler = OuHandler::new();
    let message = handler
        .train(&data(json!({
            "methods": ["lr"],
            "input_path": input,
            "save_path": save_path,
        })))
        .unwrap();

    assert!(message.is_empty());
    assert_eq!(handler.cached().len(), 1);
    save_path
}

fn ou_infer(model_path: &Path, opunit: Value, features: Value) -> Map<String, Value> {
    data(json!({ "features": features, "opunit": opunit, "model_path": model_path }))
}

#[test]
fn reloaded_model_predicts_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let save_path = train_ou(dir.path());
    let request = ou_infer(&save_path, json!("SEQ_SCAN"), json!([[2.0, 1.0], [10.0, 3.0]]));

    let mut handler = OuHandler::new();
    assert!(handler.cached().is_empty());

    let first = handler.infer(&request).unwrap();
    let second = handler.infer(&request).unwrap();
    assert_eq!(first, second);
    assert_eq!(handler.cached().len(), 1);

    let rows = first.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].as_array().unwrap().len(), 1);

    let txn = handler
        .infer(&ou_infer(&save_path, json!("TXN_BEGIN"), json!([[1.0, 1.0]])))
        .unwrap();
    assert_eq!(txn.as_array().unwrap().len(), 1);
    assert_eq!(handler.cached().len(), 1);
}

#[test]
fn operating_unit_infer_codes() {
    let dir = tempfile::tempdir().unwrap();
    let save_path = train_ou(dir.path());
    let mut handler = OuHandler::new();

    let err = handler
        .infer(&ou_infer(&dir.path().join("nope.json"), json!("SEQ_SCAN"), json!([[1.0, 1.0]])))
        .unwrap_err();
    assert_eq!(err.code(), "MODEL_MAP_NOT_TRAINED");
    assert!(handler.cached().is_empty());

    let cases = [
        (json!("BOGUS"), json!([[1.0, 1.0]]), "INVALID_OPUNIT"),
        (json!(5), json!([[1.0, 1.0]]), "INVALID_OPUNIT"),
        (json!("IDX_SCAN"), json!([[1.0, 1.0]]), "MODEL_NOT_FOUND"),
        (json!("SEQ_SCAN"), json!([[1.0, 1.0, 1.0]]), "FAIL_INFERENCE_FAILED"),
    ];
    for (opunit, features, code) in cases {
        let err = handler
            .infer(&ou_infer(&save_path, opunit, features))
            .unwrap_err();
        assert_eq!(err.code(), code);
    }

    let err = handler
        .infer(&data(json!({ "opunit": "SEQ_SCAN", "model_path": save_path })))
        .unwrap_err();
    assert_eq!(err.code(), "FAIL_DATA_FORMAT_ERROR");
}

#[test]
fn operating_unit_train_failures() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty");
    fs::create_dir(&empty).unwrap();

    let mut handler = OuHandler::new();
    let err = handler
        .train(&data(json!({
            "methods": ["lr"],
            "input_path": empty,
            "save_path": dir.path().join("ou.json"),
        })))
        .unwrap_err();
    assert_eq!(err.code(), "FAIL_TRAINING_FAILED");

    write_opunit(&empty, "SEQ_SCAN", 10);
    let err = handler
        .train(&data(json!({
            "methods": ["forest"],
            "input_path": empty,
            "save_path": dir.path().join("ou.json"),
        })))
        .unwrap_err();
    assert_eq!(err.code(), "FAIL_TRAINING_FAILED");
    assert!(handler.cached().is_empty());
}

#[test]
fn diverging_fits_never_reach_the_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ou_data");
    fs::create_dir_all(&input).unwrap();

    let mut csv = (0..30).map(|j| format!("f{j}")).collect::<Vec<_>>().join(",");
    csv.push_str(",elapsed_us\n");
    for i in 0..40 {
        let a = i as f32;
        let row: Vec<_> = (0..30)
            .map(|j| (a + 0.001 * j as f32 * (i % 2) as f32).to_string())
            .collect();
        csv.push_str(&format!("{},{}\n", row.join(","), 2.0 * a + 1.0));
    }
    fs::write(input.join("SEQ_SCAN.csv"), csv).unwrap();

    let save_path = dir.path().join("ou_model.json");
    let mut handler = OuHandler::new();
    handler
        .train(&data(json!({
            "methods": ["lr", "mean"],
            "input_path": input,
            "save_path": save_path,
        })))
        .unwrap();
    assert!(!fs::read_to_string(&save_path).unwrap().contains("null"));

    let request = ou_infer(&save_path, json!("SEQ_SCAN"), json!([vec![3.0; 30]]));
    let mut fresh = OuHandler::new();
    let predictions = fresh.infer(&request).unwrap();
    assert_eq!(predictions, handler.infer(&request).unwrap());
    assert!(predictions[0][0].as_f64().unwrap().is_finite());

    let err = handler
        .train(&data(json!({
            "methods": ["lr"],
            "input_path": input,
            "save_path": dir.path().join("lr_only.json"),
        })))
        .unwrap_err();
    assert_eq!(err.code(), "FAIL_TRAINING_FAILED");
    assert!(!dir.path().join("lr_only.json").exists());
}

#[test]
fn read_only_output_is_a_permission_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ou_data");
    fs::create_dir_all(&input).unwrap();
    write_opunit(&input, "SEQ_SCAN", 30);

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::set_permissions(&out, fs::Permissions::from_mode(0o555)).unwrap();

    // Privileged users ignore the mode bits.
    if fs::create_dir(out.join("write_check")).is_ok() {
        fs::set_permissions(&out, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let mut handler = OuHandler::new();
    for save_path in [out.join("ou_model.json"), out.join("nested").join("ou_model.json")] {
        let err = handler
            .train(&data(json!({
                "methods": ["lr"],
                "input_path": input,
                "save_path": save_path,
            })))
            .unwrap_err();
        assert_eq!(err.code(), "FAIL_PERMISSION_ERROR");
    }
    assert!(handler.cached().is_empty());

    fs::set_permissions(&out, fs::Permissions::from_mode(0o755)).unwrap();
}

fn write_pipelines(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    for file in ["a.csv", "b.csv"] {
        let mut csv = String::from("cpu,io,slowdown\n");
        for i in 0..15 {
            let (x, y) = (i as f32, (i % 3) as f32);
            csv.push_str(&format!("{x},{y},{}\n", 0.5 * x + y));
        }
        fs::write(dir.join(file), csv).unwrap();
    }
}

#[test]
fn interference_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let ou_model_path = train_ou(dir.path());
    let input = dir.path().join("pipelines");
    write_pipelines(&input);
    let save_path = dir.path().join("interference").join("model.json");

    let train = |ou_model_path: &Path, rate: u32| {
        data(json!({
            "methods": ["lr", "mean"],
            "input_path": input,
            "save_path": save_path,
            "ou_model_path": ou_model_path,
            "pipeline_metrics_sample_rate": rate,
        }))
    };

    let mut handler = InterferenceHandler::new();
    let err = handler.train(&train(&dir.path().join("missing.json"), 2)).unwrap_err();
    assert_eq!(err.code(), "FAIL_TRAINING_FAILED");

    let err = handler.train(&train(&ou_model_path, 0)).unwrap_err();
    assert_eq!(err.code(), "FAIL_DATA_FORMAT_ERROR");

    handler.train(&train(&ou_model_path, 2)).unwrap();
    assert!(dir.path().join("interference").join("model_metric_results").is_dir());

    let mut fresh = InterferenceHandler::new();
    let request = data(json!({ "features": [[1.0, 0.0], [4.0, 2.0]], "model_path": save_path }));
    let predictions = fresh.infer(&request).unwrap();
    assert_eq!(predictions, handler.infer(&request).unwrap());
    assert_eq!(predictions.as_array().unwrap().len(), 2);

    let err = fresh
        .infer(&data(json!({ "features": [[1.0, 0.0]], "model_path": dir.path().join("x") })))
        .unwrap_err();
    assert_eq!(err.code(), "MODEL_MAP_NOT_TRAINED");
    assert_eq!(fresh.cached().len(), 1);
}

const INTERVAL_US: u64 = 10_000_000;

fn write_trace(path: &Path, intervals: u64) {
    let mut csv = String::from("query_id,timestamp_us\n");
    for t in 0..intervals {
        let ts = t * INTERVAL_US;
        csv.push_str(&format!("1,{ts}\n1,{}\n2,{ts}\n", ts + 1));
    }
    fs::write(path, csv).unwrap();
}

#[test]
fn forecast_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("trace.csv");
    write_trace(&trace, 10);
    let config = dir.path().join("models.json");
    fs::write(&config, r#"{"lr": {"epochs": 200, "learning_rate": 0.05}}"#).unwrap();
    let save_path = dir.path().join("forecast").join("model.json");

    let mut handler = ForecastHandler::new();
    handler
        .train(&data(json!({
            "methods": ["lr", "mean"],
            "models_config": config,
            "input_path": trace,
            "save_path": save_path,
            "interval_micro_sec": INTERVAL_US,
        })))
        .unwrap();

    let infer = |model_names: Value, interval: u64| {
        data(json!({
            "input_path": trace,
            "model_names": model_names,
            "models_config": "/does/not/matter.json",
            "interval_micro_sec": interval,
            "model_path": save_path,
        }))
    };

    let mut fresh = ForecastHandler::new();
    let result = fresh.infer(&infer(json!(["lr", "mean"]), INTERVAL_US)).unwrap();
    let queries = result["0"].as_object().unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries["1"].as_array().unwrap().len(), 3);
    assert_eq!(result, fresh.infer(&infer(json!(["lr"]), INTERVAL_US)).unwrap());

    let err = fresh.infer(&infer(json!(["lstm"]), INTERVAL_US)).unwrap_err();
    assert_eq!(err.code(), "MODEL_NOT_FOUND");

    let err = fresh.infer(&infer(json!(["lr"]), 5_000_000)).unwrap_err();
    assert_eq!(err.code(), "FAIL_INFERENCE_FAILED");

    let err = fresh.infer(&infer(json!(["lr"]), 1)).unwrap_err();
    assert_eq!(err.code(), "FAIL_DATA_FORMAT_ERROR");

    let err = fresh
        .infer(&data(json!({
            "input_path": trace,
            "model_names": ["lr"],
            "interval_micro_sec": INTERVAL_US,
            "model_path": dir.path().join("missing.json"),
        })))
        .unwrap_err();
    assert_eq!(err.code(), "MODELS_NOT_TRAINED");
}

#[test]
fn forecast_train_failures() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("short.csv");
    write_trace(&trace, 4);
    let save_path = dir.path().join("forecast.json");

    let train = |models_config: Value| {
        data(json!({
            "methods": ["lr"],
            "models_config": models_config,
            "input_path": trace,
            "save_path": save_path,
            "interval_micro_sec": INTERVAL_US,
        }))
    };

    let mut handler = ForecastHandler::new();
    let err = handler.train(&train(Value::Null)).unwrap_err();
    assert_eq!(err.code(), "FAIL_TRAINING_FAILED");

    let err = handler
        .train(&train(json!(dir.path().join("missing_config.json"))))
        .unwrap_err();
    assert_eq!(err.code(), "FAIL_DATA_FORMAT_ERROR");
    assert!(handler.cached().is_empty());
}

#[test]
fn oversized_traces_fail_without_aborting() {
    let dir = tempfile::tempdir().unwrap();
    let wide = dir.path().join("wide.csv");
    fs::write(&wide, "query_id,timestamp_us\n1,0\n1,18000000000000000000\n").unwrap();
    let trace = dir.path().join("trace.csv");
    write_trace(&trace, 10);
    let save_path = dir.path().join("forecast.json");

    let train = |input_path: &Path| {
        data(json!({
            "methods": ["mean"],
            "input_path": input_path,
            "save_path": save_path,
            "interval_micro_sec": INTERVAL_US,
        }))
    };

    let mut handler = ForecastHandler::new();
    let err = handler.train(&train(&wide)).unwrap_err();
    assert_eq!(err.code(), "FAIL_TRAINING_FAILED");
    assert!(handler.cached().is_empty());

    handler.train(&train(&trace)).unwrap();
    let err = handler
        .infer(&data(json!({
            "input_path": wide,
            "model_names": ["mean"],
            "interval_micro_sec": INTERVAL_US,
            "model_path": save_path,
        })))
        .unwrap_err();
    assert_eq!(err.code(), "FAIL_INFERENCE_FAILED");
}
