use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use weka_bridge::arff::{FsSchemaStore, SchemaStore};
use weka_bridge::error::{BridgeError, ErrorKind, Result};
use weka_bridge::tool::{Invocation, ToolOutput, ToolRunner};
use weka_bridge::{Bridge, BridgeConfig, Outcome, TrainOptions};

const SURVEY: &str = "\u{feff}Age,Current_brand,City,Comment\n\
25,Apple,Penang,\"likes the camera, a lot\"\n\
35,Samsung,Johor Bahru,\n\
25,Samsung,Penang,big screen\n";

const TRAIN_DOCUMENT: &str = "@RELATION survey

@ATTRIBUTE Age {25,35}
@ATTRIBUTE City {'Johor Bahru',Penang}
@ATTRIBUTE Comment STRING
@ATTRIBUTE Current_brand {Apple,Samsung}

@DATA
25,Penang,'likes the camera a lot',Apple
35,'Johor Bahru',?,Samsung
25,Penang,'big screen',Samsung
";

const SINGLE_REPORT: &str = "\n=== Predictions on test data ===\n\n \
inst#     actual  predicted error distribution\n     \
1        1:?    2:Samsung       0.2,*0.8\n";

const CSV_REPORT: &str = "inst#,actual,predicted,error,prob_Apple,prob_Samsung\n\
1,?,1:Apple,,0.9,0.1\n\
2,?,2:Samsung,,0.3,0.7\n";

// ---------------------------------------------------------------------------
// Scripted runner
// ---------------------------------------------------------------------------

struct Call {
    args: Vec<String>,
    /// Contents of the `-t`/`-T` document while the tool was running.
    document: String,
}

/// Stands in for the tool: records each call and answers with fixed output.
struct ScriptedRunner {
    stdout: String,
    stderr: Option<String>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRunner {
    fn answering(stdout: &str) -> Self {
        ScriptedRunner {
            stdout: stdout.to_string(),
            stderr: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(stderr: &str) -> Self {
        ScriptedRunner {
            stdout: String::new(),
            stderr: Some(stderr.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_args(&self) -> Vec<String> {
        self.calls.lock().unwrap().last().map(|c| c.args.clone()).unwrap()
    }

    fn last_document(&self) -> String {
        self.calls.lock().unwrap().last().map(|c| c.document.clone()).unwrap()
    }
}

fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let args = &invocation.args;
        let document = arg_after(args, "-t")
            .or_else(|| arg_after(args, "-T"))
            .and_then(|p| fs::read_to_string(p).ok())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(Call {
            args: args.clone(),
            document,
        });

        if let Some(stderr) = &self.stderr {
            return Err(BridgeError::Process {
                argv: invocation.argv(),
                exit_code: Some(1),
                stdout: self.stdout.clone(),
                stderr: stderr.clone(),
            });
        }
        if let Some(model) = arg_after(args, "-d") {
            fs::write(model, "serialized model").unwrap();
        }
        Ok(ToolOutput {
            stdout: self.stdout.clone(),
            stderr: String::new(),
            exit_code: Some(0),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(dir: &Path) -> BridgeConfig {
    BridgeConfig {
        relation: "survey".to_string(),
        string_attributes: vec!["Comment".to_string()],
        work_dir: dir.join("uploads"),
        model_path: dir.join("model").join("brand.model"),
        schema_path: dir.join("model").join("header.arff"),
        ..BridgeConfig::default()
    }
}

fn bridge(dir: &Path, runner: ScriptedRunner) -> Bridge<FsSchemaStore, ScriptedRunner> {
    let cfg = config(dir);
    let store = FsSchemaStore::new(&cfg.schema_path);
    Bridge::new(cfg, store, runner).unwrap()
}

fn write_input(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(rd) => rd
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

fn trained(dir: &Path) {
    let input = write_input(dir, "survey.csv", SURVEY);
    bridge(dir, ScriptedRunner::answering("=== Summary ===\n"))
        .train(&input, &TrainOptions::default())
        .unwrap();
}

// ---------------------------------------------------------------------------
// Train flow
// ---------------------------------------------------------------------------

#[test]
fn training_renders_document_and_persists_schema() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "survey.csv", SURVEY);
    let b = bridge(dir.path(), ScriptedRunner::answering("=== Summary ===\n"));

    let outcome = b.train(&input, &TrainOptions::default()).unwrap();

    assert_eq!(outcome.classifier, "weka.classifiers.trees.J48");
    assert_eq!(outcome.attributes, 4);
    assert_eq!(outcome.report, "=== Summary ===\n");
    assert_eq!(b.runner().last_document(), TRAIN_DOCUMENT);

    let args = b.runner().last_args();
    assert_eq!(arg_after(&args, "-c"), Some("4"));
    assert!(args.iter().any(|a| a == "weka.classifiers.trees.J48"));

    let persisted = b.store().load().unwrap();
    assert_eq!(persisted.schema.class_attribute().name, "Current_brand");
    assert_eq!(persisted.classifier.as_deref(), Some("weka.classifiers.trees.J48"));
    assert_eq!(
        fs::read_to_string(dir.path().join("model/brand.model")).unwrap(),
        "serialized model"
    );
}

#[test]
fn classifier_alias_and_extra_options_reach_the_tool() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "survey.csv", SURVEY);
    let b = bridge(dir.path(), ScriptedRunner::answering(""));
    let options = TrainOptions {
        classifier: Some("NaiveBayes".to_string()),
        extra: vec!["-K".to_string()],
    };

    b.train(&input, &options).unwrap();

    let args = b.runner().last_args();
    assert!(args.iter().any(|a| a == "weka.classifiers.bayes.NaiveBayes"));
    assert_eq!(args.last().map(String::as_str), Some("-K"));
    assert_eq!(
        b.store().load().unwrap().classifier.as_deref(),
        Some("weka.classifiers.bayes.NaiveBayes")
    );
}

#[test]
fn failed_training_keeps_previous_schema_and_model() {
    let dir = TempDir::new().unwrap();
    trained(dir.path());
    let schema_before = fs::read_to_string(dir.path().join("model/header.arff")).unwrap();

    let other = write_input(
        dir.path(),
        "other.csv",
        "Age,Current_brand\n60,Vivo\n70,Oppo\n",
    );
    let b = bridge(dir.path(), ScriptedRunner::failing("Exception in thread \"main\""));
    let err = b.train(&other, &TrainOptions::default()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Process);
    assert_eq!(
        fs::read_to_string(dir.path().join("model/header.arff")).unwrap(),
        schema_before
    );
    assert_eq!(entries(&dir.path().join("model")), vec!["brand.model", "header.arff"]);
    assert!(entries(&dir.path().join("uploads")).is_empty());
}

#[test]
fn missing_class_value_fails_before_the_tool_runs() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "survey.csv", "Age,Current_brand\n25,Apple\n35,\n");
    let b = bridge(dir.path(), ScriptedRunner::answering(""));

    let err = b.train(&input, &TrainOptions::default()).unwrap_err();

    assert!(matches!(err, BridgeError::ClassValueMissing { row: 1, .. }));
    assert!(err.is_client_error());
    assert_eq!(b.runner().call_count(), 0);
    assert!(matches!(b.store().load(), Err(BridgeError::SchemaNotFound { .. })));
}

#[test]
fn attribute_relation_input_is_passed_through() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        "phones.arff",
        "% exported\n@relation phones\n\n\
         @attribute Current_brand {Apple,Samsung}\n@attribute Age {25,35}\n\n\
         @data\nApple,25\nSamsung,35\n",
    );
    let b = bridge(dir.path(), ScriptedRunner::answering(""));

    b.train(&input, &TrainOptions::default()).unwrap();

    let args = b.runner().last_args();
    assert_eq!(arg_after(&args, "-t"), input.to_str());
    assert_eq!(arg_after(&args, "-c"), Some("1"));
    let persisted = b.store().load().unwrap();
    assert_eq!(persisted.schema.relation(), "phones");
    assert_eq!(persisted.schema.class_index(), 0);
}

#[test]
fn numeric_attribute_relation_input_is_rejected_before_the_tool_runs() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        "exported.arff",
        "@relation smartphone\n@attribute Age NUMERIC\n\
         @attribute Current_brand {Apple,Samsung}\n@data\n31,Apple\n",
    );
    let b = bridge(dir.path(), ScriptedRunner::answering(""));

    let err = b.train(&input, &TrainOptions::default()).unwrap_err();

    assert!(matches!(err, BridgeError::MalformedSchema { line: 2, .. }));
    assert_eq!(b.runner().call_count(), 0);
    assert!(matches!(b.store().load(), Err(BridgeError::SchemaNotFound { .. })));
    assert!(!dir.path().join("model/brand.model").exists());
}

// ---------------------------------------------------------------------------
// Predict flow
// ---------------------------------------------------------------------------

#[test]
fn prediction_uses_persisted_schema() {
    let dir = TempDir::new().unwrap();
    trained(dir.path());
    let query = write_input(
        dir.path(),
        "query.json",
        r#"[{"Age": 45, "City": "Penang", "Comment": "new  phone", "Current_brand": "Apple"}]"#,
    );
    let b = bridge(dir.path(), ScriptedRunner::answering(SINGLE_REPORT));

    let prediction = b.predict(&query).unwrap();

    assert_eq!(prediction.label, "Samsung");
    assert_eq!(prediction.distribution.get("Apple"), Some(0.2));
    assert_eq!(prediction.distribution.get("Samsung"), Some(0.8));

    let document = b.runner().last_document();
    let (header, data) = document.split_once("@DATA\n").unwrap();
    assert!(TRAIN_DOCUMENT.starts_with(header));
    assert_eq!(data, "?,Penang,'new phone',?\n");

    let args = b.runner().last_args();
    assert!(args.iter().any(|a| a == "-distribution"));
    assert_eq!(arg_after(&args, "-c"), Some("4"));
    assert!(entries(&dir.path().join("uploads")).is_empty());
}

#[test]
fn batch_prediction_reads_every_row() {
    let dir = TempDir::new().unwrap();
    trained(dir.path());
    let query = write_input(dir.path(), "query.csv", "Age,City\n25,Penang\n35,Johor Bahru\n");
    let b = bridge(dir.path(), ScriptedRunner::answering(CSV_REPORT));

    let predictions = b.predict_batch(&query).unwrap();

    let labels: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["Apple", "Samsung"]);
    assert_eq!(predictions[1].distribution.get("Samsung"), Some(0.7));
    assert!(b.runner().last_args().iter().any(|a| a == "-classifications"));
    assert!(b.runner().last_document().ends_with("@DATA\n25,Penang,?,?\n35,'Johor Bahru',?,?\n"));
}

#[test]
fn prediction_before_training_is_schema_not_found() {
    let dir = TempDir::new().unwrap();
    let query = write_input(dir.path(), "query.csv", "Age,City\n25,Penang\n");
    let b = bridge(dir.path(), ScriptedRunner::answering(SINGLE_REPORT));

    let err = b.predict(&query).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(b.runner().call_count(), 0);
}

#[test]
fn empty_query_is_rejected_before_the_tool_runs() {
    let dir = TempDir::new().unwrap();
    trained(dir.path());
    let query = write_input(dir.path(), "query.csv", "Age,City\n");
    let b = bridge(dir.path(), ScriptedRunner::answering(SINGLE_REPORT));

    assert!(matches!(b.predict(&query), Err(BridgeError::EmptyTable)));
    assert_eq!(b.runner().call_count(), 0);
}

#[test]
fn incompatible_model_surfaces_as_stale() {
    let dir = TempDir::new().unwrap();
    trained(dir.path());
    let query = write_input(dir.path(), "query.csv", "Age,City\n25,Penang\n");
    let b = bridge(
        dir.path(),
        ScriptedRunner::failing("weka.core.WekaException: Train and test set are not compatible"),
    );

    let err = b.predict(&query).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StaleModel);
    assert!(entries(&dir.path().join("uploads")).is_empty());
}

#[test]
fn failed_prediction_removes_its_document() {
    let dir = TempDir::new().unwrap();
    trained(dir.path());
    let query = write_input(dir.path(), "query.csv", "Age,City\n25,Penang\n35,Penang\n");
    let b = bridge(dir.path(), ScriptedRunner::failing("java.lang.OutOfMemoryError"));

    let err = b.predict_batch(&query).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Process);
    assert!(b.runner().last_document().contains("@DATA\n25,Penang,?,?\n"));
    assert!(entries(&dir.path().join("uploads")).is_empty());
}

#[test]
fn handle_dispatches_on_the_flag() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), "survey.csv", SURVEY);
    let query = write_input(dir.path(), "query.csv", "Age,City\n25,Penang\n");

    let outcome = bridge(dir.path(), ScriptedRunner::answering("")).handle(&input, true).unwrap();
    assert!(matches!(outcome, Outcome::Trained(_)));

    let predicted = bridge(dir.path(), ScriptedRunner::answering(SINGLE_REPORT))
        .handle(&query, false)
        .unwrap();
    let json = serde_json::to_value(&predicted).unwrap();
    assert_eq!(json["kind"], "predicted");
    assert_eq!(json["label"], "Samsung");
    assert_eq!(json["distribution"]["Samsung"], 0.8);
}

#[test]
fn model_info_returns_tool_text_even_on_failure() {
    let dir = TempDir::new().unwrap();
    trained(dir.path());
    let b = bridge(dir.path(), ScriptedRunner::failing("Error: no test instances"));

    let info = b.model_info().unwrap();

    assert_eq!(info, "Error: no test instances");
    assert!(b.runner().last_document().ends_with("@DATA\n"));
}
