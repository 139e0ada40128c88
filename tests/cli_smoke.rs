use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use serde_json::{Value, json};

fn counsel_bin() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Ok(bin) = std::env::var("CARGO_BIN_EXE_counsel-search") {
        return Ok(PathBuf::from(bin));
    }

    let mut path = std::env::current_exe()?;
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("counsel-search");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    Ok(path)
}

fn run(data_dir: &Path, args: &[&str]) -> Result<Output, Box<dyn std::error::Error>> {
    let output = Command::new(counsel_bin()?)
        .args(args)
        .env("COUNSEL_DATA_DIR", data_dir)
        .env("COUNSEL_LOG", "warn")
        .output()?;
    Ok(output)
}

fn write_corpus(dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let corpus = json!({
        "threads": [
            {"id": "t1", "title": "Back trouble", "users": ["u1", "d1"], "date_created": 1},
        ],
        "messages": [
            {"id": "m1", "threadId": "t1", "userId": "u1", "message": "hello doctor", "timestamp": 10, "msgIndex": 0},
            {"id": "m2", "threadId": "t1", "userId": "u1", "message": "My back pain is severe", "timestamp": 20, "msgIndex": 1},
            {"id": "m3", "threadId": "t1", "userId": "d1", "message": "recommend gentle stretching", "timestamp": 30, "msgIndex": 2},
        ],
    });
    let path = dir.join("corpus.json");
    std::fs::write(&path, serde_json::to_vec(&corpus)?)?;
    Ok(path)
}

#[test]
fn import_rebuild_search_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let data_dir = tempdir.path().join("data");
    let corpus = write_corpus(tempdir.path())?;

    let import = run(&data_dir, &["import", corpus.to_str().unwrap(), "--rebuild"])?;
    assert!(import.status.success(), "{}", String::from_utf8_lossy(&import.stderr));
    assert!(data_dir.join("index").join("search_index.json").is_file());

    let search = run(&data_dir, &["search", "back pian", "--json"])?;
    assert!(search.status.success());
    let response: Value = serde_json::from_slice(&search.stdout)?;
    assert_eq!(response["totalResults"], 1);
    assert_eq!(response["results"][0]["messageId"], "m2");
    assert_eq!(response["results"][0]["threadName"], "Back trouble");
    assert_eq!(response["results"][0]["tier"], "exact");
    assert_eq!(response["correctedTerms"][0]["corrected"], "pain");
    assert_eq!(
        response["results"][0]["context"]["messages"]
            .as_array()
            .map(Vec::len),
        Some(3)
    );

    let status = run(&data_dir, &["status", "--json"])?;
    assert!(status.status.success());
    let status: Value = serde_json::from_slice(&status.stdout)?;
    assert_eq!(status["messages"], 3);
    assert!(status["index"]["terms"].as_u64().unwrap() > 0);

    Ok(())
}

#[test]
fn search_before_rebuild_reports_unavailable_index()
-> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;

    let search = run(tempdir.path(), &["search", "pain", "--json"])?;
    assert!(search.status.success());
    let response: Value = serde_json::from_slice(&search.stdout)?;
    assert_eq!(response["totalResults"], 0);
    assert!(
        response["error"]
            .as_str()
            .is_some_and(|e| e.contains("search index unavailable"))
    );
    Ok(())
}

#[test]
fn config_values_are_validated() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;

    let bad = run(tempdir.path(), &["config", "set", "result_limit", "0"])?;
    assert!(!bad.status.success());

    let good = run(tempdir.path(), &["config", "set", "result_limit", "5"])?;
    assert!(good.status.success());

    let show = run(tempdir.path(), &["config", "show", "--json"])?;
    let config: Value = serde_json::from_slice(&show.stdout)?;
    assert_eq!(config["result_limit"], 5);
    assert_eq!(config["expansion_threshold"], 20);

    let clear = run(tempdir.path(), &["config", "clear", "result_limit"])?;
    assert!(clear.status.success());
    assert!(String::from_utf8_lossy(&clear.stderr).contains("(was 5)"));
    let again = run(tempdir.path(), &["config", "clear", "result_limit"])?;
    assert!(!again.status.success());

    Ok(())
}
