use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn civic_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("civic");
    path
}

const FIXTURE: &str = r#"[
  {
    "id": "yt-1",
    "platform": "youtube",
    "title": "Zoning board hearing",
    "description": "Variance requests for the east district",
    "topics": ["local"],
    "views": 900,
    "likes": 45,
    "uploadDate": "2024-03-01T12:00:00Z",
    "hasSubtitles": true
  },
  {
    "id": "yt-2",
    "platform": "youtube",
    "title": "State budget explained",
    "topics": ["economy"],
    "views": 5000,
    "likes": 100,
    "uploadDate": "2024-02-01T12:00:00Z"
  }
]"#;

const ARCHIVE: &str = r#"[
  {
    "id": "vm-1",
    "platform": "vimeo",
    "title": "Zoning reform documentary",
    "topics": ["local"],
    "uploadDate": "2023-11-10T08:00:00Z"
  }
]"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::create_dir_all(root.join("fixtures")).unwrap();

    fs::write(root.join("fixtures/youtube.json"), FIXTURE).unwrap();
    fs::write(root.join("fixtures/archive.json"), ARCHIVE).unwrap();

    let config_content = format!(
        r#"[server]
bind = "127.0.0.1:7340"

[aggregator]
deadline_ms = 2000

[adapters.fixture.offline]
platform = "youtube"
path = "{root}/fixtures/youtube.json"

[adapters.catalog.archive]
path = "{root}/data/catalog.sqlite"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("civic.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_civic(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = civic_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run civic binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_sources_lists_adapters() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_civic(&config, &["sources"]);
    assert!(success, "sources failed: {}", stderr);
    assert!(stdout.contains("ADAPTER"));
    assert!(stdout.contains("offline"));
    assert!(stdout.contains("fixture"));
    assert!(stdout.contains("archive"));
    assert!(stdout.contains("NOT INITIALIZED"));
}

#[test]
fn test_search_json_merges_sources() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_civic(&config, &["search", "zoning", "--json"]);
    assert!(success, "search failed: {}", stderr);

    let result: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["items"][0]["id"], "yt-1");
    assert_eq!(result["perSourceStatus"]["offline"]["status"], "ok");
    assert_eq!(result["perSourceStatus"]["archive"]["status"], "ok");
    assert_eq!(result["perSourceStatus"]["archive"]["count"], 0);
    assert_eq!(result["degraded"], false);
}

#[test]
fn test_search_human_output() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_civic(&config, &["search", "budget"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("State budget explained"));
    assert!(stdout.contains("SOURCE"));
    assert!(stdout.contains("Showing 1 of 1"));
}

#[test]
fn test_search_with_subtitles_flag() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) =
        run_civic(&config, &["search", "zoning budget", "--subtitles", "--json"]);
    assert!(success, "search failed: {}", stderr);

    let result: Value = serde_json::from_str(&stdout).unwrap();
    let items = result["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "yt-1");
}

#[test]
fn test_search_rejects_zero_limit() {
    let (_tmp, config) = setup_test_env();
    let (_stdout, stderr, success) = run_civic(&config, &["search", "zoning", "--limit", "0"]);
    assert!(!success);
    assert!(stderr.contains("limit"), "stderr: {}", stderr);
}

#[test]
fn test_catalog_init_import_then_search() {
    let (tmp, config) = setup_test_env();

    let (stdout, stderr, success) = run_civic(&config, &["catalog", "init"]);
    assert!(success, "catalog init failed: {}", stderr);
    assert!(stdout.contains("initialized"));

    let archive = tmp.path().join("fixtures/archive.json");
    let (stdout, stderr, success) =
        run_civic(&config, &["catalog", "import", archive.to_str().unwrap()]);
    assert!(success, "catalog import failed: {}", stderr);
    assert!(stdout.contains("Imported 1 items"));

    let (stdout, stderr, success) = run_civic(&config, &["search", "zoning", "--json"]);
    assert!(success, "search failed: {}", stderr);
    let result: Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<&str> = result["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"yt-1"));
    assert!(ids.contains(&"vm-1"));
    assert_eq!(result["perSourceStatus"]["archive"]["status"], "ok");

    let (stdout, _, _) = run_civic(&config, &["sources"]);
    assert!(stdout.contains("1 items"));
}

#[test]
fn test_enhance_without_config() {
    let (stdout, stderr, success) =
        run_civic(Path::new("/nonexistent/civic.toml"), &["enhance", "recent congress live"]);
    assert!(success, "enhance failed: {}", stderr);
    let enhanced: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(enhanced["inferredFilters"]["isLive"], true);
    assert_eq!(enhanced["inferredFilters"]["sortBy"], "date");
}

#[test]
fn test_suggest_prints_table() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_civic(&config, &["suggest", "clim"]);
    assert!(success, "suggest failed: {}", stderr);
    assert!(stdout.contains("SUGGESTION"));
    assert!(stdout.to_lowercase().contains("climate"));
}

#[test]
fn test_invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[server]\nbind = \"x\"\n[affinity]\ndecay_factor = 1.5\n").unwrap();

    let (_stdout, stderr, success) = run_civic(&config_path, &["sources"]);
    assert!(!success);
    assert!(stderr.contains("decay_factor"), "stderr: {}", stderr);
}
