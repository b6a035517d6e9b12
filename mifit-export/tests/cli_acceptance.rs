use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const COMPLETE_TRACK: &str = "1561234567";
const UNCOMPLETE_TRACK: &str = "1561300000";
const LATER_TRACK: &str = "1600000000";

struct CliTestEnv {
    _temp_dir: TempDir,
    base: PathBuf,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            base,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    /// Seed a cache with three listed tracks, two of them with details
    fn seed_cache(&self) -> PathBuf {
        let dir = self.path("cache-in");
        fs::create_dir_all(&dir).expect("failed to create cache dir");

        let listing = serde_json::json!({
            "summary": [
                {"trackid": LATER_TRACK, "source": "run.mifit.huami.com", "type": 9, "dis": "20000", "run_time": "3600"},
                {"trackid": COMPLETE_TRACK, "source": "run.mifit.huami.com", "type": 1, "dis": "5012", "run_time": "1800"},
                {"trackid": UNCOMPLETE_TRACK, "source": "run.mifit.huami.com", "type": 1}
            ],
            "next": -1
        });
        fs::write(dir.join("activities.json"), listing.to_string()).expect("failed to write listing");

        for id in [COMPLETE_TRACK, LATER_TRACK] {
            let details = serde_json::json!({
                "trackid": id,
                "longitude_latitude": "4800000000,200000000;100,100;100,100",
                "time": "0;5;5"
            });
            fs::write(dir.join(format!("track_{}.json", id)), details.to_string())
                .expect("failed to write details");
        }

        dir
    }

    fn write_config(&self, content: &str) -> PathBuf {
        let path = self.path("config.toml");
        fs::write(&path, content).expect("failed to write config");
        path
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("mifit-export"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute mifit-export: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "mifit-export {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is not UTF-8")
}

#[test]
fn list_shows_cached_tracks_in_order_with_status() {
    let env = CliTestEnv::new();
    let cache = env.seed_cache();

    let args = ["--cache-in", path_str(&cache), "--list"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let rows: Vec<&str> = stdout.lines().filter(|l| l.contains("track_")).collect();
    assert_eq!(rows.len(), 3, "unexpected rows:\n{stdout}");

    assert!(rows[0].starts_with("001: "));
    assert!(rows[0].ends_with(&format!("track_{COMPLETE_TRACK}")));
    assert!(rows[1].ends_with(&format!("track_{UNCOMPLETE_TRACK} (uncomplete)")));
    assert!(rows[2].ends_with(&format!("track_{LATER_TRACK}")));
}

#[test]
fn list_respects_range() {
    let env = CliTestEnv::new();
    let cache = env.seed_cache();

    let range = format!("{}..{}", UNCOMPLETE_TRACK, LATER_TRACK);
    let args = ["--ci", path_str(&cache), "-l", "-r", range.as_str()];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let rows: Vec<&str> = stdout.lines().filter(|l| l.contains("track_")).collect();
    assert_eq!(rows.len(), 1, "unexpected rows:\n{stdout}");
    assert!(rows[0].contains(UNCOMPLETE_TRACK));
}

#[test]
fn invalid_range_is_rejected() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["--list", "--range", "someday.."]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid date"), "stderr:\n{stderr}");
}

#[test]
fn cache_round_trips_through_cli() {
    let env = CliTestEnv::new();
    let cache_in = env.seed_cache();
    let cache_out = env.path("cache-out");

    let args = ["--cache-in", path_str(&cache_in), "--cache-out", path_str(&cache_out)];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    assert!(cache_out.join("activities.json").is_file());
    assert!(cache_out.join(format!("track_{COMPLETE_TRACK}.json")).is_file());
    assert!(cache_out.join(format!("track_{LATER_TRACK}.json")).is_file());
    assert!(!cache_out.join(format!("track_{UNCOMPLETE_TRACK}.json")).exists());

    let listing: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(cache_out.join("activities.json")).expect("missing listing"),
    )
    .expect("listing is not JSON");
    let ids: Vec<&str> = listing["summary"]
        .as_array()
        .expect("summary is not a list")
        .iter()
        .filter_map(|s| s["trackid"].as_str())
        .collect();
    assert_eq!(ids, vec![COMPLETE_TRACK, UNCOMPLETE_TRACK, LATER_TRACK]);
    assert_eq!(listing["next"], serde_json::json!(-1));

    let original: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(cache_in.join(format!("track_{COMPLETE_TRACK}.json"))).unwrap(),
    )
    .unwrap();
    let copied: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(cache_out.join(format!("track_{COMPLETE_TRACK}.json"))).unwrap(),
    )
    .unwrap();
    assert_eq!(original, copied);
}

#[test]
fn tcx_export_writes_complete_tracks() {
    let env = CliTestEnv::new();
    let cache = env.seed_cache();
    let out = env.path("tcx");

    let args = ["--cache-in", path_str(&cache), "--tcx", "-o", path_str(&out)];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let tcx = out.join(format!("track_{COMPLETE_TRACK}.tcx"));
    let content = fs::read_to_string(&tcx).expect("missing TCX file");
    assert!(content.contains(r#"<Activity Sport="Running">"#));
    assert_eq!(content.matches("<Trackpoint>").count(), 3);

    let ride = fs::read_to_string(out.join(format!("track_{LATER_TRACK}.tcx")))
        .expect("missing TCX file");
    assert!(ride.contains(r#"Sport="Biking""#));

    assert!(!out.join(format!("track_{UNCOMPLETE_TRACK}.tcx")).exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Skipped track_{UNCOMPLETE_TRACK} (uncomplete)")));
}

#[test]
fn missing_cache_is_empty_not_an_error() {
    let env = CliTestEnv::new();
    let missing = env.path("does-not-exist");

    let args = ["--cache-in", path_str(&missing), "--list"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Loaded 0 track(s)"));
    assert!(stdout.contains("No tracks known"));
}

#[test]
fn failed_login_still_writes_cache() {
    let env = CliTestEnv::new();
    let cache_in = env.seed_cache();
    let cache_out = env.path("cache-out");
    // Port 9 (discard) is closed on test machines, so the login request fails fast
    let config = env.write_config(
        r#"
[api]
account_url = "http://127.0.0.1:9"
api_url = "http://127.0.0.1:9"
timeout_secs = 5
"#,
    );

    let output = run_bin(
        &env,
        &[
            "--config",
            path_str(&config),
            "--cache-in",
            path_str(&cache_in),
            "--cache-out",
            path_str(&cache_out),
            "--update",
            "--code",
            "dummy",
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to log in"), "stderr:\n{stderr}");
    assert!(cache_out.join("activities.json").is_file());
    assert!(cache_out.join(format!("track_{COMPLETE_TRACK}.json")).is_file());
}

#[test]
fn invalid_config_is_reported() {
    let env = CliTestEnv::new();
    let config = env.write_config("[api]\ntimeout_secs = 0\n");

    let output = run_bin(&env, &["--config", path_str(&config), "--list"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load configuration"), "stderr:\n{stderr}");
}
