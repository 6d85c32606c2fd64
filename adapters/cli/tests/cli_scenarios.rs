use std::{fs, path::PathBuf, process::Command};

fn scenario(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

fn blast_grid(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_blast-grid"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch blast-grid binary");

    assert!(
        output.status.success(),
        "blast-grid {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is utf-8")
}

#[test]
fn bundled_scenarios_run_to_an_outcome() {
    for name in ["chain_reaction.toml", "generated_stage.toml"] {
        let path = scenario(name);
        let stdout = blast_grid(&[path.to_str().expect("utf-8 path")]);

        assert!(stdout.contains("StageLoaded"), "{name}: {stdout}");
        assert!(stdout.contains("outcome: "), "{name}: {stdout}");
        assert!(stdout.contains("player 1 "), "{name}: {stdout}");
    }
}

#[test]
fn exported_session_resumes_from_saved_tick() {
    let path = scenario("chain_reaction.toml");
    let path = path.to_str().expect("utf-8 path");
    let saved = std::env::temp_dir().join(format!("blast-grid-{}.session", std::process::id()));
    let saved_arg = saved.to_str().expect("utf-8 path");

    let _ = blast_grid(&[path, "--ticks", "5", "--export", saved_arg]);
    let encoded = fs::read_to_string(&saved).expect("session file written");
    assert!(encoded.starts_with("blast:v1:11x7:"), "{encoded}");

    let stdout = blast_grid(&[path, "--ticks", "1", "--resume", saved_arg]);
    fs::remove_file(&saved).expect("remove session file");

    assert!(
        stdout.lines().any(|line| line.trim_start().starts_with("6 TimeAdvanced")),
        "resumed run should continue at tick 6: {stdout}"
    );
    assert!(!stdout.contains("StageLoaded"), "{stdout}");
}
