// tests/cli_exit.rs
//
// Exit status and stderr of the `pbspipe` binary.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Fake `qsub`: every log is clean except `mstransform` for spw1.
const QSUB: &str = r#"#!/bin/sh
log="${1%.pbs}.log"
case "$1" in
  */mstransform_spw1.pbs) echo "Error: no rows selected" > "$log" ;;
  *) echo "done" > "$log" ;;
esac
echo "$$.fakeserver"
"#;

const QSTAT: &str = "#!/bin/sh\nexit 153\n";

fn executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn pbspipe(config: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pbspipe"))
        .arg("--config")
        .arg(config)
        .arg("--no-log-file")
        .env("PBSPIPE_LOG", "warn")
        .output()
        .unwrap()
}

// One test so that no other thread forks while the stand-ins are being
// written (which would make exec fail with ETXTBSY).
#[test]
fn exit_status_reports_failed_partitions() {
    let bin = tempfile::tempdir().unwrap();
    let qsub = executable(bin.path(), "qsub", QSUB);
    let qstat = executable(bin.path(), "qstat", QSTAT);

    let work = tempfile::tempdir().unwrap();
    let config = work.path().join("Pipeline.toml");
    fs::write(
        &config,
        format!(
            r#"
[pipeline]
ms_name = "rcs.ms"
engine_dir = "/opt/casa"
work_dir = "{work}"
poll_interval = "1ms"

[fields]
amp_cal = "3C286"
phase_cal = "1634+627"
source = "RXCS"

[scheduler]
submit_cmd = "{qsub}"
status_cmd = "{qstat}"

[[partition]]
name = "spw0"
spw = "0:124~573"

[[partition]]
name = "spw1"
spw = "1:0~500"
"#,
            work = work.path().display(),
            qsub = qsub.display(),
            qstat = qstat.display(),
        ),
    )
    .unwrap();

    let out = pbspipe(&config);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(out.status.code(), Some(1), "{stderr}");
    assert!(stderr.contains("pbspipe error"), "{stderr}");
    assert!(
        stderr.contains("stage 'mstransform' failed for partitions: spw1"),
        "{stderr}"
    );
    assert!(!work.path().join("spw0").join("flag_cal_spw0.pbs").exists());

    // A config that cannot be read exits the same way.
    let out = pbspipe(&work.path().join("missing.toml"));
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("pbspipe error"));
}
