use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[derive(Debug)]
pub struct JsnapRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

/// Isolated working directory; also used as `HOME` so no user config leaks in.
pub struct JsnapWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl JsnapWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read(&self, relative: impl AsRef<Path>) -> String {
        fs::read_to_string(self.root.join(relative)).expect("read file")
    }
}

pub fn run_jsnap<I, S>(workspace: &JsnapWorkspace, args: I, label: &str) -> JsnapRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_jsnap_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_jsnap_with_env<I, S, E, K, V>(
    workspace: &JsnapWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> JsnapRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jsnap"));
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    cmd.env_remove("JIRA_API_TOKEN");
    cmd.env_remove("JIRA_USER");
    cmd.env_remove("JIRA_SERVER");
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "jira_snapshot=debug");
    cmd.env("HOME", &workspace.root);

    let start = Instant::now();
    let output = cmd.output().expect("run jsnap");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let log_body = format!(
        concat!(
            "label: {}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\n",
            "stdout:\n{}\n\nstderr:\n{}\n"
        ),
        label,
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    JsnapRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}
