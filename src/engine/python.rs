use super::{types::*, Engine};
use crate::config::Config;
use crate::util::expand_tilde;
use anyhow::{anyhow, Context, Result};
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const STDOUT_TAIL_BYTES: usize = 2048;

pub struct PythonEngine {
    cfg: Config,
    base_dir: PathBuf,
    scripts_dir: PathBuf,
    python_exe: PathBuf,
}

impl PythonEngine {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cfg: cfg.clone(),
            base_dir: cfg.base_dir(),
            scripts_dir: cfg.scripts_dir(),
            python_exe: resolve_python_exe(&cfg.python.python_exe),
        }
    }

    fn script(&self, name: &str) -> Result<PathBuf> {
        let path = self.scripts_dir.join(name);
        if !path.exists() {
            return Err(anyhow!("missing script: {}", path.display()));
        }
        Ok(path)
    }

    fn timeout(&self) -> Option<Duration> {
        match self.cfg.pipeline.step_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    fn run<I, S>(&self, step: &str, args: I, timeout: Option<Duration>) -> Result<StepOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let started = Instant::now();
        let mut cmd = Command::new(&self.python_exe);
        cmd.args(args);
        cmd.current_dir(&self.base_dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        debug!(step, ?cmd, ?timeout, "python run");

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {} for {step}", self.python_exe.display()))?;

        let output = match timeout {
            Some(t) => wait_with_timeout(&mut child, t)?,
            None => child
                .wait_with_output()
                .with_context(|| "waiting for python")?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{step} failed ({}):\n{}",
                output.status,
                stderr.trim()
            ));
        }

        if self.cfg.pipeline.keep_python_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("python stderr {step}: {}", stderr.trim());
        }

        Ok(StepOutput {
            step: step.to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            stdout_tail: tail(&String::from_utf8_lossy(&output.stdout), STDOUT_TAIL_BYTES),
        })
    }

    fn python_version(&self) -> Option<String> {
        let out = Command::new(&self.python_exe)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !out.status.success() {
            return None;
        }
        // Older interpreters print the version on stderr.
        let raw = if out.stdout.is_empty() {
            out.stderr
        } else {
            out.stdout
        };
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("QUESTIONNAIRE_PYTHON") {
            return expand_tilde(&env_val);
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn tail(s: &str, max: usize) -> String {
    let s = s.trim_end();
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

impl Engine for PythonEngine {
    fn doctor(&self) -> Result<Diag> {
        let python_version = self.python_version();
        let names = [
            self.cfg.pipeline.detect_script.clone(),
            self.cfg.pipeline.export_script.clone(),
            self.cfg.pipeline.template_file.clone(),
        ];
        let artifacts: Vec<ArtifactStatus> = names
            .into_iter()
            .map(|name| {
                let dir = if name == self.cfg.pipeline.template_file {
                    &self.base_dir
                } else {
                    &self.scripts_dir
                };
                ArtifactStatus {
                    present: dir.join(&name).exists(),
                    name,
                }
            })
            .collect();
        let ok = python_version.is_some() && artifacts.iter().all(|a| a.present);
        Ok(Diag {
            python_exe: self.python_exe.display().to_string(),
            python_version,
            scripts_dir: self.scripts_dir.display().to_string(),
            artifacts,
            ok,
        })
    }

    fn detect(&self, template: &Path, pdf: &Path, out_json: &Path) -> Result<StepOutput> {
        let script = self.script(&self.cfg.pipeline.detect_script)?;
        let args = [
            script.as_os_str(),
            template.as_os_str(),
            pdf.as_os_str(),
            out_json.as_os_str(),
        ];
        self.run("detect", args, self.timeout())
    }

    fn export_excel(&self, fusion_json: &Path, out_xlsx: &Path) -> Result<StepOutput> {
        let script = self.script(&self.cfg.pipeline.export_script)?;
        let args = [
            script.as_os_str(),
            fusion_json.as_os_str(),
            out_xlsx.as_os_str(),
        ];
        self.run("export", args, self.timeout())
    }

    fn pip_install(&self, packages: &[String]) -> Result<PipReport> {
        if packages.is_empty() {
            return Ok(PipReport {
                packages: Vec::new(),
                ok: true,
                error: None,
            });
        }
        info!("installing python packages: {}", packages.join(" "));
        let mut args: Vec<String> = vec!["-m".into(), "pip".into(), "install".into()];
        args.extend(self.cfg.python.pip_args.iter().cloned());
        args.extend(packages.iter().cloned());

        let timeout = match self.cfg.python.pip_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let res = self.run("pip install", &args, timeout);
        Ok(PipReport {
            packages: packages.to_vec(),
            ok: res.is_ok(),
            error: res.err().map(|e| format!("{e:#}")),
        })
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so chatty scripts can't block on a full pipe buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("python process timed out after {:?}", timeout);
            let _ = child.kill();
            child.wait().with_context(|| "wait after kill")?;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            let _ = stdout_thread.join();
            return Err(anyhow!(
                "python process exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr)
            ));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_end() {
        assert_eq!(tail("abcdef\n", 3), "def");
        assert_eq!(tail("ab", 10), "ab");
        // never splits a multi-byte char
        assert_eq!(tail("cochée", 2), "e");
    }

    #[test]
    fn missing_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.paths.base_dir = dir.path().display().to_string();
        let engine = PythonEngine::new(&cfg);
        let err = engine
            .detect(
                Path::new("template.json"),
                Path::new("a.pdf"),
                Path::new("out.json"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("missing script"));
    }

    #[test]
    fn relative_base_dir_runs_scripts_once_resolved() {
        let dir = tempfile::Builder::new()
            .prefix("rel_base")
            .tempdir_in(".")
            .unwrap();
        let rel = dir.path().file_name().unwrap().to_str().unwrap();
        std::fs::write(dir.path().join("detect0.py"), "cp \"$1\" \"$3\"\n").unwrap();
        std::fs::write(dir.path().join("template.json"), "{}").unwrap();

        let mut cfg = Config::default();
        cfg.paths.base_dir = rel.to_string();
        cfg.python.python_exe = "/bin/sh".into();
        let engine = PythonEngine::new(&cfg);
        let out = cfg.results_dir().join("out.json");
        std::fs::create_dir_all(cfg.results_dir()).unwrap();

        engine
            .detect(&cfg.template_path(), Path::new("scan.pdf"), &out)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "{}");
    }

    #[test]
    fn doctor_checks_template_in_base_and_scripts_in_scripts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("detect0.py"), "").unwrap();
        std::fs::write(scripts.join("json2excel.py"), "").unwrap();
        // in the wrong directory for the template
        std::fs::write(scripts.join("template.json"), "{}").unwrap();

        let mut cfg = Config::default();
        cfg.paths.base_dir = dir.path().display().to_string();
        cfg.paths.scripts_dir = "scripts".into();
        cfg.python.python_exe = dir.path().join("no-python").display().to_string();
        let engine = PythonEngine::new(&cfg);

        let diag = engine.doctor().unwrap();
        let present = |name: &str| {
            diag.artifacts
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.present)
        };
        assert_eq!(present("detect0.py"), Some(true));
        assert_eq!(present("json2excel.py"), Some(true));
        assert_eq!(present("template.json"), Some(false));
        assert!(diag.python_version.is_none());
        assert!(!diag.ok);
        assert!(diag.scripts_dir.ends_with("scripts"));

        std::fs::write(dir.path().join("template.json"), "{}").unwrap();
        let diag = engine.doctor().unwrap();
        assert!(diag.artifacts.iter().all(|a| a.present));
        // still not ok without an interpreter
        assert!(!diag.ok);
    }
}
