//! Scripted collaborator fakes shared by the integration tests.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

use vigil::models::{ProbeReport, ProcessStatus};
use vigil::notify::Notify;
use vigil::orchestrator::ControlPlane;
use vigil::probe::HealthProbe;
use vigil::process::ProcessInspector;

/// Probe replaying a fixed per-endpoint script, repeating the final entry
/// once exhausted.
pub struct ScriptedProbe {
    scripts: Mutex<HashMap<String, Vec<ProbeReport>>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(self, endpoint: &str, reports: Vec<ProbeReport>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), reports);
        self
    }
}

impl HealthProbe for ScriptedProbe {
    fn probe(&self, endpoint: &str) -> ProbeReport {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(endpoint) {
            Some(script) if script.len() > 1 => script.remove(0),
            Some(script) => script[0].clone(),
            None => ProbeReport::unreachable(),
        }
    }
}

pub struct FakeInspector {
    pub status: ProcessStatus,
    pub log: Option<String>,
}

impl FakeInspector {
    pub fn unknown() -> Self {
        Self {
            status: ProcessStatus::Unknown,
            log: None,
        }
    }
}

impl ProcessInspector for FakeInspector {
    fn inspect(&self, _container: &str) -> ProcessStatus {
        self.status.clone()
    }

    fn log_tail(&self, _container: &str, _max_lines: usize) -> Option<String> {
        self.log.clone()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(String, String, bool)>>,
}

impl Notify for RecordingNotifier {
    fn notify(&self, header: &str, body: &str, success: bool) {
        self.messages
            .lock()
            .unwrap()
            .push((header.to_string(), body.to_string(), success));
    }
}

/// Control plane that records calls and always succeeds.
#[derive(Default)]
pub struct FakeControl {
    pub calls: Mutex<Vec<String>>,
}

impl ControlPlane for FakeControl {
    fn pull_latest(&self, branch: &str) -> Result<String> {
        self.calls.lock().unwrap().push(format!("pull:{branch}"));
        Ok("deadbee".to_string())
    }

    fn build(&self, profile: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("build:{profile}"));
        Ok(())
    }

    fn restart(&self, containers: &[String]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("restart:{}", containers.join(",")));
        Ok(())
    }
}
