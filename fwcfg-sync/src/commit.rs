//! Commits and commit-job polling.
//!
//! A commit is accepted as a job. With [`CommitOptions::sync`] the session
//! polls the job at `interval` until the device reports it finished, sleeping
//! the calling thread in between. A timeout returns [`Error::Timeout`] and
//! leaves the job running on the device.

use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};
use xml_doc_core::XmlNode;

use crate::error::{Error, Result};
use crate::protocol::{Action, Request, Transport};
use crate::session::Session;
use crate::settings::SyncSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOptions {
    /// Commit even when the device reports no pending changes.
    pub force: bool,
    pub description: Option<String>,
    /// Wait for the job to finish.
    pub sync: bool,
    pub interval: Duration,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl CommitOptions {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            force: false,
            description: None,
            sync: true,
            interval: settings.commit_interval(),
            timeout: settings.commit_timeout(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Submit only; do not wait for the job.
    pub fn asynchronous(mut self) -> Self {
        self.sync = false;
        self
    }

    fn command(&self) -> XmlNode {
        let mut cmd = XmlNode::new("commit");
        if self.force {
            cmd = cmd.child(XmlNode::new("force"));
        }
        if let Some(description) = &self.description {
            cmd = cmd.child(XmlNode::with_text("description", description.as_str()));
        }
        cmd
    }
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::default())
    }
}

/// Outcome of a submitted commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub job_id: String,
    /// False when the commit was submitted without waiting.
    pub finished: bool,
    pub success: bool,
    pub messages: Vec<String>,
}

fn job_cmd(job_id: &str) -> XmlNode {
    XmlNode::new("show").child(XmlNode::new("jobs").child(XmlNode::with_text("id", job_id)))
}

fn lines(node: Option<&XmlNode>) -> Vec<String> {
    let Some(node) = node else {
        return Vec::new();
    };
    let lines: Vec<String> = node
        .get_children("line")
        .into_iter()
        .filter_map(|l| l.text.clone())
        .collect();
    if lines.is_empty() {
        node.text.iter().cloned().collect()
    } else {
        lines
    }
}

impl<T: Transport> Session<T> {
    /// Commit the candidate configuration of the connected device.
    ///
    /// Returns `Ok(None)` when there was nothing to commit.
    pub fn commit(&mut self, options: &CommitOptions) -> Result<Option<CommitResult>> {
        let request = Request::new(Action::Commit).with_element(options.command());
        let response = self.execute(&request)?;
        let job_id = response
            .document
            .as_ref()
            .and_then(|r| r.get_text(&["job"]))
            .map(|id| id.trim().to_string());

        let Some(job_id) = job_id else {
            let message = response.message.unwrap_or_default();
            if response.code.as_deref() == Some("19")
                || message.to_ascii_lowercase().contains("no changes")
            {
                info!("nothing to commit");
                return Ok(None);
            }
            return Err(Error::Document(format!(
                "commit accepted without a job id: {message}"
            )));
        };
        info!(%job_id, "commit submitted");

        if !options.sync {
            return Ok(Some(CommitResult {
                job_id,
                finished: false,
                success: false,
                messages: response.message.into_iter().collect(),
            }));
        }
        self.wait_for_job(&job_id, options.interval, options.timeout)
            .map(Some)
    }

    /// Poll `job_id` until it finishes or `timeout` passes.
    pub fn wait_for_job(
        &mut self,
        job_id: &str,
        interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<CommitResult> {
        let started = Instant::now();
        loop {
            let result = self.op(job_cmd(job_id))?;
            let job = result
                .as_ref()
                .and_then(|r| r.get_child("job"))
                .ok_or_else(|| Error::Document(format!("no status for job {job_id}")))?;
            let status = job.get_text(&["status"]).unwrap_or_default();
            if status == "FIN" {
                let success = job.get_text(&["result"]) == Some("OK");
                let messages = lines(job.get_child("details"));
                info!(%job_id, success, "commit finished");
                return Ok(CommitResult {
                    job_id: job_id.to_string(),
                    finished: true,
                    success,
                    messages,
                });
            }
            if let Some(limit) = timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(Error::Timeout {
                        job_id: job_id.to_string(),
                        waited,
                    });
                }
            }
            debug!(%job_id, status, "commit job still running");
            thread::sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::CommitOptions;
    use crate::emulator::MemoryDevice;
    use crate::error::Error;
    use crate::protocol::{Action, Request, Transport};
    use crate::session::Session;

    fn fast() -> CommitOptions {
        CommitOptions {
            interval: Duration::from_millis(1),
            ..CommitOptions::default()
        }
    }

    fn dirty_device() -> MemoryDevice {
        let mut device = MemoryDevice::firewall("10.1.0");
        let request = Request::at(Action::Set, "/config/shared")
            .with_element(xml_doc_core::XmlNode::new("tag"));
        device.execute(&request).expect("set");
        device
    }

    #[test]
    fn nothing_to_commit() {
        let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
        assert_eq!(session.commit(&fast()).expect("commit"), None);
    }

    #[test]
    fn sync_commit_polls_until_finished() {
        let mut device = dirty_device();
        device.set_commit_polls(Some(3));
        let mut session = Session::new(device);
        let result = session
            .commit(&fast().with_description("nightly"))
            .expect("commit")
            .expect("job");
        assert!(result.finished && result.success);
        assert_eq!(result.messages, ["Configuration committed successfully"]);

        let polls = session
            .transport()
            .expect("single")
            .requests()
            .iter()
            .filter(|r| r.action == Action::Op)
            .count();
        assert_eq!(polls, 4);
    }

    #[test]
    fn failed_commit_carries_details() {
        let mut device = dirty_device();
        device.set_commit_success(false);
        let mut session = Session::new(device);
        let result = session.commit(&fast()).expect("commit").expect("job");
        assert!(result.finished);
        assert!(!result.success);
        assert_eq!(result.messages.len(), 2);
    }

    #[test]
    fn async_commit_returns_job_id() {
        let mut session = Session::new(dirty_device());
        let result = session
            .commit(&fast().asynchronous())
            .expect("commit")
            .expect("job");
        assert_eq!(result.job_id, "1");
        assert!(!result.finished);
    }

    #[test]
    fn timeout_leaves_job_running() {
        let mut device = dirty_device();
        device.set_commit_polls(None);
        let mut session = Session::new(device);
        let options = CommitOptions {
            timeout: Some(Duration::from_millis(20)),
            ..fast()
        };
        let err = session.commit(&options).expect_err("timeout");
        assert!(matches!(err, Error::Timeout { ref job_id, .. } if job_id == "1"));
    }

    #[test]
    fn force_commits_clean_candidate() {
        let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
        let options = CommitOptions {
            force: true,
            ..fast()
        };
        assert!(session.commit(&options).expect("commit").is_some());
    }
}
