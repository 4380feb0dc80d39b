//! Testing utilities for the promptcut workspace
//!
//! Shared fixtures: scripted generation clients, canned plugins that
//! pass/fail/count, and session directory scaffolding.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use promptcut_gen::{GenerationClient, GenerationRequest, GenerationServiceError};
use promptcut_plugins::{IoMap, SandboxFailure, ToolPlugin, Verdict};

/// Generation client that replays queued responses in order.
///
/// Each queued item is the full candidate list for one `generate` call;
/// queue exhaustion yields an empty candidate list. Every request's user
/// content is recorded for assertions.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<Vec<String>, GenerationServiceError>>>,
    fallback: Mutex<Option<Vec<String>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same single candidate.
    pub fn always(script: &str) -> Self {
        let client = Self::new();
        *client.fallback.lock() = Some(vec![script.to_string()]);
        client
    }

    pub fn push_candidates(&self, candidates: Vec<String>) {
        self.responses.lock().push_back(Ok(candidates));
    }

    pub fn push_error(&self, error: GenerationServiceError) {
        self.responses.lock().push_back(Err(error));
    }

    /// User content of every request seen so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, GenerationServiceError> {
        self.requests.lock().push(request.user_content.clone());
        match self.responses.lock().pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.lock().clone().unwrap_or_default()),
        }
    }
}

/// Plugin that certifies every candidate without running anything.
pub struct AlwaysPassPlugin {
    name: String,
}

impl AlwaysPassPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl ToolPlugin for AlwaysPassPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "test tool that accepts every script"
    }

    fn generation_instructions(&self) -> &str {
        "write anything"
    }

    fn prerequisites(&self) -> &str {
        "none"
    }

    fn sandbox_timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn validate(&self, _: &str, _: &Path, _: &IoMap, _: &IoMap) -> Verdict {
        Verdict::Pass
    }
}

/// Plugin that rejects every candidate with the same failure message.
pub struct AlwaysFailPlugin {
    name: String,
    message: String,
}

impl AlwaysFailPlugin {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ToolPlugin for AlwaysFailPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "test tool that rejects every script"
    }

    fn generation_instructions(&self) -> &str {
        "write anything; it will be rejected"
    }

    fn prerequisites(&self) -> &str {
        "none"
    }

    fn sandbox_timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn validate(&self, _: &str, _: &Path, _: &IoMap, _: &IoMap) -> Verdict {
        Verdict::Fail(SandboxFailure::Execution {
            code: Some(1),
            stderr: self.message.clone(),
        })
    }
}

/// Plugin that counts validations and delegates the verdict to an inner
/// plugin. Useful for proving scripts were (or were not) certified.
pub struct CountingPlugin<P> {
    inner: P,
    validations: Arc<AtomicUsize>,
}

impl<P: ToolPlugin> CountingPlugin<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            validations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of validation calls.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.validations.clone()
    }
}

#[async_trait]
impl<P: ToolPlugin> ToolPlugin for CountingPlugin<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn generation_instructions(&self) -> &str {
        self.inner.generation_instructions()
    }

    fn prerequisites(&self) -> &str {
        self.inner.prerequisites()
    }

    fn sandbox_timeout(&self) -> Duration {
        self.inner.sandbox_timeout()
    }

    async fn validate(
        &self,
        script: &str,
        sandbox_dir: &Path,
        inputs: &IoMap,
        outputs: &IoMap,
    ) -> Verdict {
        self.validations.fetch_add(1, Ordering::SeqCst);
        self.inner.validate(script, sandbox_dir, inputs, outputs).await
    }
}

/// A sessions root with one seed media file, for store tests.
pub struct SessionFixture {
    pub root: tempfile::TempDir,
    pub seed: PathBuf,
}

impl SessionFixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("temp sessions root");
        let seed = root.path().join("upload.mp4");
        std::fs::write(&seed, b"fixture video bytes").expect("seed file");
        Self { root, seed }
    }

    pub fn sessions_dir(&self) -> &Path {
        self.root.path()
    }
}

impl Default for SessionFixture {
    fn default() -> Self {
        Self::new()
    }
}
