use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{ContainerRuntime, Error, Result};

#[derive(Default)]
struct State {
    running: bool,
    launched_assets: Vec<String>,
    kill_count: usize,
    remove_count: usize,
    exec_log: Vec<Vec<String>>,
    ports: HashMap<(String, u16), u16>,
}

/// In-memory [`ContainerRuntime`].
///
/// Records every call; `exec` and `service_port` work only while the
/// fake composition is running. Cloning yields another handle to the
/// same runtime.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<State>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `internal` on `service` as host port `external`.
    pub fn map_port(&self, service: &str, internal: u16, external: u16) {
        self.lock().ports.insert((service.to_string(), internal), external);
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn launched_assets(&self) -> Vec<String> {
        self.lock().launched_assets.clone()
    }

    pub fn kill_count(&self) -> usize {
        self.lock().kill_count
    }

    pub fn remove_count(&self) -> usize {
        self.lock().remove_count
    }

    pub fn exec_log(&self) -> Vec<Vec<String>> {
        self.lock().exec_log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn launch(&self, asset: &str) -> Result<()> {
        let mut state = self.lock();
        state.running = true;
        state.launched_assets.push(asset.to_string());
        Ok(())
    }

    async fn kill(&self) -> Result<()> {
        let mut state = self.lock();
        state.running = false;
        state.kill_count += 1;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.lock().remove_count += 1;
        Ok(())
    }

    async fn exec(&self, service: &str, command: &[&str]) -> Result<String> {
        let mut state = self.lock();
        if !state.running {
            return Err(Error::Connection(format!(
                "service '{service}' is not running"
            )));
        }
        state
            .exec_log
            .push(command.iter().map(|s| s.to_string()).collect());
        Ok(String::new())
    }

    async fn service_port(&self, service: &str, internal: u16) -> Result<u16> {
        let state = self.lock();
        if !state.running {
            return Err(Error::Connection(format!(
                "service '{service}' is not running"
            )));
        }
        state
            .ports
            .get(&(service.to_string(), internal))
            .copied()
            .ok_or_else(|| {
                Error::Connection(format!("service '{service}' does not expose port {internal}"))
            })
    }
}

impl std::fmt::Debug for FakeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FakeRuntime")
            .field("running", &state.running)
            .field("launched_assets", &state.launched_assets)
            .finish_non_exhaustive()
    }
}
