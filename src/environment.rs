use std::future::Future;

use crate::{poller::Outcome, Error, Poller, PollSpec, Result};

/// Container/process launcher for the system under test.
///
/// Used only for environment setup and teardown; it is not part of the
/// synchronization core. Implementations shell out to a container
/// engine, talk to its API, or fake the whole thing in memory
/// ([`FakeRuntime`](crate::testing::FakeRuntime)).
pub trait ContainerRuntime: Send + Sync {
    /// Launch the composition named by `asset`.
    fn launch(&self, asset: &str) -> impl Future<Output = Result<()>> + Send;

    /// Stop all containers of the composition. Must succeed when
    /// nothing is running, so it can be used for leftover cleanup.
    fn kill(&self) -> impl Future<Output = Result<()>> + Send;

    /// Remove stopped containers.
    fn remove(&self) -> impl Future<Output = Result<()>> + Send;

    /// Run a command inside a service's container, returning its
    /// output.
    fn exec(&self, service: &str, command: &[&str]) -> impl Future<Output = Result<String>> + Send;

    /// The host port mapped to `internal` on the given service.
    fn service_port(
        &self,
        service: &str,
        internal: u16,
    ) -> impl Future<Output = Result<u16>> + Send;
}

/// Which asset to launch and how to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EnvironmentConfig {
    asset: String,
    service: String,
    ready: PollSpec,
}

impl EnvironmentConfig {
    /// `asset` names the composition to launch; `service` is the
    /// container that commands and port lookups target.
    pub fn new(asset: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            service: service.into(),
            ready: PollSpec::default(),
        }
    }

    /// Override how long and how often readiness is polled.
    pub fn with_ready(mut self, ready: PollSpec) -> Self {
        self.ready = ready;
        self
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn ready(&self) -> PollSpec {
        self.ready
    }
}

/// A launched test environment, torn down explicitly.
///
/// Built per scenario and passed by reference: no global state. Setup
/// clears leftovers from an earlier run, then launches the asset.
/// [`teardown`](Self::teardown) kills and removes the containers;
/// dropping an environment that was never torn down logs a warning so
/// leaked containers show up in test output.
///
/// # Example
///
/// ```ignore
/// let env = TestEnvironment::setup(
///     EnvironmentConfig::new("amqp", "ari_amqp"),
///     runtime,
/// ).await?;
/// env.await_ready(|| control.is_reachable()).await?;
/// let port = env.service_port(5672).await?;
/// // ... run the scenario ...
/// env.teardown().await?;
/// ```
#[derive(Debug)]
pub struct TestEnvironment<R: ContainerRuntime> {
    config: EnvironmentConfig,
    runtime: R,
    torn_down: bool,
}

impl<R: ContainerRuntime> TestEnvironment<R> {
    /// Clear leftovers and launch the asset.
    pub async fn setup(config: EnvironmentConfig, runtime: R) -> Result<Self> {
        tracing::info!(asset = config.asset(), "launching test environment");
        // Leftovers from an interrupted earlier run must not block the
        // launch; their cleanup failures are irrelevant.
        let _ = runtime.kill().await;
        let _ = runtime.remove().await;
        runtime.launch(config.asset()).await?;
        Ok(Self {
            config,
            runtime,
            torn_down: false,
        })
    }

    /// Poll `check` until the service answers, per the config's ready
    /// spec.
    ///
    /// The check may return `bool`, `Option<T>`, or `Result<T>` (see
    /// [`Outcome`]). A deadline with no diagnosable failure surfaces as
    /// [`Error::Connection`] naming the service.
    pub async fn await_ready<F, Fut, O>(&self, check: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = O>,
        O: Outcome,
    {
        let poller = Poller::new(self.config.ready())?;
        match poller.value(check).await {
            Ok(_) => Ok(()),
            Err(Error::Timeout { timeout, .. }) => Err(Error::Connection(format!(
                "service '{}' not ready within {:?}",
                self.config.service(),
                timeout
            ))),
            Err(e) => Err(e),
        }
    }

    /// Run a command inside the configured service's container.
    pub async fn exec(&self, command: &[&str]) -> Result<String> {
        self.runtime.exec(self.config.service(), command).await
    }

    /// The host port mapped to `internal` on the configured service.
    pub async fn service_port(&self, internal: u16) -> Result<u16> {
        self.runtime.service_port(self.config.service(), internal).await
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Kill and remove the containers.
    pub async fn teardown(mut self) -> Result<()> {
        tracing::info!(asset = self.config.asset(), "tearing down test environment");
        self.runtime.kill().await?;
        self.runtime.remove().await?;
        self.torn_down = true;
        Ok(())
    }
}

impl<R: ContainerRuntime> Drop for TestEnvironment<R> {
    fn drop(&mut self) {
        if !self.torn_down {
            tracing::warn!(
                asset = self.config.asset(),
                "environment dropped without teardown, containers may be left running"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    use super::*;
    use crate::testing::FakeRuntime;

    fn config() -> EnvironmentConfig {
        EnvironmentConfig::new("amqp", "ari_amqp").with_ready(PollSpec::new(
            Duration::from_secs(1),
            Duration::from_millis(10),
        ))
    }

    #[tokio::test]
    async fn setup_clears_leftovers_then_launches() {
        let runtime = FakeRuntime::new();
        let env = TestEnvironment::setup(config(), runtime).await.unwrap();

        assert!(env.runtime().is_running());
        assert_eq!(env.runtime().launched_assets(), vec!["amqp".to_string()]);
        assert!(env.runtime().kill_count() >= 1);
        env.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn await_ready_retries_until_the_service_answers() {
        let runtime = FakeRuntime::new();
        let env = TestEnvironment::setup(config(), runtime).await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        env.await_ready(move || {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            async move { n >= 3 }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        env.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn await_ready_times_out_as_connection_error() {
        let runtime = FakeRuntime::new();
        let env = TestEnvironment::setup(
            EnvironmentConfig::new("amqp", "ari_amqp").with_ready(PollSpec::new(
                Duration::from_millis(30),
                Duration::from_millis(10),
            )),
            runtime,
        )
        .await
        .unwrap();

        let err = env.await_ready(|| async { false }).await.unwrap_err();
        match err {
            Error::Connection(message) => assert!(message.contains("ari_amqp")),
            other => panic!("expected Connection, got {other}"),
        }
        env.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn exec_and_ports_target_the_configured_service() {
        let runtime = FakeRuntime::new();
        runtime.map_port("ari_amqp", 5672, 49154);
        let env = TestEnvironment::setup(config(), runtime).await.unwrap();

        env.exec(&["asterisk", "-rx", "module load res_stasis_amqp.so"])
            .await
            .unwrap();
        assert_eq!(env.service_port(5672).await.unwrap(), 49154);
        assert_eq!(
            env.runtime().exec_log(),
            vec![vec![
                "asterisk".to_string(),
                "-rx".to_string(),
                "module load res_stasis_amqp.so".to_string()
            ]]
        );
        env.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn teardown_kills_and_removes() {
        let runtime = FakeRuntime::new();
        let env = TestEnvironment::setup(config(), runtime).await.unwrap();
        let handle = env.runtime().clone();

        env.teardown().await.unwrap();
        assert!(!handle.is_running());
        assert!(handle.remove_count() >= 2);
    }
}
