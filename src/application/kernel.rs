//! Application kernel - provider lifecycle around a container and an event bus

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::application::container::Container;
use crate::application::errors::BotError;
use crate::application::events::Emitter;
use crate::infrastructure::config::Config;

/// A unit that registers bindings and hooks into the application lifecycle.
///
/// Every hook defaults to a no-op.
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Register bindings to the container
    fn register(&self, _app: &Application) -> Result<(), BotError> {
        Ok(())
    }

    /// The container bindings have been registered
    async fn boot(&self, _app: &Application) -> Result<(), BotError> {
        Ok(())
    }

    /// The application has been booted
    async fn start(&self, _app: &Application) -> Result<(), BotError> {
        Ok(())
    }

    /// Every provider has started
    async fn ready(&self, _app: &Application) -> Result<(), BotError> {
        Ok(())
    }

    /// The application is terminating
    async fn shutdown(&self, _app: &Application) -> Result<(), BotError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Created,
    Registered,
    Booted,
    Started,
    Ready,
    Terminated,
}

/// Why the application stopped waiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    Requested,
    Interrupted,
    Failed(String),
}

/// Clonable handle that lets background tasks end the application
#[derive(Clone)]
pub struct ExitHandle {
    tx: Arc<watch::Sender<Option<ExitReason>>>,
}

impl ExitHandle {
    pub fn request(&self) {
        self.tx.send_if_modified(|current| set_once(current, ExitReason::Requested));
    }

    pub fn fail(&self, reason: impl Into<String>) {
        let reason = ExitReason::Failed(reason.into());
        self.tx.send_if_modified(|current| set_once(current, reason));
    }
}

// The first reason wins.
fn set_once(current: &mut Option<ExitReason>, reason: ExitReason) -> bool {
    if current.is_some() {
        return false;
    }
    *current = Some(reason);
    true
}

/// The application: container, emitter and providers
pub struct Application {
    container: Container,
    emitter: Arc<Emitter>,
    providers: Vec<Arc<dyn ServiceProvider>>,
    state: Mutex<AppState>,
    exit_tx: Arc<watch::Sender<Option<ExitReason>>>,
}

impl Application {
    pub fn new(config: Config) -> Self {
        let container = Container::new();
        container.instance(Arc::new(config));

        let emitter = Arc::new(Emitter::new());
        container.instance(Arc::clone(&emitter));

        let (exit_tx, _) = watch::channel(None);

        Self {
            container,
            emitter,
            providers: Vec::new(),
            state: Mutex::new(AppState::Created),
            exit_tx: Arc::new(exit_tx),
        }
    }

    pub fn with_provider<P: ServiceProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn emitter(&self) -> Arc<Emitter> {
        Arc::clone(&self.emitter)
    }

    pub fn config(&self) -> Result<Arc<Config>, BotError> {
        self.container.make::<Config>()
    }

    pub fn exit_handle(&self) -> ExitHandle {
        ExitHandle {
            tx: Arc::clone(&self.exit_tx),
        }
    }

    pub fn state(&self) -> AppState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: AppState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        tracing::debug!("Application state: {:?}", state);
    }

    /// Run `register` then `boot` on every provider
    pub async fn boot(&self) -> Result<(), BotError> {
        if self.state() != AppState::Created {
            return Err(BotError::Internal(format!(
                "application cannot boot from state {:?}",
                self.state()
            )));
        }

        for provider in &self.providers {
            tracing::debug!("Registering provider {}", provider.name());
            provider.register(self)?;
        }
        self.set_state(AppState::Registered);

        for provider in &self.providers {
            provider.boot(self).await?;
        }
        self.set_state(AppState::Booted);
        Ok(())
    }

    /// Run `start` then `ready` on every provider
    pub async fn start(&self) -> Result<(), BotError> {
        if self.state() != AppState::Booted {
            return Err(BotError::Internal(format!(
                "application cannot start from state {:?}",
                self.state()
            )));
        }

        for provider in &self.providers {
            provider.start(self).await?;
        }
        self.set_state(AppState::Started);

        for provider in &self.providers {
            provider.ready(self).await?;
        }
        self.set_state(AppState::Ready);
        tracing::info!("Application ready with {} providers", self.providers.len());
        Ok(())
    }

    /// Wait for Ctrl-C or an exit request from a provider
    pub async fn wait(&self) -> ExitReason {
        let mut rx = self.exit_tx.subscribe();
        let requested = async {
            loop {
                let current = rx.borrow_and_update().clone();
                if let Some(reason) = current {
                    return reason;
                }
                if rx.changed().await.is_err() {
                    return ExitReason::Requested;
                }
            }
        };

        tokio::select! {
            reason = requested => reason,
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                }
                ExitReason::Interrupted
            }
        }
    }

    /// Shut providers down in reverse order. Errors are logged, not returned.
    pub async fn shutdown(&self) {
        if self.state() == AppState::Terminated {
            return;
        }
        for provider in self.providers.iter().rev() {
            if let Err(e) = provider.shutdown(self).await {
                tracing::error!("Provider {} failed to shut down: {}", provider.name(), e);
            }
        }
        self.set_state(AppState::Terminated);
    }

    /// Full lifecycle: boot, start, wait, shutdown
    pub async fn run(&self) -> Result<(), BotError> {
        if let Err(e) = self.boot_and_start().await {
            self.shutdown().await;
            return Err(e);
        }

        let reason = self.wait().await;
        tracing::info!("Shutting down ({:?})", reason);
        self.shutdown().await;

        match reason {
            ExitReason::Failed(msg) => Err(BotError::Gateway(msg)),
            ExitReason::Requested | ExitReason::Interrupted => Ok(()),
        }
    }

    async fn boot_and_start(&self) -> Result<(), BotError> {
        self.boot().await?;
        self.start().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_on_start: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                log: Arc::clone(log),
                fail_on_start: false,
            }
        }

        fn push(&self, phase: &str) {
            self.log.lock().unwrap().push(format!("{}:{}", self.name, phase));
        }
    }

    #[async_trait]
    impl ServiceProvider for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn register(&self, _app: &Application) -> Result<(), BotError> {
            self.push("register");
            Ok(())
        }

        async fn boot(&self, _app: &Application) -> Result<(), BotError> {
            self.push("boot");
            Ok(())
        }

        async fn start(&self, app: &Application) -> Result<(), BotError> {
            self.push("start");
            if self.fail_on_start {
                return Err(BotError::Internal("start failed".to_string()));
            }
            app.exit_handle().request();
            Ok(())
        }

        async fn ready(&self, _app: &Application) -> Result<(), BotError> {
            self.push("ready");
            Ok(())
        }

        async fn shutdown(&self, _app: &Application) -> Result<(), BotError> {
            self.push("shutdown");
            Ok(())
        }
    }

    #[tokio::test]
    async fn hooks_run_in_phase_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let app = Application::new(Config::default())
            .with_provider(Recorder::new("a", &log))
            .with_provider(Recorder::new("b", &log));

        app.run().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:register", "b:register", "a:boot", "b:boot", "a:start", "b:start",
                "a:ready", "b:ready", "b:shutdown", "a:shutdown",
            ]
        );
        assert_eq!(app.state(), AppState::Terminated);
    }

    #[tokio::test]
    async fn failed_exit_is_an_error() {
        let app = Application::new(Config::default());
        app.boot().await.unwrap();
        app.start().await.unwrap();

        let handle = app.exit_handle();
        handle.fail("gateway closed");
        handle.request();

        assert_eq!(app.wait().await, ExitReason::Failed("gateway closed".to_string()));
    }

    #[tokio::test]
    async fn start_failure_still_shuts_down() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut failing = Recorder::new("a", &log);
        failing.fail_on_start = true;
        let app = Application::new(Config::default()).with_provider(failing);

        assert!(app.run().await.is_err());
        assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("a:shutdown"));
    }

    #[tokio::test]
    async fn cannot_boot_twice() {
        let app = Application::new(Config::default());
        app.boot().await.unwrap();
        assert!(app.boot().await.is_err());
    }

    #[test]
    fn config_and_emitter_are_bound() {
        let app = Application::new(Config::default());
        assert!(app.config().is_ok());
        let emitter = app.container().make::<Emitter>().unwrap();
        assert!(Arc::ptr_eq(&emitter, &app.emitter()));
    }
}
