use crate::backend::Backend;
use crate::backends::mock::MockBackend;
use crate::config::Config;
use crate::error::BackendError;
use crate::session::CaptureSession;
use crate::{MocapError, Result};
use std::collections::BTreeMap;

/// What a backend constructor returns.
pub type FactoryResult = std::result::Result<Box<dyn Backend>, BackendError>;

/// Constructs a connected backend from its configuration.
pub trait BackendFactory: Send + Sync {
    fn create(&self, config: &Config) -> FactoryResult;
}

impl<F> BackendFactory for F
where
    F: Fn(&Config) -> FactoryResult + Send + Sync,
{
    fn create(&self, config: &Config) -> FactoryResult {
        self(config)
    }
}

/// Maps backend ids to their factories.
///
/// Build one at startup, register every backend the application supports,
/// and pass it wherever sessions are opened.
#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, Box<dyn BackendFactory>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in backends (`mock`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MockBackend::ID, |cfg: &Config| -> FactoryResult {
            Ok(Box::new(MockBackend::from_config(cfg)?))
        });
        registry
    }

    /// Register `factory` under `id`, replacing any previous registration.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        factory: impl BackendFactory + 'static,
    ) -> &mut Self {
        let id = id.into();
        if self.factories.insert(id.clone(), Box::new(factory)).is_some() {
            log::warn!("Backend '{}' registered twice, keeping the latest", id);
        }
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn backend_ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Open a session on backend `id`.
    ///
    /// Fails with `UnknownBackend` before touching any backend if `id` is not
    /// registered, and with `Connection` if the backend's own connect fails.
    pub fn connect(&self, id: &str, config: &Config) -> Result<CaptureSession> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| MocapError::UnknownBackend {
                id: id.to_string(),
                available: self.backend_ids().map(str::to_string).collect(),
            })?;

        log::info!("Connecting to backend '{}' ({} config keys)", id, config.len());
        let backend = factory.create(config).map_err(|source| {
            log::warn!("Backend '{}' failed to connect: {}", id, source);
            MocapError::Connection {
                backend: id.to_string(),
                source,
            }
        })?;

        Ok(CaptureSession::from_boxed(backend))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
