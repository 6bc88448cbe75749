use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub socket: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl ConnectionConfig {
    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Copy used by `\c`: `None` keeps the current value.
    #[must_use]
    pub fn reconnect_as(&self, database: Option<&str>, user: Option<&str>) -> Self {
        let mut config = self.clone();
        if let Some(database) = database {
            config.database = database.to_string();
        }
        if let Some(user) = user {
            config.user = Some(user.to_string());
        }
        config
    }

    #[must_use]
    pub fn describe(&self) -> String {
        let mut target = String::new();
        if let Some(user) = &self.user {
            target.push_str(user);
            target.push('@');
        }
        match (&self.socket, &self.host) {
            (Some(socket), _) => target.push_str(socket),
            (None, Some(host)) => target.push_str(host),
            (None, None) => target.push_str("localhost"),
        }
        if let Some(port) = self.port {
            target.push(':');
            target.push_str(&port.to_string());
        }
        target.push('/');
        target.push_str(&self.database);
        target
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    #[default]
    CollectAll,
    FailFast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependencyPolicy {
    /// Dependencies are verified and their failures fail the run.
    #[default]
    Verify,
    /// Dependencies only contribute side effects; outcomes are ignored.
    SideEffectsOnly,
}

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub connection: ConnectionConfig,
    pub failure_mode: FailureMode,
    pub dependency_policy: DependencyPolicy,
    /// Initial session variables, visible to `:name` interpolation.
    pub variables: BTreeMap<String, String>,
    pub environment: BTreeMap<String, String>,
    pub inherit_process_env: bool,
    pub cancellation: CancellationToken,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            failure_mode: FailureMode::default(),
            dependency_policy: DependencyPolicy::default(),
            variables: BTreeMap::new(),
            environment: BTreeMap::new(),
            inherit_process_env: true,
            cancellation: CancellationToken::new(),
        }
    }
}

impl HarnessConfig {
    #[must_use]
    pub fn new(connection: ConnectionConfig) -> Self {
        Self {
            connection,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn env_var(&self, name: &str) -> Option<String> {
        if let Some(value) = self.environment.get(name) {
            return Some(value.clone());
        }
        if self.inherit_process_env {
            return std::env::var(name).ok();
        }
        None
    }
}
