//! Keeps one idle-process pool per engine name so a worker doesn't pay a fresh
//! spawn-plus-handshake on every game. The lease that hands a process out is released
//! through Rust's `Drop`, not a manually-invoked scope guard.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::engine::EngineConfiguration;
use crate::engine::process::{DEFAULT_HANDSHAKE_TIMEOUT, UciProcess};
use crate::error::{AppError, Res};
use crate::output::Output;

pub struct EngineCache {
    configs: HashMap<String, EngineConfiguration>,
    idle: Mutex<HashMap<String, Vec<UciProcess>>>,
    output: Arc<dyn Output>,
}

impl EngineCache {
    #[must_use]
    pub fn new(configs: Vec<EngineConfiguration>, output: Arc<dyn Output>) -> Self {
        let configs = configs.into_iter().map(|c| (c.name.clone(), c)).collect();
        Self { configs, idle: Mutex::new(HashMap::new()), output }
    }

    #[must_use]
    pub fn config(&self, name: &str) -> Option<&EngineConfiguration> {
        self.configs.get(name)
    }

    /// Pops a warmed-up process for `name` if one is idle, otherwise spawns and
    /// hand-shakes a new one. Either way the returned lease behaves identically to
    /// its caller.
    pub fn acquire(self: &Arc<Self>, name: &str) -> Res<EngineLease> {
        let config = self
            .config(name)
            .ok_or_else(|| AppError::Config(format!("no engine configuration named '{name}'")))?
            .clone();

        let cached = self.idle.lock().expect("engine cache mutex poisoned").get_mut(name).and_then(Vec::pop);
        let process = match cached {
            Some(process) => process,
            None => {
                let mut process = UciProcess::spawn(&config, Arc::clone(&self.output))?;
                process.handshake(DEFAULT_HANDSHAKE_TIMEOUT)?;
                for (opt_name, value) in &config.uci_options {
                    process.set_option(opt_name, value)?;
                }
                process.isready(DEFAULT_HANDSHAKE_TIMEOUT)?;
                process
            }
        };
        Ok(EngineLease { process: Some(process), name: name.to_string(), cache: Arc::clone(self), poisoned: false })
    }

    fn reclaim(&self, name: &str, process: UciProcess) {
        self.idle.lock().expect("engine cache mutex poisoned").entry(name.to_string()).or_default().push(process);
    }

    /// Drains and quits every idle process, giving each the standard quit grace.
    pub fn shutdown_all(&self, grace: Duration) {
        let mut idle = self.idle.lock().expect("engine cache mutex poisoned");
        for (_, processes) in idle.drain() {
            for mut process in processes {
                let _ = process.quit_and_reap(grace);
            }
        }
    }
}

/// A leased engine process. Returns to the cache's idle pool on drop unless the
/// caller marked it `poison()`-ed, in which case it's quit and dropped for good
/// (used when the engine misbehaved and might be left in a wedged state).
pub struct EngineLease {
    process: Option<UciProcess>,
    name: String,
    cache: Arc<EngineCache>,
    poisoned: bool,
}

impl EngineLease {
    pub fn poison(&mut self) {
        self.poisoned = true;
    }
}

impl std::ops::Deref for EngineLease {
    type Target = UciProcess;
    fn deref(&self) -> &UciProcess {
        self.process.as_ref().expect("engine lease process taken before drop")
    }
}

impl std::ops::DerefMut for EngineLease {
    fn deref_mut(&mut self) -> &mut UciProcess {
        self.process.as_mut().expect("engine lease process taken before drop")
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        if let Some(process) = self.process.take() {
            if self.poisoned {
                drop(process);
            } else {
                self.cache.reclaim(&self.name, process);
            }
        }
    }
}
