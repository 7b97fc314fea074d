// Application state shared by every HTTP handler

use crate::config::MarketConfig;
use crate::engine::{EngineSnapshot, MarketEngine};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub engine: MarketEngine,
    /// Where the engine snapshot is written on shutdown
    pub state_path: PathBuf,
    pub started_at: u64,
}

impl AppState {
    pub fn new(engine: MarketEngine, state_path: impl Into<PathBuf>) -> Self {
        let started_at = engine.now();
        Self { engine, state_path: state_path.into(), started_at }
    }

    /// Restore the last snapshot from `state_path`, or start an empty engine
    /// with `config` if there is none.
    ///
    /// A restored snapshot keeps its own configuration, so admin updates
    /// survive restarts.
    pub fn load_or_new(config: MarketConfig, state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let engine = match Self::load_from_disk(&state_path) {
            Ok(engine) => {
                info!(path = %state_path.display(), "loaded persisted state");
                engine
            }
            Err(e) => {
                info!(
                    path = %state_path.display(),
                    reason = %e,
                    "no persisted state, starting fresh"
                );
                MarketEngine::new(config)
            }
        };
        Self::new(engine, state_path)
    }

    pub fn save_to_disk(&self) -> Result<(), String> {
        let snapshot = self.engine.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| format!("Failed to serialize state: {}", e))?;

        if let Some(parent) = self.state_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create state directory: {}", e))?;
        }
        fs::write(&self.state_path, json)
            .map_err(|e| format!("Failed to write state file: {}", e))?;

        info!(
            path = %self.state_path.display(),
            markets = snapshot.markets.len(),
            assertions = snapshot.assertions.len(),
            "state saved to disk"
        );
        Ok(())
    }

    fn load_from_disk(path: &Path) -> Result<MarketEngine, String> {
        let json = fs::read_to_string(path).map_err(|_| "No state file found".to_string())?;
        let snapshot: EngineSnapshot =
            serde_json::from_str(&json).map_err(|e| format!("Failed to deserialize state: {}", e))?;
        MarketEngine::from_snapshot(snapshot).map_err(|e| {
            warn!(error = %e, "persisted state rejected");
            format!("Invalid persisted state: {}", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("opm-{}-{}", name, uuid::Uuid::new_v4()))
            .join("state.json")
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("reload");
        let state = AppState::new(MarketEngine::new(MarketConfig::default()), &path);
        state.engine.mint_collateral("admin", "alice", 500).unwrap();
        state.save_to_disk().unwrap();

        let restored = AppState::load_or_new(MarketConfig::default(), &path);
        assert_eq!(restored.engine.collateral_balance("alice"), 500);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_starts_fresh() {
        let state = AppState::load_or_new(MarketConfig::default(), temp_path("missing"));
        assert!(state.engine.markets().is_empty());
    }
}
