use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Artifact location. Relative paths are resolved against the install
    /// location, see [`install_roots`].
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Exit at startup instead of serving in degraded mode when the model
    /// cannot be loaded.
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Browser origins allowed to call `/api/*`.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model").join("realstate_prices_mlp_model.json")
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "https://nepalestates.vercel.app".to_string(),
    ]
}

impl PredictionConfig {
    pub fn load() -> Result<Self, AppError> {
        core_config::load_settings(&["cors.allowed_origins"])
    }

    /// Absolute location of the model artifact.
    pub fn model_path(&self) -> PathBuf {
        resolve_model_path(&install_roots(), &self.model.path)
    }
}

/// Where the service is installed: the directory holding the executable,
/// then the crate directory for binaries run out of `target/`.
pub fn install_roots() -> Vec<PathBuf> {
    let mut roots = Vec::with_capacity(2);
    match std::env::current_exe() {
        Ok(exe) => {
            if let Some(dir) = exe.parent() {
                roots.push(dir.to_path_buf());
            }
        }
        Err(e) => tracing::warn!("Cannot locate the running executable: {}", e),
    }
    roots.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")));
    roots
}

/// Absolute paths are kept. A relative path resolves under the first root
/// that contains it, or under the first root when none does.
pub fn resolve_model_path(roots: &[PathBuf], configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        return configured.to_path_buf();
    }

    roots
        .iter()
        .map(|root| root.join(configured))
        .find(|candidate| candidate.exists())
        .or_else(|| roots.first().map(|root| root.join(configured)))
        .unwrap_or_else(|| configured.to_path_buf())
}
