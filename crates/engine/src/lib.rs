use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
pub mod geometry;
pub mod input;
pub mod sim;

pub use app::{
    run_app, run_app_with_metrics, AppError, LoopConfig, LoopMetricsSnapshot, MetricsHandle,
    Renderer,
};
pub use content::{load_content, ContentBundle, ContentError, ContentOrigin};
pub use geometry::{GeometrySource, MapGeometryIndex, MapLoadError, Rect, TmxMapSource, Vec2};
pub use input::{InputNormalizer, InputTuning, PadTuning};
pub use sim::{
    GameLoop, PlayerTuning, QuestChain, SimConfig, SnapshotHandle, WatchdogTuning, World,
    WorldEvent, WorldSnapshot,
};

pub const ROOT_ENV_VAR: &str = "TARMAC_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "{env_var} is set but does not point to a valid exhibit root: {path}\n\
A valid root contains assets/ next to either Cargo.toml or an installed map."
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "Could not detect the exhibit root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing assets/ and either Cargo.toml or assets/map.tmx.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/opt/tarmac\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let assets_dir = root.join("assets");
    Ok(AppPaths { root, assets_dir })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(&value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    path: normalized,
                    env_var: ROOT_ENV_VAR,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

/// A checkout (Cargo.toml plus assets/) or an installed exhibit (assets/map.tmx
/// next to the binary).
fn is_repo_marker(path: &Path) -> bool {
    let assets = path.join("assets");
    if !assets.is_dir() {
        return false;
    }
    path.join("Cargo.toml").is_file() || assets.join("map.tmx").is_file()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_assets() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));

        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("Cargo.toml"), "").expect("write manifest");
        assert!(!is_repo_marker(dir.path()));
        fs::create_dir(dir.path().join("assets")).expect("assets dir");
        assert!(is_repo_marker(dir.path()));
    }

    #[test]
    fn installed_layout_is_a_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let assets = dir.path().join("assets");
        fs::create_dir(&assets).expect("assets dir");
        assert!(!is_repo_marker(dir.path()));
        fs::write(assets.join("map.tmx"), "<map/>").expect("write map");
        assert!(is_repo_marker(dir.path()));
    }
}
