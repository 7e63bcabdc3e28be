use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "repair-assistant";

/// Filesystem layout of one installation.
///
/// `project_root` anchors relative paths from `config.yml` (CSV source, index,
/// conversation db). `user_data_dir` holds per-user files: an optional
/// `config.yml` override, `secrets.yaml` and `logs/`.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// Layout from `REPAIR_ROOT` / `REPAIR_DATA_DIR`, falling back to the
    /// nearest ancestor of the working directory holding a `config.yml`.
    pub fn new() -> Self {
        let project_root = env::var_os("REPAIR_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(locate_project_root);
        let user_data_dir = env::var_os("REPAIR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| platform_data_dir(&project_root));
        Self::with_dirs(project_root, user_data_dir)
    }

    /// Explicit layout. Creates the data and log directories when missing.
    pub fn with_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        if let Err(err) = fs::create_dir_all(&log_dir) {
            eprintln!("cannot create log directory {}: {}", log_dir.display(), err);
        }

        Self {
            secrets_path: user_data_dir.join("secrets.yaml"),
            project_root,
            user_data_dir,
            log_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn locate_project_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    cwd.ancestors()
        .find(|dir| dir.join("config.yml").is_file())
        .map(Path::to_path_buf)
        .unwrap_or(cwd)
}

// Debug builds keep everything next to the checkout.
fn platform_data_dir(project_root: &Path) -> PathBuf {
    if cfg!(debug_assertions) {
        return project_root.to_path_buf();
    }

    let home = env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if cfg!(target_os = "windows") {
        env::var_os("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or(home)
            .join(APP_DIR_NAME)
    } else if cfg!(target_os = "macos") {
        home.join("Library/Application Support").join(APP_DIR_NAME)
    } else {
        env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".local/share"))
            .join(APP_DIR_NAME)
    }
}
