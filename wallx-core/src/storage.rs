use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use log::{info, warn};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::request::UNSPLASH_API_URL;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub secure_dir: PathBuf,
    pub unsplash_api_url: String,
    pub unsplash_access_key: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub http_timeout: Duration,
}

impl Config {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "wallx", "wallx")
            .context("Failed to get project directories")?;
        Self::with_config_dir(proj_dirs.config_dir().to_path_buf())
    }

    /// Builds the configuration rooted at `config_dir`, creating the
    /// storage directories if they don't exist.
    pub fn with_config_dir(config_dir: PathBuf) -> Result<Self> {
        let storage_dir = config_dir.join("storage");
        let secure_dir = config_dir.join("secure");

        fs::create_dir_all(&storage_dir)
            .with_context(|| format!("Failed to create {}", storage_dir.display()))?;
        fs::create_dir_all(&secure_dir)
            .with_context(|| format!("Failed to create {}", secure_dir.display()))?;
        restrict_permissions(&secure_dir, 0o700)?;

        let unsplash_access_key = first_env(&["UNSPLASH_API_KEY", "EXPO_PUBLIC_UNSPLASH_API_KEY"]);
        if unsplash_access_key.is_none() {
            warn!("No Unsplash access key configured, listings will use fallback data");
        }

        let http_timeout = env::var("WALLX_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));

        let config = Config {
            config_dir,
            storage_dir,
            secure_dir,
            unsplash_api_url: first_env(&["UNSPLASH_API_URL"]).unwrap_or_else(|| UNSPLASH_API_URL.to_string()),
            unsplash_access_key,
            supabase_url: first_env(&["SUPABASE_URL", "EXPO_PUBLIC_SUPABASE_URL"]),
            supabase_anon_key: first_env(&["SUPABASE_ANON_KEY", "EXPO_PUBLIC_SUPABASE_ANON_KEY"]),
            http_timeout,
        };
        info!("Config loaded from {:?}", config.config_dir);
        Ok(config)
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// String key-value storage on the local device.
pub trait KvStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
    secure: bool,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, secure: false })
    }

    /// Same layout, but every file is readable by the owner only.
    pub fn secure(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        restrict_permissions(&dir, 0o700)?;
        Ok(Self { dir, secure: true })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !valid {
            bail!("Invalid storage key: {:?}", key);
        }
        Ok(self.dir.join(key))
    }
}

impl KvStore for FileKvStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // keys never start with '.', so the temp name can't shadow one
        let tmp = self.dir.join(format!(".{}.tmp", key));
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        if self.secure {
            restrict_permissions(&tmp, 0o600)?;
        }
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl KvStore for MemoryKvStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
