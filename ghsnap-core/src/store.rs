//! Per-user snapshot store.
//!
//! # Storage layout
//!
//! ```text
//! <home>/.config/ghsnap/<user>/
//!   config.yml     (USER, JSON_FIELDS, … — mode 0600)
//! <home>/.local/share/ghsnap/<user>/
//!   db.yml         (snapshot: key → record — mode 0600)
//!   fetch.yml      (fetch log: sequence → timestamp — mode 0600)
//! ```
//!
//! On Windows the roots are `<home>\AppData\Roaming` and `<home>\AppData\Local`.
//!
//! # API pattern
//!
//! Every function takes an explicit `home: &Path`; callers resolve it once
//! with [`home`]. Tests always pass a `TempDir`.
//!
//! Nothing here locks files. Two invocations racing on the same user can
//! lose one cycle's merge; saves are atomic renames, so neither leaves a torn
//! file behind.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{io_err, StoreError};
use crate::types::{AppConfig, FetchLog, Snapshot, UserName};

pub const APP_DIR: &str = "ghsnap";
pub const CONFIG_FILE: &str = "config.yml";
pub const SNAPSHOT_FILE: &str = "db.yml";
pub const FETCH_LOG_FILE: &str = "fetch.yml";

// ---------------------------------------------------------------------------
// 1. Path helpers (pure, no I/O)
// ---------------------------------------------------------------------------

/// Resolve the current user's home directory.
pub fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

#[cfg(not(windows))]
fn config_root_at(home: &Path) -> PathBuf {
    home.join(".config")
}
#[cfg(windows)]
fn config_root_at(home: &Path) -> PathBuf {
    home.join("AppData").join("Roaming")
}

#[cfg(not(windows))]
fn data_root_at(home: &Path) -> PathBuf {
    home.join(".local").join("share")
}
#[cfg(windows)]
fn data_root_at(home: &Path) -> PathBuf {
    home.join("AppData").join("Local")
}

/// `<config_root>/ghsnap/<user>/`
pub fn config_dir_at(home: &Path, user: &UserName) -> PathBuf {
    config_root_at(home).join(APP_DIR).join(&user.0)
}

/// `<data_root>/ghsnap/<user>/`
pub fn data_dir_at(home: &Path, user: &UserName) -> PathBuf {
    data_root_at(home).join(APP_DIR).join(&user.0)
}

pub fn config_path_at(home: &Path, user: &UserName) -> PathBuf {
    config_dir_at(home, user).join(CONFIG_FILE)
}

pub fn snapshot_path_at(home: &Path, user: &UserName) -> PathBuf {
    data_dir_at(home, user).join(SNAPSHOT_FILE)
}

pub fn fetch_log_path_at(home: &Path, user: &UserName) -> PathBuf {
    data_dir_at(home, user).join(FETCH_LOG_FILE)
}

// ---------------------------------------------------------------------------
// 2. Config
// ---------------------------------------------------------------------------

/// Load `config.yml` for `user`.
///
/// Returns `StoreError::NotInitialized` if absent, `StoreError::Parse`
/// (with path + line context) if malformed.
pub fn load_config_at(home: &Path, user: &UserName) -> Result<AppConfig, StoreError> {
    ensure_path_safe(user)?;
    let path = config_path_at(home, user);
    if !path.exists() {
        return Err(StoreError::NotInitialized { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let config: AppConfig =
        serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path: path.clone(), source: e })?;

    if config.tracked_fields.is_empty() {
        return Err(StoreError::InvalidConfig {
            path,
            reason: "JSON_FIELDS must name at least one field".to_string(),
        });
    }
    if !(-23..=23).contains(&config.utc_offset_hours) {
        return Err(StoreError::InvalidConfig {
            path,
            reason: format!("utc_offset_hours {} is out of range", config.utc_offset_hours),
        });
    }
    Ok(config)
}

/// Atomically save `config.yml` under the config's own user.
pub fn save_config_at(home: &Path, config: &AppConfig) -> Result<(), StoreError> {
    ensure_path_safe(&config.user)?;
    let dir = config_dir_at(home, &config.user);
    write_yaml_atomic(&dir, &dir.join(CONFIG_FILE), config)
}

// ---------------------------------------------------------------------------
// 3. Snapshot + fetch log
// ---------------------------------------------------------------------------

/// Load the snapshot for `user`. Absent, empty, or `null` files load as an
/// empty snapshot.
pub fn load_snapshot_at(home: &Path, user: &UserName) -> Result<Snapshot, StoreError> {
    ensure_path_safe(user)?;
    read_yaml_or_default(&snapshot_path_at(home, user))
}

/// Atomically save the snapshot for `user`.
pub fn save_snapshot_at(home: &Path, user: &UserName, snapshot: &Snapshot) -> Result<(), StoreError> {
    ensure_path_safe(user)?;
    let dir = data_dir_at(home, user);
    write_yaml_atomic(&dir, &dir.join(SNAPSHOT_FILE), snapshot)
}

/// Load the fetch log for `user`. Absent, empty, or `null` files load as an
/// empty log.
pub fn load_fetch_log_at(home: &Path, user: &UserName) -> Result<FetchLog, StoreError> {
    ensure_path_safe(user)?;
    read_yaml_or_default(&fetch_log_path_at(home, user))
}

/// Atomically save the fetch log for `user`.
pub fn save_fetch_log_at(home: &Path, user: &UserName, log: &FetchLog) -> Result<(), StoreError> {
    ensure_path_safe(user)?;
    let dir = data_dir_at(home, user);
    write_yaml_atomic(&dir, &dir.join(FETCH_LOG_FILE), log)
}

// ---------------------------------------------------------------------------
// 4. Setup
// ---------------------------------------------------------------------------

/// Write a fresh `config.yml` for `user` and reset the snapshot and fetch log
/// to empty. Re-running setup is the only way stored records are dropped.
pub fn setup_at(
    home: &Path,
    user: &UserName,
    tracked_fields: Option<Vec<String>>,
) -> Result<AppConfig, StoreError> {
    let config = AppConfig::new(user.clone(), tracked_fields);
    save_config_at(home, &config)?;
    save_snapshot_at(home, user, &Snapshot::new())?;
    save_fetch_log_at(home, user, &FetchLog::new())?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn ensure_path_safe(user: &UserName) -> Result<(), StoreError> {
    if user.is_path_safe() {
        Ok(())
    } else {
        Err(StoreError::InvalidUserName { user: user.0.clone() })
    }
}

fn read_yaml_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    let parsed: Option<T> = serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parsed.unwrap_or_default())
}

/// Write flow: serialize → `<file>.tmp` sibling → `chmod 0600` → `rename`.
/// `.tmp` is always in the same directory as the target (same filesystem).
fn write_yaml_atomic<T: Serialize>(dir: &Path, path: &Path, value: &T) -> Result<(), StoreError> {
    ensure_dir(dir)?;
    let yaml = serde_yaml::to_string(value)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        set_dir_permissions(dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
