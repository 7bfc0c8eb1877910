//! Centralized path resolution.
//!
//! The documents and extraction-cache directories are relative to the working
//! directory by default (they are deployment data, not user config); only the
//! optional settings file lives in the platform config directory.
//!
//! | Purpose | Linux | macOS | Windows |
//! |---------|-------|-------|---------|
//! | Config | `~/.config/docs-chatbot/` | `~/Library/Application Support/docs-chatbot/` | `%APPDATA%\docs-chatbot\` |

use std::path::PathBuf;

/// Application name used in directory paths
const APP_NAME: &str = "docs-chatbot";

/// Settings file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Default directory scanned for manuals
pub const DEFAULT_DOCUMENTS_DIR: &str = "documents";

/// Default directory for cached text extractions
pub const DEFAULT_CACHE_DIR: &str = "processed_data";

/// Get the configuration directory
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join(APP_NAME))
        .unwrap_or_else(|| fallback_base_dir().join("config"))
}

/// Path of the settings file used when `--config` is not given
pub fn get_default_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE_NAME)
}

/// Fallback base directory when platform dirs are unavailable.
///
/// Tries in order:
/// 1. `~/.docs-chatbot/` (home directory)
/// 2. `./.docs-chatbot/` (current working directory)
fn fallback_base_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".docs-chatbot"))
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".docs-chatbot")
        })
}
