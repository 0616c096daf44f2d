//! Layered runtime settings: built-in defaults, then an optional TOML file,
//! then `ROSTER_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use roster_store_sqlite::{SinCipher, SqliteStore};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub store_path: PathBuf,
  pub host:       String,
  pub port:       u16,
  /// Base64 32-byte key for the encrypted SIN column.
  pub sin_key:    Option<String>,
}

impl Settings {
  pub fn load(path: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .set_default("store_path", "roster.db")?
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8000)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ROSTER"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Settings = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }

  pub fn cipher(&self) -> Result<SinCipher> {
    let key = self
      .sin_key
      .as_deref()
      .context("sin_key is not configured; generate one with `roster gen-key`")?;
    Ok(SinCipher::from_base64(key)?)
  }

  pub async fn open_store(&self) -> Result<SqliteStore> {
    let cipher = self.cipher()?;
    SqliteStore::open(&self.store_path, cipher)
      .await
      .with_context(|| format!("failed to open store at {:?}", self.store_path))
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/") {
    if let Ok(home) = std::env::var("HOME") {
      return PathBuf::from(home).join(rest);
    }
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "port = 9001\nsin_key = \"{}\"", SinCipher::generate_key_base64()).unwrap();

    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.port, 9001);
    assert_eq!(settings.host, "127.0.0.1");
    assert!(settings.cipher().is_ok());
  }

  #[test]
  fn missing_key_is_reported() {
    let settings = Settings {
      store_path: "roster.db".into(),
      host:       "127.0.0.1".into(),
      port:       8000,
      sin_key:    None,
    };
    let err = settings.cipher().unwrap_err();
    assert!(err.to_string().contains("sin_key"));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/r.db")), PathBuf::from(home).join("r.db"));
    assert_eq!(expand_tilde(Path::new("/abs/r.db")), PathBuf::from("/abs/r.db"));
  }
}
