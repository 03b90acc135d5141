use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use corkboard_shared::CurrentUser;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::editor::PatchMode;

/// Flat `key=value` configuration read from
/// `.corkboardrc` files and command-line
/// overrides.
#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    map.insert(
      "editor.diff_patches".to_string(),
      "off".to_string()
    );
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(rc_override))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    if let Some(path) =
      resolve_rc_path(rc_override)?
    {
      info!(rc = %path.display(), "loading corkboardrc");
      cfg.load_file(&path)?;
    } else {
      debug!("no corkboardrc found; using defaults");
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(self, overrides))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<Item = (String, String)>
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.map.get(key).map(String::as_str)
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self.map.get(key).map(|v| parse_bool(v))
  }

  /// Session user, present only when both name
  /// and email are set and non-blank.
  pub fn session_user(
    &self
  ) -> Option<CurrentUser> {
    let name = self.get("session.name")?.trim();
    let email =
      self.get("session.email")?.trim();
    if name.is_empty() || email.is_empty() {
      return None;
    }
    Some(CurrentUser {
      name:  name.to_string(),
      email: email.to_string()
    })
  }

  pub fn patch_mode(&self) -> PatchMode {
    if self
      .get_bool("editor.diff_patches")
      .unwrap_or(false)
    {
      PatchMode::DiffOnly
    } else {
      PatchMode::FullDraft
    }
  }

  pub fn color(&self) -> bool {
    self.get_bool("color").unwrap_or(true)
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    if self.loaded_files.contains(&path) {
      warn!(file = %path.display(), "include cycle; skipping");
      return Ok(());
    }
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;

    self.loaded_files.push(path.clone());

    let base_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."));

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let line = raw_line
        .split_once('#')
        .map_or(raw_line, |(before, _)| before)
        .trim();
      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path = resolve_include_path(
          &base_dir,
          include_rest.trim()
        )?;
        debug!(
          file = %path.display(),
          include = %include_path.display(),
          line = line_num + 1,
          "processing include"
        );
        if include_path.exists() {
          self.load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) =
        line.split_once('=').ok_or_else(|| {
          anyhow!(
            "invalid config line {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Everything the CLI derives from
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  pub user:       Option<CurrentUser>,
  pub patch_mode: PatchMode,
  pub color:      bool
}

impl From<&Config> for Settings {
  fn from(cfg: &Config) -> Self {
    Self {
      user:       cfg.session_user(),
      patch_mode: cfg.patch_mode(),
      color:      cfg.color()
    }
  }
}

fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) = std::env::var("CORKBOARDRC")
  {
    if rc_env == "/dev/null" || rc_env.is_empty()
    {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(rc_env)));
  }

  let Some(home) = dirs::home_dir() else {
    warn!("cannot determine home directory");
    return Ok(None);
  };
  let candidate = home.join(".corkboardrc");
  Ok(candidate.exists().then_some(candidate))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let expanded = expand_tilde(Path::new(include));
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(path: &Path) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) = text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim().to_ascii_lowercase().as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_without_rc_file() {
    let cfg = Config::default();
    let settings = Settings::from(&cfg);
    assert!(settings.color);
    assert_eq!(
      settings.patch_mode,
      PatchMode::FullDraft
    );
    assert!(settings.user.is_none());
  }

  #[test]
  fn loads_file_with_comments_and_includes() {
    let dir =
      tempfile::tempdir().expect("tempdir");
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "session.email = ada@example.com\n"
    )
    .expect("write include");
    let rc = dir.path().join("corkboardrc");
    fs::write(
      &rc,
      "# who is signed in\n\
       session.name = Ada Lovelace  # trailing\n\
       include extra.rc\n\
       editor.diff_patches = yes\n\
       color=off\n"
    )
    .expect("write rc");

    let cfg =
      Config::load(Some(&rc)).expect("load");
    assert_eq!(cfg.loaded_files.len(), 2);

    let settings = Settings::from(&cfg);
    assert_eq!(
      settings.user,
      Some(CurrentUser {
        name:  "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string()
      })
    );
    assert_eq!(
      settings.patch_mode,
      PatchMode::DiffOnly
    );
    assert!(!settings.color);
  }

  #[test]
  fn malformed_line_is_an_error() {
    let dir =
      tempfile::tempdir().expect("tempdir");
    let rc = dir.path().join("corkboardrc");
    fs::write(&rc, "session.name Ada\n")
      .expect("write rc");

    let err = Config::load(Some(&rc))
      .expect_err("missing '='");
    assert!(
      err.to_string().contains(":1:"),
      "{err}"
    );
  }

  #[test]
  fn self_include_is_skipped() {
    let dir =
      tempfile::tempdir().expect("tempdir");
    let rc = dir.path().join("corkboardrc");
    fs::write(
      &rc,
      "include corkboardrc\ncolor=off\n"
    )
    .expect("write rc");

    let cfg =
      Config::load(Some(&rc)).expect("load");
    assert_eq!(cfg.loaded_files.len(), 1);
    assert!(!cfg.color());
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "rc.session.name".to_string(),
        "Grace".to_string()
      ),
      (
        "session.email".to_string(),
        "grace@example.com".to_string()
      ),
    ]);
    assert_eq!(
      cfg.session_user().map(|u| u.name),
      Some("Grace".to_string())
    );
  }

  #[test]
  fn blank_session_email_means_signed_out() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "session.name".to_string(),
        "Grace".to_string()
      ),
      (
        "session.email".to_string(),
        " ".to_string()
      ),
    ]);
    assert!(cfg.session_user().is_none());
  }
}
