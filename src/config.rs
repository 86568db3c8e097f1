// Copyright 2026 Recall Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub collection: String,
    pub embedding: String,
    pub embedding_dim: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("kbridge.db"),
            collection: "knowledge_base".to_string(),
            embedding: "hash".to_string(),
            embedding_dim: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigCtx {
    pub root: PathBuf,
    pub config: Config,
}

impl ConfigCtx {
    pub fn load_from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir().context("get current dir")?;
        Self::load_from(&cwd)
    }

    pub fn load_from(start: &Path) -> Result<Self> {
        let config = load_global_config()?;
        let root = find_store_root(start, &config.store_path).ok_or_else(|| {
            anyhow::anyhow!(
                "store not found: no {} in {} or its parents",
                config.store_path.display(),
                start.display()
            )
        })?;
        Ok(Self { root, config })
    }

    pub fn store_path(&self) -> PathBuf {
        if self.config.store_path.is_absolute() {
            self.config.store_path.clone()
        } else {
            self.root.join(&self.config.store_path)
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        return std::env::var_os("APPDATA").map(PathBuf::from);
    }

    if cfg!(target_os = "macos") {
        let home = std::env::var_os("HOME")?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support"),
        );
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg));
    }
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config"))
}

pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("kbridge").join("kbridge.toml"))
}

pub fn load_global_config() -> Result<Config> {
    let Some(path) = global_config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    read_config(&path)
}

pub fn find_store_root(start: &Path, store_path: &Path) -> Option<PathBuf> {
    if store_path.is_absolute() {
        return store_path
            .exists()
            .then(|| store_path.parent().unwrap_or(store_path).to_path_buf());
    }

    let mut cur = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    loop {
        let candidate = cur.join(store_path);
        if candidate.exists() {
            return Some(cur);
        }
        match cur.parent() {
            Some(parent) => cur = parent.to_path_buf(),
            None => return None,
        }
    }
}

pub fn read_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config: Config = toml::from_str(&text).context("parse kbridge.toml")?;
    if config.collection.trim().is_empty() {
        anyhow::bail!("collection name in {} is empty", path.display());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use tempfile::tempdir;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn config_path(config_root: &Path) -> PathBuf {
        let base = if cfg!(target_os = "macos") {
            config_root.join("Library").join("Application Support")
        } else {
            config_root.to_path_buf()
        };
        base.join("kbridge").join("kbridge.toml")
    }

    const CONFIG_ENV: [&str; 3] = ["XDG_CONFIG_HOME", "HOME", "APPDATA"];

    // Points every config-dir variable at `config_root` for the duration of `f`.
    fn with_env<T>(config_root: &Path, f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().expect("env lock");
        let saved: Vec<_> = CONFIG_ENV
            .iter()
            .map(|key| (*key, std::env::var_os(key)))
            .collect();
        for key in CONFIG_ENV {
            unsafe { std::env::set_var(key, config_root) };
        }
        let result = f();
        for (key, old) in saved {
            match old {
                Some(val) => unsafe { std::env::set_var(key, val) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
        result
    }

    #[test]
    fn global_config_path_follows_platform_config_dir() {
        let config_dir = tempdir().expect("config dir");
        with_env(config_dir.path(), || {
            assert_eq!(global_config_path(), Some(config_path(config_dir.path())));
        });
    }

    #[test]
    fn find_store_root_walks_up() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("repo");
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(root.join("kbridge.db"), "stub").expect("write db");

        let found = find_store_root(&nested, Path::new("kbridge.db"));
        let expected = root.canonicalize().unwrap_or(root);
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn load_from_errors_when_store_missing() {
        let config_dir = tempdir().expect("config dir");
        let work_dir = tempdir().expect("work dir");
        with_env(config_dir.path(), || {
            let err = ConfigCtx::load_from(work_dir.path()).unwrap_err();
            assert!(err.to_string().contains("store not found"));
        });
    }

    #[test]
    fn load_from_uses_global_config() {
        let config_dir = tempdir().expect("config dir");
        let work_dir = tempdir().expect("work dir");
        let db_path = work_dir.path().join("fshd.db");
        std::fs::write(&db_path, "stub").expect("write db");

        let path = config_path(config_dir.path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        let body = format!(
            "store_path = {:?}\ncollection = \"fshd_knowledge_base\"\n",
            db_path.display().to_string()
        );
        std::fs::write(&path, body).expect("write config");

        with_env(config_dir.path(), || {
            let ctx = ConfigCtx::load_from(Path::new("/")).expect("load");
            assert_eq!(ctx.config.collection, "fshd_knowledge_base");
            assert_eq!(ctx.config.embedding_dim, 256);
            assert_eq!(ctx.store_path(), db_path);
        });
    }

    #[test]
    fn read_config_rejects_empty_collection() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("kbridge.toml");
        std::fs::write(&path, "collection = \"  \"\n").expect("write config");
        let err = read_config(&path).unwrap_err();
        assert!(err.to_string().contains("collection name"));
    }
}
