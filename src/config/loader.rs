use std::path::{Path, PathBuf};

use super::types::Config;
use crate::error::Result;

pub const CONFIG_FILE: &str = ".gatewayctl.yml";

/// Load `.gatewayctl.yml` from `dir`, or defaults when the file is absent.
///
/// The returned config has an absolute `work_dir`.
pub fn load(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        let mut cfg = Config::default();
        cfg.work_dir = absolutize(dir, &cfg.work_dir)?;
        return Ok(cfg);
    }
    load_file(&path)
}

/// Load an explicit config file. Relative `work_dir` values are resolved
/// against the file's directory.
pub fn load_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&contents)?;
    let base = path.parent().unwrap_or(Path::new("."));
    cfg.work_dir = absolutize(base, &cfg.work_dir)?;
    cfg.validate()?;
    Ok(cfg)
}

fn absolutize(base: &Path, path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    Ok(std::path::absolute(joined)?)
}
