use etf_blend_core::EngineConfig;

use super::file;

/// Load an engine config from YAML (`.yaml`/`.yml`) or JSON.
pub fn read_config(path: &str) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let (canonical, contents) = file::read_text(path)?;
    let config: EngineConfig = match file::extension(&canonical).as_deref() {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?,
        _ => serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?,
    };
    Ok(config)
}
