//! TOML parsing with file path context.

use anyhow::{Context, Result};
use std::path::Path;

/// Parse a TOML file into `T`.
///
/// # Examples
///
/// ```rust,no_run
/// use hxview::config::{ViewConfig, parse_config};
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let config: ViewConfig = parse_config(Path::new("hxview.toml"))?;
/// println!("templates in {}", config.templates_path.display());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails with "Failed to read config file: ..." when the file cannot be read
/// and "Failed to parse config file: ..." when it is not valid TOML for `T`.
/// The underlying error is kept as the cause.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(serde::Deserialize)]
    struct Sample {
        name: String,
        debounce_ms: u64,
    }

    #[test]
    fn test_parse_config() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sample.toml");
        std::fs::write(&path, "name = \"site\"\ndebounce_ms = 75\n").unwrap();

        let config: Sample = parse_config(&path).unwrap();
        assert_eq!(config.name, "site");
        assert_eq!(config.debounce_ms, 75);
    }

    #[test]
    fn test_parse_errors_name_the_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.toml");
        std::fs::write(&path, "name = {").unwrap();

        let err = parse_config::<Sample>(&path).err().unwrap();
        assert!(err.to_string().contains("Failed to parse config file"));
        assert!(err.to_string().contains("broken.toml"));

        let missing = parse_config::<Sample>(&temp.path().join("missing.toml")).err().unwrap();
        assert!(missing.to_string().contains("Failed to read config file"));
    }
}
