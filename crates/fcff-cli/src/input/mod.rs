pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a typed input from `--input <file>`, falling back to piped stdin.
/// Returns `None` when neither is available.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_input(path)?));
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Like [`load`], but a missing input is an error naming the command.
pub fn require<T: DeserializeOwned>(path: Option<&str>, command: &str) -> Result<T, Box<dyn std::error::Error>> {
    load(path)?.ok_or_else(|| format!("--input <file> or stdin required for {command}").into())
}
