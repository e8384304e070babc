use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current unix timestamp in milliseconds
///
/// A clock set before the unix epoch yields `0`.
pub fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Validate a provided name value
///
/// Names become topic levels so they must be non-empty and free of the topic separator and wildcard characters.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name string must not be empty".into());
    }
    for c in name.chars() {
        if matches!(c, '+' | '/' | '#') {
            return Err(format!(
                "name string {name} cannot contain '+', '/' or '#' characters"
            ));
        }
    }
    Ok(())
}
