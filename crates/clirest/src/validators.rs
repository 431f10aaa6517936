//! Semantic value checks used as option converters

use std::sync::OnceLock;

use anyhow::{bail, Result};
use regex::Regex;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+").unwrap())
}

/// Accept anything shaped like `local@domain.tld`
pub fn email(value: &str) -> Result<String> {
    if !email_pattern().is_match(value) {
        bail!("{} is not a valid email address", value);
    }
    Ok(value.to_string())
}
