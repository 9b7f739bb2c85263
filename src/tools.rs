//! External tool path resolution
//!
//! Each external tool is resolved through a `{TOOL}_BIN` environment
//! variable with a PATH fallback, so packaged installs can pin an exact
//! binary while development environments just use whatever PATH finds.

use std::env;

/// Get the path to an external tool.
///
/// Checks `{TOOL}_BIN` (uppercase tool name + "_BIN"); falls back to
/// the tool name itself, which relies on PATH.
pub fn get_tool_path(tool: &str) -> String {
    let env_var = format!("{}_BIN", tool.to_uppercase());
    env::var(&env_var).unwrap_or_else(|_| tool.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_tool_path_with_env() {
        env::set_var("FAKETOOL_BIN", "/custom/path/to/faketool");
        assert_eq!(get_tool_path("faketool"), "/custom/path/to/faketool");
        env::remove_var("FAKETOOL_BIN");
    }

    #[test]
    fn test_get_tool_path_fallback() {
        env::remove_var("NONEXISTENT_BIN");
        assert_eq!(get_tool_path("nonexistent"), "nonexistent");
    }
}
