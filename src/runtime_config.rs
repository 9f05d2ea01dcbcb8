//! # Runtime Configuration Module
//!
//! Coroutine runtime tuning read from the environment at startup.
//!
//! ## Environment Variables
//!
//! ### `SCHEMAGATE_STACK_SIZE`
//!
//! Stack size for each connection coroutine. Accepts decimal (`16384`) or
//! hexadecimal (`0x4000`). Unparseable values fall back to the default of
//! `0x4000` (16 KB).
//!
//! Total virtual memory for stacks is roughly `stack_size × concurrent connections`;
//! raise it only for handlers with deep call chains.
//!
//! ```rust
//! use schemagate::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stack_size > 0);
//! ```

use std::env;

/// Environment variable holding the coroutine stack size
pub const STACK_SIZE_ENV: &str = "SCHEMAGATE_STACK_SIZE";

/// Default coroutine stack size (16 KB)
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var(STACK_SIZE_ENV)
            .ok()
            .and_then(|v| parse_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        Self { stack_size }
    }

    /// Apply to the global `may` coroutine scheduler
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal size; zero is rejected.
#[must_use]
pub fn parse_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    };
    parsed.filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("16384"), Some(16384));
        assert_eq!(parse_size("0x8000"), Some(0x8000));
        assert_eq!(parse_size(" 0X10 "), Some(16));
        assert_eq!(parse_size("0"), None);
        assert_eq!(parse_size("big"), None);
    }
}
