//! Compiled regex patterns for parsing probe tool output.
//!
//! Compiled once on first use. Update these when the output format of
//! `ss` or `docker ps` changes.

use once_cell::sync::Lazy;
use regex::Regex;

// ss -lptnH

/// First `:<port>` followed by whitespace, i.e. the local address column
pub static RE_SS_LOCAL_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r":(\d+)\s+").unwrap());
pub static RE_SS_PID: Lazy<Regex> = Lazy::new(|| Regex::new(r"pid=(\d+)").unwrap());

// docker ps

/// Host side of a published port mapping, e.g. `0.0.0.0:5432->5432/tcp`
pub static RE_DOCKER_HOST_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r":(\d+)->").unwrap());

// package-manager prefixes stripped before matching process command lines

pub static RE_PM_RUN_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(npm|yarn|pnpm|bun)\s+run\s+").unwrap());
pub static RE_NPX_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(npx|bunx)\s+").unwrap());
