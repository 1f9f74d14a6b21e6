//! `.env` files and `$VAR` substitution

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

/// `${VAR}`, `${VAR:-default}` or `$VAR`
static RE_ENV_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

pub type EnvVars = HashMap<String, String>;

/// Parses `KEY=VALUE` lines; quotes are stripped, comments and blanks skipped.
pub fn parse_env(content: &str) -> EnvVars {
    let mut vars = EnvVars::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        let value = if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            &value[1..value.len() - 1]
        } else {
            value
        };
        vars.insert(key.trim().to_string(), value.to_string());
    }
    vars
}

/// Missing or unreadable files yield no variables.
pub fn read_env_file(path: &Path) -> EnvVars {
    match fs::read_to_string(path) {
        Ok(content) => parse_env(&content),
        Err(_) => EnvVars::new(),
    }
}

/// Replaces every variable reference; `None` if any stays unresolved.
pub fn substitute(raw: &str, vars: &EnvVars) -> Option<String> {
    let mut unresolved = false;
    let out = RE_ENV_VAR.replace_all(raw, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        match vars.get(name).map(String::as_str).or_else(|| caps.get(2).map(|d| d.as_str())) {
            Some(value) => value.to_string(),
            None => {
                debug!(variable = name, raw, "unresolved env variable");
                unresolved = true;
                caps[0].to_string()
            }
        }
    });

    (!unresolved).then(|| out.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> EnvVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_env() {
        let env = parse_env(
            "# comment\nPORT=3000\nexport NAME=\"shop\"\nQUOTED='x y'\n\nbroken line\nEMPTY=\n",
        );
        assert_eq!(env.get("PORT").map(String::as_str), Some("3000"));
        assert_eq!(env.get("NAME").map(String::as_str), Some("shop"));
        assert_eq!(env.get("QUOTED").map(String::as_str), Some("x y"));
        assert_eq!(env.get("EMPTY").map(String::as_str), Some(""));
        assert_eq!(env.len(), 4);
    }

    #[test]
    fn test_substitute_forms() {
        let env = vars(&[("NS", "shop"), ("PG_PORT", "5433")]);

        assert_eq!(substitute("${NS}-postgres", &env).as_deref(), Some("shop-postgres"));
        assert_eq!(substitute("$PG_PORT", &env).as_deref(), Some("5433"));
        assert_eq!(substitute("${MISSING:-8080}", &env).as_deref(), Some("8080"));
        assert_eq!(substitute("${NS:-other}", &env).as_deref(), Some("shop"));
        assert_eq!(substitute("plain", &env).as_deref(), Some("plain"));
        assert_eq!(substitute("${MISSING}-db", &env), None);
    }
}
