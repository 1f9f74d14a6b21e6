//! Compose facet: declared services, host ports and container names

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use monotui_core::model::{ComposeFacet, ComposeService};

use super::env::{EnvVars, read_env_file, substitute};
use super::rel_file;

const FILENAMES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

const ENV_FILE: &str = ".env";

#[derive(Debug, Deserialize)]
struct ComposeFile {
    services: Option<Mapping>,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceSpec {
    container_name: Option<String>,
    image: Option<String>,
    #[serde(default)]
    ports: Vec<Value>,
}

/// Host port of a short-syntax mapping: `"3000"`, `"3000:3000"`,
/// `"127.0.0.1:5432:5432/tcp"`, `"${PORT:-8080}:80"`.
pub fn host_port(raw: &str, env: &EnvVars) -> Option<u16> {
    let resolved = substitute(raw.trim(), env)?;
    let without_proto = resolved.split('/').next().unwrap_or_default();
    let parts: Vec<&str> = without_proto.split(':').collect();
    let host = match parts.len() {
        0 | 1 => parts.first().copied()?,
        n => parts[n - 2],
    };
    // ranges publish their first port
    host.split('-').next()?.trim().parse::<u16>().ok()
}

fn port_of(value: &Value, env: &EnvVars) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => host_port(s, env),
        // long syntax: { target: 80, published: 8080 }
        Value::Mapping(m) => m.get("published").and_then(|p| match p {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => substitute(s, env).and_then(|s| s.trim().parse().ok()),
            _ => None,
        }),
        _ => None,
    }
}

fn service(name: String, spec: ServiceSpec, env: &EnvVars) -> ComposeService {
    let ports = spec.ports.iter().filter_map(|p| port_of(p, env)).collect();
    ComposeService {
        container_name: spec.container_name.and_then(|c| substitute(&c, env)),
        image: spec.image,
        ports,
        name,
    }
}

fn parse_services(content: &str, env: &EnvVars) -> Result<Option<Vec<Arc<ComposeService>>>, serde_yaml::Error> {
    let file: ComposeFile = serde_yaml::from_str(content)?;
    let Some(services) = file.services else {
        return Ok(None);
    };

    let mut out = Vec::with_capacity(services.len());
    for (key, value) in services {
        let Some(name) = key.as_str().map(str::to_string) else {
            continue;
        };
        let spec = if value.is_null() {
            ServiceSpec::default()
        } else {
            serde_yaml::from_value(value)?
        };
        out.push(Arc::new(service(name, spec, env)));
    }
    Ok(Some(out))
}

pub fn parse_compose(dir: &Path, rel_dir: &str) -> Option<ComposeFacet> {
    let env = read_env_file(&dir.join(ENV_FILE));

    for filename in FILENAMES {
        let path = dir.join(filename);
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };

        match parse_services(&content, &env) {
            Ok(Some(services)) => {
                if services.is_empty() {
                    return None;
                }
                return Some(ComposeFacet {
                    filename: filename.to_string(),
                    path: rel_file(rel_dir, filename),
                    services,
                });
            }
            Ok(None) => continue,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping invalid compose file");
                continue;
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> EnvVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_host_port_forms() {
        let vars = env(&[("PG_PORT", "5433")]);

        assert_eq!(host_port("3000", &vars), Some(3000));
        assert_eq!(host_port("8080:80", &vars), Some(8080));
        assert_eq!(host_port("127.0.0.1:5432:5432/tcp", &vars), Some(5432));
        assert_eq!(host_port("${PG_PORT}:5432", &vars), Some(5433));
        assert_eq!(host_port("${WEB_PORT:-8081}:80", &vars), Some(8081));
        assert_eq!(host_port("$PG_PORT:5432", &vars), Some(5433));
        assert_eq!(host_port("9000-9001:9000-9001", &vars), Some(9000));
        assert_eq!(host_port("${NOPE}:80", &vars), None);
    }

    #[test]
    fn test_services_with_env_substitution() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".env"), "NAMESPACE=shop\nPG_PORT=5433\n").unwrap();
        fs::write(
            tmp.path().join("docker-compose.yml"),
            r#"
services:
  db:
    image: postgres:16
    container_name: ${NAMESPACE}-postgres
    ports:
      - "${PG_PORT:-5432}:5432"
  cache:
    image: redis:7
    container_name: ${UNKNOWN}-redis
    ports:
      - 6379
  web:
    ports:
      - target: 80
        published: 8080
  worker:
"#,
        )
        .unwrap();

        let facet = parse_compose(tmp.path(), "infra").unwrap();
        assert_eq!(facet.filename, "docker-compose.yml");
        assert_eq!(facet.path, "infra/docker-compose.yml");

        let names: Vec<&str> = facet.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["db", "cache", "web", "worker"]);

        let db = &facet.services[0];
        assert_eq!(db.container_name.as_deref(), Some("shop-postgres"));
        assert_eq!(db.image.as_deref(), Some("postgres:16"));
        assert_eq!(db.ports, vec![5433]);

        assert_eq!(facet.services[1].container_name, None);
        assert_eq!(facet.services[1].ports, vec![6379]);
        assert_eq!(facet.services[2].ports, vec![8080]);
        assert!(facet.services[3].ports.is_empty());
    }

    #[test]
    fn test_compose_yaml_without_services_falls_through() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("docker-compose.yml"), "version: '3'\n").unwrap();
        fs::write(
            tmp.path().join("compose.yaml"),
            "services:\n  api:\n    image: api\n",
        )
        .unwrap();

        let facet = parse_compose(tmp.path(), ".").unwrap();
        assert_eq!(facet.filename, "compose.yaml");
        assert_eq!(facet.path, "compose.yaml");
        assert_eq!(facet.services.len(), 1);
    }

    #[test]
    fn test_invalid_yaml_is_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("docker-compose.yml"), "services: [unclosed").unwrap();
        assert!(parse_compose(tmp.path(), ".").is_none());
    }
}
