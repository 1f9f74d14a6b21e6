//! Process-side runtime detection for package.json scripts and Makefile targets

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{Listener, ProcessInfo, ProcessInspector};
use crate::model::ScriptTarget;
use crate::patterns::{RE_NPX_PREFIX, RE_PM_RUN_PREFIX, RE_SS_LOCAL_PORT, RE_SS_PID};
use crate::runtime::{RunKind, RunState, RuntimeStatus};

/// Subcommands that make the second token part of the signature
const SERVER_SUBCOMMANDS: &[&str] = &["dev", "start", "serve", "preview"];

/// Reduces a script command to the substring expected in a process command line.
///
/// `"pnpm run dev"` becomes `"dev"`, `"next dev --turbo"` becomes `"next dev"`,
/// `"npx vite --port 5173"` becomes `"vite"`.
pub fn extract_core_command(command: &str) -> String {
    let trimmed = command.trim();
    let without_run = RE_PM_RUN_PREFIX.replace(trimmed, "");
    let stripped = RE_NPX_PREFIX.replace(&without_run, "").into_owned();

    let tokens: Vec<&str> = stripped.split_whitespace().collect();
    match tokens.as_slice() {
        [first, second, ..] if SERVER_SUBCOMMANDS.contains(second) => {
            format!("{} {}", first, second)
        }
        [first, ..] => first.to_string(),
        [] => stripped.clone(),
    }
}

/// Parses `ss -lptnH` output into (pid, port) pairs.
///
/// A line can name several owning pids; each one yields a pair.
pub fn parse_ss_listeners(output: &str) -> Vec<Listener> {
    let mut listeners = Vec::new();

    for line in output.lines() {
        let Some(port) = RE_SS_LOCAL_PORT
            .captures(line)
            .and_then(|c| c[1].parse::<u16>().ok())
        else {
            if !line.trim().is_empty() {
                debug!(line, "skipping ss line without a local port");
            }
            continue;
        };

        for cap in RE_SS_PID.captures_iter(line) {
            if let Ok(pid) = cap[1].parse::<u32>() {
                listeners.push(Listener { pid, port });
            }
        }
    }

    listeners
}

fn matches_project(process: &ProcessInfo, signature: &str, root: &Path, root_str: &str) -> bool {
    if !process.command_line.contains(signature) {
        return false;
    }

    process.command_line.contains(root_str)
        || process
            .cwd
            .as_deref()
            .is_some_and(|cwd| cwd.starts_with(root))
}

/// Collects `roots` and every process below them.
///
/// Iterative with a visited set, so cyclic parent data terminates.
fn collect_descendants(roots: &[u32], processes: &[ProcessInfo]) -> HashSet<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for p in processes {
        if let Some(parent) = p.parent {
            children.entry(parent).or_default().push(p.pid);
        }
    }

    let mut visited = HashSet::new();
    let mut stack: Vec<u32> = roots.to_vec();

    while let Some(pid) = stack.pop() {
        if !visited.insert(pid) {
            continue;
        }
        if let Some(kids) = children.get(&pid) {
            stack.extend(kids.iter().filter(|k| !visited.contains(*k)));
        }
    }

    visited
}

fn join<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct ProcessProbe {
    inspector: Arc<dyn ProcessInspector>,
}

impl ProcessProbe {
    pub fn new(inspector: Arc<dyn ProcessInspector>) -> Self {
        Self { inspector }
    }

    /// One run state per target, in input order. Never fails: an unavailable
    /// process table reports every target as stopped.
    pub async fn probe_scripts(
        &self,
        absolute_path: &Path,
        project_path: &str,
        targets: &[ScriptTarget<'_>],
    ) -> Vec<RunState> {
        if targets.is_empty() {
            return Vec::new();
        }

        let processes = match self.inspector.processes().await {
            Ok(p) => p,
            Err(e) => {
                debug!(project = %project_path, error = %e, "process table unavailable");
                Vec::new()
            }
        };

        let root_str = absolute_path.to_string_lossy();
        let mut listeners: Option<Vec<Listener>> = None;
        let mut states = Vec::with_capacity(targets.len());

        for target in targets {
            let base = RunState::new(
                project_path,
                target.facet,
                RunKind::Script,
                target.name,
                target.command,
            );

            let signature = extract_core_command(target.invocation);
            if signature.is_empty() {
                states.push(base);
                continue;
            }

            let matched: Vec<u32> = processes
                .iter()
                .filter(|p| matches_project(p, &signature, absolute_path, &root_str))
                .map(|p| p.pid)
                .collect();

            if matched.is_empty() {
                states.push(base);
                continue;
            }

            let tree = collect_descendants(&matched, &processes);

            if listeners.is_none() {
                listeners = Some(match self.inspector.listeners().await {
                    Ok(l) => l,
                    Err(e) => {
                        debug!(project = %project_path, error = %e, "listener table unavailable");
                        Vec::new()
                    }
                });
            }

            let ports: BTreeSet<u16> = listeners
                .as_deref()
                .unwrap_or_default()
                .iter()
                .filter(|l| tree.contains(&l.pid))
                .map(|l| l.port)
                .collect();

            let mut pids: Vec<u32> = tree.into_iter().collect();
            pids.sort_unstable();

            let state = match ports.len() {
                0 => base.with_status(
                    RuntimeStatus::Running,
                    Some(format!(
                        "Process running (pids: {}) but no LISTEN TCP port detected",
                        join(&pids)
                    )),
                ),
                1 => {
                    let port = ports.first().copied();
                    base.with_status(RuntimeStatus::Running, None).with_port(port)
                }
                _ => base.with_status(
                    RuntimeStatus::Conflict,
                    Some(format!(
                        "Multiple listening ports detected: {} (pids: {})",
                        join(&ports),
                        join(&pids)
                    )),
                ),
            };

            debug!(
                project = %project_path,
                facet = target.facet.tag(),
                script = %target.name,
                status = state.status.label(),
                "script probed"
            );
            states.push(state);
        }

        states
    }
}
