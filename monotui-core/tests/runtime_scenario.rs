//! End-to-end: discovered project -> poller -> reconciled snapshot -> grid

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use monotui_core::config::RuntimeConfig;
use monotui_core::grid::{Cell, build_workspace_grid};
use monotui_core::model::{
    ComposeFacet, ComposeService, Facets, MakefileCommand, MakefileFacet, Project, ProjectType,
};
use monotui_core::navigation::{Direction, NavIntent, NavKey, NavigationMode, Navigator};
use monotui_core::poller::{PollerCommand, Probes, RuntimePoller};
use monotui_core::probe::{
    ContainerInfo, ContainerProbe, ContainerRuntime, Listener, PortChecker, ProbeError,
    ProcessInfo, ProcessInspector, ProcessProbe, parse_docker_ps_line,
};
use monotui_core::quick_actions::derive_quick_actions;
use monotui_core::runtime::{RunKind, RuntimeStatus};

struct IdleMachine;

#[async_trait]
impl ProcessInspector for IdleMachine {
    async fn processes(&self) -> Result<Vec<ProcessInfo>, ProbeError> {
        Ok(vec![ProcessInfo {
            pid: 1,
            parent: None,
            command_line: "/sbin/init".into(),
            cwd: Some(PathBuf::from("/")),
        }])
    }

    async fn listeners(&self) -> Result<Vec<Listener>, ProbeError> {
        Ok(vec![])
    }
}

struct DockerPs(Vec<ContainerInfo>);

#[async_trait]
impl ContainerRuntime for DockerPs {
    async fn containers(&self) -> Result<Vec<ContainerInfo>, ProbeError> {
        Ok(self.0.clone())
    }
}

struct NothingListening;

#[async_trait]
impl PortChecker for NothingListening {
    async fn is_in_use(&self, _port: u16) -> bool {
        false
    }
}

fn myapp() -> Project {
    Project {
        name: "myapp".into(),
        path: "apps/myapp".into(),
        absolute_path: PathBuf::from("/work/repo/apps/myapp"),
        project_type: ProjectType::App,
        folder: "myapp".into(),
        facets: Facets {
            makefile: Some(MakefileFacet {
                filename: "Makefile".into(),
                path: "apps/myapp/Makefile".into(),
                commands: vec![Arc::new(MakefileCommand {
                    name: "dev".into(),
                    command: "make dev".into(),
                    exec: "pnpm dev".into(),
                    port: None,
                    description: None,
                    dependencies: vec![],
                })],
            }),
            package_json: None,
            compose: Some(ComposeFacet {
                filename: "docker-compose.yml".into(),
                path: "apps/myapp/docker-compose.yml".into(),
                services: vec![Arc::new(ComposeService {
                    name: "db".into(),
                    container_name: None,
                    image: Some("postgres:16".into()),
                    ports: vec![5432],
                })],
            }),
        },
    }
}

#[tokio::test]
async fn test_stopped_script_and_running_container() {
    let container = parse_docker_ps_line(
        r#"{"ID":"f00","Image":"postgres:16","Names":"myapp-db-1","Ports":"0.0.0.0:5432->5432/tcp, :::5432->5432/tcp","State":"running","Status":"Up 5 minutes"}"#,
    )
    .unwrap();

    let probes = Probes {
        process: Arc::new(ProcessProbe::new(Arc::new(IdleMachine))),
        container: Arc::new(ContainerProbe::new(
            Arc::new(DockerPs(vec![container])),
            Arc::new(NothingListening),
        )),
    };
    let handle = RuntimePoller::spawn(probes, &RuntimeConfig::default());
    let mut rx = handle.subscribe();

    let projects = vec![Arc::new(myapp())];
    handle
        .send(PollerCommand::SetProjects(projects.clone()))
        .await;
    rx.changed().await.unwrap();
    let snapshot = rx.borrow_and_update().clone();

    assert_eq!(snapshot.len(), 1);
    let states = &snapshot[0].run_states;
    assert_eq!(states.len(), 2);

    assert_eq!(states[0].name, "dev");
    assert_eq!(states[0].kind, RunKind::Script);
    assert_eq!(states[0].status, RuntimeStatus::Stopped);
    assert_eq!(states[0].id, "apps/myapp::makefile::dev");
    assert_eq!(states[0].command, "make dev");

    assert_eq!(states[1].name, "db");
    assert_eq!(states[1].kind, RunKind::Service);
    assert_eq!(states[1].status, RuntimeStatus::Running);
    assert_eq!(states[1].port, Some(5432));
    assert_eq!(states[1].id, "apps/myapp::compose::db");

    // only the running service earns a runtime cell
    let actions = derive_quick_actions(&projects);
    let grid = build_workspace_grid(&projects, &actions, &snapshot);
    assert_eq!(grid.rows()[0].cells.len(), 1 + 3 + 1);

    let mut nav = Navigator::new(NavigationMode::Free);
    nav.on_rebuild(&grid, None);
    nav.handle_key(&grid, NavKey::Move(Direction::Left));
    let intent = nav.handle_key(&grid, NavKey::Stop);
    let Some(NavIntent::Stop(pos)) = intent else {
        panic!("expected a stop intent, got {intent:?}");
    };
    match grid.cell_at(pos.row, pos.col) {
        Some(Cell::Runtime { run_state, .. }) => assert_eq!(run_state.name, "db"),
        other => panic!("expected runtime cell, got {other:?}"),
    }

    handle.shutdown().await;
}
