// Suppress clippy warnings that require extensive refactoring
#![allow(clippy::collapsible_if)]
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]

mod app;
mod commands;
mod discovery;
mod dispatch;
mod inspect;
mod logging;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event as CEvent, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use monotui_core::config::{ConfigError, MonotuiConfig};
use monotui_core::poller::RuntimePoller;

use app::{Action, App};
use dispatch::{Dispatcher, ExecMode};

#[derive(Parser)]
#[command(name = "monotui")]
#[command(about = "Terminal dashboard for monorepos", long_about = None)]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file (defaults to monotui.yml in the workspace root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the dashboard (default)
    Tui,
    /// Poll once and print the runtime state of every project
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Write a default monotui.yml
    Init {
        #[arg(short, long)]
        force: bool,
    },
}

type Term = Terminal<CrosstermBackend<io::Stdout>>;

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Hands the terminal to a foreground command
fn suspend_terminal(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

fn resume_terminal(terminal: &mut Term) -> io::Result<()> {
    enable_raw_mode()?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal.clear()
}

fn load_config(root: &Path, explicit: Option<&Path>) -> Result<(Option<PathBuf>, MonotuiConfig), ConfigError> {
    match explicit {
        Some(path) => Ok((Some(path.to_path_buf()), MonotuiConfig::load(path)?)),
        None => MonotuiConfig::discover(root),
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    if let Some(Commands::Init { force }) = cli.command {
        return match commands::run_init(&root, force) {
            Ok(()) => Ok(()),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
    }

    let (config_path, config) = match load_config(&root, cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let tui = matches!(cli.command, None | Some(Commands::Tui));
    let _logging_guard = logging::init(&config.logging, !tui);
    match &config_path {
        Some(path) => info!(path = %path.display(), "config loaded"),
        None => info!("no config file, using defaults"),
    }

    match cli.command {
        Some(Commands::Status { json }) => match commands::run_status(&root, &config, json).await {
            Ok(()) => Ok(()),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        _ => run_tui(root, config).await,
    }
}

async fn run_tui(root: PathBuf, config: MonotuiConfig) -> io::Result<()> {
    let projects = match discovery::discover_shared(root.clone(), config.discovery.clone()).await {
        Ok(projects) => projects,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let poller = RuntimePoller::spawn(inspect::local_probes(), &config.runtime);
    let mut app = App::new(
        root,
        config.discovery.clone(),
        Dispatcher::new(&config.execution),
        poller.sender(),
        poller.subscribe(),
    );
    app.set_projects(projects);

    let mut terminal = setup_terminal()?;
    let result = tui_loop(&mut terminal, &mut app).await;
    restore_terminal(terminal)?;
    poller.shutdown().await;

    if let Err(e) = &result {
        warn!(error = %e, "dashboard exited with an error");
    }
    result
}

async fn tui_loop(terminal: &mut Term, app: &mut App) -> io::Result<()> {
    let mut dirty = true;

    loop {
        dirty |= app.tick();
        if dirty {
            terminal.draw(|f| ui::draw(f, app))?;
            dirty = false;
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }

        let ev = event::read()?;
        let CEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = ev
        else {
            // resizes and the like
            dirty = true;
            continue;
        };
        dirty = true;

        match app.handle_key(code, modifiers) {
            Action::None => {}
            Action::Quit => return Ok(()),
            Action::Rediscover => app.rediscover().await,
            Action::RunAttached { command, cwd } => {
                suspend_terminal(terminal)?;
                println!("$ {}", command);
                let result = app.dispatcher().run_command(&command, &cwd, ExecMode::Attached).await;
                resume_terminal(terminal)?;
                app.attached_finished(&command, result);
            }
        }
    }
}
