mod app;
mod cli;
mod ui;

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use app::{App, InputMode, LineKind};
use gatewayctl::Orchestrator;
use gatewayctl::config::{self, Config};
use gatewayctl::orchestrator::{OpEvent, Operation, Outcome};
use gatewayctl::process::{CancelToken, ChannelSink};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = load_config(&cli)?;

    let Some(command) = cli.command else {
        init_tracing(cli.log_file.as_deref(), false)?;
        return run_dashboard(config);
    };

    init_tracing(cli.log_file.as_deref(), true)?;
    let code = cli::run(command, config)?;
    std::process::exit(code);
}

fn load_config(cli: &cli::Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("reading current directory")?;
            config::load(&cwd).context("loading configuration")?
        }
    };
    if let Some(dir) = &cli.work_dir {
        cfg.work_dir = std::path::absolute(dir)
            .with_context(|| format!("resolving {}", dir.display()))?;
    }
    Ok(cfg)
}

/// Initialize the tracing subscriber.
///
/// The dashboard owns the terminal, so there it only logs when a file is
/// given; subcommands log to stderr.
fn init_tracing(log_file: Option<&Path>, to_stderr: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gatewayctl=warn"));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if to_stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

// ── Dashboard ─────────────────────────────────────────────────────────

fn run_dashboard(config: Config) -> Result<()> {
    // Ensure terminal is restored on panic.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        original_hook(info);
    }));

    let mut app = App::new(&config);
    let orch = Arc::new(Orchestrator::new(config));

    let mut terminal = setup_terminal()?;
    let result = run(&mut terminal, &mut app, &orch);
    restore_terminal()?;

    // Nothing outlives the dashboard.
    if let Some(token) = &app.cancel_token {
        token.cancel();
    }
    if let Some(handle) = app.tail.take() {
        orch.cancel_logs(&handle);
    }
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    orch: &Arc<Orchestrator>,
) -> Result<()> {
    app.info(format!(
        "{} · compose file {} in {}",
        orch.config().service,
        orch.config().compose_file,
        orch.config().work_dir.display()
    ));

    while app.running {
        if app.status_due() {
            start_status_probe(app, orch);
        }

        terminal.draw(|frame| ui::draw(frame, &*app))?;

        // Poll for input: use a short timeout while an operation runs (to
        // drain its output promptly) and a longer one when idle.
        let poll_timeout = if app.busy.is_some() || app.following {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(200)
        };
        if event::poll(poll_timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key(app, orch, key);
        }

        drain_op_events(app, orch);
        drain_tail_lines(app);
        app.sync_following(orch.is_following());
        drain_status(app);
    }

    Ok(())
}

fn handle_key(app: &mut App, orch: &Arc<Orchestrator>, key: KeyEvent) {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        app.running = false;
        return;
    }

    if app.show_help {
        app.show_help = false;
        return;
    }

    match app.mode.clone() {
        InputMode::Exec => handle_exec_input(app, orch, key),
        InputMode::Confirm(op) => {
            app.mode = InputMode::Normal;
            if key.code == KeyCode::Char('y') {
                start_operation(app, orch, op);
            } else {
                app.info(format!("{op} aborted"));
            }
        }
        InputMode::Normal => handle_normal_key(app, orch, key),
    }
}

fn handle_normal_key(app: &mut App, orch: &Arc<Orchestrator>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Esc => {
            if app.busy.is_some()
                && let Some(token) = &app.cancel_token
            {
                token.cancel();
                app.info("cancelling…");
            }
        }
        KeyCode::Char('s') => {
            app.follow_after_start = true;
            start_operation(app, orch, Operation::Start);
        }
        // Stopping tears down the tail itself.
        KeyCode::Char('x') => start_operation(app, orch, Operation::Stop),
        KeyCode::Char('b') => request(app, orch, Operation::Build),
        KeyCode::Char('r') => request(app, orch, Operation::Rebuild),
        KeyCode::Char('d') => request(app, orch, Operation::Remove),
        KeyCode::Char('w') => request(app, orch, Operation::Wipe),
        KeyCode::Char('e') if app.busy.is_none() => {
            app.input.clear();
            app.mode = InputMode::Exec;
        }
        KeyCode::Char('l') => toggle_follow(app, orch),
        KeyCode::Char('u') => app.last_probe = None,
        KeyCode::Char('c') => app.clear_log(),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_down(1),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(20),
        KeyCode::PageUp => app.scroll_up(20),
        KeyCode::End | KeyCode::Char('G') => app.scroll = 0,
        _ => {}
    }
}

fn handle_exec_input(app: &mut App, orch: &Arc<Orchestrator>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.mode = InputMode::Normal;
            app.input.clear();
        }
        KeyCode::Enter => {
            app.mode = InputMode::Normal;
            let command = std::mem::take(&mut app.input);
            if !command.trim().is_empty() {
                start_operation(app, orch, Operation::Exec(command));
            }
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) => app.input.push(c),
        _ => {}
    }
}

/// Destructive operations wait for `y` in the footer first.
fn request(app: &mut App, orch: &Arc<Orchestrator>, op: Operation) {
    if op.is_destructive() && app.busy.is_none() {
        app.mode = InputMode::Confirm(op);
    } else {
        start_operation(app, orch, op);
    }
}

/// Run `op` in the background; one operation at a time.
fn start_operation(app: &mut App, orch: &Arc<Orchestrator>, op: Operation) {
    if let Some(running) = &app.busy {
        let msg = format!("{} is still running", running.label());
        app.error(msg);
        app.follow_after_start = false;
        return;
    }

    app.info(format!("── {op} ──"));
    app.scroll = 0;
    let cancel = CancelToken::new();
    app.op_rx = Some(orch.spawn(op.clone(), cancel.clone()));
    app.cancel_token = Some(cancel);
    app.busy = Some(op);
}

fn toggle_follow(app: &mut App, orch: &Arc<Orchestrator>) {
    if orch.is_following()
        && let Some(handle) = app.tail.take()
    {
        orch.cancel_logs(&handle);
        app.following = false;
        app.info("stopped following logs");
        return;
    }
    follow(app, orch);
}

fn follow(app: &mut App, orch: &Arc<Orchestrator>) {
    let sink = ChannelSink::new(app.tail_tx.clone(), |stream, line| (stream, line));
    app.tail = Some(orch.follow_logs(Box::new(sink)));
    app.following = true;
    app.info(format!("following {} logs", app.service));
}

/// Drain pending operation events without blocking.
fn drain_op_events(app: &mut App, orch: &Arc<Orchestrator>) {
    let mut events = Vec::new();
    if let Some(rx) = &app.op_rx {
        while let Ok(ev) = rx.try_recv() {
            let done = matches!(ev, OpEvent::Finished(_));
            events.push(ev);
            if done {
                break;
            }
        }
    }

    let mut finished = None;
    for ev in events {
        match ev {
            OpEvent::Stdout(line) => app.push(LineKind::Stdout, line),
            OpEvent::Stderr(line) => app.push(LineKind::Stderr, line),
            OpEvent::Finished(outcome) => finished = Some(outcome),
        }
    }

    let Some(outcome) = finished else {
        return;
    };
    let op = app.busy.take();
    app.op_rx = None;
    app.cancel_token = None;

    let label = op.as_ref().map_or("operation", |o| o.label());
    match &outcome {
        Outcome::Exited(0) => app.info(format!("{label}: {outcome}")),
        _ => app.error(format!("{label}: {outcome}")),
    }

    let follow_now = std::mem::take(&mut app.follow_after_start);
    if follow_now && op == Some(Operation::Start) && outcome.is_success() {
        follow(app, orch);
    }
    // Lifecycle changes show up on the status bar right away.
    app.last_probe = None;
}

fn drain_tail_lines(app: &mut App) {
    while let Ok((stream, line)) = app.tail_rx.try_recv() {
        app.push_tail(stream, &line);
    }
}

fn drain_status(app: &mut App) {
    let Some(rx) = &app.status_rx else {
        return;
    };
    match rx.try_recv() {
        Ok(status) => {
            app.status = Some(status);
            app.status_rx = None;
        }
        Err(std::sync::mpsc::TryRecvError::Empty) => {}
        Err(std::sync::mpsc::TryRecvError::Disconnected) => app.status_rx = None,
    }
}

/// Probe on a background thread; the UI keeps the last known status.
fn start_status_probe(app: &mut App, orch: &Arc<Orchestrator>) {
    let (tx, rx) = std::sync::mpsc::channel();
    let orch = Arc::clone(orch);
    std::thread::spawn(move || {
        let status = orch.status();
        debug!(%status, "status probed");
        let _ = tx.send(status);
    });
    app.status_rx = Some(rx);
    app.last_probe = Some(Instant::now());
}
