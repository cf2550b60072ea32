use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::Invocation;

/// `<engine> <args...>` run from the work directory.
fn engine(cfg: &Config, args: &[&str]) -> Invocation {
    Invocation::new(&cfg.engine, &cfg.work_dir).args(args.iter().copied())
}

/// `<engine> compose -f <file> <args...>`.
fn compose(cfg: &Config, args: &[&str]) -> Invocation {
    engine(cfg, &["compose", "-f", &cfg.compose_file]).args(args.iter().copied())
}

/// Bring the service up detached.
pub fn start_command(cfg: &Config) -> Invocation {
    compose(cfg, &["up", "-d", &cfg.service])
}

/// Stop the service without removing it.
pub fn stop_command(cfg: &Config) -> Invocation {
    compose(cfg, &["stop", &cfg.service])
}

/// Rebuild the service image ignoring the layer cache.
pub fn build_command(cfg: &Config) -> Invocation {
    compose(cfg, &["build", "--no-cache", &cfg.service])
}

/// Remove only the service container; images and volumes stay.
pub fn remove_command(cfg: &Config) -> Invocation {
    compose(cfg, &["rm", "--stop", "--force", &cfg.service])
}

/// Follow the service logs until killed.
pub fn logs_command(cfg: &Config) -> Invocation {
    compose(cfg, &["logs", "--follow", &cfg.service])
}

/// Tear down the project including images, volumes and orphans.
pub fn down_command(cfg: &Config) -> Invocation {
    compose(cfg, &["down", "--rmi", "all", "-v", "--remove-orphans"])
}

pub fn network_remove_command(cfg: &Config, network: &str) -> Invocation {
    engine(cfg, &["network", "rm", network])
}

/// Engine-wide prune of everything unused.
pub fn prune_command(cfg: &Config) -> Invocation {
    engine(cfg, &["system", "prune", "-af"])
}

/// Engine reachability check; exits non-zero when the daemon is down.
pub fn info_command(cfg: &Config) -> Invocation {
    engine(cfg, &["info", "--format", "{{.ServerVersion}}"])
}

/// Inspect the image directly, independent of any container.
pub fn image_inspect_command(cfg: &Config) -> Invocation {
    engine(cfg, &["image", "inspect", "--format", "{{.Id}}", &cfg.image])
}

pub fn container_state_command(cfg: &Config) -> Invocation {
    engine(
        cfg,
        &["inspect", "--format", "{{.State.Status}}", &cfg.container],
    )
}

/// Service-state query for platforms that manage the engine as a service.
pub fn desktop_query_command(cfg: &Config) -> Option<Invocation> {
    let words = cfg.resolved_desktop_query()?;
    let (program, args) = words.split_first()?;
    Some(Invocation::new(program, &cfg.work_dir).args(args.iter().cloned()))
}

/// Escape text for embedding inside a double-quoted shell word.
pub fn escape_double_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Command line (without the engine) that runs `command` through the
/// container's shell: `exec <container> <shell> -c "<escaped>"`.
pub fn exec_line(cfg: &Config, command: &str) -> String {
    format!(
        "exec {} {} -c \"{}\"",
        shell_words::quote(&cfg.container),
        shell_words::quote(&cfg.exec_shell),
        escape_double_quoted(command)
    )
}

/// Split [`exec_line`] into argv; the shell receives `command` verbatim.
pub fn exec_command(cfg: &Config, command: &str) -> Result<Invocation> {
    let line = exec_line(cfg, command);
    let args = shell_words::split(&line)
        .map_err(|e| Error::InvalidCommand(format!("{line}: {e}")))?;
    Ok(Invocation::new(&cfg.engine, &cfg.work_dir).args(args))
}
