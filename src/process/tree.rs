use std::process::Command;

use tracing::debug;

/// Start the child in its own process group so its descendants can be
/// signalled together. On Windows the tree is resolved by `taskkill /T`.
pub fn isolate(cmd: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    #[cfg(not(unix))]
    let _ = cmd;
}

/// Forcefully kill `pid` and every process in its group. Best effort.
pub fn kill_tree(pid: u32) {
    // A zero pid would address our own process group.
    if pid == 0 {
        return;
    }

    #[cfg(unix)]
    {
        // SAFETY: kill(2) with a negative pid signals a process group and does
        // not touch our memory. The group was created by `isolate`.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            debug!(pid, error = %std::io::Error::last_os_error(), "process group kill failed");
        }
    }

    #[cfg(windows)]
    {
        let status = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
        if let Err(e) = status {
            debug!(pid, error = %e, "taskkill failed");
        }
    }
}
