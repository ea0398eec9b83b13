//! Runtime that runs backends as child processes.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::process::Stdio;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::time::{Duration, timeout};
use tracing::{info, warn};

use crate::error::RuntimeError;
use crate::runtime::{Output, Runtime, ServiceDescriptor};

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs each registered backend as a child of this process.
///
/// Terminating a backend sends SIGTERM, waits up to the stop timeout, then
/// kills it outright. Children are always reaped. Dropping the runtime kills
/// whatever is still running without waiting.
#[derive(Debug)]
pub struct LocalRuntime {
    table: Mutex<ProcessTable>,
    stop_timeout: Duration,
}

#[derive(Debug, Default)]
struct ProcessTable {
    processes: HashMap<String, ManagedProcess>,
    stopped: bool,
}

#[derive(Debug)]
struct ManagedProcess {
    descriptor: ServiceDescriptor,
    child: Option<Child>,
    launched: bool,
}

impl LocalRuntime {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(ProcessTable::default()),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Pid of the named backend while it has a live child handle.
    pub fn pid(&self, name: &str) -> Option<u32> {
        self.table()
            .processes
            .get(name)
            .and_then(|p| p.child.as_ref())
            .and_then(Child::id)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.table().processes.contains_key(name)
    }

    pub fn is_stopped(&self) -> bool {
        self.table().stopped
    }

    fn table(&self) -> MutexGuard<'_, ProcessTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runtime for LocalRuntime {
    async fn create(&self, descriptor: &ServiceDescriptor) -> Result<(), RuntimeError> {
        let mut table = self.table();
        if table.stopped {
            return Err(RuntimeError::Stopped);
        }
        if descriptor.program().is_none() {
            return Err(RuntimeError::EmptyCommand {
                name: descriptor.name.clone(),
            });
        }
        if table.processes.contains_key(&descriptor.name) {
            return Err(RuntimeError::AlreadyRegistered {
                name: descriptor.name.clone(),
            });
        }

        table.processes.insert(
            descriptor.name.clone(),
            ManagedProcess {
                descriptor: descriptor.clone(),
                child: None,
                launched: false,
            },
        );
        Ok(())
    }

    async fn start(&self) -> Result<(), RuntimeError> {
        let mut table = self.table();
        if table.stopped {
            return Err(RuntimeError::Stopped);
        }

        for process in table.processes.values_mut().filter(|p| !p.launched) {
            process.spawn()?;
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), RuntimeError> {
        // terminate outside the lock, it waits up to the stop timeout
        let mut process = self
            .table()
            .processes
            .remove(name)
            .ok_or_else(|| RuntimeError::NotFound {
                name: name.to_string(),
            })?;

        process.terminate(self.stop_timeout).await
    }

    async fn stop(&self) -> Result<(), RuntimeError> {
        let remaining: Vec<ManagedProcess> = {
            let mut table = self.table();
            table.stopped = true;
            table.processes.drain().map(|(_, p)| p).collect()
        };

        let mut result = Ok(());
        for mut process in remaining {
            if let Err(e) = process.terminate(self.stop_timeout).await {
                warn!(service = %process.descriptor.name, error = %e, "Failed to stop backend");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

impl Drop for LocalRuntime {
    fn drop(&mut self) {
        let table = self.table.get_mut().unwrap_or_else(PoisonError::into_inner);
        table.stopped = true;
        // children are spawned with kill_on_drop
        for (name, process) in table.processes.drain() {
            if process.child.is_some() {
                warn!(service = %name, "Runtime dropped with backend running, killing it");
            }
        }
    }
}

impl ManagedProcess {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn spawn(&mut self) -> Result<(), RuntimeError> {
        let program = self
            .descriptor
            .program()
            .ok_or_else(|| RuntimeError::EmptyCommand {
                name: self.name().to_string(),
            })?
            .to_string();

        let mut cmd = Command::new(&program);
        cmd.args(self.descriptor.args());
        cmd.stdin(Stdio::null());
        cmd.stdout(self.stdout()?);
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| RuntimeError::Launch {
            name: self.name().to_string(),
            program: program.clone(),
            source,
        })?;

        info!(
            service = self.name(),
            pid = child.id().unwrap_or_default(),
            command = %program,
            output = %self.descriptor.output,
            "Backend spawned"
        );
        self.child = Some(child);
        self.launched = true;
        Ok(())
    }

    fn stdout(&self) -> Result<Stdio, RuntimeError> {
        Ok(match &self.descriptor.output {
            Output::Stdout => Stdio::inherit(),
            Output::Null => Stdio::null(),
            Output::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| RuntimeError::Output {
                        name: self.name().to_string(),
                        path: path.clone(),
                        source,
                    })?;
                Stdio::from(file)
            }
        })
    }

    /// Ask the child to exit, escalating to a kill after `stop_timeout`.
    async fn terminate(&mut self, stop_timeout: Duration) -> Result<(), RuntimeError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let name = self.name().to_string();
        let failed = |source: std::io::Error| RuntimeError::Terminate {
            name: name.clone(),
            source,
        };

        if let Some(status) = child.try_wait().map_err(failed)? {
            info!(service = %name, %status, "Backend had already exited");
            return Ok(());
        }

        info!(service = %name, pid = child.id().unwrap_or_default(), "Sending SIGTERM to backend");
        request_exit(&child);

        if let Ok(status) = timeout(stop_timeout, child.wait()).await {
            let status = status.map_err(failed)?;
            info!(service = %name, %status, "Backend exited");
            return Ok(());
        }

        warn!(
            service = %name,
            timeout_secs = stop_timeout.as_secs(),
            "Stop timeout reached, killing backend"
        );
        child.start_kill().map_err(failed)?;
        let status = child.wait().await.map_err(failed)?;
        info!(service = %name, %status, "Backend killed");
        Ok(())
    }
}

#[cfg(unix)]
fn request_exit(child: &Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!(pid, error = %e, "Failed to send SIGTERM");
    }
}

#[cfg(not(unix))]
fn request_exit(_child: &Child) {
    // no graceful signal; the kill after the stop timeout does the work
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Instant;

    use super::*;

    fn sleeper(name: &str) -> ServiceDescriptor {
        ServiceDescriptor::new(name, vec!["/bin/sleep".to_string(), "60".to_string()])
            .with_output(Output::Null)
    }

    #[tokio::test]
    async fn start_skips_processes_already_launched() {
        let runtime = LocalRuntime::new();
        runtime.create(&sleeper("a")).await.unwrap();
        runtime.start().await.unwrap();
        let first = runtime.pid("a").unwrap();

        runtime.start().await.unwrap();
        assert_eq!(runtime.pid("a"), Some(first));

        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stubborn_backend_is_killed_after_timeout() {
        let runtime = LocalRuntime::new().with_stop_timeout(Duration::from_millis(200));
        let descriptor = ServiceDescriptor::new(
            "stubborn",
            vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "trap '' TERM; sleep 60".to_string(),
            ],
        )
        .with_output(Output::Null);
        runtime.create(&descriptor).await.unwrap();
        runtime.start().await.unwrap();
        // give the shell time to install the trap
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = Instant::now();
        runtime.delete("stubborn").await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!runtime.is_registered("stubborn"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn waiting_for_exit_leaves_executor_free() {
        let runtime = LocalRuntime::new().with_stop_timeout(Duration::from_millis(600));
        let descriptor = ServiceDescriptor::new(
            "stubborn",
            vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "trap '' TERM; sleep 60".to_string(),
            ],
        )
        .with_output(Output::Null);
        runtime.create(&descriptor).await.unwrap();
        runtime.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let ticker = tokio::spawn(async {
            let mut ticks = 0u32;
            let mut interval = tokio::time::interval(Duration::from_millis(50));
            loop {
                interval.tick().await;
                ticks += 1;
                if ticks == 5 {
                    return Instant::now();
                }
            }
        });

        runtime.delete("stubborn").await.unwrap();
        let deleted = Instant::now();
        let ticked = ticker.await.unwrap();

        // the ticker finished while delete was still waiting on the child
        assert!(ticked < deleted);
    }
}
