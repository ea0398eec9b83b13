//! Backend process supervision
//!
//! [`ProcessSupervisor`] drives a [`Runtime`] through register, start and
//! teardown for each backend and tracks where every backend is in its
//! [`ProcessState`] lifecycle. [`ProcessSupervisor::launch`] hands back a
//! [`Supervised`] guard once the backend is running; dropping the guard (or
//! awaiting [`Supervised::teardown`]) deletes the backend and stops the
//! runtime, exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::{Builder, Handle};
use tracing::{info, warn};

use crate::error::RuntimeError;
use crate::runtime::{ProcessState, Runtime, ServiceDescriptor};

/// Drives a runtime through the backend lifecycle.
#[derive(Debug)]
pub struct ProcessSupervisor<R: Runtime> {
    runtime: R,
    states: Mutex<HashMap<String, ProcessState>>,
}

impl<R: Runtime> ProcessSupervisor<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Lifecycle state of the named backend.
    pub fn state(&self, name: &str) -> ProcessState {
        self.states()
            .get(name)
            .copied()
            .unwrap_or(ProcessState::Unregistered)
    }

    /// Record the backend with the runtime.
    pub async fn register(&self, descriptor: &ServiceDescriptor) -> Result<(), RuntimeError> {
        self.check_transition(&descriptor.name, ProcessState::Registered)?;
        self.runtime.create(descriptor).await?;
        self.set_state(&descriptor.name, ProcessState::Registered);

        info!(
            service = %descriptor.name,
            command = %descriptor.command.join(" "),
            "Backend registered"
        );
        Ok(())
    }

    /// Launch every registered backend.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        self.runtime.start().await?;

        let mut states = self.states();
        for state in states.values_mut() {
            if *state == ProcessState::Registered {
                *state = ProcessState::Running;
            }
        }
        Ok(())
    }

    /// Delete the backend, then stop the runtime.
    ///
    /// Both steps are attempted even if the delete fails; the first error is
    /// returned. The backend is `Stopped` afterwards either way.
    pub async fn teardown(&self, descriptor: &ServiceDescriptor) -> Result<(), RuntimeError> {
        self.check_transition(&descriptor.name, ProcessState::Stopped)?;

        let deleted = self.runtime.delete(&descriptor.name).await;
        let stopped = self.runtime.stop().await;
        self.set_state(&descriptor.name, ProcessState::Stopped);

        info!(service = %descriptor.name, "Backend torn down");
        deleted.and(stopped)
    }

    /// Register and start the backend, arming its teardown.
    ///
    /// On failure nothing is armed: a backend that never started is never
    /// deleted.
    pub async fn launch(
        self: &Arc<Self>,
        descriptor: ServiceDescriptor,
    ) -> Result<Supervised<R>, RuntimeError> {
        self.register(&descriptor).await?;
        self.start().await?;

        if self.state(&descriptor.name) != ProcessState::Running {
            return Err(RuntimeError::InvalidTransition {
                name: descriptor.name.clone(),
                from: self.state(&descriptor.name),
                to: ProcessState::Running,
            });
        }

        Ok(Supervised {
            supervisor: Arc::clone(self),
            descriptor: Some(descriptor),
        })
    }

    fn check_transition(&self, name: &str, next: ProcessState) -> Result<(), RuntimeError> {
        let current = self.state(name);
        if current.can_transition_to(next) {
            Ok(())
        } else {
            Err(RuntimeError::InvalidTransition {
                name: name.to_string(),
                from: current,
                to: next,
            })
        }
    }

    fn set_state(&self, name: &str, state: ProcessState) {
        self.states().insert(name.to_string(), state);
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, ProcessState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A running backend whose teardown is armed.
///
/// Teardown runs once: when [`Supervised::teardown`] is awaited or, failing
/// that, on drop. A dropped guard spawns the teardown onto the current tokio
/// runtime, or runs it on a private one when there is none.
#[must_use = "dropping the guard tears the backend down immediately"]
pub struct Supervised<R: Runtime> {
    supervisor: Arc<ProcessSupervisor<R>>,
    descriptor: Option<ServiceDescriptor>,
}

impl<R: Runtime> Supervised<R> {
    pub fn name(&self) -> &str {
        self.descriptor.as_ref().map_or("", |d| d.name.as_str())
    }

    /// Tear the backend down now and report the outcome.
    pub async fn teardown(mut self) -> Result<(), RuntimeError> {
        match self.descriptor.take() {
            Some(descriptor) => self.supervisor.teardown(&descriptor).await,
            None => Ok(()),
        }
    }
}

impl<R: Runtime> Drop for Supervised<R> {
    fn drop(&mut self) {
        let Some(descriptor) = self.descriptor.take() else {
            return;
        };
        let supervisor = Arc::clone(&self.supervisor);
        let teardown = async move {
            if let Err(e) = supervisor.teardown(&descriptor).await {
                warn!(service = %descriptor.name, error = %e, "Backend teardown failed");
            }
        };

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(teardown);
            }
            Err(_) => match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime.block_on(teardown),
                Err(e) => warn!(error = %e, "No runtime to tear the backend down on"),
            },
        }
    }
}
