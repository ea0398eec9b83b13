//! Shared test helpers
#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use svcproxy::error::RuntimeError;
use svcproxy::runtime::{Runtime, ServiceDescriptor};

/// A runtime call as seen by [`RecordingRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Start,
    Delete(String),
    Stop,
}

#[derive(Debug, Default)]
pub struct RecordingRuntime {
    calls: Mutex<Vec<Call>>,
    fail_start: bool,
    fail_delete: bool,
}

impl RecordingRuntime {
    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until `expected` calls have been recorded, then return them all.
    ///
    /// A dropped guard tears down on a spawned task, so its calls land a
    /// moment after the drop.
    pub async fn settled_calls(&self, expected: usize) -> Vec<Call> {
        for _ in 0..200 {
            if self.calls().len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // let any stray duplicate land before the caller compares
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.calls()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Runtime for RecordingRuntime {
    async fn create(&self, descriptor: &ServiceDescriptor) -> Result<(), RuntimeError> {
        self.record(Call::Create(descriptor.name.clone()));
        Ok(())
    }

    async fn start(&self) -> Result<(), RuntimeError> {
        self.record(Call::Start);
        if self.fail_start {
            return Err(RuntimeError::Launch {
                name: "backend".to_string(),
                program: "/nonexistent".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(Call::Delete(name.to_string()));
        if self.fail_delete {
            return Err(RuntimeError::NotFound {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), RuntimeError> {
        self.record(Call::Stop);
        Ok(())
    }
}
