use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{ErrorKind, Result, Transport};

/// A request for the [`RecordingTransport`], telling it how to behave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    Succeed(usize),
    Fail(usize),
    Panic(usize),
}

impl Probe {
    pub(crate) const fn id(self) -> usize {
        match self {
            Self::Succeed(id) | Self::Fail(id) | Self::Panic(id) => id,
        }
    }
}

/// Transport which records every invocation together with the time it
/// happened, and answers according to the [`Probe`] it receives
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    calls: Mutex<Vec<(usize, Instant)>>,
}

impl RecordingTransport {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Probe ids in the order the transport saw them
    pub(crate) fn order(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    /// Invocation timestamps in execution order
    pub(crate) fn timestamps(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    type Request = Probe;
    type Response = usize;

    async fn execute(&self, probe: Probe) -> Result<usize> {
        self.calls.lock().unwrap().push((probe.id(), Instant::now()));
        match probe {
            Probe::Succeed(id) => Ok(id),
            Probe::Fail(id) => Err(ErrorKind::Transport(format!("probe {id} failed"))),
            Probe::Panic(id) => panic!("probe {id} panicked"),
        }
    }
}
