use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use cmdrelay::bridge::{Bridge, BridgeCall, BridgeReply};
use cmdrelay::errors::Result;

/// Per-call behaviour of a [`FakeBridge`].
pub type CallHandler = Arc<
    dyn Fn(BridgeCall) -> Pin<Box<dyn Future<Output = Result<BridgeReply>> + Send>> + Send + Sync,
>;

/// A `Bridge` implementation that never touches real processes.
///
/// - Records every call, in order, for later assertions.
/// - Delegates the reply to a caller-supplied handler, so tests can
///   script successes, failures, delays, or a hang (for timeout tests).
#[derive(Clone)]
pub struct FakeBridge {
    calls: Arc<Mutex<Vec<BridgeCall>>>,
    handler: CallHandler,
}

impl FakeBridge {
    pub fn new(handler: CallHandler) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            handler,
        }
    }

    /// A bridge that answers every command call with its command name as
    /// output, and every kill with `Killed`.
    pub fn echoing() -> Self {
        Self::new(Arc::new(|call| {
            Box::pin(async move {
                match call {
                    BridgeCall::Execute { command, .. } | BridgeCall::Spawn { command, .. } => {
                        // Let other tasks run so concurrency bugs surface.
                        tokio::task::yield_now().await;
                        Ok(BridgeReply::Output(command))
                    }
                    BridgeCall::Kill { .. } => Ok(BridgeReply::Killed),
                    BridgeCall::Which { command, .. } => Ok(BridgeReply::Path(command.into())),
                    BridgeCall::PathExists { .. } => Ok(BridgeReply::Exists(false)),
                }
            })
        }))
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Correlation ids of recorded `Kill` calls, in order.
    pub fn kill_ids(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BridgeCall::Kill { id } => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl Bridge for FakeBridge {
    fn call(
        &self,
        call: BridgeCall,
    ) -> Pin<Box<dyn Future<Output = Result<BridgeReply>> + Send + '_>> {
        self.calls.lock().unwrap().push(call.clone());
        (self.handler.as_ref())(call)
    }
}

impl std::fmt::Debug for FakeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeBridge")
            .field("calls", &self.calls.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}
