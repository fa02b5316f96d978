//! Adapter from callback-style permission launchers to [`PermissionDispatcher`]
//!
//! Platform APIs usually take a result callback instead of returning a
//! future. [`CallbackDispatcher`] hands the launcher an [`OutcomeCallback`]
//! backed by a oneshot channel and awaits the other end.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::host::{HostError, PermissionDispatcher};
use crate::permission::{PermissionSet, RequestOutcome};

/// One-shot continuation for a launched request
///
/// `complete` consumes the callback, so a result can be delivered at most
/// once. Dropping it without completing resolves the request with
/// [`HostError::ResultDropped`].
#[derive(Debug)]
pub struct OutcomeCallback {
    requested: PermissionSet,
    tx: oneshot::Sender<RequestOutcome>,
}

impl OutcomeCallback {
    /// Permissions this callback is answering for
    pub fn requested(&self) -> &PermissionSet {
        &self.requested
    }

    /// Deliver the host's answer
    pub fn complete(self, outcome: RequestOutcome) {
        if self.tx.send(outcome).is_err() {
            tracing::debug!(permissions = %self.requested, "Request result arrived after the flow went away");
        }
    }
}

/// Wraps a launcher closure as an async dispatcher
pub struct CallbackDispatcher<F> {
    launch: F,
}

impl<F> CallbackDispatcher<F>
where
    F: Fn(PermissionSet, OutcomeCallback) -> Result<(), HostError> + Send + Sync,
{
    pub fn new(launch: F) -> Self {
        Self { launch }
    }
}

impl<F> std::fmt::Debug for CallbackDispatcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackDispatcher").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> PermissionDispatcher for CallbackDispatcher<F>
where
    F: Fn(PermissionSet, OutcomeCallback) -> Result<(), HostError> + Send + Sync,
{
    async fn request_permissions(
        &self,
        permissions: &PermissionSet,
    ) -> Result<RequestOutcome, HostError> {
        let (tx, rx) = oneshot::channel();
        let callback = OutcomeCallback {
            requested: permissions.clone(),
            tx,
        };
        (self.launch)(permissions.clone(), callback)?;
        rx.await.map_err(|_| HostError::ResultDropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_immediate_completion() {
        let dispatcher = CallbackDispatcher::new(|set: PermissionSet, cb: OutcomeCallback| {
            cb.complete(set.iter().map(|p| (p.clone(), true)).collect());
            Ok(())
        });

        let set: PermissionSet = ["a", "b"].into_iter().collect();
        let outcome = dispatcher.request_permissions(&set).await.unwrap();
        assert!(outcome.denied_in(&set).is_empty());
    }

    #[tokio::test]
    async fn test_deferred_completion() {
        let parked: Arc<Mutex<Option<OutcomeCallback>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&parked);
        let dispatcher = CallbackDispatcher::new(move |_set, cb| {
            *slot.lock().unwrap() = Some(cb);
            Ok(())
        });

        let set = PermissionSet::single("a");
        let request = dispatcher.request_permissions(&set);
        let completer = async {
            loop {
                if let Some(cb) = parked.lock().unwrap().take() {
                    assert_eq!(cb.requested(), &PermissionSet::single("a"));
                    cb.complete(RequestOutcome::new().with("a", false));
                    break;
                }
                tokio::task::yield_now().await;
            }
        };

        let (outcome, ()) = tokio::join!(request, completer);
        assert_eq!(outcome.unwrap().get(&"a".into()), Some(false));
    }

    #[tokio::test]
    async fn test_dropped_callback() {
        let dispatcher = CallbackDispatcher::new(|_set, cb| {
            drop(cb);
            Ok(())
        });

        let err = dispatcher
            .request_permissions(&PermissionSet::single("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::ResultDropped));
    }

    #[tokio::test]
    async fn test_launch_failure_propagates() {
        let dispatcher =
            CallbackDispatcher::new(|_set, _cb| Err(HostError::Launch("no activity".into())));

        let err = dispatcher
            .request_permissions(&PermissionSet::single("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Launch(_)));
    }
}
