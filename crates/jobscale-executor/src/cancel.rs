//! Cancellation of in-flight remote calls.
//!
//! A `CancelSignal` is the receiving half of a `watch` channel; sending
//! `true` aborts whatever remote call is pending and fails the rest of
//! the invocation with `ScaleError::Cancelled`.

use std::future::Future;

use tokio::sync::watch;

use jobscale_core::ClientResult;

use crate::error::{ScaleError, ScaleResult};

pub type CancelSignal = watch::Receiver<bool>;

/// A signal that never fires.
pub fn never_cancelled() -> CancelSignal {
    let (_tx, rx) = watch::channel(false);
    rx
}

/// Run a remote call unless (or until) `cancel` fires.
pub(crate) async fn guarded<T, F>(cancel: &CancelSignal, call: F) -> ScaleResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    if *cancel.borrow() {
        return Err(ScaleError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = wait_cancelled(cancel.clone()) => Err(ScaleError::Cancelled),
        result = call => result.map_err(ScaleError::from),
    }
}

async fn wait_cancelled(mut rx: CancelSignal) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nobody can cancel any more.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use jobscale_core::ClientError;

    #[tokio::test]
    async fn passes_results_through() {
        let cancel = never_cancelled();
        let ok = guarded(&cancel, async { Ok::<_, ClientError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = guarded(&cancel, async {
            Err::<(), _>(ClientError::Unavailable("down".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ScaleError::Client(ClientError::Unavailable(_))));
    }

    #[tokio::test]
    async fn already_cancelled_skips_the_call() {
        let (_tx, rx) = watch::channel(true);
        let mut ran = false;
        let err = guarded(&rx, async {
            ran = true;
            Ok::<(), ClientError>(())
        })
        .await
        .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!ran);
    }

    #[tokio::test]
    async fn cancelling_aborts_a_hanging_call() {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let hanging = std::future::pending::<ClientResult<()>>();
        let result = tokio::time::timeout(Duration::from_secs(5), guarded(&rx, hanging))
            .await
            .expect("guarded call should return once cancelled");
        assert!(result.unwrap_err().is_cancelled());
    }
}
