use tokio::sync::watch;

/// Cancels the associated logical call.
///
/// Cancellation during a retry delay or an in-flight attempt short-circuits
/// the call directly to its terminal state with `Error::Cancelled`; it never
/// transitions into another retry.
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// The call-side half of a cancel pair.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Resolves once the paired handle has been cancelled.
    pub(crate) async fn cancelled(&mut self) {
        if *self.rx.borrow() {
            return;
        }
        // closed sender without a cancel signal means the call can never be
        // cancelled anymore; park forever rather than resolve spuriously
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

/// Create a connected handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}
