use crashscan_model::BatchProgressSnapshot;
use tokio::sync::watch;

/// Receives a snapshot after every file of a batch completes.
pub trait ProgressSink: Send + Sync {
    fn report(&self, snapshot: BatchProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(BatchProgressSnapshot) + Send + Sync,
{
    fn report(&self, snapshot: BatchProgressSnapshot) {
        self(snapshot)
    }
}

/// Publishes the latest snapshot on a `watch` channel.
#[derive(Debug, Clone)]
pub struct WatchProgressSink {
    tx: watch::Sender<Option<BatchProgressSnapshot>>,
}

impl WatchProgressSink {
    pub fn channel() -> (Self, watch::Receiver<Option<BatchProgressSnapshot>>)
    {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl ProgressSink for WatchProgressSink {
    fn report(&self, snapshot: BatchProgressSnapshot) {
        self.tx.send_replace(Some(snapshot));
    }
}
