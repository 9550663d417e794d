//! Keeps a view fresh by re-running its aggregation on a fixed period.
//!
//! A [`Poller`] owns the view's liveness token and a `watch` channel holding the last committed
//! result. Only the scheduler and its runs hold the sending side, so once they are all gone,
//! including a run that panicked, the channel closes and [`PollerUpdates`] ends.
//!
//! Runs are spawned and not awaited by the scheduler, so a slow upstream never delays the
//! next tick and runs may overlap; whichever live run finishes last wins. Teardown cancels the
//! token and then takes the channel's read lock once, and commits check the token under the
//! write lock, so nothing is committed after [`Poller::stop`] returns.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

pub struct Poller<V> {
    state: watch::Receiver<Option<V>>,
    token: CancellationToken,
    scheduler: JoinHandle<()>,
}

impl<V> Poller<V> {
    /// Receives every committed view. Holds `None` until the first run commits.
    pub fn subscribe(&self) -> watch::Receiver<Option<V>> {
        self.state.clone()
    }

    /// Tears the view down. Runs still in flight finish, but their results are discarded.
    pub fn stop(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        self.scheduler.abort();
        // Waits out a commit holding the lock; any later commit sees the cancelled token
        drop(self.state.borrow());
        debug!("Poller stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<V> Poller<V>
where
    V: Send + Sync + 'static,
{
    /// Starts polling. The first run starts immediately; with no `period` it is also the last.
    pub fn spawn<F, Fut>(period: Option<Duration>, aggregate: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (sender, state) = watch::channel(None);
        let token = CancellationToken::new();

        let scheduler = tokio::spawn(schedule(period, aggregate, Arc::new(sender), token.clone()));

        Self {
            state,
            token,
            scheduler,
        }
    }
}

impl<V> Poller<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Turns the poller into a stream of committed views. Dropping the stream stops the poller.
    pub fn into_updates(self) -> PollerUpdates<V> {
        let inner = WatchStream::new(self.subscribe());
        PollerUpdates { inner, _poller: self }
    }
}

impl<V> Drop for Poller<V> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn schedule<V, F, Fut>(
    period: Option<Duration>,
    aggregate: F,
    state: Arc<watch::Sender<Option<V>>>,
    token: CancellationToken,
) where
    V: Send + Sync + 'static,
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = V> + Send + 'static,
{
    let run = || {
        let view = aggregate(token.clone());
        let state = state.clone();
        let token = token.clone();
        tokio::spawn(async move {
            let view = view.await;
            if !commit(&state, &token, view) {
                trace!("Discarded result of a run that finished after teardown");
            }
        })
    };

    let Some(period) = period else {
        match run().await {
            Err(e) if e.is_panic() => error!(error = %e, "View aggregation panicked"),
            _ => {}
        }
        return;
    };

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                run();
            }
        }
    }
}

/// Replaces the view unless the poller has been torn down. Returns whether it did.
fn commit<V>(state: &watch::Sender<Option<V>>, token: &CancellationToken, view: V) -> bool {
    state.send_if_modified(|current| {
        if token.is_cancelled() {
            return false;
        }
        *current = Some(view);
        true
    })
}

/// Stream of committed views that keeps its [`Poller`] alive.
pub struct PollerUpdates<V> {
    inner: WatchStream<Option<V>>,
    _poller: Poller<V>,
}

impl<V> Stream for PollerUpdates<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Item = V;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Some(view))) => return Poll::Ready(Some(view)),
                // Nothing committed yet
                Poll::Ready(Some(None)) => continue,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
