use crate::{PoolConfig, PoolError};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub type ConnectionFactory<C> = Arc<dyn Fn() -> BoxFuture<'static, io::Result<C>> + Send + Sync>;

pub type ConnectionCloser<C> = Arc<dyn Fn(C) + Send + Sync>;

/// What a queued acquirer receives.
enum Handoff<C> {
    /// A released connection, ready for use.
    Connection(C),

    /// A slot freed by a discarded connection; the receiver opens a new one.
    Vacancy,
}

struct IdleConnection<C> {
    connection: C,
    last_activity: Instant,
}

struct Waiter<C> {
    id: u64,
    handoff: oneshot::Sender<Handoff<C>>,
}

struct PoolState<C> {
    idle: VecDeque<IdleConnection<C>>,
    waiters: VecDeque<Waiter<C>>,

    /// Connections alive, leased or idle, plus slots reserved for opening.
    live: usize,

    next_waiter_id: u64,
    closed: bool,
}

/// Counters describing a pool at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub live: usize,
    pub idle: usize,
    pub waiting: usize,
}

struct PoolInner<C> {
    config: PoolConfig,
    factory: ConnectionFactory<C>,
    closer: ConnectionCloser<C>,
    state: Mutex<PoolState<C>>,
}

/// A bounded pool of reusable connections.
///
/// At most `max_total_size` connections exist at once. When all of them are
/// leased, acquirers queue and are served strictly in arrival order as
/// connections come back. Every connection the factory produces is passed to
/// the closer exactly once: on idle expiry, on release into a full idle set,
/// on [`discard`](Self::discard), or when the pool is closed or dropped.
///
/// The state lock is never held across the factory or the closer.
pub struct ConnectionPool<C> {
    inner: Arc<PoolInner<C>>,
}

impl<C> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C> ConnectionPool<C> {
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.inner.lock();
        PoolStatus {
            live: state.live,
            idle: state.idle.len(),
            waiting: state.waiters.len(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl<C> std::fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.inner.config)
            .field("status", &self.status())
            .finish()
    }
}

impl<C> ConnectionPool<C>
where
    C: Send + 'static,
{
    /// Validates `config` and opens `initial_size` connections.
    ///
    /// If any initial connection fails, the ones already opened are closed
    /// and the factory error is returned.
    pub async fn new<F, Fut, G>(config: PoolConfig, factory: F, closer: G) -> Result<Self, PoolError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = io::Result<C>> + Send + 'static,
        G: Fn(C) + Send + Sync + 'static,
    {
        config.validate()?;

        let factory: ConnectionFactory<C> = Arc::new(move || Box::pin(factory()));
        let closer: ConnectionCloser<C> = Arc::new(closer);

        let mut idle = VecDeque::with_capacity(config.max_idle_size);
        for _ in 0..config.initial_size {
            match factory().await {
                Ok(connection) => idle.push_back(IdleConnection {
                    connection,
                    last_activity: Instant::now(),
                }),
                Err(err) => {
                    for entry in idle {
                        closer(entry.connection);
                    }
                    return Err(PoolError::Connect(err));
                }
            }
        }

        tracing::debug!(
            initial = config.initial_size,
            max_idle = config.max_idle_size,
            max_total = config.max_total_size,
            "connection pool created"
        );

        let live = idle.len();
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                factory,
                closer,
                state: Mutex::new(PoolState {
                    idle,
                    waiters: VecDeque::new(),
                    live,
                    next_waiter_id: 0,
                    closed: false,
                }),
            }),
        })
    }

    /// Leases a connection, waiting for one if the pool is at capacity.
    ///
    /// Cancelling `cancel` (or dropping the returned future) abandons the
    /// wait; a connection handed over in the meantime goes back to the pool.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<C, PoolError> {
        if cancel.is_cancelled() {
            return Err(PoolError::Cancelled);
        }

        let (step, expired) = {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(PoolError::Closed);
            }

            let mut expired = Vec::new();
            let mut found = None;
            while let Some(entry) = state.idle.pop_front() {
                if entry.last_activity.elapsed() > self.inner.config.max_idle_duration {
                    state.live -= 1;
                    expired.push(entry.connection);
                } else {
                    found = Some(entry.connection);
                    break;
                }
            }

            let step = if let Some(connection) = found {
                AcquireStep::Ready(connection)
            } else if state.live < self.inner.config.max_total_size {
                state.live += 1;
                AcquireStep::Open
            } else {
                let id = state.next_waiter_id;
                state.next_waiter_id += 1;
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(Waiter { id, handoff: tx });
                AcquireStep::Wait(id, rx)
            };
            (step, expired)
        };

        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "closing expired idle connections");
            for connection in expired {
                (self.inner.closer)(connection);
            }
        }

        match step {
            AcquireStep::Ready(connection) => Ok(connection),
            AcquireStep::Open => self.inner.open_reserved().await,
            AcquireStep::Wait(id, rx) => {
                let mut pending = PendingAcquire {
                    inner: &self.inner,
                    id,
                    rx,
                    settled: false,
                };

                let handoff = tokio::select! {
                    handoff = &mut pending.rx => handoff,
                    _ = cancel.cancelled() => return Err(PoolError::Cancelled),
                };
                pending.settled = true;

                match handoff {
                    Ok(Handoff::Connection(connection)) => Ok(connection),
                    Ok(Handoff::Vacancy) => self.inner.open_reserved().await,
                    // Sender dropped without a hand-off: the pool was closed.
                    Err(_) => Err(PoolError::Closed),
                }
            }
        }
    }

    /// Returns a healthy connection to the pool.
    pub fn release(&self, connection: C) {
        self.inner.release(connection);
    }

    /// Closes a broken connection and frees its slot.
    pub fn discard(&self, connection: C) {
        self.inner.release_vacancy();
        (self.inner.closer)(connection);
    }

    /// Closes every idle connection and fails every queued acquirer.
    ///
    /// Connections still leased are closed when they come back.
    pub fn close(&self) {
        let (idle, waiters) = {
            let mut state = self.inner.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let idle: Vec<_> = state.idle.drain(..).collect();
            state.live -= idle.len();
            let waiters: Vec<_> = state.waiters.drain(..).collect();
            (idle, waiters)
        };

        tracing::debug!(
            idle = idle.len(),
            waiting = waiters.len(),
            "connection pool closed"
        );
        drop(waiters);
        for entry in idle {
            (self.inner.closer)(entry.connection);
        }
    }

}

enum AcquireStep<C> {
    Ready(C),
    Open,
    Wait(u64, oneshot::Receiver<Handoff<C>>),
}

impl<C> PoolInner<C> {
    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, connection: C) {
        let mut state = self.lock();
        if !state.closed {
            let connection = match hand_off(&mut state, Handoff::Connection(connection)) {
                None => return,
                Some(Handoff::Connection(connection)) => connection,
                Some(Handoff::Vacancy) => return,
            };

            if state.idle.len() < self.config.max_idle_size {
                state.idle.push_back(IdleConnection {
                    connection,
                    last_activity: Instant::now(),
                });
                return;
            }

            state.live -= 1;
            drop(state);
            tracing::trace!("idle set full, closing released connection");
            (self.closer)(connection);
            return;
        }

        state.live -= 1;
        drop(state);
        (self.closer)(connection);
    }

    /// Gives a freed slot to the oldest waiter, or drops it from the count.
    fn release_vacancy(&self) {
        let mut state = self.lock();
        if state.closed || hand_off(&mut state, Handoff::Vacancy).is_some() {
            state.live -= 1;
        }
    }

    /// Opens a connection for a slot already counted in `live`.
    async fn open_reserved(&self) -> Result<C, PoolError> {
        let mut reservation = SlotReservation {
            inner: self,
            armed: true,
        };
        let connection = (self.factory)().await?;
        reservation.armed = false;
        tracing::trace!("opened new pooled connection");
        Ok(connection)
    }
}

impl<C> Drop for PoolInner<C> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for entry in state.idle.drain(..) {
            (self.closer)(entry.connection);
        }
    }
}

/// Delivers `handoff` to the oldest waiter still listening.
///
/// Returns the hand-off back if nobody took it. Must be called with the state
/// lock held so a cancelling waiter cannot slip out between send and removal.
fn hand_off<C>(state: &mut PoolState<C>, mut handoff: Handoff<C>) -> Option<Handoff<C>> {
    while let Some(waiter) = state.waiters.pop_front() {
        match waiter.handoff.send(handoff) {
            Ok(()) => {
                tracing::trace!(waiter = waiter.id, "handed off to queued acquirer");
                return None;
            }
            Err(returned) => handoff = returned,
        }
    }
    Some(handoff)
}

/// A queued acquire. Dropped before settling, it leaves the queue and passes
/// on anything that was delivered to it.
struct PendingAcquire<'a, C> {
    inner: &'a PoolInner<C>,
    id: u64,
    rx: oneshot::Receiver<Handoff<C>>,
    settled: bool,
}

impl<C> Drop for PendingAcquire<'_, C> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        self.inner.lock().waiters.retain(|w| w.id != self.id);
        self.rx.close();
        match self.rx.try_recv() {
            Ok(Handoff::Connection(connection)) => self.inner.release(connection),
            Ok(Handoff::Vacancy) => self.inner.release_vacancy(),
            Err(_) => {}
        }
    }
}

/// Frees a reserved slot unless the connection for it was opened.
struct SlotReservation<'a, C> {
    inner: &'a PoolInner<C>,
    armed: bool,
}

impl<C> Drop for SlotReservation<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.release_vacancy();
        }
    }
}
