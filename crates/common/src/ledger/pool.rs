use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::block::Inclusion;
use super::call::Call;
use super::transport::{LedgerConnector, LedgerSession, TransportError, WatchError};
use crate::crypto::Signer;

pub const DEFAULT_POOL_CAPACITY: usize = 4;

/// A bounded pool of ledger sessions over another connector.
///
/// At most `capacity` sessions are checked out at once. A checkout beyond
/// that fails immediately with [`TransportError::PoolExhausted`] instead of
/// queueing. Closing a healthy pooled session returns it to the pool for the
/// same endpoint; an unhealthy one is closed for real. At most `capacity`
/// sessions sit idle across all endpoints, the oldest is closed first.
#[derive(Debug)]
pub struct SessionPool<C: LedgerConnector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: LedgerConnector> Clone for SessionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[derive(Debug)]
struct PoolInner<C: LedgerConnector> {
    connector: C,
    capacity: usize,
    permits: Arc<Semaphore>,
    /// Sessions waiting for reuse with their endpoints, oldest first
    idle: Mutex<VecDeque<(String, C::Session)>>,
}

impl<C: LedgerConnector> SessionPool<C> {
    pub fn new(connector: C, capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                connector,
                capacity,
                permits: Arc::new(Semaphore::new(capacity)),
                idle: Mutex::new(VecDeque::new()),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Checkouts that can still be made without hitting backpressure.
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    pub fn idle_sessions(&self) -> usize {
        self.inner.idle.lock().len()
    }

    pub async fn checkout(&self, endpoint: &str) -> Result<PooledSession<C>, TransportError> {
        let permit = self
            .inner
            .permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| TransportError::PoolExhausted {
                capacity: self.inner.capacity,
            })?;

        let (reused, stale) = self.take_idle(endpoint);
        for session in stale {
            if let Err(e) = session.close().await {
                tracing::warn!(endpoint, error = %e, "failed to close stale pooled session");
            }
        }

        let session = match reused {
            Some(session) => {
                tracing::debug!(endpoint, "reusing pooled session");
                session
            }
            None => self.inner.connector.connect(endpoint).await?,
        };

        Ok(PooledSession {
            session,
            endpoint: endpoint.to_string(),
            pool: self.inner.clone(),
            permit,
        })
    }

    /// Close every idle session.
    pub async fn drain(&self) {
        let idle: Vec<C::Session> = self
            .inner
            .idle
            .lock()
            .drain(..)
            .map(|(_, session)| session)
            .collect();
        for session in idle {
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "failed to close pooled session");
            }
        }
    }

    /// The newest healthy idle session for `endpoint`, plus any unhealthy
    /// ones for it found along the way.
    fn take_idle(&self, endpoint: &str) -> (Option<C::Session>, Vec<C::Session>) {
        let mut idle = self.inner.idle.lock();
        let mut stale = Vec::new();
        while let Some(position) = idle.iter().rposition(|(e, _)| e == endpoint) {
            let Some((_, session)) = idle.remove(position) else {
                break;
            };
            if session.is_healthy() {
                return (Some(session), stale);
            }
            stale.push(session);
        }
        (None, stale)
    }
}

#[async_trait]
impl<C: LedgerConnector> LedgerConnector for SessionPool<C> {
    type Session = PooledSession<C>;

    async fn connect(&self, endpoint: &str) -> Result<Self::Session, TransportError> {
        self.checkout(endpoint).await
    }
}

/// A session checked out of a [`SessionPool`]. Holds one pool permit until
/// it is closed or dropped.
#[derive(Debug)]
pub struct PooledSession<C: LedgerConnector> {
    session: C::Session,
    endpoint: String,
    pool: Arc<PoolInner<C>>,
    permit: OwnedSemaphorePermit,
}

#[async_trait]
impl<C: LedgerConnector> LedgerSession for PooledSession<C> {
    async fn submit_and_watch(
        &mut self,
        call: &Call<'_>,
        signer: &Signer,
    ) -> Result<Inclusion, WatchError> {
        self.session.submit_and_watch(call, signer).await
    }

    async fn close(self) -> Result<(), TransportError> {
        let PooledSession {
            session,
            endpoint,
            pool,
            permit,
        } = self;
        if !session.is_healthy() {
            tracing::debug!(endpoint, "closing unhealthy pooled session");
            let result = session.close().await;
            drop(permit);
            return result;
        }

        let evicted = {
            let mut idle = pool.idle.lock();
            idle.push_back((endpoint, session));
            if idle.len() > pool.capacity {
                idle.pop_front()
            } else {
                None
            }
        };
        drop(permit);
        match evicted {
            Some((endpoint, session)) => {
                tracing::debug!(endpoint, "closing oldest idle session");
                session.close().await
            }
            None => Ok(()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.session.is_healthy()
    }
}
