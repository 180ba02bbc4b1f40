//! Single-flight access token refresh
//!
//! When several requests of one identity hit a 401 at the same moment, only
//! the first starts a refresh. The others park in a FIFO queue and are handed
//! the outcome of that one refresh, so the backend sees exactly one
//! `/auth/refresh` per expiry and never has to deal with racing rotations.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use smm_core::{Identity, SessionError, SessionStore, TokenRefresher};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::types::auth::{RefreshResponse, RefreshTokenRequest};

type Outcome = Result<String, SessionError>;

/// Refresh state of one session
#[derive(Debug, Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<Outcome>>,
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<Outcome>),
}

/// Serializes refreshes of one session and fans the result out
#[derive(Debug)]
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    timeout: Duration,
}

impl RefreshCoordinator {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            timeout,
        }
    }

    /// Get a fresh access token for `session`, sharing any refresh in flight
    ///
    /// A failed refresh logs the session out. The in-flight flag is cleared
    /// before the outcome reaches anyone, including when the leading future
    /// is dropped halfway.
    pub(crate) async fn recover(&self, session: &SessionStore) -> Outcome {
        let role = {
            let mut state = self.lock();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                debug!(
                    identity = %session.identity(),
                    queued = state.waiters.len(),
                    "Refresh in flight, queueing request"
                );
                Role::Waiter(rx)
            } else {
                state.in_flight = true;
                Role::Leader
            }
        };

        match role {
            Role::Waiter(rx) => rx
                .await
                .unwrap_or_else(|_| Err(SessionError::transport("token refresh was abandoned"))),
            Role::Leader => {
                let mut flight = InFlight {
                    coordinator: self,
                    outcome: None,
                };
                let outcome = self.refresh(session).await;
                flight.outcome = Some(outcome.clone());
                drop(flight);
                outcome
            }
        }
    }

    async fn refresh(&self, session: &SessionStore) -> Outcome {
        let identity = session.identity();
        let outcome = match tokio::time::timeout(self.timeout, session.refresh_access_token()).await
        {
            Ok(Ok(Some(token))) => Ok(token),
            Ok(Ok(None)) => Err(SessionError::MissingAccessToken),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SessionError::TimedOut(self.timeout)),
        };

        if let Err(e) = &outcome {
            warn!(%identity, error = %e, "Token refresh failed, logging out");
            session.logout();
        }
        outcome
    }

    /// Requests currently parked behind a refresh
    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> bool {
        self.lock().in_flight
    }

    fn release(&self, outcome: Outcome) {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        if !waiters.is_empty() {
            debug!(count = waiters.len(), ok = outcome.is_ok(), "Releasing queued requests");
        }
        for waiter in waiters {
            // The receiving request may have been cancelled meanwhile
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight flag and releases waiters when the leader finishes
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    outcome: Option<Outcome>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err(SessionError::transport("token refresh was abandoned")));
        self.coordinator.release(outcome);
    }
}

/// One coordinator per identity, so sessions never share a refresh
#[derive(Debug)]
pub(crate) struct Refreshers {
    admin: RefreshCoordinator,
    user: RefreshCoordinator,
}

impl Refreshers {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            admin: RefreshCoordinator::new(timeout),
            user: RefreshCoordinator::new(timeout),
        }
    }

    pub(crate) fn get(&self, identity: Identity) -> &RefreshCoordinator {
        match identity {
            Identity::Admin => &self.admin,
            Identity::User => &self.user,
        }
    }
}

/// Calls `POST /auth/refresh` directly, outside the retrying client
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTokenRefresher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(
        &self,
        identity: Identity,
        refresh_token: &str,
    ) -> Result<Option<String>, SessionError> {
        debug!(%identity, "POST /auth/refresh");
        let response = self
            .client
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|e| SessionError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(SessionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| SessionError::transport(e.to_string()))?;
        Ok(body.access_token.filter(|token| !token.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smm_core::MemoryTokenStorage;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Refresher that blocks until released and counts its calls
    struct GatedRefresher {
        calls: AtomicUsize,
        proceed: Notify,
        result: Result<Option<String>, SessionError>,
    }

    impl GatedRefresher {
        fn new(result: Result<Option<String>, SessionError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                proceed: Notify::new(),
                result,
            })
        }
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(
            &self,
            _identity: Identity,
            _refresh_token: &str,
        ) -> Result<Option<String>, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.proceed.notified().await;
            self.result.clone()
        }
    }

    fn session(refresher: Arc<GatedRefresher>) -> Arc<SessionStore> {
        let session = SessionStore::load(
            Identity::User,
            Arc::new(MemoryTokenStorage::new()),
            refresher,
        );
        session.set_tokens("A1", "R1");
        Arc::new(session)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        while !condition() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_waiters_released_in_fifo_order() {
        let refresher = GatedRefresher::new(Ok(Some("A2".to_string())));
        let session = session(refresher.clone());
        let coordinator = Arc::new(RefreshCoordinator::new(Duration::from_secs(5)));
        let order = Arc::new(Mutex::new(Vec::new()));

        let leader = {
            let (coordinator, session) = (coordinator.clone(), session.clone());
            tokio::spawn(async move { coordinator.recover(&session).await })
        };
        wait_until(|| refresher.calls.load(Ordering::SeqCst) == 1).await;

        let mut waiters = Vec::new();
        for id in 0..5 {
            let (task_coordinator, session, order) =
                (coordinator.clone(), session.clone(), order.clone());
            waiters.push(tokio::spawn(async move {
                let token = task_coordinator.recover(&session).await;
                order.lock().unwrap().push(id);
                token
            }));
            let expected = id + 1;
            wait_until(|| coordinator.queued() == expected).await;
        }

        refresher.proceed.notify_one();
        assert_eq!(leader.await.unwrap(), Ok("A2".to_string()));
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Ok("A2".to_string()));
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(!coordinator.in_flight());
        assert_eq!(session.access_token().as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_logs_out() {
        let rejected = SessionError::Rejected {
            status: 401,
            message: "expired".to_string(),
        };
        let refresher = GatedRefresher::new(Err(rejected.clone()));
        let session = session(refresher.clone());
        let coordinator = Arc::new(RefreshCoordinator::new(Duration::from_secs(5)));

        let leader = {
            let (coordinator, session) = (coordinator.clone(), session.clone());
            tokio::spawn(async move { coordinator.recover(&session).await })
        };
        wait_until(|| refresher.calls.load(Ordering::SeqCst) == 1).await;

        let waiter = {
            let (coordinator, session) = (coordinator.clone(), session.clone());
            tokio::spawn(async move { coordinator.recover(&session).await })
        };
        wait_until(|| coordinator.queued() == 1).await;

        refresher.proceed.notify_one();
        assert_eq!(leader.await.unwrap(), Err(rejected.clone()));
        assert_eq!(waiter.await.unwrap(), Err(rejected));
        assert!(!session.is_authenticated());
        assert!(!coordinator.in_flight());
    }

    #[tokio::test]
    async fn test_token_less_success_is_a_failure() {
        let refresher = GatedRefresher::new(Ok(None));
        refresher.proceed.notify_one();
        let session = session(refresher);
        let coordinator = RefreshCoordinator::new(Duration::from_secs(5));

        assert_eq!(
            coordinator.recover(&session).await,
            Err(SessionError::MissingAccessToken)
        );
        assert!(!session.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_refresh_times_out() {
        let refresher = GatedRefresher::new(Ok(Some("never".to_string())));
        let session = session(refresher);
        let coordinator = RefreshCoordinator::new(Duration::from_secs(10));

        assert_eq!(
            coordinator.recover(&session).await,
            Err(SessionError::TimedOut(Duration::from_secs(10)))
        );
        assert!(!session.is_authenticated());
        assert!(!coordinator.in_flight());
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_waiters() {
        let refresher = GatedRefresher::new(Ok(Some("A2".to_string())));
        let session = session(refresher.clone());
        let coordinator = Arc::new(RefreshCoordinator::new(Duration::from_secs(5)));

        let leader = {
            let (coordinator, session) = (coordinator.clone(), session.clone());
            tokio::spawn(async move { coordinator.recover(&session).await })
        };
        wait_until(|| refresher.calls.load(Ordering::SeqCst) == 1).await;

        let waiter = {
            let (coordinator, session) = (coordinator.clone(), session.clone());
            tokio::spawn(async move { coordinator.recover(&session).await })
        };
        wait_until(|| coordinator.queued() == 1).await;

        leader.abort();
        assert!(matches!(
            waiter.await.unwrap(),
            Err(SessionError::Transport(_))
        ));
        assert!(!coordinator.in_flight());
    }
}
