use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use aquarent_core::{
    TokenPair, UserProfile, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, USER_PROFILE_KEY,
};
use aquarent_store::{KeyValueStore, StoreError};

use crate::error::{ClientError, RefreshError};
use crate::refresher::TokenRefresher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// An access token is stored and assumed usable.
    Valid,
    /// A refresh call is in flight.
    Refreshing,
    /// No usable credentials; the user has to sign in again.
    Invalid,
}

type RefreshOutcome = Result<String, RefreshError>;

struct PendingRefresh {
    id: u64,
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
}

/// State shared with the spawned refresh task.
struct SessionCore {
    store: Arc<dyn KeyValueStore>,
    refresher: Arc<dyn TokenRefresher>,
    state: watch::Sender<SessionState>,
    /// Bumped by sign-in and sign-out so a refresh that started under an
    /// older session never writes over the newer one.
    epoch: AtomicU64,
    /// Serializes every write of the token pair.
    write_lock: Mutex<()>,
}

impl SessionCore {
    fn publish(&self, next: SessionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!(state = ?next, "session state changed");
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let result = self.store.remove_many(&SESSION_KEYS).await;
        self.publish(SessionState::Invalid);
        result
    }

    async fn fail_refresh(&self, epoch: u64, err: RefreshError) -> RefreshOutcome {
        warn!(event = "token_refresh_failed", error = %err, "clearing session");
        let _guard = self.write_lock.lock().await;
        if self.epoch.load(Ordering::SeqCst) == epoch {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            if let Err(store_err) = self.clear().await {
                warn!(event = "session_clear_failed", error = %store_err);
            }
        }
        Err(err)
    }

    async fn current_access_token(&self) -> Option<String> {
        match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(err) => {
                warn!(event = "token_read_failed", error = %err);
                None
            }
        }
    }
}

async fn run_refresh(core: Arc<SessionCore>) -> RefreshOutcome {
    let epoch = core.epoch.load(Ordering::SeqCst);
    let refresh_token = match core.store.get(REFRESH_TOKEN_KEY).await {
        Ok(Some(token)) if !token.is_empty() => token,
        Ok(_) => return core.fail_refresh(epoch, RefreshError::MissingRefreshToken).await,
        Err(err) => return core.fail_refresh(epoch, err.into()).await,
    };

    info!(event = "token_refresh_started");
    let grant = match core.refresher.refresh(&refresh_token).await {
        Ok(grant) => grant,
        Err(err) => return core.fail_refresh(epoch, err).await,
    };

    let guard = core.write_lock.lock().await;
    if core.epoch.load(Ordering::SeqCst) != epoch {
        drop(guard);
        debug!("session changed during refresh; discarding grant");
        return core
            .current_access_token()
            .await
            .ok_or_else(|| RefreshError::Aborted("session ended during refresh".to_string()));
    }

    let next_refresh = grant
        .refresh_token
        .filter(|token| !token.is_empty())
        .unwrap_or(refresh_token);
    let written = core
        .store
        .set_many(&[
            (ACCESS_TOKEN_KEY, grant.access_token.as_str()),
            (REFRESH_TOKEN_KEY, next_refresh.as_str()),
        ])
        .await;
    drop(guard);
    if let Err(err) = written {
        return core.fail_refresh(epoch, err.into()).await;
    }

    core.publish(SessionState::Valid);
    info!(event = "token_refresh_succeeded");
    Ok(grant.access_token)
}

/// Owns the persisted credentials and coordinates token refresh.
///
/// However many requests hit a 401 together, at most one refresh call is
/// in flight; every caller that arrives while it runs awaits the same
/// outcome.
pub struct Session {
    core: Arc<SessionCore>,
    pending: Mutex<Option<PendingRefresh>>,
    next_refresh_id: AtomicU64,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        let (state, _) = watch::channel(SessionState::Invalid);
        Self {
            core: Arc::new(SessionCore {
                store,
                refresher,
                state,
                epoch: AtomicU64::new(0),
                write_lock: Mutex::new(()),
            }),
            pending: Mutex::new(None),
            next_refresh_id: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.core.state.borrow()
    }

    /// Receiver notified on every state change, e.g. to route back to
    /// sign-in once the session becomes `Invalid`.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.core.state.subscribe()
    }

    /// Reads persisted credentials at startup and returns the cached
    /// profile so the first screen is not blank.
    pub async fn restore(&self) -> Result<Option<UserProfile>, StoreError> {
        let mut values = self.core.store.get_many(&SESSION_KEYS).await?.into_iter();
        let access = values.next().flatten().filter(|token| !token.is_empty());
        let _refresh = values.next().flatten();
        let profile = values.next().flatten();

        self.core.publish(if access.is_some() {
            SessionState::Valid
        } else {
            SessionState::Invalid
        });
        Ok(profile.and_then(|raw| decode_profile(&raw)))
    }

    pub async fn access_token(&self) -> Option<String> {
        self.core.current_access_token().await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.core.store.get(REFRESH_TOKEN_KEY).await
    }

    /// Persists a freshly issued token pair, and optionally the user, after
    /// sign-in.
    pub async fn establish(
        &self,
        tokens: &TokenPair,
        profile: Option<&UserProfile>,
    ) -> Result<(), ClientError> {
        let profile = profile.map(UserProfile::to_json).transpose()?;
        let mut entries = vec![
            (ACCESS_TOKEN_KEY, tokens.access_token.as_str()),
            (REFRESH_TOKEN_KEY, tokens.refresh_token.as_str()),
        ];
        if let Some(profile) = profile.as_deref() {
            entries.push((USER_PROFILE_KEY, profile));
        }

        let _guard = self.core.write_lock.lock().await;
        self.core.epoch.fetch_add(1, Ordering::SeqCst);
        self.core.store.set_many(&entries).await?;
        self.core.publish(SessionState::Valid);
        info!(event = "session_established");
        Ok(())
    }

    pub async fn store_profile(&self, profile: &UserProfile) -> Result<(), ClientError> {
        let raw = profile.to_json()?;
        self.core.store.set(USER_PROFILE_KEY, &raw).await?;
        Ok(())
    }

    pub async fn cached_profile(&self) -> Option<UserProfile> {
        match self.core.store.get(USER_PROFILE_KEY).await {
            Ok(raw) => raw.and_then(|raw| decode_profile(&raw)),
            Err(err) => {
                warn!(event = "profile_read_failed", error = %err);
                None
            }
        }
    }

    /// Drops tokens and the cached profile. Safe to call when already
    /// signed out.
    pub async fn end(&self) -> Result<(), StoreError> {
        let _guard = self.core.write_lock.lock().await;
        self.core.epoch.fetch_add(1, Ordering::SeqCst);
        self.core.clear().await?;
        info!(event = "session_ended");
        Ok(())
    }

    /// Returns an access token newer than `stale`, refreshing if needed.
    ///
    /// `stale` is the token the failed request carried. When storage
    /// already holds a different token another caller has rotated it and no
    /// network call is made. A refresh that fails clears the session.
    pub async fn refresh_access_token(&self, stale: Option<&str>) -> RefreshOutcome {
        let (id, outcome) = {
            let mut slot = self.pending.lock().await;
            match slot.as_ref().filter(|pending| pending.outcome.peek().is_none()) {
                Some(pending) => {
                    debug!(refresh_id = pending.id, "joining in-flight token refresh");
                    (pending.id, pending.outcome.clone())
                }
                None => {
                    if let Some(current) = self.core.current_access_token().await {
                        if stale != Some(current.as_str()) {
                            debug!("access token already rotated; skipping refresh");
                            return Ok(current);
                        }
                    }
                    let pending = self.start_refresh();
                    let started = (pending.id, pending.outcome.clone());
                    *slot = Some(pending);
                    started
                }
            }
        };

        let result = outcome.await;

        let mut slot = self.pending.lock().await;
        if slot.as_ref().is_some_and(|pending| pending.id == id) {
            *slot = None;
        }
        result
    }

    fn start_refresh(&self) -> PendingRefresh {
        let id = self.next_refresh_id.fetch_add(1, Ordering::SeqCst);
        self.core.publish(SessionState::Refreshing);

        // Spawned so a rotation the server already accepted is persisted
        // even if every waiting request is dropped.
        let task = tokio::spawn(run_refresh(Arc::clone(&self.core)));
        let core = Arc::clone(&self.core);
        let outcome = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    core.publish(SessionState::Invalid);
                    Err(RefreshError::Aborted(err.to_string()))
                }
            }
        }
        .boxed()
        .shared();
        PendingRefresh { id, outcome }
    }
}

fn decode_profile(raw: &str) -> Option<UserProfile> {
    match UserProfile::from_json(raw) {
        Ok(profile) => Some(profile),
        Err(err) => {
            warn!(event = "profile_cache_invalid", error = %err);
            None
        }
    }
}
