//! Credential bootstrap.
//!
//! [`CredentialProvider`] turns whatever is cached into a usable access
//! token: a still-valid token is returned as is, an expired one is refreshed,
//! and anything else goes through the interactive flow. Every newly obtained
//! token is persisted before it is handed out.

use tracing::{debug, info};

use crate::error::ProviderResult;
use crate::provider::BoxFuture;

use super::tokens::{CredentialStore, TokenInfo};

/// Obtains and refreshes OAuth tokens.
pub trait Authorizer: Send + Sync {
    /// Runs the interactive authorization flow for `scopes`.
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, ProviderResult<TokenInfo>>;

    /// Exchanges the refresh token of `token` for a new access token.
    fn refresh<'a>(&'a self, token: &'a TokenInfo) -> BoxFuture<'a, ProviderResult<TokenInfo>>;
}

/// What can be done with a cached credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CachedState {
    Valid,
    Refreshable,
    Unusable(&'static str),
}

fn classify(token: &TokenInfo, scopes: &[String]) -> CachedState {
    if !token.has_scopes(scopes) {
        return CachedState::Unusable("cached credential lacks the required scopes");
    }
    if !token.is_expired() {
        return CachedState::Valid;
    }
    if token.can_refresh() {
        CachedState::Refreshable
    } else {
        CachedState::Unusable("cached credential expired without a refresh token")
    }
}

/// Produces a valid credential from a store and an authorizer.
pub struct CredentialProvider<S, A> {
    store: S,
    authorizer: A,
    scopes: Vec<String>,
}

impl<S: CredentialStore, A: Authorizer> CredentialProvider<S, A> {
    /// Creates a provider requiring `scopes`.
    pub fn new(store: S, authorizer: A, scopes: Vec<String>) -> Self {
        Self {
            store,
            authorizer,
            scopes,
        }
    }

    /// Returns the credential store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a valid credential, refreshing or authorizing as needed.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read or written, or if the refresh or
    /// the interactive flow fails. Nothing is retried.
    pub async fn acquire(&self) -> ProviderResult<TokenInfo> {
        let token = match self.store.load()? {
            Some(cached) => match classify(&cached, &self.scopes) {
                CachedState::Valid => {
                    debug!("using cached credential");
                    return Ok(cached);
                }
                CachedState::Refreshable => {
                    info!("access token expired, refreshing");
                    self.authorizer.refresh(&cached).await?
                }
                CachedState::Unusable(reason) => {
                    info!("{}, starting authorization", reason);
                    self.authorizer.authorize(&self.scopes).await?
                }
            },
            None => {
                info!("no cached credential, starting authorization");
                self.authorizer.authorize(&self.scopes).await?
            }
        };

        self.store.save(&token)?;
        Ok(token)
    }

    /// Runs the interactive flow regardless of the cached state and
    /// persists the result.
    pub async fn reauthorize(&self) -> ProviderResult<TokenInfo> {
        let token = self.authorizer.authorize(&self.scopes).await?;
        self.store.save(&token)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderErrorCode};
    use chrono::{Duration, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

    fn scopes() -> Vec<String> {
        vec![SCOPE.to_string()]
    }

    #[derive(Default)]
    struct MemoryStore {
        token: Mutex<Option<TokenInfo>>,
        saves: AtomicUsize,
    }

    impl MemoryStore {
        fn with(token: TokenInfo) -> Self {
            Self {
                token: Mutex::new(Some(token)),
                saves: AtomicUsize::new(0),
            }
        }

        fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        fn current(&self) -> Option<TokenInfo> {
            self.token.lock().unwrap().clone()
        }
    }

    impl CredentialStore for MemoryStore {
        fn load(&self) -> ProviderResult<Option<TokenInfo>> {
            Ok(self.token.lock().unwrap().clone())
        }

        fn save(&self, token: &TokenInfo) -> ProviderResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.token.lock().unwrap() = Some(token.clone());
            Ok(())
        }

        fn clear(&self) -> ProviderResult<()> {
            *self.token.lock().unwrap() = None;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAuthorizer {
        authorizations: AtomicUsize,
        refreshes: AtomicUsize,
        fail: bool,
    }

    impl FakeAuthorizer {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    impl Authorizer for FakeAuthorizer {
        fn authorize<'a>(
            &'a self,
            scopes: &'a [String],
        ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
            Box::pin(async move {
                self.authorizations.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(ProviderError::authentication("authorization denied: access_denied"));
                }
                Ok(TokenInfo::new(
                    "authorized",
                    Some("refresh".to_string()),
                    Some(3600),
                    scopes.to_vec(),
                ))
            })
        }

        fn refresh<'a>(&'a self, token: &'a TokenInfo) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
            Box::pin(async move {
                self.refreshes.fetch_add(1, Ordering::SeqCst);
                let mut refreshed = token.clone();
                refreshed.update_access_token("refreshed", Some(3600));
                Ok(refreshed)
            })
        }
    }

    fn expired(refresh_token: Option<&str>) -> TokenInfo {
        let mut token = TokenInfo::new("stale", refresh_token.map(str::to_string), None, scopes());
        token.expires_at = Some(Utc::now() - Duration::minutes(5));
        token
    }

    #[tokio::test]
    async fn valid_cached_credential_is_returned_untouched() {
        let cached = TokenInfo::new("cached", Some("r".into()), Some(3600), scopes());
        let provider = CredentialProvider::new(
            MemoryStore::with(cached.clone()),
            FakeAuthorizer::default(),
            scopes(),
        );

        let token = provider.acquire().await.unwrap();
        assert_eq!(token, cached);
        assert_eq!(provider.store().saves(), 0);
        assert_eq!(provider.authorizer.authorizations.load(Ordering::SeqCst), 0);
        assert_eq!(provider.authorizer.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_credential_is_refreshed_and_saved() {
        let provider = CredentialProvider::new(
            MemoryStore::with(expired(Some("refresh"))),
            FakeAuthorizer::default(),
            scopes(),
        );

        let token = provider.acquire().await.unwrap();
        assert_eq!(token.access_token, "refreshed");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(provider.authorizer.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(provider.authorizer.authorizations.load(Ordering::SeqCst), 0);
        assert_eq!(provider.store().saves(), 1);
        assert_eq!(provider.store().current(), Some(token));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_reauthorizes() {
        let provider = CredentialProvider::new(
            MemoryStore::with(expired(None)),
            FakeAuthorizer::default(),
            scopes(),
        );

        let token = provider.acquire().await.unwrap();
        assert_eq!(token.access_token, "authorized");
        assert_eq!(provider.authorizer.authorizations.load(Ordering::SeqCst), 1);
        assert_eq!(provider.store().saves(), 1);
    }

    #[tokio::test]
    async fn missing_credential_is_authorized_and_saved() {
        let provider =
            CredentialProvider::new(MemoryStore::default(), FakeAuthorizer::default(), scopes());

        let token = provider.acquire().await.unwrap();
        assert_eq!(token.access_token, "authorized");
        assert!(token.has_scopes(&scopes()));
        assert_eq!(provider.store().saves(), 1);
        assert_eq!(provider.store().current(), Some(token));
    }

    #[tokio::test]
    async fn missing_scope_forces_authorization() {
        let narrow = TokenInfo::new("narrow", Some("r".into()), Some(3600), vec![]);
        let provider = CredentialProvider::new(
            MemoryStore::with(narrow),
            FakeAuthorizer::default(),
            scopes(),
        );

        let token = provider.acquire().await.unwrap();
        assert_eq!(token.access_token, "authorized");
        assert_eq!(provider.authorizer.authorizations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn authorization_failure_propagates_without_saving() {
        let provider =
            CredentialProvider::new(MemoryStore::default(), FakeAuthorizer::failing(), scopes());

        let err = provider.acquire().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(provider.store().saves(), 0);
        assert_eq!(provider.store().current(), None);
    }

    #[tokio::test]
    async fn reauthorize_ignores_valid_cache() {
        let cached = TokenInfo::new("cached", Some("r".into()), Some(3600), scopes());
        let provider = CredentialProvider::new(
            MemoryStore::with(cached),
            FakeAuthorizer::default(),
            scopes(),
        );

        let token = provider.reauthorize().await.unwrap();
        assert_eq!(token.access_token, "authorized");
        assert_eq!(provider.store().saves(), 1);
    }

    #[test]
    fn classification() {
        let valid = TokenInfo::new("a", None, Some(3600), scopes());
        assert_eq!(classify(&valid, &scopes()), CachedState::Valid);
        assert_eq!(classify(&expired(Some("r")), &scopes()), CachedState::Refreshable);
        assert!(matches!(classify(&expired(None), &scopes()), CachedState::Unusable(_)));
        assert!(matches!(classify(&valid, &["other".to_string()]), CachedState::Unusable(_)));
    }
}
