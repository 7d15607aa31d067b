//! Identity provider lookup.

use dashmap::DashMap;

use crate::model::SamlProvider;

/// Errors returned by an [`IdentityProviderStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderStoreError {
    /// No provider is registered for the issuer.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Resolves registered identity providers by issuer.
pub trait IdentityProviderStore: Send + Sync {
    /// Find the provider whose metadata declares `issuer` as its entity ID.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderStoreError::NotFound`] for an unknown issuer, or
    /// [`ProviderStoreError::Unavailable`] if the store failed.
    fn find_provider(&self, issuer: &str) -> Result<SamlProvider, ProviderStoreError>;
}

/// In-memory provider registry keyed by issuer.
#[derive(Debug, Default)]
pub struct StaticIdentityProviderStore {
    providers: DashMap<String, SamlProvider>,
}

impl StaticIdentityProviderStore {
    /// Create a store holding `providers`.
    pub fn new(providers: impl IntoIterator<Item = SamlProvider>) -> Self {
        let store = Self::default();
        for provider in providers {
            store.register(provider);
        }
        store
    }

    /// Register or replace the provider for its issuer.
    pub fn register(&self, provider: SamlProvider) {
        self.providers.insert(provider.issuer().to_owned(), provider);
    }

    /// Remove the provider for `issuer`, returning it if present.
    pub fn deregister(&self, issuer: &str) -> Option<SamlProvider> {
        self.providers.remove(issuer).map(|(_, provider)| provider)
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl IdentityProviderStore for StaticIdentityProviderStore {
    fn find_provider(&self, issuer: &str) -> Result<SamlProvider, ProviderStoreError> {
        self.providers
            .get(issuer)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ProviderStoreError::NotFound(issuer.to_owned()))
    }
}
