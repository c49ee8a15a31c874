use std::sync::Arc;

use twilight_cache_inmemory::InMemoryCache;
use twilight_http::Client;

use crate::store::GuildConfigStore;

/// The bot's HTTP and cache APIs, alongside its configuration store.
#[derive(Clone, Debug)]
pub struct Api {
    /// The API's HTTP client.
    pub http: Arc<Client>,
    /// The API's in-memory cache.
    pub cache: Arc<InMemoryCache>,
    /// The guild configuration store.
    pub store: Arc<GuildConfigStore>,
}

impl Api {
    /// Creates a new [`Api`].
    #[must_use]
    pub const fn new(http: Arc<Client>, cache: Arc<InMemoryCache>, store: Arc<GuildConfigStore>) -> Self {
        Self { http, cache, store }
    }

    /// Returns a shared reference to this [`Api`].
    #[must_use]
    pub const fn api_ref(&self) -> ApiRef {
        ApiRef { http: &self.http, cache: &self.cache, store: &self.store }
    }
}

/// A reference to the bot's HTTP and cache APIs, alongside its configuration store.
#[derive(Clone, Copy, Debug)]
pub struct ApiRef<'api> {
    /// The API's HTTP client.
    pub http: &'api Arc<Client>,
    /// The API's in-memory cache.
    pub cache: &'api Arc<InMemoryCache>,
    /// The guild configuration store.
    pub store: &'api Arc<GuildConfigStore>,
}
