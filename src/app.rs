use crate::config::Config;
use crate::core::credentials::TokenCodec;
use crate::core::db::{KeyValue, Store};

/// Everything a resolver needs: the document store and the token codec.
pub struct App<K> {
    pub store: Store<K>,
    pub tokens: TokenCodec,
}

impl<K: KeyValue> App<K> {
    pub fn new(kv: K, tokens: TokenCodec) -> Self {
        App {
            store: Store::new(kv),
            tokens,
        }
    }

    pub fn from_config(kv: K, config: &Config) -> Self {
        Self::new(
            kv,
            TokenCodec::new(config.jwt_secret.as_bytes(), config.token_ttl),
        )
    }
}
