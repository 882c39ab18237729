use std::collections::HashMap;

use tracing::{debug, info};

use crate::{
    store::{self, BlobStore},
    token::Token,
    Result,
};

/// Tokens keyed by identity hash, with their usage weights.
///
/// The order of `entries` is the storage order, it is only used to break
/// ties between equal weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenCache {
    entries: Vec<Token>,
    index: HashMap<String, usize>,
}

impl TokenCache {
    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut cache = Self::default();
        for token in tokens {
            cache.upsert(token);
        }

        cache
    }

    /// Loads the cache file, `None` when there is none yet.
    pub fn load(store: &dyn BlobStore, name: &str) -> Result<Option<Self>> {
        let tokens: Option<Vec<Token>> = store::load_json(store, name)?;

        Ok(tokens.map(|tokens| {
            let cache = Self::from_tokens(tokens);
            debug!(tokens = cache.len(), "token cache loaded");
            cache
        }))
    }

    pub fn save(&self, store: &dyn BlobStore, name: &str) -> Result<()> {
        store::save_json(store, name, &self.entries)?;
        debug!(tokens = self.len(), "token cache saved");
        Ok(())
    }

    /// Inserts a token; one with the same identity is overwritten in place.
    pub fn upsert(&mut self, token: Token) {
        let key = token.identity();
        match self.index.get(&key) {
            Some(&i) => self.entries[i] = token,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(token);
            }
        }
    }

    /// Replaces every entry with a fresh batch.
    ///
    /// Entries missing from the batch are dropped. Surviving identities keep
    /// their weight, so ranking never goes backwards.
    pub fn replace(&mut self, tokens: impl IntoIterator<Item = Token>) {
        let mut fresh = Self::from_tokens(tokens);
        for token in &mut fresh.entries {
            if let Some(old) = self.get(&token.identity()) {
                token.weight = token.weight.max(old.weight);
            }
        }

        info!(
            before = self.len(),
            after = fresh.len(),
            "token cache rebuilt"
        );
        *self = fresh;
    }

    pub fn get(&self, identity: &str) -> Option<&Token> {
        self.index.get(identity).map(|&i| &self.entries[i])
    }

    /// Increments the weight of a token, false if it is not cached.
    ///
    /// Nothing is written, call [`TokenCache::save`] afterwards.
    pub fn bump_weight(&mut self, identity: &str) -> bool {
        match self.index.get(identity) {
            Some(&i) => {
                self.entries[i].bump_weight();
                true
            }
            None => false,
        }
    }

    /// Tokens in storage order
    pub fn tokens(&self) -> &[Token] {
        &self.entries
    }

    /// Tokens by descending weight, equal weights keep storage order.
    pub fn ranked(&self) -> Vec<&Token> {
        let mut ranked: Vec<&Token> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.weight.cmp(&a.weight));
        ranked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
