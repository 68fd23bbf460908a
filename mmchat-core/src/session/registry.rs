//! The set of sessions offered in the session selector

use super::key::SessionKey;
use super::store::HistoryStore;
use serde::{Deserialize, Serialize};

/// `new_session` followed by every persisted key, in storage order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRegistry {
    keys: Vec<SessionKey>,
}

impl SessionRegistry {
    /// Build the registry from the store's current listing
    pub fn load(store: &dyn HistoryStore) -> crate::Result<Self> {
        Ok(Self::from_listing(store.list()?))
    }

    /// Build the registry from an already obtained listing
    pub fn from_listing(listing: Vec<SessionKey>) -> Self {
        let mut keys = Vec::with_capacity(listing.len() + 1);
        keys.push(SessionKey::New);
        keys.extend(listing.into_iter().filter(|k| !k.is_new()));
        Self { keys }
    }

    pub fn keys(&self) -> &[SessionKey] {
        &self.keys
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.keys.contains(key)
    }

    /// Selector position of `key`, if it is offered
    pub fn index_of(&self, key: &SessionKey) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn into_keys(self) -> Vec<SessionKey> {
        self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_always_first() {
        let registry = SessionRegistry::from_listing(vec![
            SessionKey::Persisted("b.json".into()),
            SessionKey::Persisted("a.json".into()),
        ]);
        assert_eq!(registry.keys()[0], SessionKey::New);
        // listing order is preserved, not sorted
        assert_eq!(registry.keys()[1].as_str(), "b.json");
        assert_eq!(registry.index_of(&SessionKey::Persisted("a.json".into())), Some(2));
        assert_eq!(registry.index_of(&SessionKey::Persisted("c.json".into())), None);
    }

    #[test]
    fn test_empty_listing() {
        let registry = SessionRegistry::from_listing(Vec::new());
        assert_eq!(registry.keys(), &[SessionKey::New]);
    }
}
