//! Per-user cached data that disappears with the session

use parking_lot::RwLock;
use std::sync::Arc;

use crate::store::TokenStore;

/// A value owned by whoever is signed in.
///
/// Reads return `T::default()` once the session ends or a different subject
/// signs in. Writes name the subject they were loaded for (see [`owner`]) and
/// are dropped if that subject is no longer the one signed in, so nothing
/// loaded for one user is ever shown to another.
///
/// [`owner`]: SessionScoped::owner
#[derive(Debug)]
pub struct SessionScoped<T> {
    store: Arc<TokenStore>,
    slot: RwLock<Option<(String, T)>>,
}

impl<T: Clone + Default> SessionScoped<T> {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self {
            store,
            slot: RwLock::new(None),
        }
    }

    /// Subject signed in right now. Capture it before sending the request
    /// whose result will be committed with [`set_for`](Self::set_for).
    pub fn owner(&self) -> Option<String> {
        self.store.claims().map(|claims| claims.subject)
    }

    pub fn get(&self) -> T {
        let subject = self.owner();
        match &*self.slot.read() {
            Some((owner, value)) if Some(owner) == subject.as_ref() => value.clone(),
            _ => T::default(),
        }
    }

    /// Store `value` for `owner`. Returns `false`, leaving the slot alone, when
    /// `owner` is not the subject signed in now.
    pub fn set_for(&self, owner: Option<&str>, value: T) -> bool {
        let mut slot = self.slot.write();
        match (owner, self.owner()) {
            (Some(owner), Some(current)) if owner == current => {
                *slot = Some((current, value));
                true
            }
            (_, None) => {
                *slot = None;
                false
            }
            _ => false,
        }
    }

    /// Apply `f` to the value held for `owner`, under the same rule as
    /// [`set_for`](Self::set_for).
    pub fn update_for(&self, owner: Option<&str>, f: impl FnOnce(&mut T)) -> bool {
        let mut slot = self.slot.write();
        let current = match (owner, self.owner()) {
            (Some(owner), Some(current)) if owner == current => current,
            (_, None) => {
                *slot = None;
                return false;
            }
            _ => return false,
        };
        match &mut *slot {
            Some((held_for, value)) if *held_for == current => f(value),
            _ => {
                let mut value = T::default();
                f(&mut value);
                *slot = Some((current, value));
            }
        }
        true
    }

    pub fn reset(&self) {
        *self.slot.write() = None;
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::test_helpers::{future_access_token, memory_store, signed_in_store};
    use jobboard_protocol::{Role, TokenPair};

    #[test]
    fn test_value_follows_subject() {
        let store = signed_in_store("1", Role::Candidate);
        let scoped: SessionScoped<Vec<u64>> = SessionScoped::new(store.clone());

        assert!(scoped.set_for(Some("1"), vec![1, 2]));
        assert_eq!(scoped.get(), vec![1, 2]);

        store
            .set_credentials(TokenPair::new(future_access_token("2", Role::Candidate), "r2"))
            .unwrap();
        assert!(scoped.get().is_empty());

        assert!(scoped.update_for(scoped.owner().as_deref(), |v| v.push(9)));
        assert_eq!(scoped.get(), vec![9]);
    }

    #[test]
    fn test_write_for_previous_subject_is_discarded() {
        let store = signed_in_store("1", Role::Candidate);
        let scoped: SessionScoped<Vec<u64>> = SessionScoped::new(store.clone());
        let owner = scoped.owner();
        assert_eq!(owner.as_deref(), Some("1"));

        store.clear();
        store
            .set_credentials(TokenPair::new(future_access_token("2", Role::Candidate), "r2"))
            .unwrap();

        assert!(!scoped.set_for(owner.as_deref(), vec![7]));
        assert!(!scoped.update_for(owner.as_deref(), |v| v.push(8)));
        assert!(scoped.get().is_empty());
    }

    #[test]
    fn test_cleared_session_reads_empty() {
        let store = signed_in_store("1", Role::Candidate);
        let scoped: SessionScoped<Vec<u64>> = SessionScoped::new(store.clone());
        scoped.set_for(Some("1"), vec![3]);

        store.clear();
        assert!(scoped.get().is_empty());

        assert!(!scoped.update_for(Some("1"), |v| v.push(4)));
        assert!(scoped.get().is_empty());
    }

    #[test]
    fn test_set_while_logged_out_is_dropped() {
        let scoped: SessionScoped<Vec<u64>> = SessionScoped::new(memory_store());
        assert!(!scoped.set_for(None, vec![5]));
        assert!(scoped.get().is_empty());
    }
}
