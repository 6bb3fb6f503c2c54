use accessdesk_auth::{Principal, User};
use accessdesk_core::UserId;

use super::store::{InMemoryReadStore, ReadStore};

/// Users known to the service.
///
/// Accounts are owned by the auth collaborator; this directory only remembers
/// the users it has seen, either registered up front or recorded as they make
/// calls. Lookups for anyone else come back empty.
#[derive(Debug, Default)]
pub struct UserDirectory<S = InMemoryReadStore<UserId, User>> {
    store: S,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> UserDirectory<S>
where
    S: ReadStore<UserId, User>,
{
    pub fn register(&self, user: User) {
        self.store.upsert(user.id, user);
    }

    /// Remember the principal behind a call. The latest username and role win.
    pub fn observe(&self, principal: &Principal) {
        if self.store.get(&principal.user_id).as_ref() != Some(&principal.to_user()) {
            self.register(principal.to_user());
        }
    }

    pub fn get(&self, id: &UserId) -> Option<User> {
        self.store.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accessdesk_auth::Role;

    #[test]
    fn observe_records_and_refreshes() {
        let dir = UserDirectory::new();
        let id = UserId::new();

        dir.observe(&Principal::new(id, "ada", Role::Employee));
        dir.observe(&Principal::new(id, "ada", Role::Manager));

        let user = dir.get(&id).unwrap();
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.username, "ada");
    }

    #[test]
    fn unknown_users_are_absent() {
        let dir = UserDirectory::new();
        dir.register(User {
            id: UserId::new(),
            username: "grace".to_string(),
            role: Role::Admin,
        });
        assert!(dir.get(&UserId::new()).is_none());
    }
}
