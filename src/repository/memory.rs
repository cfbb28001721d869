use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::ContactStore;
use crate::entity::{Contact, ContactUpdate, NewContact, User};
use crate::error::StoreResult;

/// Process-local store, used for tests and for running without a database.
#[derive(Debug, Default)]
pub struct MemoryContactStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    contacts: BTreeMap<i64, Contact>,
    owners: HashMap<i64, Arc<User>>,
}

impl Inner {
    fn owner(&mut self, user: &User) -> Arc<User> {
        if let Some(existing) = self.owners.get(&user.id) {
            if existing.as_ref() == user {
                return Arc::clone(existing);
            }
        }
        let owner = Arc::new(user.clone());
        self.owners.insert(user.id, Arc::clone(&owner));
        owner
    }
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.contacts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn page<'a>(
    contacts: impl Iterator<Item = &'a Contact>,
    limit: i64,
    offset: i64,
) -> Vec<Contact> {
    let skip = usize::try_from(offset).unwrap_or(0);
    let take = usize::try_from(limit).unwrap_or(0);
    contacts.skip(skip).take(take).cloned().collect()
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn list_own(&self, limit: i64, offset: i64, user: &User) -> StoreResult<Vec<Contact>> {
        let inner = self.inner.read().await;
        let owned = inner.contacts.values().filter(|c| c.is_owned_by(user));
        Ok(page(owned, limit, offset))
    }

    async fn list_all(&self, limit: i64, offset: i64) -> StoreResult<Vec<Contact>> {
        let inner = self.inner.read().await;
        Ok(page(inner.contacts.values(), limit, offset))
    }

    async fn get_one(&self, id: i64, user: &User) -> StoreResult<Option<Contact>> {
        let inner = self.inner.read().await;
        Ok(inner
            .contacts
            .get(&id)
            .filter(|c| c.is_owned_by(user))
            .cloned())
    }

    async fn create(&self, input: NewContact, user: &User) -> StoreResult<Contact> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let now = Utc::now();
        let contact = Contact {
            id: inner.next_id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone_number: input.phone_number,
            birthday: input.birthday,
            extra_info: input.extra_info,
            completed: input.completed,
            created_at: Some(now),
            updated_at: Some(now),
            user: inner.owner(user),
        };
        inner.contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn update(
        &self,
        id: i64,
        input: ContactUpdate,
        user: &User,
    ) -> StoreResult<Option<Contact>> {
        let mut inner = self.inner.write().await;
        let Some(contact) = inner.contacts.get_mut(&id).filter(|c| c.is_owned_by(user)) else {
            return Ok(None);
        };

        contact.first_name = input.first_name;
        contact.last_name = input.last_name;
        contact.email = input.email;
        contact.phone_number = input.phone_number;
        contact.birthday = input.birthday;
        contact.extra_info = input.extra_info;
        contact.completed = input.completed;
        contact.updated_at = Some(Utc::now());

        Ok(Some(contact.clone()))
    }

    async fn delete(&self, id: i64, user: &User) -> StoreResult<Option<Contact>> {
        let mut inner = self.inner.write().await;
        if !inner.contacts.get(&id).is_some_and(|c| c.is_owned_by(user)) {
            return Ok(None);
        }
        Ok(inner.contacts.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Role;

    fn user(id: i64) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            role: Role::User,
        }
    }

    fn new_contact(first_name: &str) -> NewContact {
        NewContact {
            first_name: first_name.to_string(),
            last_name: "Hopper".into(),
            email: "grace@example.com".into(),
            phone_number: "555-0100".into(),
            birthday: "1906-12-09".into(),
            extra_info: "Rear admiral".into(),
            completed: false,
        }
    }

    fn replacement() -> ContactUpdate {
        ContactUpdate {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone_number: "555-0199".into(),
            birthday: "1815-12-10".into(),
            extra_info: "Analyst".into(),
            completed: true,
        }
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids_and_owner() {
        let store = MemoryContactStore::new();
        let owner = user(1);

        let first = store.create(new_contact("Grace"), &owner).await.unwrap();
        let second = store.create(new_contact("Grace"), &owner).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.user.as_ref(), &owner);
        assert_eq!(first.first_name, "Grace");
        assert_eq!(first.birthday, "1906-12-09");
        assert!(!first.completed);
        assert!(first.created_at.is_some());
    }

    #[tokio::test]
    async fn get_one_is_scoped_to_owner() {
        let store = MemoryContactStore::new();
        let owner = user(1);
        let contact = store.create(new_contact("Grace"), &owner).await.unwrap();

        let found = store.get_one(contact.id, &owner).await.unwrap();
        assert_eq!(found, Some(contact.clone()));
        assert_eq!(store.get_one(contact.id, &user(2)).await.unwrap(), None);
        assert_eq!(store.get_one(999, &owner).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_own_on_empty_user_is_empty() {
        let store = MemoryContactStore::new();
        store.create(new_contact("Grace"), &user(1)).await.unwrap();

        assert!(store.list_own(10, 0, &user(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_own_and_all_slice_by_offset_and_limit() {
        let store = MemoryContactStore::new();
        for i in 0..15 {
            let owner = if i % 3 == 0 { user(2) } else { user(1) };
            store.create(new_contact("Grace"), &owner).await.unwrap();
        }

        let own = store.list_own(10, 0, &user(1)).await.unwrap();
        assert_eq!(own.len(), 10);
        assert!(own.iter().all(|c| c.user.id == 1));

        let rest = store.list_own(10, 8, &user(1)).await.unwrap();
        assert_eq!(rest.len(), 2);

        let all = store.list_all(10, 10).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].id, 11);
    }

    #[tokio::test]
    async fn update_overwrites_every_field() {
        let store = MemoryContactStore::new();
        let owner = user(1);
        let contact = store.create(new_contact("Grace"), &owner).await.unwrap();

        let updated = store
            .update(contact.id, replacement(), &owner)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, contact.id);
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Lovelace");
        assert_eq!(updated.email, "ada@example.com");
        assert_eq!(updated.phone_number, "555-0199");
        assert_eq!(updated.birthday, "1815-12-10");
        assert_eq!(updated.extra_info, "Analyst");
        assert!(updated.completed);
        assert_eq!(store.get_one(contact.id, &owner).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn update_of_missing_or_foreign_contact_changes_nothing() {
        let store = MemoryContactStore::new();
        let owner = user(1);
        let contact = store.create(new_contact("Grace"), &owner).await.unwrap();

        assert_eq!(store.update(42, replacement(), &owner).await.unwrap(), None);
        assert_eq!(
            store.update(contact.id, replacement(), &user(2)).await.unwrap(),
            None
        );
        assert_eq!(
            store.get_one(contact.id, &owner).await.unwrap(),
            Some(contact)
        );
    }

    #[tokio::test]
    async fn delete_removes_owned_contact_once() {
        let store = MemoryContactStore::new();
        let owner = user(1);
        let contact = store.create(new_contact("Grace"), &owner).await.unwrap();

        let removed = store.delete(contact.id, &owner).await.unwrap();
        assert_eq!(removed, Some(contact.clone()));
        assert_eq!(store.get_one(contact.id, &owner).await.unwrap(), None);
        assert_eq!(store.delete(contact.id, &owner).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_of_foreign_contact_is_a_noop() {
        let store = MemoryContactStore::new();
        let contact = store.create(new_contact("Grace"), &user(1)).await.unwrap();

        assert_eq!(store.delete(contact.id, &user(2)).await.unwrap(), None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn contacts_share_the_owner_allocation() {
        let store = MemoryContactStore::new();
        let owner = user(1);
        let a = store.create(new_contact("Grace"), &owner).await.unwrap();
        let b = store.create(new_contact("Alan"), &owner).await.unwrap();

        assert!(Arc::ptr_eq(&a.user, &b.user));
    }
}
