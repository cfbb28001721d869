//! Contact persistence.
//!
//! Every operation maps to a single statement against the backing store.
//! Owner-scoped operations take the caller and never touch rows belonging to
//! anyone else; a lookup that misses because the row does not exist and one
//! that misses because it is owned by another user both yield `None`.

use async_trait::async_trait;

use crate::entity::{Contact, ContactUpdate, NewContact, User};
use crate::error::StoreResult;

mod memory;
mod postgres;

pub use memory::MemoryContactStore;
pub use postgres::PgContactStore;

#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Contacts owned by `user`, ordered by id.
    async fn list_own(&self, limit: i64, offset: i64, user: &User) -> StoreResult<Vec<Contact>>;

    /// Contacts of every user, ordered by id. Callers must check roles first.
    async fn list_all(&self, limit: i64, offset: i64) -> StoreResult<Vec<Contact>>;

    async fn get_one(&self, id: i64, user: &User) -> StoreResult<Option<Contact>>;

    /// Persists a new contact owned by `user` and returns it with its
    /// generated id and timestamps.
    async fn create(&self, input: NewContact, user: &User) -> StoreResult<Contact>;

    /// Replaces every field of the owned contact `id`.
    async fn update(
        &self,
        id: i64,
        input: ContactUpdate,
        user: &User,
    ) -> StoreResult<Option<Contact>>;

    /// Removes the owned contact `id`, returning its last stored values.
    async fn delete(&self, id: i64, user: &User) -> StoreResult<Option<Contact>>;
}
