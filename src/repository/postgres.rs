use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::ContactStore;
use crate::entity::{Contact, ContactUpdate, NewContact, Role, User};
use crate::error::{StoreError, StoreResult};

/// PostgreSQL-backed store. Every call runs a single statement on a pooled
/// connection, so each mutation commits on its own.
#[derive(Debug, Clone)]
pub struct PgContactStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct ContactRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: String,
    birthday: String,
    extra_info: String,
    completed: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    user_id: i64,
}

#[derive(Debug, FromRow)]
struct ContactWithOwnerRow {
    #[sqlx(flatten)]
    contact: ContactRow,
    owner_username: String,
    owner_email: String,
    owner_role: String,
}

impl ContactRow {
    fn into_contact(self, owner: Arc<User>) -> Contact {
        debug_assert_eq!(self.user_id, owner.id);
        Contact {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            birthday: self.birthday,
            extra_info: self.extra_info,
            completed: self.completed,
            created_at: self.created_at,
            updated_at: self.updated_at,
            user: owner,
        }
    }
}

impl PgContactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn list_own(&self, limit: i64, offset: i64, user: &User) -> StoreResult<Vec<Contact>> {
        let rows: Vec<ContactRow> = sqlx::query_as(
            "SELECT id, first_name, last_name, email, phone_number, birthday, extra_info, \
                    completed, created_at, updated_at, user_id \
             FROM contacts \
             WHERE user_id = $1 \
             ORDER BY id \
             LIMIT $2 OFFSET $3",
        )
        .bind(user.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let owner = Arc::new(user.clone());
        Ok(rows
            .into_iter()
            .map(|row| row.into_contact(Arc::clone(&owner)))
            .collect())
    }

    async fn list_all(&self, limit: i64, offset: i64) -> StoreResult<Vec<Contact>> {
        let rows: Vec<ContactWithOwnerRow> = sqlx::query_as(
            "SELECT c.id, c.first_name, c.last_name, c.email, c.phone_number, c.birthday, \
                    c.extra_info, c.completed, c.created_at, c.updated_at, c.user_id, \
                    u.username AS owner_username, u.email AS owner_email, u.role AS owner_role \
             FROM contacts c \
             JOIN users u ON u.id = c.user_id \
             ORDER BY c.id \
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut owners: HashMap<i64, Arc<User>> = HashMap::new();
        let mut contacts = Vec::with_capacity(rows.len());
        for row in rows {
            let owner = match owners.get(&row.contact.user_id).cloned() {
                Some(owner) => owner,
                None => {
                    let role = row
                        .owner_role
                        .parse::<Role>()
                        .map_err(StoreError::Corrupt)?;
                    let owner = Arc::new(User {
                        id: row.contact.user_id,
                        username: row.owner_username,
                        email: row.owner_email,
                        role,
                    });
                    owners.insert(owner.id, Arc::clone(&owner));
                    owner
                }
            };
            contacts.push(row.contact.into_contact(owner));
        }
        Ok(contacts)
    }

    async fn get_one(&self, id: i64, user: &User) -> StoreResult<Option<Contact>> {
        let row: Option<ContactRow> = sqlx::query_as(
            "SELECT id, first_name, last_name, email, phone_number, birthday, extra_info, \
                    completed, created_at, updated_at, user_id \
             FROM contacts \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.into_contact(Arc::new(user.clone()))))
    }

    async fn create(&self, input: NewContact, user: &User) -> StoreResult<Contact> {
        let row: ContactRow = sqlx::query_as(
            "INSERT INTO contacts \
                (first_name, last_name, email, phone_number, birthday, extra_info, completed, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, first_name, last_name, email, phone_number, birthday, extra_info, \
                       completed, created_at, updated_at, user_id",
        )
        .bind(input.first_name)
        .bind(input.last_name)
        .bind(input.email)
        .bind(input.phone_number)
        .bind(input.birthday)
        .bind(input.extra_info)
        .bind(input.completed)
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(contact_id = row.id, user_id = user.id, "contact inserted");
        Ok(row.into_contact(Arc::new(user.clone())))
    }

    async fn update(
        &self,
        id: i64,
        input: ContactUpdate,
        user: &User,
    ) -> StoreResult<Option<Contact>> {
        let row: Option<ContactRow> = sqlx::query_as(
            "UPDATE contacts \
             SET first_name = $1, last_name = $2, email = $3, phone_number = $4, \
                 birthday = $5, extra_info = $6, completed = $7, updated_at = now() \
             WHERE id = $8 AND user_id = $9 \
             RETURNING id, first_name, last_name, email, phone_number, birthday, extra_info, \
                       completed, created_at, updated_at, user_id",
        )
        .bind(input.first_name)
        .bind(input.last_name)
        .bind(input.email)
        .bind(input.phone_number)
        .bind(input.birthday)
        .bind(input.extra_info)
        .bind(input.completed)
        .bind(id)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.into_contact(Arc::new(user.clone()))))
    }

    async fn delete(&self, id: i64, user: &User) -> StoreResult<Option<Contact>> {
        let row: Option<ContactRow> = sqlx::query_as(
            "DELETE FROM contacts \
             WHERE id = $1 AND user_id = $2 \
             RETURNING id, first_name, last_name, email, phone_number, birthday, extra_info, \
                       completed, created_at, updated_at, user_id",
        )
        .bind(id)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.into_contact(Arc::new(user.clone()))))
    }
}
