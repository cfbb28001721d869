//! Contact routes.
//!
//! ## Routes
//!
//! - `GET    /contacts` - List the caller's contacts
//! - `GET    /contacts/all` - List every contact (admin and moderator only)
//! - `POST   /contacts` - Create a contact
//! - `GET    /contacts/{contact_id}` - Get one of the caller's contacts
//! - `PUT    /contacts/{contact_id}` - Replace one of the caller's contacts
//! - `DELETE /contacts/{contact_id}` - Delete one of the caller's contacts

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ContactId, CurrentUser, Elevated, JsonBody, Page};
use crate::schema::{ContactResponse, ContactSchema, ContactUpdateSchema};
use crate::server::AppState;

pub fn contacts() -> Router<Arc<AppState>> {
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route("/contacts/all", get(list_all_contacts))
        .route(
            "/contacts/:contact_id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

async fn list_contacts(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Page(page): Page,
) -> ApiResult<Json<Vec<ContactResponse>>> {
    tracing::debug!(user_id = user.id, limit = page.limit, offset = page.offset, "Listing contacts");

    let contacts = state
        .store
        .list_own(page.limit, page.offset, &user)
        .await?;
    Ok(Json(contacts.iter().map(ContactResponse::from).collect()))
}

async fn list_all_contacts(
    State(state): State<Arc<AppState>>,
    Elevated(user): Elevated,
    Page(page): Page,
) -> ApiResult<Json<Vec<ContactResponse>>> {
    tracing::debug!(user_id = user.id, role = %user.role, "Listing all contacts");

    let contacts = state.store.list_all(page.limit, page.offset).await?;
    Ok(Json(contacts.iter().map(ContactResponse::from).collect()))
}

async fn create_contact(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<ContactSchema>,
) -> ApiResult<impl IntoResponse> {
    let input = body.validate().map_err(ApiError::validation)?;

    // Store failures on create are reported as 404 for wire compatibility.
    let contact = state.store.create(input, &user).await.map_err(|err| {
        tracing::error!(user_id = user.id, error = %err, "Failed to create contact");
        ApiError::not_found("Failed to create contact")
    })?;

    tracing::info!(user_id = user.id, contact_id = contact.id, "Created contact");
    Ok((StatusCode::CREATED, Json(ContactResponse::from(contact))))
}

async fn get_contact(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ContactId(id): ContactId,
) -> ApiResult<Json<ContactResponse>> {
    let contact = state
        .store
        .get_one(id, &user)
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?
        .ok_or_else(|| ApiError::not_found("Contact not found"))?;

    Ok(Json(ContactResponse::from(contact)))
}

async fn update_contact(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ContactId(id): ContactId,
    JsonBody(body): JsonBody<ContactUpdateSchema>,
) -> ApiResult<Json<ContactResponse>> {
    let input = body.validate().map_err(ApiError::validation)?;

    let contact = state
        .store
        .update(id, input, &user)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact not found"))?;

    tracing::info!(user_id = user.id, contact_id = contact.id, "Updated contact");
    Ok(Json(ContactResponse::from(contact)))
}

async fn delete_contact(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ContactId(id): ContactId,
) -> ApiResult<StatusCode> {
    if let Some(contact) = state.store.delete(id, &user).await? {
        tracing::info!(user_id = user.id, contact_id = contact.id, "Deleted contact");
    }
    Ok(StatusCode::NO_CONTENT)
}
