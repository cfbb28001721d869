//! Wire shapes for contact requests and responses.
//!
//! Incoming bodies deserialize into loosely typed schemas first. `validate`
//! then checks every constraint and either yields the domain input or the full
//! list of violations, so a client sees all problems with a request at once.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::{Contact, ContactUpdate, NewContact, Role, User};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MIN_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 500;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Violations = Vec<Violation>;

/// Body of `POST /contacts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactSchema {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub birthday: Option<String>,
    pub extra_info: Option<String>,
    pub completed: Option<bool>,
}

impl ContactSchema {
    pub fn validate(self) -> Result<NewContact, Violations> {
        let mut v = Vec::new();

        let first_name = required(&mut v, "first_name", self.first_name);
        let last_name = required(&mut v, "last_name", self.last_name);
        let email = required(&mut v, "email", self.email);
        let phone_number = required(&mut v, "phone_number", self.phone_number);
        let birthday = required(&mut v, "birthday", self.birthday);
        let extra_info = required(&mut v, "extra_info", self.extra_info);

        if let Some(value) = &first_name {
            check_name(&mut v, "first_name", value);
        }
        if let Some(value) = &last_name {
            check_name(&mut v, "last_name", value);
        }
        if let Some(value) = &email {
            check_email(&mut v, value);
        }
        if let Some(value) = &phone_number {
            check_length(&mut v, "phone_number", value, 0, 20);
        }
        if let Some(value) = &birthday {
            check_length(&mut v, "birthday", value, 0, 20);
        }
        if let Some(value) = &extra_info {
            check_length(&mut v, "extra_info", value, 3, 250);
        }

        if !v.is_empty() {
            return Err(v);
        }

        Ok(NewContact {
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            email: email.unwrap_or_default(),
            phone_number: phone_number.unwrap_or_default(),
            birthday: birthday.unwrap_or_default(),
            extra_info: extra_info.unwrap_or_default(),
            completed: self.completed.unwrap_or(false),
        })
    }
}

/// Body of `PUT /contacts/{id}`.
///
/// Text fields may be omitted; `completed` may not.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdateSchema {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub birthday: Option<String>,
    pub extra_info: Option<String>,
    pub completed: Option<bool>,
}

impl ContactUpdateSchema {
    pub fn validate(self) -> Result<ContactUpdate, Violations> {
        let mut v = Vec::new();

        if let Some(value) = &self.first_name {
            check_name(&mut v, "first_name", value);
        }
        if let Some(value) = &self.last_name {
            check_name(&mut v, "last_name", value);
        }
        if let Some(value) = &self.email {
            check_email(&mut v, value);
        }
        if let Some(value) = &self.phone_number {
            check_length(&mut v, "phone_number", value, 0, 20);
        }
        if let Some(value) = &self.birthday {
            check_length(&mut v, "birthday", value, 0, 20);
        }
        if let Some(value) = &self.extra_info {
            check_length(&mut v, "extra_info", value, 3, 250);
        }
        if self.completed.is_none() {
            v.push(Violation::new("completed", "field required"));
        }

        if !v.is_empty() {
            return Err(v);
        }

        Ok(ContactUpdate {
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            phone_number: self.phone_number.unwrap_or_default(),
            birthday: self.birthday.unwrap_or_default(),
            extra_info: self.extra_info.unwrap_or_default(),
            completed: self.completed.unwrap_or_default(),
        })
    }
}

/// `limit`/`offset` query parameters of the list routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn validate(self) -> Result<Self, Violations> {
        let mut v = Vec::new();
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&self.limit) {
            v.push(Violation::new(
                "limit",
                format!("must be between {MIN_LIMIT} and {MAX_LIMIT}"),
            ));
        }
        if self.offset < 0 {
            v.push(Violation::new("offset", "must be greater than or equal to 0"));
        }
        if v.is_empty() {
            Ok(self)
        } else {
            Err(v)
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

pub fn validate_contact_id(id: i64) -> Result<i64, Violations> {
    if id >= 1 {
        Ok(id)
    } else {
        Err(vec![Violation::new(
            "contact_id",
            "must be greater than or equal to 1",
        )])
    }
}

/// Owner summary nested in every contact response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: String,
    pub extra_info: String,
    pub completed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user: Option<UserResponse>,
}

impl From<&Contact> for ContactResponse {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id,
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email.clone(),
            phone_number: contact.phone_number.clone(),
            birthday: contact.birthday.clone(),
            extra_info: contact.extra_info.clone(),
            completed: contact.completed,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
            user: Some(UserResponse::from(contact.user.as_ref())),
        }
    }
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self::from(&contact)
    }
}

fn required(v: &mut Violations, field: &str, value: Option<String>) -> Option<String> {
    if value.is_none() {
        v.push(Violation::new(field, "field required"));
    }
    value
}

fn check_name(v: &mut Violations, field: &str, value: &str) {
    check_length(v, field, value, 3, 20);
}

fn check_email(v: &mut Violations, value: &str) {
    check_length(v, "email", value, 3, 40);
    if !EMAIL_RE.is_match(value) {
        v.push(Violation::new("email", "value is not a valid email address"));
    }
}

fn check_length(v: &mut Violations, field: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min {
        v.push(Violation::new(
            field,
            format!("should have at least {min} characters"),
        ));
    } else if len > max {
        v.push(Violation::new(
            field,
            format!("should have at most {max} characters"),
        ));
    }
}
