use chrono::{DateTime, Datelike, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::entities::patients;

/// Credential view of a patient row. Never serialized.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub active: bool,
}

impl From<patients::Model> for Account {
    fn from(model: patients::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            password_hash: model.password_hash,
            full_name: model.full_name,
            active: model.active,
        }
    }
}

/// What clients may see about an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicAccount {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub name: String,
}

impl From<&Account> for PublicAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            name: account.full_name.clone(),
        }
    }
}

impl From<patients::Model> for PublicAccount {
    fn from(model: patients::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            name: model.full_name,
        }
    }
}

/// Every profile column except the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientProfile {
    pub id: i32,
    pub full_name: String,
    pub birth_date: Option<String>,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub document_number: Option<String>,
    pub address: Option<String>,
    pub primary_phone: Option<String>,
    pub secondary_phone: Option<String>,
    pub username: String,
    pub email: String,
    pub registered_at: String,
    pub updated_at: String,
    pub active: bool,
}

impl From<patients::Model> for PatientProfile {
    fn from(model: patients::Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
            birth_date: model.birth_date,
            age: model.age,
            sex: model.sex,
            document_number: model.document_number,
            address: model.address,
            primary_phone: model.primary_phone,
            secondary_phone: model.secondary_phone,
            username: model.username,
            email: model.email,
            registered_at: model.registered_at,
            updated_at: model.updated_at,
            active: model.active,
        }
    }
}

/// Profile columns a patient may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProfileField {
    FullName,
    BirthDate,
    Sex,
    DocumentNumber,
    Address,
    PrimaryPhone,
    SecondaryPhone,
    Email,
}

impl ProfileField {
    pub const ALL: [Self; 8] = [
        Self::FullName,
        Self::BirthDate,
        Self::Sex,
        Self::DocumentNumber,
        Self::Address,
        Self::PrimaryPhone,
        Self::SecondaryPhone,
        Self::Email,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::BirthDate => "birth_date",
            Self::Sex => "sex",
            Self::DocumentNumber => "document_number",
            Self::Address => "address",
            Self::PrimaryPhone => "primary_phone",
            Self::SecondaryPhone => "secondary_phone",
            Self::Email => "email",
        }
    }

    /// Whether the column accepts `null`.
    #[must_use]
    pub const fn nullable(self) -> bool {
        !matches!(self, Self::FullName | Self::Email)
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileUpdateError {
    #[error("Field '{0}' must be a string or null")]
    InvalidType(ProfileField),

    #[error("Field '{0}' cannot be empty")]
    Required(ProfileField),

    #[error("Invalid birth date '{0}', expected YYYY-MM-DD")]
    InvalidBirthDate(String),

    #[error("No fields to update")]
    Empty,
}

/// A partial profile update: only fields present in the map are written.
///
/// `Some(None)` from [`ProfileUpdate::get`] means "set the column to NULL".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    changes: BTreeMap<ProfileField, Option<String>>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, field: ProfileField, value: Option<String>) -> Self {
        self.changes.insert(field, value);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: ProfileField) -> Option<Option<&str>> {
        self.changes.get(&field).map(Option::as_deref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, Option<&str>)> {
        self.changes.iter().map(|(k, v)| (*k, v.as_deref()))
    }

    /// Check required fields and normalise the birth date to `YYYY-MM-DD`.
    pub fn validate(mut self) -> Result<Self, ProfileUpdateError> {
        if self.is_empty() {
            return Err(ProfileUpdateError::Empty);
        }

        for (field, value) in &self.changes {
            let blank = value.as_deref().is_none_or(|v| v.trim().is_empty());
            if !field.nullable() && blank {
                return Err(ProfileUpdateError::Required(*field));
            }
        }

        if let Some(Some(raw)) = self.changes.get(&ProfileField::BirthDate) {
            let date = parse_birth_date(raw)?;
            self.changes
                .insert(ProfileField::BirthDate, Some(date.to_string()));
        }

        Ok(self)
    }

    /// The birth date this update sets, if any.
    #[must_use]
    pub fn birth_date(&self) -> Option<Option<NaiveDate>> {
        self.get(ProfileField::BirthDate)
            .map(|value| value.and_then(|raw| parse_birth_date(raw).ok()))
    }
}

impl TryFrom<Map<String, Value>> for ProfileUpdate {
    type Error = ProfileUpdateError;

    fn try_from(body: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut update = Self::new();

        for field in ProfileField::ALL {
            match body.get(field.key()) {
                None => {}
                Some(Value::Null) => update = update.set(field, None),
                Some(Value::String(s)) => update = update.set(field, Some(s.trim().to_string())),
                Some(_) => return Err(ProfileUpdateError::InvalidType(field)),
            }
        }

        update.validate()
    }
}

fn parse_birth_date(raw: &str) -> Result<NaiveDate, ProfileUpdateError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| ProfileUpdateError::InvalidBirthDate(raw.to_string()))
}

/// Age in whole years on `today`.
#[must_use]
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}
