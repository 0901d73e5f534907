//! The profile record collected by the intake form and rendered by the viewer.
//!
//! A record is five plain strings.  Four of them are required and the email
//! must have a basic `local@domain.tld` shape; the description is free-form
//! and may contain line breaks.  Values are stored exactly as entered, the
//! validation trims only for the emptiness check.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s\x{FEFF}@]+@[^\s\x{FEFF}@]+\.[^\s\x{FEFF}@]+$")
        .expect("email pattern is a valid regex")
});

/// Whitespace as form input sees it: Unicode `White_Space` plus the byte order mark.
pub fn is_form_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Whether `value` is empty once form whitespace is trimmed.
pub fn is_blank(value: &str) -> bool {
    value.chars().all(is_form_whitespace)
}

/// One of the five fields of a [`ProfileRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Phone,
    Position,
    Description,
}

impl Field {
    /// All fields in display order.
    pub const ALL: [Field; 5] = [
        Field::Name,
        Field::Email,
        Field::Phone,
        Field::Position,
        Field::Description,
    ];

    /// Fields that must be non-blank for a record to validate.
    pub const REQUIRED: [Field; 4] = [Field::Name, Field::Email, Field::Phone, Field::Position];

    /// Key used for the field in the serialized record and in validation messages.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Position => "position",
            Field::Description => "description",
        }
    }

    /// Label shown next to the input on the intake form.
    pub fn form_label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Phone => "Phone Number",
            Field::Position => "Position",
            Field::Description => "Description",
        }
    }

    /// Heading used for the field's block in the rendered document.
    pub fn display_label(self) -> &'static str {
        match self {
            Field::Name => "Full Name",
            Field::Email => "Email Address",
            Field::Phone => "Phone Number",
            Field::Position => "Job Position",
            Field::Description => "Description",
        }
    }

    /// Whether the field has to be filled in.
    pub fn is_required(self) -> bool {
        !matches!(self, Field::Description)
    }

    /// Looks a field up by its [`key`](Field::key).
    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reasons a draft record is rejected before it is persisted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields are blank, listed in form order.
    #[error("Please fill in the following required fields: {}", join_keys(.0))]
    MissingFields(Vec<Field>),
    /// The email does not look like `local@domain.tld`.
    #[error("Please enter a valid email address")]
    InvalidEmail,
}

fn join_keys(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| field.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The contact details of a single person.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    name: String,
    email: String,
    phone: String,
    position: String,
    #[serde(default)]
    description: String,
}

impl ProfileRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `field`.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::Position => &self.position,
            Field::Description => &self.description,
        }
    }

    /// Replaces the value of `field` without validating it.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Phone => &mut self.phone,
            Field::Position => &mut self.position,
            Field::Description => &mut self.description,
        };
        *slot = value.into();
    }

    /// Sets `field` and returns the updated record.
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Required fields whose value is empty after trimming, in form order.
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::REQUIRED
            .into_iter()
            .filter(|field| is_blank(self.get(*field)))
            .collect()
    }

    /// Checks the required fields first, then the email shape.
    ///
    /// The email is matched as entered, so surrounding whitespace makes it invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }

        Ok(())
    }

    /// Fields with a non-blank value, in display order.
    pub fn filled_fields(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
            .filter(|(_, value)| !is_blank(value))
    }
}

/// Returns whether `email` has the `local@domain.tld` shape, with no
/// whitespace or `@` inside any part.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}
