//! Browser form payloads and their validation.
//!
//! Every form deserializes leniently (missing fields become empty strings) and
//! is then checked by `validate`, which either yields the cleaned value or a
//! [`FormErrors`] map that the page re-renders next to the inputs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Profile;

pub const USERNAME_MAX: usize = 150;
pub const PASSWORD_MIN: usize = 8;
pub const FULL_NAME_MAX: usize = 100;
pub const LOCATION_MAX: usize = 100;
pub const PHONE_MAX: usize = 15;
pub const EDUCATION_MAX: usize = 255;

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    #[cfg(test)]
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

// -- Registration --

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<NewAccount, FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();

        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if username.chars().count() > USERNAME_MAX {
            errors.add(
                "username",
                format!("Ensure this value has at most {USERNAME_MAX} characters."),
            );
        } else if !username.chars().all(is_username_char) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else {
            if self.password1.chars().count() < PASSWORD_MIN {
                errors.add(
                    "password1",
                    format!("This password is too short. It must contain at least {PASSWORD_MIN} characters."),
                );
            }
            if self.password1.chars().all(|c| c.is_ascii_digit()) {
                errors.add("password1", "This password is entirely numeric.");
            }
        }

        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.finish(NewAccount {
            username: username.to_string(),
            password: self.password1.clone(),
        })
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

// -- Login --

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.finish(())
    }
}

// -- Profile --

/// Full-replace submission of every profile field.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub full_name: String,
    pub birth_date: String,
    pub location: String,
    pub bio: String,
    pub email: String,
    pub phone_number: String,
    pub education: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub location: String,
    pub bio: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub education: Option<String>,
}

impl ProfileForm {
    /// Prefill from the stored profile.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            birth_date: profile
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            location: profile.location.clone(),
            bio: profile.bio.clone(),
            email: profile.email.clone(),
            phone_number: profile.phone_number.clone().unwrap_or_default(),
            education: profile.education.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<ProfileUpdate, FormErrors> {
        let mut errors = FormErrors::default();

        let full_name = self.full_name.trim();
        check_max(&mut errors, "full_name", full_name, FULL_NAME_MAX);
        let location = self.location.trim();
        check_max(&mut errors, "location", location, LOCATION_MAX);

        let birth_date = match self.birth_date.trim() {
            "" => None,
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("birth_date", "Enter a valid date (YYYY-MM-DD).");
                    None
                }
            },
        };

        let email = self.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            errors.add("email", "Enter a valid email address.");
        }

        let phone_number = blank_to_none(&self.phone_number);
        if let Some(phone) = &phone_number {
            check_max(&mut errors, "phone_number", phone, PHONE_MAX);
        }
        let education = blank_to_none(&self.education);
        if let Some(education) = &education {
            check_max(&mut errors, "education", education, EDUCATION_MAX);
        }

        errors.finish(ProfileUpdate {
            full_name: full_name.to_string(),
            birth_date,
            location: location.to_string(),
            bio: self.bio.trim().to_string(),
            email: email.to_string(),
            phone_number,
            education,
        })
    }
}

fn check_max(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
        }
        None => false,
    }
}

// -- Comments --

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub content: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let content = self.content.trim();
        if content.is_empty() {
            errors.add("content", REQUIRED);
        }
        errors.finish(content.to_string())
    }
}
