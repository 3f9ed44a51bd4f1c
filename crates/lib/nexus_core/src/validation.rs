//! Pre-submission checks for login, registration and
//! measurement forms.
//!
//! Every validator returns the full list of field errors (empty = valid).
//! A non-empty list blocks submission; nothing here touches the network.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::models::auth::{LoginRequest, RegisterRequest};
use crate::models::health::{BloodPressure, HealthEntry, Metrics, StoredBloodPressure};

/// Minimum password length for login and registration.
pub const MIN_PASSWORD_LEN: usize = 6;

pub const SYSTOLIC_RANGE: RangeInclusive<u16> = 60..=250;
pub const DIASTOLIC_RANGE: RangeInclusive<u16> = 40..=150;
pub const WEIGHT_RANGE: RangeInclusive<f64> = 50.0..=400.0;
pub const GLUCOSE_RANGE: RangeInclusive<f64> = 40.0..=400.0;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// A single failed check, keyed by form field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    let email = email.trim();
    if email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if !EMAIL_RE.is_match(email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    }
}

fn check_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        errors
    }

    /// Wire payload. The email is sent trimmed.
    pub fn to_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.first_name.trim().is_empty() {
            errors.push(FieldError::new("first_name", "First name is required"));
        }
        if self.last_name.trim().is_empty() {
            errors.push(FieldError::new("last_name", "Last name is required"));
        }
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        if self.confirm_password != self.password {
            errors.push(FieldError::new("confirm_password", "Passwords do not match"));
        }
        errors
    }

    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Measurement entry
// ---------------------------------------------------------------------------

/// How the blood pressure was entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BloodPressureInput {
    /// Typed as `"120/80"`.
    Text(String),
    /// Picked on two sliders.
    Sliders { systolic: u16, diastolic: u16 },
}

impl Default for BloodPressureInput {
    fn default() -> Self {
        BloodPressureInput::Text(String::new())
    }
}

/// Raw measurement form state, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementForm {
    pub weight: String,
    pub blood_pressure: BloodPressureInput,
    pub glucose: String,
}

impl MeasurementForm {
    /// Form pre-filled from an existing entry, for editing. A free-text
    /// reading is seeded as text so the user can correct it.
    pub fn seeded_from(entry: &HealthEntry) -> Self {
        let blood_pressure = match &entry.blood_pressure {
            StoredBloodPressure::Parsed(bp) => BloodPressureInput::Sliders {
                systolic: bp.systolic,
                diastolic: bp.diastolic,
            },
            StoredBloodPressure::Raw(raw) => BloodPressureInput::Text(raw.clone()),
        };
        Self {
            weight: entry.weight.to_string(),
            blood_pressure,
            glucose: entry.glucose.to_string(),
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        match self.to_metrics() {
            Ok(_) => Vec::new(),
            Err(errors) => errors,
        }
    }

    /// Parse and bound-check every field.
    pub fn to_metrics(&self) -> Result<Metrics, Vec<FieldError>> {
        let mut errors = Vec::new();
        let weight = parse_number("weight", "Weight", &self.weight, &WEIGHT_RANGE, &mut errors);
        let glucose = parse_number("glucose", "Glucose", &self.glucose, &GLUCOSE_RANGE, &mut errors);
        let blood_pressure = self.parse_blood_pressure(&mut errors);

        match (weight, blood_pressure, glucose) {
            (Some(weight), Some(blood_pressure), Some(glucose)) if errors.is_empty() => Ok(Metrics {
                weight,
                blood_pressure,
                glucose,
            }),
            _ => Err(errors),
        }
    }

    fn parse_blood_pressure(&self, errors: &mut Vec<FieldError>) -> Option<BloodPressure> {
        let bp = match &self.blood_pressure {
            BloodPressureInput::Text(text) if text.trim().is_empty() => {
                errors.push(FieldError::new("blood_pressure", "Blood pressure is required"));
                return None;
            }
            BloodPressureInput::Text(text) => match text.parse::<BloodPressure>() {
                Ok(bp) => bp,
                Err(_) => {
                    errors.push(FieldError::new(
                        "blood_pressure",
                        "Blood pressure must look like 120/80",
                    ));
                    return None;
                }
            },
            BloodPressureInput::Sliders {
                systolic,
                diastolic,
            } => BloodPressure::new(*systolic, *diastolic),
        };

        let before = errors.len();
        if !SYSTOLIC_RANGE.contains(&bp.systolic) {
            errors.push(FieldError::new(
                "systolic",
                format!(
                    "Systolic must be between {} and {}",
                    SYSTOLIC_RANGE.start(),
                    SYSTOLIC_RANGE.end()
                ),
            ));
        }
        if !DIASTOLIC_RANGE.contains(&bp.diastolic) {
            errors.push(FieldError::new(
                "diastolic",
                format!(
                    "Diastolic must be between {} and {}",
                    DIASTOLIC_RANGE.start(),
                    DIASTOLIC_RANGE.end()
                ),
            ));
        }
        (errors.len() == before).then_some(bp)
    }
}

fn parse_number(
    field: &'static str,
    label: &str,
    raw: &str,
    range: &RangeInclusive<f64>,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push(FieldError::new(field, format!("{label} is required")));
        return None;
    }
    let value = match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            errors.push(FieldError::new(field, format!("{label} must be a number")));
            return None;
        }
    };
    if !range.contains(&value) {
        errors.push(FieldError::new(
            field,
            format!("{label} must be between {} and {}", range.start(), range.end()),
        ));
        return None;
    }
    Some(value)
}
