//! Person and idea domain records.
//!
//! # Responsibility
//! - Define the canonical `Person`/`Idea` shapes persisted in the collection.
//! - Validate user-supplied fields before any record is constructed.
//!
//! # Invariants
//! - `id` values are opaque and never change after construction.
//! - `name`/`text`/`img` are non-empty after trimming.
//! - `width`/`height` are finite and strictly positive.
//! - Ideas only exist inside their owning person's `ideas` sequence.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque person identifier produced by an [`IdGenerator`](super::id::IdGenerator).
pub type PersonId = String;

/// Opaque idea identifier produced by an [`IdGenerator`](super::id::IdGenerator).
pub type IdeaId = String;

/// Wire/input format for dates of birth.
pub const DOB_FORMAT: &str = "%Y-%m-%d";

/// Validation failure for person/idea input.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required text field is empty or whitespace.
    MissingField(&'static str),
    /// Date of birth is not a `YYYY-MM-DD` calendar date.
    InvalidDob(String),
    /// Display dimension is zero, negative or not finite.
    InvalidDimension { field: &'static str, value: f64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::InvalidDob(value) => {
                write!(f, "date of birth `{value}` is not a YYYY-MM-DD date")
            }
            Self::InvalidDimension { field, value } => {
                write!(f, "{field} must be a positive number, got {value}")
            }
        }
    }
}

impl Error for ValidationError {}

/// A tracked individual with an owned list of gift ideas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    /// Serialized as `YYYY-MM-DD`.
    pub dob: NaiveDate,
    /// Insertion order is display and storage order.
    pub ideas: Vec<Idea>,
}

impl Person {
    /// Creates a person with no ideas.
    ///
    /// `name` is trimmed; empty names are rejected.
    pub fn new(
        id: impl Into<PersonId>,
        name: &str,
        dob: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let name = required_text("name", name)?;
        Ok(Self {
            id: id.into(),
            name,
            dob,
            ideas: Vec::new(),
        })
    }

    /// Month/day pair used for birthday ordering. Birth year is ignored.
    pub fn birthday_key(&self) -> (u32, u32) {
        (self.dob.month(), self.dob.day())
    }

    /// Removes and returns the idea with `idea_id`, keeping the order of the rest.
    pub fn take_idea(&mut self, idea_id: &str) -> Option<Idea> {
        let index = self.ideas.iter().position(|idea| idea.id == idea_id)?;
        Some(self.ideas.remove(index))
    }
}

/// A gift suggestion owned by one person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    pub text: String,
    /// Path of the committed asset exclusively owned by this idea.
    pub img: String,
    pub width: f64,
    pub height: f64,
}

impl Idea {
    /// Creates an idea after validating caption and dimensions.
    ///
    /// `img` must already be the committed (permanent) asset path.
    pub fn new(
        id: impl Into<IdeaId>,
        text: &str,
        img: impl Into<String>,
        width: f64,
        height: f64,
    ) -> Result<Self, ValidationError> {
        let text = required_text("text", text)?;
        let img = img.into();
        if img.trim().is_empty() {
            return Err(ValidationError::MissingField("image"));
        }
        validate_dimension("width", width)?;
        validate_dimension("height", height)?;
        Ok(Self {
            id: id.into(),
            text,
            img,
            width,
            height,
        })
    }
}

/// Parses a date of birth in `YYYY-MM-DD` form.
///
/// Empty input is reported as a missing field rather than a parse error.
pub fn parse_dob(value: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("dob"));
    }
    NaiveDate::parse_from_str(trimmed, DOB_FORMAT)
        .map_err(|_| ValidationError::InvalidDob(trimmed.to_string()))
}

/// Returns the trimmed value, or `MissingField(field)` when nothing is left.
pub fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

pub fn validate_dimension(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidDimension { field, value })
    }
}
