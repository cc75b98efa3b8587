//! Author create/update form

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{empty_as_none, optional_date, push_error, validate_fields, FieldErrors};
use crate::models::{Author, NewAuthor};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct AuthorForm {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "This field is required."),
        length(max = 100, message = "Ensure this value has at most 100 characters.")
    )]
    pub first_name: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "This field is required."),
        length(max = 100, message = "Ensure this value has at most 100 characters.")
    )]
    pub last_name: Option<String>,

    /// YYYY-MM-DD
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_of_birth: Option<String>,

    /// YYYY-MM-DD
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_of_death: Option<String>,
}

impl From<&Author> for AuthorForm {
    fn from(author: &Author) -> Self {
        Self {
            first_name: Some(author.first_name.clone()),
            last_name: Some(author.last_name.clone()),
            date_of_birth: author.date_of_birth.map(|d| d.to_string()),
            date_of_death: author.date_of_death.map(|d| d.to_string()),
        }
    }
}

impl AuthorForm {
    pub fn clean(&self) -> Result<NewAuthor, FieldErrors> {
        let mut errors = validate_fields(self);

        let date_of_birth = optional_date(&mut errors, "date_of_birth", self.date_of_birth.as_deref());
        let date_of_death = optional_date(&mut errors, "date_of_death", self.date_of_death.as_deref());

        if let (Some(born), Some(died)) = (date_of_birth, date_of_death) {
            if died < born {
                push_error(&mut errors, "date_of_death", "Date of death cannot precede date of birth.");
            }
        }

        match (&self.first_name, &self.last_name) {
            (Some(first_name), Some(last_name)) if errors.is_empty() => Ok(NewAuthor {
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                date_of_birth,
                date_of_death,
            }),
            _ => Err(errors),
        }
    }
}
