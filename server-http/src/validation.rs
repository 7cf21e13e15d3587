use crate::api::{CreateCategoryRequest, UpdateCategoryRequest};
use larder::{CategoryChanges, NewCategory};

/// Upper bound on every text field of a category
const MAX_TEXT_LEN: usize = 255;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    MissingRequiredField { field: &'static str },
    Blank { field: &'static str },
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    NothingToUpdate,
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingRequiredField { field }
            | ValidationError::Blank { field }
            | ValidationError::TooLong { field, .. } => field,
            ValidationError::NothingToUpdate => "body",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingRequiredField { field } => {
                write!(f, "The {} field is required", field)
            }
            ValidationError::Blank { field } => {
                write!(f, "The {} field must not be blank", field)
            }
            ValidationError::TooLong { field, len, max } => {
                write!(
                    f,
                    "The {} field must not be greater than {} characters (got {})",
                    field, max, len
                )
            }
            ValidationError::NothingToUpdate => {
                write!(f, "At least one field must be provided")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for shared::Error {
    fn from(err: ValidationError) -> Self {
        shared::Error::Validation {
            field: err.field(),
            reason: err.to_string(),
        }
    }
}

pub struct CategoryRequestValidator;

impl CategoryRequestValidator {
    /// Validate a create request. Every field is required.
    pub fn for_create(req: CreateCategoryRequest) -> Result<NewCategory, ValidationError> {
        let name = Self::required_text("name", req.name)?;
        let description = Self::required_text("description", req.description)?;
        let slug = Self::required_text("slug", req.slug)?;
        let is_active = req
            .is_active
            .ok_or(ValidationError::MissingRequiredField { field: "is_active" })?;
        let sort_order = req
            .sort_order
            .ok_or(ValidationError::MissingRequiredField { field: "sort_order" })?;

        Ok(NewCategory {
            name,
            description,
            slug,
            is_active,
            sort_order,
        })
    }

    /// Validate a partial update. Fields that are present follow the create rules.
    pub fn for_update(req: UpdateCategoryRequest) -> Result<CategoryChanges, ValidationError> {
        let changes = CategoryChanges {
            name: Self::optional_text("name", req.name)?,
            description: Self::optional_text("description", req.description)?,
            slug: Self::optional_text("slug", req.slug)?,
            is_active: req.is_active,
            sort_order: req.sort_order,
        };

        if changes.is_empty() {
            return Err(ValidationError::NothingToUpdate);
        }
        Ok(changes)
    }

    fn required_text(
        field: &'static str,
        value: Option<String>,
    ) -> Result<String, ValidationError> {
        let value = value.ok_or(ValidationError::MissingRequiredField { field })?;
        Self::check_text(field, value)
    }

    fn optional_text(
        field: &'static str,
        value: Option<String>,
    ) -> Result<Option<String>, ValidationError> {
        value.map(|v| Self::check_text(field, v)).transpose()
    }

    fn check_text(field: &'static str, value: String) -> Result<String, ValidationError> {
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(ValidationError::Blank { field });
        }

        let len = value.chars().count();
        if len > MAX_TEXT_LEN {
            return Err(ValidationError::TooLong {
                field,
                len,
                max: MAX_TEXT_LEN,
            });
        }
        Ok(value)
    }
}
