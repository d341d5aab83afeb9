use crate::errors::AppError;

/// Rejects an empty required argument; anything else is passed on untouched.
pub fn normalize_required(field: &'static str, value: String) -> Result<String, AppError> {
    if value.is_empty() {
        return Err(AppError::bad_request(
            "missing_argument",
            format!("{field} is required and must not be empty"),
        ));
    }

    Ok(value)
}

/// An empty optional argument is treated as absent.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
