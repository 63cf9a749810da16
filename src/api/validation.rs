use sea_orm::sea_query::Order;

use super::ApiError;

/// Accepted spellings of a sort direction. Anything else is a 400.
pub fn parse_sort_direction(token: &str) -> Result<Order, ApiError> {
    match token {
        "asc" | "ascending" | "1" => Ok(Order::Asc),
        "desc" | "descending" | "-1" => Ok(Order::Desc),
        other => Err(ApiError::validation(format!(
            "Invalid sortBy value: '{}'. Use asc, desc, ascending, descending, 1 or -1",
            other
        ))),
    }
}

pub fn validate_page(page: u64) -> Result<u64, ApiError> {
    if page < 1 {
        return Err(ApiError::validation(format!(
            "Invalid page: {}. Page must be a positive integer",
            page
        )));
    }
    Ok(page)
}

pub fn validate_limit(limit: u64) -> Result<u64, ApiError> {
    const MAX_LIMIT: u64 = 100;
    const MIN_LIMIT: u64 = 1;

    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between {} and {}",
            limit, MIN_LIMIT, MAX_LIMIT
        )));
    }
    Ok(limit)
}

/// Every listed field must be non-blank after trimming.
pub fn require_fields(fields: &[(&str, &str)]) -> Result<(), ApiError> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(ApiError::validation(format!("{} is required", name)));
        }
    }
    Ok(())
}

/// The same shallow shape check the signup form applies client-side.
pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    if !email.contains('@') || !email.contains('.') {
        return Err(ApiError::validation(format!(
            "Invalid email address: '{}'",
            email
        )));
    }
    Ok(email)
}

pub fn validate_content(content: &str) -> Result<&str, ApiError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Content cannot be empty"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_sort_spellings() {
        for token in ["asc", "ascending", "1"] {
            assert!(matches!(parse_sort_direction(token), Ok(Order::Asc)));
        }
        for token in ["desc", "descending", "-1"] {
            assert!(matches!(parse_sort_direction(token), Ok(Order::Desc)));
        }
    }

    #[test]
    fn rejects_unknown_sort_tokens() {
        for token in ["ASC", "up", "", "2", "oldest"] {
            assert!(parse_sort_direction(token).is_err());
        }
    }

    #[test]
    fn rejects_blank_required_fields() {
        assert!(require_fields(&[("username", "alice"), ("password", "  ")]).is_err());
        assert!(require_fields(&[("username", "alice"), ("password", "pw")]).is_ok());
    }

    #[test]
    fn email_needs_at_and_dot() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice.example.com").is_err());
        assert!(validate_email("alice@examplecom").is_err());
    }

    #[test]
    fn limit_bounds() {
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(100).is_ok());
        assert!(validate_limit(101).is_err());
    }
}
