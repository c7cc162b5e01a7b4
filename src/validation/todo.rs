use crate::error::{AppError, Result};

/// The longest title a todo may have, in characters.
pub const MAX_TITLE_CHARS: usize = 500;

/// Validates a todo title and returns it trimmed.
///
/// # Arguments
///
/// * `title` - The title as submitted.
///
/// # Returns
///
/// A `Result` containing the trimmed title.
pub fn normalize_title(title: &str) -> Result<String> {
    let title = title.trim();

    if title.is_empty() {
        return Err(AppError::Validation("Title cannot be empty".to_string()));
    }

    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }

    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_trimmed() {
        assert_eq!(normalize_title("  Buy milk \n").unwrap(), "Buy milk");
    }

    #[test]
    fn blank_titles_are_rejected() {
        for blank in ["", "   ", "\t\n"] {
            assert!(matches!(normalize_title(blank), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn overlong_titles_are_rejected() {
        assert!(normalize_title(&"a".repeat(MAX_TITLE_CHARS)).is_ok());
        assert!(normalize_title(&"a".repeat(MAX_TITLE_CHARS + 1)).is_err());
    }
}
