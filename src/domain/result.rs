//! Result type alias
//!
//! This module provides a convenient Result type alias that uses `RecupError`
//! as the error type.

use super::errors::RecupError;

/// Result type alias for library operations
///
/// # Examples
///
/// ```
/// use recup_monitor::domain::result::Result;
/// use recup_monitor::domain::errors::RecupError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(RecupError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, RecupError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::RecupError;

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(RecupError::Validation("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
