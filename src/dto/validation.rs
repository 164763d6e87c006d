//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a session code is exactly 6 ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_session_code("482913") // Ok
/// validate_session_code("000000") // Ok - leading zeros are part of the code
/// validate_session_code("48291")  // Err - too short
/// validate_session_code("48291a") // Err - not a digit
/// ```
pub fn validate_session_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 6 {
        let mut err = ValidationError::new("session_code_length");
        err.message =
            Some(format!("Session code must be exactly 6 digits (got {})", code.len()).into());
        return Err(err);
    }

    if !code.bytes().all(|b| b.is_ascii_digit()) {
        let mut err = ValidationError::new("session_code_format");
        err.message = Some("Session code must contain only digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_code_valid() {
        assert!(validate_session_code("482913").is_ok());
        assert!(validate_session_code("000000").is_ok());
        assert!(validate_session_code("999999").is_ok());
    }

    #[test]
    fn test_validate_session_code_invalid_length() {
        assert!(validate_session_code("48291").is_err()); // too short
        assert!(validate_session_code("4829130").is_err()); // too long
        assert!(validate_session_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_session_code_invalid_format() {
        assert!(validate_session_code("48291a").is_err()); // letter
        assert!(validate_session_code("4829 3").is_err()); // space
        assert!(validate_session_code("-48291").is_err()); // sign
        assert!(validate_session_code("４８２９").is_err()); // full-width digits
    }
}
