//! Request validation utilities for consistent validation across handlers
//!
//! Request bodies implement [`RequestValidation`]; the macros below return
//! an [`ApiError::Validation`](crate::error::ApiError) carrying the
//! field-specific message shown to the client.

use crate::error::ApiError;

/// Trait for validating request payloads
///
/// # Example
///
/// ```rust,ignore
/// impl RequestValidation for LoginRequest {
///     fn validate(&self) -> Result<(), ApiError> {
///         validate_required!(self.email, "Email is required");
///         validate_required!(self.password, "Password is required");
///         Ok(())
///     }
/// }
/// ```
pub trait RequestValidation {
    fn validate(&self) -> Result<(), ApiError>;
}

/// Return a validation error unless `$predicate` holds
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Non-blank string
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// Length in characters, inclusive bounds
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.chars().count();
        $crate::validate_field!($field, len >= $min && len <= $max, $message);
    };
}

/// Basic shape check only; delivery is never attempted
#[macro_export]
macro_rules! validate_email {
    ($field:expr, $message:expr) => {
        $crate::validate_field!(
            $field,
            $crate::validation::looks_like_email(&$field),
            $message
        );
    };
}

/// One `@` with a non-empty local part and a dotted domain
pub fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SignUp {
        name: String,
        email: String,
        password: String,
    }

    impl RequestValidation for SignUp {
        fn validate(&self) -> Result<(), ApiError> {
            validate_required!(self.name, "Name is required");
            validate_email!(self.email, "Invalid email format");
            validate_length!(self.password, 8, 128, "Password must be between 8 and 128 characters");
            Ok(())
        }
    }

    fn sign_up(name: &str, email: &str, password: &str) -> SignUp {
        SignUp {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(sign_up("Dr. Sari", "sari@klinik.id", "rahasia123").validate().is_ok());
    }

    #[test]
    fn first_failing_rule_is_reported() {
        let err = sign_up(" ", "bad", "short").validate().unwrap_err();
        assert_eq!(err.client_message(), "Name is required");

        let err = sign_up("Dr. Sari", "sari@klinik", "rahasia123").validate().unwrap_err();
        assert_eq!(err.client_message(), "Invalid email format");

        let err = sign_up("Dr. Sari", "sari@klinik.id", "short").validate().unwrap_err();
        assert_eq!(
            err.client_message(),
            "Password must be between 8 and 128 characters"
        );
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("a@@b.co"));
        assert!(!looks_like_email("a@.co"));
    }
}
