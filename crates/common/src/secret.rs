//! Redacting wrapper for API tokens

use std::fmt;
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs, zeroed on drop
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (only at the point of use, e.g. building a header)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_redacted_in_debug_and_display() {
        let token = Secret::from("eyJ0eXAiOiJKV1Qi");
        assert_eq!(format!("{token:?}"), "[REDACTED]");
        assert_eq!(format!("{token}"), "[REDACTED]");
    }

    #[test]
    fn token_in_collection_stays_redacted() {
        let tokens: Vec<Secret<String>> = vec!["a".into(), "b".into()];
        let debug = format!("{tokens:?}");
        assert_eq!(debug, "[[REDACTED], [REDACTED]]");
    }

    #[test]
    fn expose_returns_inner_value() {
        let token = Secret::new(String::from("eyJ0eXAiOiJKV1Qi"));
        assert_eq!(token.expose(), "eyJ0eXAiOiJKV1Qi");
        assert_eq!(token.clone().expose(), "eyJ0eXAiOiJKV1Qi");
    }
}
