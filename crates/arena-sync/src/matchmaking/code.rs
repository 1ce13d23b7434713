use std::fmt;

use crate::error::SyncError;

const MIN_LEN: usize = 4;
const MAX_LEN: usize = 12;

/// A normalized room code: trimmed, upper-cased ASCII alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Codes are case-insensitive; `" abc123 "` and `"ABC123"` are the
    /// same room.
    pub fn parse(input: &str) -> Result<Self, SyncError> {
        let code = input.trim().to_ascii_uppercase();
        let valid = (MIN_LEN..=MAX_LEN).contains(&code.len())
            && code.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(SyncError::InvalidCode(input.to_string()));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(RoomCode::parse("abc123").unwrap().as_str(), "ABC123");
        assert_eq!(RoomCode::parse("  AbC123\n").unwrap(), RoomCode::parse("ABC123").unwrap());
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "   ", "ab", "ABC-123", "ÄBC123", "ABCDEFGHIJKLM"] {
            assert!(
                matches!(RoomCode::parse(bad), Err(SyncError::InvalidCode(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn displays_normalized() {
        assert_eq!(RoomCode::parse("xy12").unwrap().to_string(), "XY12");
    }
}
