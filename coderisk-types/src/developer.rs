use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identified by normalised email. Distinct display names on the same
/// normalised email collapse to the last-seen name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Developer {
    pub repo_id: Uuid,
    pub normalized_email: String,
    pub name: String,
    pub first_active: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Lower-cases and trims an email for use as a developer identity key.
///
/// Mailmap-style `+tag` stripping is intentionally not performed here:
/// only normalisation is in scope, not alias resolution, and conflating
/// the two would silently merge developers who never asked to be merged.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
