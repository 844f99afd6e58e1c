//! Session identifier sources.

use std::fmt::Debug;

use uuid::Uuid;

use crate::error::IdGenerationError;

/// Produces identifiers for new sessions.
///
/// Identifiers must be vanishingly unlikely to collide with any identifier
/// issued before. The store still refuses a colliding identifier rather
/// than overwriting a live session.
pub trait IdGenerator: Send + Sync + Debug {
    /// Generate a fresh identifier.
    fn generate(&self) -> Result<String, IdGenerationError>;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> Result<String, IdGenerationError> {
        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_generator_unique() {
        let ids: HashSet<String> = (0..1000)
            .map(|_| UuidGenerator.generate().unwrap())
            .collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_uuid_generator_parses() {
        let id = UuidGenerator.generate().unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
