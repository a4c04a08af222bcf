//! Identity types for Clade state records

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// State identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, so IDs sort naturally by creation time
/// and two states created in the same tick still differ.
pub type StateId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 StateId (timestamp-sortable, never reused).
pub fn new_state_id() -> StateId {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_id_is_v7() {
        let id = new_state_id();
        assert_eq!(id.get_version_num(), 7);
    }

    #[test]
    fn test_state_ids_are_sortable() {
        let id1 = new_state_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = new_state_id();
        // UUIDv7 should be lexicographically sortable by time
        assert!(id1.to_string() < id2.to_string());
    }

    #[test]
    fn test_state_ids_are_unique() {
        let ids: Vec<StateId> = (0..100).map(|_| new_state_id()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
