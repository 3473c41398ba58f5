use std::collections::HashSet;

use crate::domain::RawStudent;

/// Raw students whose `uuid` is not yet in the aggregate. `None` means the
/// store could not be read, so every row counts as new.
pub fn select_new(raw_students: &[RawStudent], existing_uuids: Option<&HashSet<String>>) -> Vec<RawStudent> {
    match existing_uuids {
        None => raw_students.to_vec(),
        Some(existing) => raw_students
            .iter()
            .filter(|s| !existing.contains(&s.uuid))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuids(rows: &[RawStudent]) -> Vec<&str> {
        rows.iter().map(|r| r.uuid.as_str()).collect()
    }

    #[test]
    fn test_filters_known_uuids_in_order() {
        let raw = vec![RawStudent::new("3"), RawStudent::new("1"), RawStudent::new("2")];
        let existing: HashSet<String> = ["1".to_string()].into_iter().collect();

        let new_rows = select_new(&raw, Some(&existing));
        assert_eq!(uuids(&new_rows), vec!["3", "2"]);
    }

    #[test]
    fn test_cold_start_takes_everything() {
        let raw = vec![RawStudent::new("1"), RawStudent::new("2")];
        assert_eq!(select_new(&raw, None), raw);
    }

    #[test]
    fn test_is_idempotent() {
        let raw = vec![RawStudent::new("1"), RawStudent::new("2"), RawStudent::new("3")];
        let existing: HashSet<String> = ["2".to_string()].into_iter().collect();

        let first = select_new(&raw, Some(&existing));
        let second = select_new(&raw, Some(&existing));
        assert_eq!(first, second);

        // Once everything new is committed nothing is new anymore
        let mut committed = existing.clone();
        committed.extend(first.iter().map(|r| r.uuid.clone()));
        assert!(select_new(&raw, Some(&committed)).is_empty());
    }
}
