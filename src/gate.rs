//! Pure unlock computation: catalog x progress -> accessible subset.

use crate::catalog::CatalogEntry;
use crate::progress::ProgressMarker;

/// Stable filter over the catalog: keeps exactly the entries the marker
/// permits, in catalog order, without sorting or deduplicating.
///
/// Absence or invalidity of the marker yields the empty set. Invalid
/// catalog rows are excluded rather than raised, since the catalog is
/// externally owned and may contain bad data.
pub fn unlocked(catalog: &[CatalogEntry], progress: Option<&ProgressMarker>) -> Vec<CatalogEntry> {
    let Some(marker) = progress.filter(|m| m.is_valid()) else {
        return Vec::new();
    };

    catalog
        .iter()
        .filter(|entry| entry.is_valid() && marker.permits(entry.week, entry.day))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, week: i64, day: i64) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            week,
            day,
            object_reference: format!("videos/{id}.mp4"),
            created_at: Utc::now(),
        }
    }

    fn marker(week: i64, day: i64) -> ProgressMarker {
        ProgressMarker {
            current_week: week,
            current_day: day,
        }
    }

    fn ids(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_unlocks_up_to_and_including_current_lesson() {
        let catalog = vec![entry("a", 1, 1), entry("b", 1, 3), entry("c", 2, 1)];

        let result = unlocked(&catalog, Some(&marker(1, 2)));
        assert_eq!(ids(&result), vec!["a"]);

        let result = unlocked(&catalog, Some(&marker(2, 1)));
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_membership_matches_lexicographic_order() {
        let catalog: Vec<CatalogEntry> = (1..=4)
            .flat_map(|w| (1..=7).map(move |d| entry(&format!("w{w}d{d}"), w, d)))
            .collect();

        for pw in 1..=4 {
            for pd in 1..=7 {
                let m = marker(pw, pd);
                let result = unlocked(&catalog, Some(&m));
                for e in &catalog {
                    let expected = (e.week, e.day) <= (pw, pd);
                    let included = result.iter().any(|r| r.id == e.id);
                    assert_eq!(
                        included, expected,
                        "entry ({},{}) against marker ({pw},{pd})",
                        e.week, e.day
                    );
                }
            }
        }
    }

    #[test]
    fn test_absent_or_invalid_marker_unlocks_nothing() {
        let catalog = vec![entry("a", 1, 1), entry("b", 2, 1)];

        assert!(unlocked(&catalog, None).is_empty());
        assert!(unlocked(&catalog, Some(&marker(0, 5))).is_empty());
        assert!(unlocked(&catalog, Some(&marker(2, -1))).is_empty());
    }

    #[test]
    fn test_invalid_catalog_rows_are_excluded() {
        let catalog = vec![
            entry("ok", 1, 1),
            entry("zero-week", 0, 3),
            entry("negative-day", 1, -1),
        ];

        let result = unlocked(&catalog, Some(&marker(9, 9)));
        assert_eq!(ids(&result), vec!["ok"]);
    }

    #[test]
    fn test_filter_is_stable_and_repeatable() {
        let catalog = vec![
            entry("first", 1, 2),
            entry("second", 1, 1),
            entry("twin-a", 1, 2),
            entry("twin-b", 1, 2),
        ];
        let m = marker(1, 2);

        let once = unlocked(&catalog, Some(&m));
        let twice = unlocked(&catalog, Some(&m));

        assert_eq!(ids(&once), vec!["first", "second", "twin-a", "twin-b"]);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_empty_catalog_yields_empty_view() {
        assert!(unlocked(&[], Some(&marker(3, 3))).is_empty());
    }
}
