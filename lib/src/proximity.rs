//! Course proximity: which of the user's saved courses is this position on?
//!
//! Simple radius test around one anchor point per course. The default
//! radius is kilometer-scale: it answers "which course am I probably at",
//! not anything shot-level.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, distance_meters};

/// Default in-range radius around a course anchor (m).
pub const DEFAULT_PROXIMITY_THRESHOLD_M: f64 = 1600.0;

/// One of the user's saved courses, as supplied by the course directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAnchor {
    pub course_id: String,
    pub display_name: String,
    pub coordinate: Coordinate,
}

/// Closest in-range course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCourse {
    pub course_id: String,
    pub distance_meters: f64,
}

/// Snapshot of a single classification. Not persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProximityResult {
    pub per_course_in_range: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest: Option<NearestCourse>,
}

impl ProximityResult {
    /// True when both results agree on the in-range set and the nearest
    /// course, ignoring how far away it is.
    pub fn same_course(&self, other: &ProximityResult) -> bool {
        self.per_course_in_range == other.per_course_in_range
            && self.nearest.as_ref().map(|n| &n.course_id)
                == other.nearest.as_ref().map(|n| &n.course_id)
    }

    pub fn nearest_course_id(&self) -> Option<&str> {
        self.nearest.as_ref().map(|n| n.course_id.as_str())
    }
}

/// Classify `position` against every anchor.
///
/// `nearest` is the in-range anchor with the smallest distance; on a tie the
/// earlier anchor in `anchors` wins. Anchors sharing a course id collapse to
/// one map entry that is in range if any of them is.
pub fn classify(
    position: &Coordinate,
    anchors: &[CourseAnchor],
    threshold_meters: f64,
) -> ProximityResult {
    let mut result = ProximityResult::default();

    for anchor in anchors {
        let distance = distance_meters(position, &anchor.coordinate);
        let in_range = distance <= threshold_meters;

        let entry = result
            .per_course_in_range
            .entry(anchor.course_id.clone())
            .or_insert(false);
        *entry |= in_range;

        if !in_range {
            continue;
        }
        let closer = match &result.nearest {
            Some(best) => distance < best.distance_meters,
            None => true,
        };
        if closer {
            result.nearest = Some(NearestCourse {
                course_id: anchor.course_id.clone(),
                distance_meters: distance,
            });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::destination;

    fn anchor(id: &str, coordinate: Coordinate) -> CourseAnchor {
        CourseAnchor {
            course_id: id.into(),
            display_name: format!("Course {id}"),
            coordinate,
        }
    }

    fn here() -> Coordinate {
        Coordinate::new(55.0209, -7.2479).unwrap()
    }

    #[test]
    fn empty_directory() {
        let r = classify(&here(), &[], DEFAULT_PROXIMITY_THRESHOLD_M);
        assert!(r.per_course_in_range.is_empty());
        assert!(r.nearest.is_none());
    }

    #[test]
    fn nearest_of_two_in_range() {
        let far = anchor("far", destination(&here(), 10.0, 800.0));
        let near = anchor("near", destination(&here(), 200.0, 500.0));
        let r = classify(&here(), &[far, near], DEFAULT_PROXIMITY_THRESHOLD_M);

        assert_eq!(r.per_course_in_range.get("far"), Some(&true));
        assert_eq!(r.per_course_in_range.get("near"), Some(&true));
        let nearest = r.nearest.unwrap();
        assert_eq!(nearest.course_id, "near");
        assert!((nearest.distance_meters - 500.0).abs() < 0.5);
    }

    #[test]
    fn none_in_range_still_reports_every_course() {
        let a = anchor("a", destination(&here(), 0.0, 5_000.0));
        let b = anchor("b", destination(&here(), 90.0, 1_601.0));
        let r = classify(&here(), &[a, b], DEFAULT_PROXIMITY_THRESHOLD_M);

        assert_eq!(r.per_course_in_range.len(), 2);
        assert!(r.per_course_in_range.values().all(|v| !v));
        assert!(r.nearest.is_none());
    }

    #[test]
    fn threshold_is_inclusive() {
        let at = anchor("edge", here());
        let r = classify(&here(), &[at], 0.0);
        assert_eq!(r.per_course_in_range.get("edge"), Some(&true));
        assert_eq!(r.nearest_course_id(), Some("edge"));
    }

    #[test]
    fn tie_goes_to_first_in_input_order() {
        let p = destination(&here(), 45.0, 300.0);
        let r = classify(
            &here(),
            &[anchor("first", p), anchor("second", p)],
            DEFAULT_PROXIMITY_THRESHOLD_M,
        );
        assert_eq!(r.nearest_course_id(), Some("first"));
    }

    #[test]
    fn same_course_ignores_distance() {
        let a = anchor("a", destination(&here(), 0.0, 300.0));
        let r1 = classify(&here(), std::slice::from_ref(&a), 1600.0);
        let moved = destination(&here(), 0.0, 50.0);
        let r2 = classify(&moved, std::slice::from_ref(&a), 1600.0);
        assert_ne!(r1, r2);
        assert!(r1.same_course(&r2));
    }
}
