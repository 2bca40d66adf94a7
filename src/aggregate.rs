//! Fusion of the per-class detection sets into per-frame flags and counts.
//!
//! The first box of the door set is the only door reference; same for
//! windows. Every person is tested against that reference and the flag is the
//! OR over people. An empty opening set or an empty people set means no test
//! is run and the flag stays false.

use crate::detect::{DetectionSet, ObjectClass};
use crate::proximity::{evaluate, ProximityResult, Tolerance};

/// Detection counts for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetectionCounts {
    pub people: usize,
    pub doors: usize,
    pub windows: usize,
}

/// Fused result for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregate {
    pub near_door: bool,
    pub near_window: bool,
    pub counts: DetectionCounts,
    /// One entry per person tested against the reference door.
    pub door_results: Vec<ProximityResult>,
    /// One entry per person tested against the reference window.
    pub window_results: Vec<ProximityResult>,
}

pub fn aggregate(
    people: &DetectionSet,
    doors: &DetectionSet,
    windows: &DetectionSet,
    tolerance: Tolerance,
) -> Aggregate {
    debug_assert_eq!(people.class(), ObjectClass::Person);

    let door_results = against_first(people, doors, tolerance);
    let window_results = against_first(people, windows, tolerance);

    Aggregate {
        near_door: door_results.iter().any(|r| r.is_near),
        near_window: window_results.iter().any(|r| r.is_near),
        counts: DetectionCounts {
            people: people.len(),
            doors: doors.len(),
            windows: windows.len(),
        },
        door_results,
        window_results,
    }
}

fn against_first(
    people: &DetectionSet,
    openings: &DetectionSet,
    tolerance: Tolerance,
) -> Vec<ProximityResult> {
    let Some(reference) = openings.first() else {
        return Vec::new();
    };
    people
        .iter()
        .map(|person| evaluate(person, reference, tolerance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn set(class: ObjectClass, boxes: &[(f32, f32, f32, f32)]) -> DetectionSet {
        DetectionSet::new(
            class,
            boxes
                .iter()
                .map(|&(a, b, c, d)| BoundingBox::new(a, b, c, d).with_label(class.as_str()))
                .collect(),
        )
    }

    #[test]
    fn no_people_means_no_proximity() {
        let agg = aggregate(
            &set(ObjectClass::Person, &[]),
            &set(ObjectClass::Door, &[(0.0, 0.0, 100.0, 100.0)]),
            &set(ObjectClass::Window, &[(0.0, 0.0, 100.0, 100.0)]),
            Tolerance::default(),
        );
        assert!(!agg.near_door);
        assert!(!agg.near_window);
        assert!(agg.door_results.is_empty());
        assert_eq!(agg.counts, DetectionCounts { people: 0, doors: 1, windows: 1 });
    }

    #[test]
    fn no_doors_means_not_near_door() {
        let agg = aggregate(
            &set(ObjectClass::Person, &[(10.0, 10.0, 20.0, 20.0)]),
            &set(ObjectClass::Door, &[]),
            &set(ObjectClass::Window, &[(0.0, 0.0, 100.0, 100.0)]),
            Tolerance::default(),
        );
        assert!(!agg.near_door);
        assert!(agg.near_window);
        assert!(agg.door_results.is_empty());
        assert_eq!(agg.window_results.len(), 1);
    }

    #[test]
    fn any_person_near_sets_flag() {
        let agg = aggregate(
            &set(
                ObjectClass::Person,
                &[(500.0, 500.0, 550.0, 550.0), (95.0, 95.0, 150.0, 150.0)],
            ),
            &set(ObjectClass::Door, &[(100.0, 100.0, 200.0, 200.0)]),
            &set(ObjectClass::Window, &[]),
            Tolerance::default(),
        );
        assert!(agg.near_door);
        assert_eq!(agg.door_results.len(), 2);
        assert!(!agg.door_results[0].is_near);
        assert!(agg.door_results[1].is_near);
    }

    #[test]
    fn only_first_opening_is_reference() {
        // Person touches the second door only.
        let agg = aggregate(
            &set(ObjectClass::Person, &[(395.0, 395.0, 450.0, 450.0)]),
            &set(
                ObjectClass::Door,
                &[(0.0, 0.0, 50.0, 50.0), (400.0, 400.0, 500.0, 500.0)],
            ),
            &set(ObjectClass::Window, &[]),
            Tolerance::default(),
        );
        assert!(!agg.near_door);
        assert_eq!(agg.counts.doors, 2);
    }

    #[test]
    fn tolerance_is_applied() -> crate::Result<()> {
        let people = set(ObjectClass::Person, &[(210.0, 150.0, 260.0, 180.0)]);
        let doors = set(ObjectClass::Door, &[(100.0, 100.0, 200.0, 200.0)]);
        let windows = set(ObjectClass::Window, &[]);
        assert!(!aggregate(&people, &doors, &windows, Tolerance::new(5.0)?).near_door);
        assert!(aggregate(&people, &doors, &windows, Tolerance::new(10.0)?).near_door);
        Ok(())
    }
}
