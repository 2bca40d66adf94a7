//! Person/opening adjacency.
//!
//! The target box is grown by a pixel tolerance on every side. A subject is
//! near the target when at least one of its four corners lies inside the grown
//! rectangle, bounds inclusive. Overlap without a contained corner (e.g. a
//! subject crossing the whole target) does not count.
//!
//! The relation is always read as "is this person near this opening": subject
//! is the person box, target is the door or window box.

use crate::detect::BoundingBox;
use crate::error::{Error, Result};

/// Default tolerance in pixels.
pub const DEFAULT_EPSILON: f32 = 5.0;

/// Validated pixel tolerance: finite and non-negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance(f32);

impl Tolerance {
    pub fn new(epsilon: f32) -> Result<Self> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(Error::config(format!(
                "proximity epsilon must be finite and >= 0, got {}",
                epsilon
            )));
        }
        Ok(Self(epsilon))
    }

    pub fn pixels(&self) -> f32 {
        self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(DEFAULT_EPSILON)
    }
}

/// Outcome of one subject/target test.
#[derive(Clone, Debug, PartialEq)]
pub struct ProximityResult {
    pub subject: BoundingBox,
    pub target: BoundingBox,
    pub tolerance: f32,
    pub is_near: bool,
}

/// True if any corner of `subject` falls inside `target` grown by `epsilon`.
///
/// Both boxes must satisfy the ordering invariant.
pub fn is_near(subject: &BoundingBox, target: &BoundingBox, epsilon: f32) -> bool {
    let zone = target.expanded(epsilon);
    subject
        .corners()
        .iter()
        .any(|&(x, y)| zone.contains_point(x, y))
}

pub fn evaluate(
    subject: &BoundingBox,
    target: &BoundingBox,
    tolerance: Tolerance,
) -> ProximityResult {
    ProximityResult {
        subject: subject.clone(),
        target: target.clone(),
        tolerance: tolerance.pixels(),
        is_near: is_near(subject, target, tolerance.pixels()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx(x0: f32, y0: f32, x1: f32, y1: f32) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1)
    }

    #[test]
    fn corner_on_expanded_edge_is_near() {
        let target = bx(100.0, 100.0, 200.0, 200.0);
        assert!(is_near(&bx(95.0, 95.0, 150.0, 150.0), &target, 5.0));
    }

    #[test]
    fn distant_subject_is_not_near() {
        let target = bx(100.0, 100.0, 200.0, 200.0);
        assert!(!is_near(&bx(300.0, 300.0, 350.0, 350.0), &target, 5.0));
    }

    #[test]
    fn contained_subject_is_near_for_any_epsilon() {
        let target = bx(100.0, 100.0, 200.0, 200.0);
        let inner = bx(120.0, 130.0, 180.0, 190.0);
        for eps in [0.0, 0.5, 5.0, 1000.0] {
            assert!(is_near(&inner, &target, eps), "epsilon {eps}");
        }
        assert!(is_near(&target, &target, 0.0));
    }

    #[test]
    fn each_corner_alone_is_enough() {
        let target = bx(100.0, 100.0, 200.0, 200.0);
        // top-left, top-right, bottom-left, bottom-right inside respectively
        assert!(is_near(&bx(198.0, 198.0, 260.0, 260.0), &target, 0.0));
        assert!(is_near(&bx(40.0, 198.0, 102.0, 260.0), &target, 0.0));
        assert!(is_near(&bx(198.0, 40.0, 260.0, 102.0), &target, 0.0));
        assert!(is_near(&bx(40.0, 40.0, 102.0, 102.0), &target, 0.0));
    }

    #[test]
    fn just_outside_tolerance_is_not_near() {
        let target = bx(100.0, 100.0, 200.0, 200.0);
        assert!(!is_near(&bx(205.5, 150.0, 260.0, 180.0), &target, 5.0));
        assert!(is_near(&bx(205.0, 150.0, 260.0, 180.0), &target, 5.0));
        assert!(!is_near(&bx(150.0, 40.0, 180.0, 94.0), &target, 5.0));
    }

    #[test]
    fn spanning_subject_without_inner_corner_is_not_near() {
        let target = bx(100.0, 100.0, 200.0, 200.0);
        assert!(!is_near(&bx(50.0, 50.0, 250.0, 250.0), &target, 5.0));
    }

    #[test]
    fn relation_is_not_symmetric() {
        let small = bx(140.0, 140.0, 160.0, 160.0);
        let large = bx(50.0, 50.0, 250.0, 250.0);
        assert!(is_near(&small, &large, 0.0));
        assert!(!is_near(&large, &small, 0.0));
    }

    #[test]
    fn evaluate_records_inputs() -> Result<()> {
        let target = bx(100.0, 100.0, 200.0, 200.0);
        let subject = bx(95.0, 95.0, 150.0, 150.0);
        let result = evaluate(&subject, &target, Tolerance::new(5.0)?);
        assert!(result.is_near);
        assert_eq!(result.tolerance, 5.0);
        assert_eq!(result.subject, subject);
        assert_eq!(result.target, target);
        Ok(())
    }

    #[test]
    fn tolerance_rejects_negative_and_nan() {
        assert!(Tolerance::new(-1.0).is_err());
        assert!(Tolerance::new(f32::NAN).is_err());
        assert!(Tolerance::new(f32::INFINITY).is_err());
        assert_eq!(Tolerance::new(0.0).map(|t| t.pixels()).ok(), Some(0.0));
        assert_eq!(Tolerance::default().pixels(), DEFAULT_EPSILON);
    }
}
