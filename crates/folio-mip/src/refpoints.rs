//! Key-unique reference points for the square approximation.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// A set of sample x-coordinates deduplicated on `round(x)`.
///
/// Two points within 0.5 of the same integer collide, which keeps the
/// least-squares refinement loop from accumulating near-identical anchors
/// and bounds its iteration count by the number of integers in the
/// expression's range.
#[derive(Clone, Debug, Default)]
pub struct RefPoints {
    points: BTreeMap<i64, f64>,
}

impl RefPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `x` under its rounded key. Returns true iff the key was new;
    /// an occupied key keeps the point it already holds.
    pub fn insert(&mut self, x: f64) -> bool {
        match self.points.entry(x.round() as i64) {
            Entry::Vacant(slot) => {
                slot.insert(x);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Stored points in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_new_keys() {
        let mut points = RefPoints::new();
        assert!(points.is_empty());
        assert!(points.insert(1.0));
        assert!(points.insert(2.0));
        assert!(!points.insert(2.0));
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn nearby_points_collide_on_the_rounded_key() {
        let mut points = RefPoints::new();
        assert!(points.insert(1.4));
        assert!(!points.insert(0.6));
        assert!(!points.insert(1.2));
        // The first point under a key wins.
        assert_eq!(points.iter().collect::<Vec<_>>(), vec![1.4]);
    }

    #[test]
    fn iteration_is_ascending_by_key() {
        let mut points = RefPoints::new();
        points.insert(5.2);
        points.insert(-3.1);
        points.insert(0.0);
        assert_eq!(points.iter().collect::<Vec<_>>(), vec![-3.1, 0.0, 5.2]);
    }

    #[test]
    fn negative_points_round_toward_nearest_integer() {
        let mut points = RefPoints::new();
        assert!(points.insert(-1.4));
        assert!(!points.insert(-0.6));
        assert!(points.insert(-2.6));
    }
}
