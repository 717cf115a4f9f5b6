//! Round-robin cursor over the intent population.

use serde::Serialize;

/// Rotating pointer selecting which slice of the population a cycle visits.
///
/// Advances by `stride` modulo the population size after every cycle,
/// whatever the cycle's outcome, so coverage is round-robin over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cursor {
    position: u64,
    stride: u64,
}

impl Cursor {
    pub fn new(stride: u64) -> Self {
        Self {
            position: 0,
            stride: stride.max(1),
        }
    }

    pub const fn position(&self) -> u64 {
        self.position
    }

    pub const fn stride(&self) -> u64 {
        self.stride
    }

    /// Population indices for the current slice.
    ///
    /// Wraps around and never exceeds the population, so indices are
    /// distinct. Empty for an empty population.
    pub fn slice(&self, population: u64) -> Vec<u64> {
        if population == 0 {
            return Vec::new();
        }
        (0..self.stride.min(population))
            .map(|i| (self.position % population + i) % population)
            .collect()
    }

    /// Move to the next slice. No-op for an empty population.
    pub const fn advance(&mut self, population: u64) {
        if population == 0 {
            return;
        }
        self.position = (self.position % population + self.stride % population) % population;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_sequence() {
        let mut cursor = Cursor::new(1);
        let mut visited = vec![cursor.position()];
        for _ in 0..5 {
            cursor.advance(5);
            visited.push(cursor.position());
        }
        assert_eq!(visited, vec![0, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_slice_wraps() {
        let mut cursor = Cursor::new(3);
        cursor.advance(4);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.slice(4), vec![3, 0, 1]);
    }

    #[test]
    fn test_slice_capped_at_population() {
        let cursor = Cursor::new(u64::MAX);
        assert_eq!(cursor.slice(3), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_population() {
        let mut cursor = Cursor::new(2);
        assert!(cursor.slice(0).is_empty());
        cursor.advance(0);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_shrinking_population_stays_in_range() {
        let mut cursor = Cursor::new(1);
        for _ in 0..9 {
            cursor.advance(10);
        }
        assert_eq!(cursor.position(), 9);
        cursor.advance(3);
        assert!(cursor.position() < 3);
        assert!(cursor.slice(3).iter().all(|i| *i < 3));
    }

    #[test]
    fn test_zero_stride_clamped() {
        assert_eq!(Cursor::new(0).stride(), 1);
    }
}
