//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign,
{
    // Check that the dimentions match
    if point_0.len() != point_1.len() {
        return None;
    }

    let mut sum = T::zero();

    for (a, b) in point_0.iter().zip(point_1.iter()) {
        sum += (*a - *b).powi(2);
    }

    Some(sum.sqrt())
}

/// Returns true if every element of the slice is exactly zero.
///
/// An empty slice is all zero.
pub fn all_zero<T>(values: &[T]) -> bool
where
    T: Float,
{
    values.iter().all(|v| *v == T::zero())
}

/// Returns true if every element of the slice is finite (not NaN or infinite).
pub fn all_finite<T>(values: &[T]) -> bool
where
    T: Float,
{
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_norm() {
        assert_eq!(norm(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]), Some(5.0));
        assert_eq!(norm(&[1.0f64], &[1.0, 2.0]), None);
    }

    #[test]
    fn test_all_zero() {
        assert!(all_zero(&[0.0, -0.0, 0.0]));
        assert!(!all_zero(&[0.0, 1e-12]));
        assert!(all_zero::<f64>(&[]));
    }

    #[test]
    fn test_all_finite() {
        assert!(all_finite(&[1.0, -2.0, 0.0]));
        assert!(!all_finite(&[1.0, std::f64::NAN]));
        assert!(!all_finite(&[std::f64::INFINITY]));
    }
}
