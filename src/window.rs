//! An axis-aligned integer pixel rectangle (spec 3 "Window"), the unit the Read Planner (4.D)
//! slices into tile-grid coordinates.
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub col_off: i64,
    pub row_off: i64,
    pub width: i64,
    pub height: i64,
}

impl Window {
    pub fn new(col_off: i64, row_off: i64, width: i64, height: i64) -> Result<Window, Error> {
        if col_off < 0 || row_off < 0 {
            return Err(Error::WindowError(format!(
                "window offsets must be >= 0, got col_off={}, row_off={}",
                col_off, row_off
            )));
        }
        if width <= 0 || height <= 0 {
            return Err(Error::WindowError(format!(
                "window dimensions must be > 0, got width={}, height={}",
                width, height
            )));
        }
        Ok(Window {
            col_off,
            row_off,
            width,
            height,
        })
    }

    pub fn col_stop(&self) -> i64 {
        self.col_off + self.width
    }

    pub fn row_stop(&self) -> i64 {
        self.row_off + self.height
    }

    /// The overlap between two windows. Fails iff they do not overlap (spec 8, testable property
    /// 5: commutative and idempotent over equal inputs).
    pub fn intersection(&self, other: &Window) -> Result<Window, Error> {
        let col_off = self.col_off.max(other.col_off);
        let row_off = self.row_off.max(other.row_off);
        let col_stop = self.col_stop().min(other.col_stop());
        let row_stop = self.row_stop().min(other.row_stop());
        if col_stop <= col_off || row_stop <= row_off {
            return Err(Error::WindowError(format!(
                "windows do not overlap: {:?} vs {:?}",
                self, other
            )));
        }
        Window::new(col_off, row_off, col_stop - col_off, row_stop - row_off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_negative_offsets_and_nonpositive_size() {
        assert!(Window::new(-1, 0, 10, 10).is_err());
        assert!(Window::new(0, -1, 10, 10).is_err());
        assert!(Window::new(0, 0, 0, 10).is_err());
        assert!(Window::new(0, 0, 10, 0).is_err());
        assert!(Window::new(0, 0, 10, 10).is_ok());
    }

    #[test]
    fn test_intersection_overlapping() {
        let a = Window::new(0, 0, 10, 10).unwrap();
        let b = Window::new(5, 5, 10, 10).unwrap();
        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap, Window::new(5, 5, 5, 5).unwrap());
    }

    #[test]
    fn test_intersection_is_commutative_and_idempotent() {
        let a = Window::new(0, 0, 10, 10).unwrap();
        let b = Window::new(5, 5, 10, 10).unwrap();
        assert_eq!(a.intersection(&b).unwrap(), b.intersection(&a).unwrap());
        assert_eq!(a.intersection(&a).unwrap(), a);
    }

    #[test]
    fn test_intersection_fails_when_disjoint() {
        let a = Window::new(0, 0, 5, 5).unwrap();
        let b = Window::new(10, 10, 5, 5).unwrap();
        assert!(a.intersection(&b).is_err());
    }

    #[test]
    fn test_intersection_touching_edges_is_disjoint() {
        let a = Window::new(0, 0, 5, 5).unwrap();
        let b = Window::new(5, 0, 5, 5).unwrap();
        assert!(a.intersection(&b).is_err());
    }
}
