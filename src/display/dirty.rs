//! Dirty region tracking
//!
//! Keeps the bounding box of every pixel written since the last flush so an
//! update only pushes that rectangle over the bus. The box only ever grows
//! within a cycle: sending a few unchanged pixels is cheap, leaving a changed
//! pixel out would leave stale content on the panel.
//!
//! # Verification Properties
//!
//! - While dirty, `x_low <= x_high` and `y_low <= y_high`
//! - Every marked point lies inside the box until `clear`
//! - A clipped rectangle never extends past the given extent

use verus_builtin_macros::verus;

verus! {

/// Axis-aligned rectangle: origin plus extent, extent never zero
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    /// Number of pixels covered
    pub fn area(&self) -> (result: u32)
        ensures
            result == self.w as u32 * self.h as u32,
    {
        self.w as u32 * self.h as u32
    }

    /// Rightmost column (inclusive)
    pub fn x_end(&self) -> (result: u16)
        requires
            self.w >= 1,
            self.x as int + self.w as int - 1 <= u16::MAX as int,
    {
        self.x + (self.w - 1)
    }

    /// Bottom row (inclusive)
    pub fn y_end(&self) -> (result: u16)
        requires
            self.h >= 1,
            self.y as int + self.h as int - 1 <= u16::MAX as int,
    {
        self.y + (self.h - 1)
    }
}

/// Bounding box of pixels modified since the last flush
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyRegion {
    dirty: bool,
    x_low: u16,
    y_low: u16,
    x_high: u16,
    y_high: u16,
}

impl DirtyRegion {
    /// Specification: the box is well formed
    pub open spec fn wf(&self) -> bool {
        self.dirty ==> (self.x_low <= self.x_high && self.y_low <= self.y_high && self.x_high < u16::MAX && self.y_high < u16::MAX)
    }

    /// Specification: a point lies inside the box
    pub open spec fn covers(&self, x: u16, y: u16) -> bool {
        self.dirty && self.x_low <= x <= self.x_high && self.y_low <= y <= self.y_high
    }

    /// Empty region
    pub fn new() -> (region: Self)
        ensures
            region.wf(),
            !region.dirty,
    {
        DirtyRegion { dirty: false, x_low: 0, y_low: 0, x_high: 0, y_high: 0 }
    }

    /// Nothing written since the last clear
    pub fn is_empty(&self) -> (result: bool)
        ensures
            result == !self.dirty,
    {
        !self.dirty
    }

    /// Grow the box to include `(x, y)`.
    ///
    /// `u16::MAX` is outside every panel and is ignored.
    pub fn mark(&mut self, x: u16, y: u16)
        requires
            old(self).wf(),
        ensures
            self.wf(),
            (x < u16::MAX && y < u16::MAX) ==> self.covers(x, y),
    {
        if x == u16::MAX || y == u16::MAX {
            return;
        }
        if self.dirty {
            if x < self.x_low {
                self.x_low = x;
            }
            if y < self.y_low {
                self.y_low = y;
            }
            if x > self.x_high {
                self.x_high = x;
            }
            if y > self.y_high {
                self.y_high = y;
            }
        } else {
            self.dirty = true;
            self.x_low = x;
            self.y_low = y;
            self.x_high = x;
            self.y_high = y;
        }
    }

    /// Mark the whole `width × height` area in one step
    pub fn mark_all(&mut self, width: u16, height: u16)
        requires
            old(self).wf(),
        ensures
            self.wf(),
    {
        if width == 0 || height == 0 {
            return;
        }
        self.dirty = true;
        self.x_low = 0;
        self.y_low = 0;
        self.x_high = width - 1;
        self.y_high = height - 1;
    }

    /// Reset to empty
    pub fn clear(&mut self)
        ensures
            self.wf(),
            !self.dirty,
    {
        self.dirty = false;
        self.x_low = 0;
        self.y_low = 0;
        self.x_high = 0;
        self.y_high = 0;
    }

    /// Inclusive corners `(x_low, y_low, x_high, y_high)`
    pub fn bounds(&self) -> (result: Option<(u16, u16, u16, u16)>)
        ensures
            result.is_some() == self.dirty,
    {
        if self.dirty {
            Some((self.x_low, self.y_low, self.x_high, self.y_high))
        } else {
            None
        }
    }

    /// The box as origin plus extent
    pub fn rect(&self) -> (result: Option<Rect>)
        requires
            self.wf(),
        ensures
            result.is_some() == self.dirty,
    {
        if self.dirty {
            Some(Rect {
                x: self.x_low,
                y: self.y_low,
                w: self.x_high - self.x_low + 1,
                h: self.y_high - self.y_low + 1,
            })
        } else {
            None
        }
    }

    /// The box clipped to `[0, width) × [0, height)`.
    ///
    /// `None` when nothing is dirty or nothing is left after clipping.
    pub fn clipped(&self, width: u16, height: u16) -> (result: Option<Rect>)
        requires
            self.wf(),
        ensures
            result.is_some() ==> (result.unwrap().w >= 1 && result.unwrap().h >= 1
                && result.unwrap().x as int + result.unwrap().w as int <= width as int
                && result.unwrap().y as int + result.unwrap().h as int <= height as int),
    {
        if !self.dirty || width == 0 || height == 0 {
            return None;
        }
        let x_high = if self.x_high < width - 1 { self.x_high } else { width - 1 };
        let y_high = if self.y_high < height - 1 { self.y_high } else { height - 1 };
        if self.x_low > x_high || self.y_low > y_high {
            return None;
        }
        Some(Rect {
            x: self.x_low,
            y: self.y_low,
            w: x_high - self.x_low + 1,
            h: y_high - self.y_low + 1,
        })
    }
}

} // verus!

impl Default for DirtyRegion {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_region_is_empty() {
        let region = DirtyRegion::new();
        assert!(region.is_empty());
        assert_eq!(region.rect(), None);
        assert_eq!(region.bounds(), None);
    }

    #[test]
    fn test_single_mark_is_one_pixel() {
        let mut region = DirtyRegion::new();
        region.mark(5, 5);
        assert_eq!(region.rect(), Some(Rect { x: 5, y: 5, w: 1, h: 1 }));
    }

    #[test]
    fn test_marks_accumulate_to_bounding_box() {
        let mut region = DirtyRegion::new();
        let points = [(7, 3), (2, 9), (4, 4), (12, 1)];
        for (x, y) in points {
            region.mark(x, y);
        }
        assert_eq!(region.bounds(), Some((2, 1, 12, 9)));
        assert_eq!(region.rect(), Some(Rect { x: 2, y: 1, w: 11, h: 9 }));
    }

    #[test]
    fn test_marking_inside_never_shrinks() {
        let mut region = DirtyRegion::new();
        region.mark(0, 0);
        region.mark(10, 10);
        region.mark(5, 5);
        assert_eq!(region.rect(), Some(Rect { x: 0, y: 0, w: 11, h: 11 }));
    }

    #[test]
    fn test_clear_resets() {
        let mut region = DirtyRegion::new();
        region.mark(3, 4);
        region.clear();
        assert!(region.is_empty());
        region.mark(8, 8);
        assert_eq!(region.rect(), Some(Rect { x: 8, y: 8, w: 1, h: 1 }));
    }

    #[test]
    fn test_mark_all_covers_extent() {
        let mut region = DirtyRegion::new();
        region.mark(3, 3);
        region.mark_all(480, 320);
        assert_eq!(region.rect(), Some(Rect { x: 0, y: 0, w: 480, h: 320 }));

        let mut empty = DirtyRegion::new();
        empty.mark_all(0, 320);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_clipped_trims_to_extent() {
        let mut region = DirtyRegion::new();
        region.mark(10, 10);
        region.mark(500, 400);
        assert_eq!(region.clipped(480, 320), Some(Rect { x: 10, y: 10, w: 470, h: 310 }));
    }

    #[test]
    fn test_clipped_outside_extent_is_none() {
        // e.g. after a rotation shrank the visible width
        let mut region = DirtyRegion::new();
        region.mark(400, 10);
        assert_eq!(region.clipped(320, 480), None);
        assert_eq!(DirtyRegion::new().clipped(320, 480), None);
    }

    #[test]
    fn test_max_coordinate_is_ignored() {
        let mut region = DirtyRegion::new();
        region.mark(u16::MAX, 0);
        assert!(region.is_empty());
    }

    #[test]
    fn test_rect_helpers() {
        let rect = Rect { x: 2, y: 3, w: 4, h: 5 };
        assert_eq!(rect.area(), 20);
        assert_eq!(rect.x_end(), 5);
        assert_eq!(rect.y_end(), 7);
    }
}
