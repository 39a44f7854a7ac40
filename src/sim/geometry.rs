//! Axis-aligned rectangles
//!
//! Everything in the world is a box in screen-down coordinates: `pos` is the
//! top-left corner and `y` grows toward the floor.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::rects_overlap;

/// An axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.pos.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.pos.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.pos.x + self.size.x / 2.0
    }

    /// Strict overlap (shared edges don't count)
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        rects_overlap(self.pos, self.size, other.pos, other.size)
    }

    /// Overlap after inflating the gap test by `margin` on every side.
    ///
    /// Two boxes closer than `margin` count as overlapping; exactly `margin`
    /// apart still counts (the gap must be strictly larger).
    pub fn overlaps_with_margin(&self, other: &Rect, margin: f32) -> bool {
        !(self.right() + margin < other.left()
            || self.left() > other.right() + margin
            || self.bottom() + margin < other.top()
            || self.top() > other.bottom() + margin)
    }

    /// Whether any part of the box is still ahead of `limit_x`
    #[inline]
    pub fn reaches_past(&self, limit_x: f32) -> bool {
        self.right() > limit_x
    }
}
