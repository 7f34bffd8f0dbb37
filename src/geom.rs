use serde::{Deserialize, Serialize};

/// A pixel coordinate as reported by a text detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle. `min_*` is inclusive and `max_*` exclusive when painting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Rect {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    pub fn width(&self) -> u32 {
        self.max_x.abs_diff(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.abs_diff(self.min_y)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Intersection with a `width` x `height` canvas anchored at the origin.
    pub(crate) fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        let min_x = self.min_x.clamp(0, w);
        let min_y = self.min_y.clamp(0, h);
        let max_x = self.max_x.clamp(0, w);
        let max_y = self.max_y.clamp(0, h);
        if max_x <= min_x || max_y <= min_y {
            return None;
        }
        Some(Rect {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }
}

/// Minimal rectangle containing every point; `{0,0,0,0}` for no points.
pub fn bounding_box_of(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };
    points.iter().skip(1).fold(
        Rect {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        },
        |acc, p| Rect {
            min_x: acc.min_x.min(p.x),
            min_y: acc.min_y.min(p.y),
            max_x: acc.max_x.max(p.x),
            max_y: acc.max_y.max(p.y),
        },
    )
}
