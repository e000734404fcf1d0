//! Bounding-box edit geometry.
//!
//! Pure rectangle math for the 8-handle box editor: handle hit-testing,
//! full-box moves, anchor-preserving resizes with a minimum-size floor, and
//! the rubber-band rectangle used when drawing a new box.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum width and height of a committed box, in image pixels.
pub const MIN_BOX_SIZE: f64 = 20.0;

/// Half-width of the square window around a handle center that counts as a hit.
pub const HANDLE_TOLERANCE: f64 = 16.0;

/// A freshly drawn box must exceed this size on both axes to be kept.
pub const MIN_DRAFT_SIZE: f64 = 5.0;

// ---------------------------------------------------------------------------
// BoundingBox
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build the normalised rectangle spanned by two arbitrary corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Inclusive containment test (points on the border are inside).
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Grow width/height up to [`MIN_BOX_SIZE`], keeping the top-left corner.
    pub fn with_min_size(&self) -> Self {
        Self {
            width: self.width.max(MIN_BOX_SIZE),
            height: self.height.max(MIN_BOX_SIZE),
            ..*self
        }
    }

    /// Centers of the 8 resize handles, in hit-test priority order.
    pub fn handle_points(&self) -> [(Handle, f64, f64); 8] {
        let cx = self.x + self.width / 2.0;
        let cy = self.y + self.height / 2.0;
        [
            (Handle::NorthWest, self.x, self.y),
            (Handle::North, cx, self.y),
            (Handle::NorthEast, self.right(), self.y),
            (Handle::East, self.right(), cy),
            (Handle::SouthEast, self.right(), self.bottom()),
            (Handle::South, cx, self.bottom()),
            (Handle::SouthWest, self.x, self.bottom()),
            (Handle::West, self.x, cy),
        ]
    }
}

/// Reject boxes that are not finite or fall below the minimum size.
pub fn validate_box(bbox: &BoundingBox) -> Result<(), CoreError> {
    let values = [bbox.x, bbox.y, bbox.width, bbox.height];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(CoreError::Validation(
            "bounding box coordinates must be finite numbers".to_string(),
        ));
    }
    if bbox.width < MIN_BOX_SIZE || bbox.height < MIN_BOX_SIZE {
        return Err(CoreError::Validation(format!(
            "bounding box must be at least {MIN_BOX_SIZE}x{MIN_BOX_SIZE} px, got {}x{}",
            bbox.width, bbox.height
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handles and edit modes
// ---------------------------------------------------------------------------

/// One of the 8 directional resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Handle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "n",
            Self::South => "s",
            Self::East => "e",
            Self::West => "w",
            Self::NorthEast => "ne",
            Self::NorthWest => "nw",
            Self::SouthEast => "se",
            Self::SouthWest => "sw",
        }
    }

    fn moves_top(&self) -> bool {
        matches!(self, Self::North | Self::NorthEast | Self::NorthWest)
    }

    fn moves_bottom(&self) -> bool {
        matches!(self, Self::South | Self::SouthEast | Self::SouthWest)
    }

    fn moves_left(&self) -> bool {
        matches!(self, Self::West | Self::NorthWest | Self::SouthWest)
    }

    fn moves_right(&self) -> bool {
        matches!(self, Self::East | Self::NorthEast | Self::SouthEast)
    }
}

/// What a pointer drag on a selected box does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditMode {
    Move,
    Resize(Handle),
}

const VALID_MODE_STRINGS: &[&str] = &[
    "move",
    "resize-n",
    "resize-s",
    "resize-e",
    "resize-w",
    "resize-ne",
    "resize-nw",
    "resize-se",
    "resize-sw",
];

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Resize(Handle::North) => "resize-n",
            Self::Resize(Handle::South) => "resize-s",
            Self::Resize(Handle::East) => "resize-e",
            Self::Resize(Handle::West) => "resize-w",
            Self::Resize(Handle::NorthEast) => "resize-ne",
            Self::Resize(Handle::NorthWest) => "resize-nw",
            Self::Resize(Handle::SouthEast) => "resize-se",
            Self::Resize(Handle::SouthWest) => "resize-sw",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        let handle = match s {
            "move" => return Ok(Self::Move),
            "resize-n" => Handle::North,
            "resize-s" => Handle::South,
            "resize-e" => Handle::East,
            "resize-w" => Handle::West,
            "resize-ne" => Handle::NorthEast,
            "resize-nw" => Handle::NorthWest,
            "resize-se" => Handle::SouthEast,
            "resize-sw" => Handle::SouthWest,
            _ => {
                return Err(CoreError::Validation(format!(
                    "Invalid edit mode '{s}'. Must be one of: {}",
                    VALID_MODE_STRINGS.join(", ")
                )))
            }
        };
        Ok(Self::Resize(handle))
    }
}

/// Decide which interaction a pointer-down at `(px, py)` starts on `bbox`.
///
/// Handles win over the box body; a point outside both yields `None`.
pub fn hit_test(bbox: &BoundingBox, px: f64, py: f64) -> Option<EditMode> {
    let handle = bbox.handle_points().into_iter().find(|(_, hx, hy)| {
        (px - hx).abs() <= HANDLE_TOLERANCE && (py - hy).abs() <= HANDLE_TOLERANCE
    });
    match handle {
        Some((handle, _, _)) => Some(EditMode::Resize(handle)),
        None if bbox.contains(px, py) => Some(EditMode::Move),
        None => None,
    }
}

// ---------------------------------------------------------------------------
// Edit math
// ---------------------------------------------------------------------------

/// Resize `original` by a pointer displacement, keeping the edges opposite to
/// `handle` fixed at their original absolute position.
pub fn resize(original: &BoundingBox, handle: Handle, dx: f64, dy: f64) -> BoundingBox {
    let mut next = *original;

    if handle.moves_top() {
        let (y, height) = move_leading_edge(original.y, original.bottom(), dy);
        next.y = y;
        next.height = height;
    }
    if handle.moves_bottom() {
        next.height = (original.height + dy).max(MIN_BOX_SIZE);
    }
    if handle.moves_left() {
        let (x, width) = move_leading_edge(original.x, original.right(), dx);
        next.x = x;
        next.width = width;
    }
    if handle.moves_right() {
        next.width = (original.width + dx).max(MIN_BOX_SIZE);
    }

    next
}

/// Move a top/left edge by `delta` against a fixed far edge.
fn move_leading_edge(start: f64, fixed_end: f64, delta: f64) -> (f64, f64) {
    let moved = start + delta;
    let extent = fixed_end - moved;
    if extent >= MIN_BOX_SIZE {
        (moved, extent)
    } else {
        (fixed_end - MIN_BOX_SIZE, MIN_BOX_SIZE)
    }
}

/// Apply an edit mode to `original` for a displacement `(dx, dy)`.
pub fn apply_edit(original: &BoundingBox, mode: EditMode, dx: f64, dy: f64) -> BoundingBox {
    match mode {
        EditMode::Move => original.translated(dx, dy),
        EditMode::Resize(handle) => resize(original, handle, dx, dy),
    }
}

/// In-progress move/resize of one box.
///
/// Holds the box as it was at pointer-down plus the pointer anchor; every
/// intermediate position is derived from those, so previews never accumulate
/// drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxEdit {
    pub original: BoundingBox,
    pub mode: EditMode,
    pub anchor: (f64, f64),
}

impl BoxEdit {
    pub fn new(original: BoundingBox, mode: EditMode, anchor_x: f64, anchor_y: f64) -> Self {
        Self {
            original,
            mode,
            anchor: (anchor_x, anchor_y),
        }
    }

    /// Start an edit if the pointer hits the box or one of its handles.
    pub fn begin(bbox: BoundingBox, px: f64, py: f64) -> Option<Self> {
        hit_test(&bbox, px, py).map(|mode| Self::new(bbox, mode, px, py))
    }

    /// Box geometry for the pointer currently at `(px, py)`.
    pub fn box_at(&self, px: f64, py: f64) -> BoundingBox {
        apply_edit(
            &self.original,
            self.mode,
            px - self.anchor.0,
            py - self.anchor.1,
        )
    }
}

// ---------------------------------------------------------------------------
// Drawing a new box
// ---------------------------------------------------------------------------

/// Rubber-band rectangle for a box being drawn from scratch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DraftBox {
    start: (f64, f64),
    current: BoundingBox,
}

impl DraftBox {
    pub fn start(x: f64, y: f64) -> Self {
        Self {
            start: (x, y),
            current: BoundingBox::new(x, y, 0.0, 0.0),
        }
    }

    pub fn update(&mut self, x: f64, y: f64) -> BoundingBox {
        self.current = BoundingBox::from_corners(self.start.0, self.start.1, x, y);
        self.current
    }

    pub fn current(&self) -> BoundingBox {
        self.current
    }

    /// Finish the drag. Boxes not larger than [`MIN_DRAFT_SIZE`] on both
    /// axes are discarded.
    pub fn finish(self) -> Option<BoundingBox> {
        let b = self.current;
        (b.width > MIN_DRAFT_SIZE && b.height > MIN_DRAFT_SIZE).then_some(b)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
