use eframe::egui;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    pub const ALL: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    /// Short name used in logs (`tl`, `tr`, `bl`, `br`).
    pub fn short_name(&self) -> &'static str {
        match self {
            Handle::TopLeft => "tl",
            Handle::TopRight => "tr",
            Handle::BottomLeft => "bl",
            Handle::BottomRight => "br",
        }
    }

    /// Corner of `rect` this handle sits on.
    pub fn corner_of(&self, rect: egui::Rect) -> egui::Pos2 {
        match self {
            Handle::TopLeft => rect.min,
            Handle::TopRight => egui::pos2(rect.max.x, rect.min.y),
            Handle::BottomLeft => egui::pos2(rect.min.x, rect.max.y),
            Handle::BottomRight => rect.max,
        }
    }
}

/// Size limits a crop rectangle must respect while being resized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropConstraints {
    pub min_width: f32,
    pub min_height: f32,
    /// Width divided by height, for fixed-aspect slots.
    pub aspect: Option<f32>,
}

/// Crop region in source-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn to_egui(&self) -> egui::Rect {
        egui::Rect::from_min_size(
            egui::pos2(self.x, self.y),
            egui::vec2(self.width, self.height),
        )
    }

    /// Applies a handle drag of `(dx, dy)` image pixels.
    ///
    /// Handles that move the origin keep the opposite edge fixed when the
    /// minimum size is reached, so the rectangle never drifts.
    pub fn resize(&mut self, handle: Handle, delta: egui::Vec2, constraints: &CropConstraints) {
        let right = self.right();
        let bottom = self.bottom();

        let (mut width, mut height) = match handle {
            Handle::TopLeft => (self.width - delta.x, self.height - delta.y),
            Handle::TopRight => (self.width + delta.x, self.height - delta.y),
            Handle::BottomLeft => (self.width - delta.x, self.height + delta.y),
            Handle::BottomRight => (self.width + delta.x, self.height + delta.y),
        };

        if let Some(ratio) = constraints.aspect {
            // Dominant axis drives, the other follows the ratio
            if delta.x.abs() >= delta.y.abs() {
                height = width / ratio;
            } else {
                width = height * ratio;
            }
        }

        width = width.max(constraints.min_width);
        height = height.max(constraints.min_height);
        if let Some(ratio) = constraints.aspect {
            // Growing one side to its minimum must drag the other along
            if width / height > ratio {
                height = width / ratio;
            } else {
                width = height * ratio;
            }
        }

        match handle {
            Handle::TopLeft => {
                self.x = right - width;
                self.y = bottom - height;
            }
            Handle::TopRight => {
                self.y = bottom - height;
            }
            Handle::BottomLeft => {
                self.x = right - width;
            }
            Handle::BottomRight => {}
        }
        self.width = width;
        self.height = height;
    }
}

pub fn hit_test(pos: egui::Pos2, rect: egui::Rect, tolerance: f32) -> Option<Handle> {
    Handle::ALL
        .into_iter()
        .find(|handle| pos.distance(handle.corner_of(rect)) < tolerance)
}
