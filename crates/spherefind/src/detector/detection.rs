use crate::sphere::SphereFit;

use super::window::Window;

/// An accepted sphere: the window it was found in plus the verified fit.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Detection {
    /// Extraction window in grid coordinates.
    pub window: Window,
    /// Verified sphere.
    pub fit: SphereFit,
}

impl Detection {
    /// Sphere center (metres).
    pub fn center(&self) -> [f64; 3] {
        self.fit.center
    }

    /// Sphere radius (metres).
    pub fn radius(&self) -> f64 {
        self.fit.radius
    }

    /// Fitness ratio.
    pub fn ratio(&self) -> f64 {
        self.fit.ratio
    }
}
