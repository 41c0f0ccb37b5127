//! Floating images: session-only overlays that never enter the markup,
//! the history or saved templates. They only reach raster export.

use super::geometry::{Point, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest width or height a floating image can be resized to
pub const MIN_IMAGE_SIZE: f64 = 20.0;

/// Rotation applied per click
pub const ROTATION_STEP: u16 = 90;

/// Longest side of a freshly placed image
pub const DEFAULT_MAX_SIDE: f64 = 320.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FloatingImageId(u64);

impl FloatingImageId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FloatingImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AspectMode {
    #[default]
    Freeform,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectMode {
    /// Locked `(width, height)` proportion, `None` for freeform
    pub fn ratio(&self) -> Option<(f64, f64)> {
        match self {
            AspectMode::Freeform => None,
            AspectMode::Square => Some((1.0, 1.0)),
            AspectMode::Standard => Some((4.0, 3.0)),
            AspectMode::Wide => Some((16.0, 9.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatingImage {
    pub id: FloatingImageId,
    pub source: String,
    pub position: Point,
    pub size: Size,
    pub rotation_degrees: u16,
    pub natural_size: Size,
    pub aspect_mode: AspectMode,
}

/// New size after dragging the resize handle by `(dx, dy)` from `origin`.
/// In a fixed-ratio mode the axis with the larger absolute delta drives
/// the other.
pub fn resize_with_aspect(origin: Size, dx: f64, dy: f64, mode: AspectMode) -> Size {
    let Some((rw, rh)) = mode.ratio() else {
        return Size::new(
            (origin.width + dx).max(MIN_IMAGE_SIZE),
            (origin.height + dy).max(MIN_IMAGE_SIZE),
        );
    };
    let height_for = |width: f64| width * rh / rw;
    let width_for = |height: f64| height * rw / rh;

    let (mut width, mut height) = if dx.abs() >= dy.abs() {
        let width = origin.width + dx;
        (width, height_for(width))
    } else {
        let height = origin.height + dy;
        (width_for(height), height)
    };
    if width < MIN_IMAGE_SIZE {
        width = MIN_IMAGE_SIZE;
        height = height_for(width);
    }
    if height < MIN_IMAGE_SIZE {
        height = MIN_IMAGE_SIZE;
        width = width_for(height);
    }
    Size::new(width, height)
}

/// All floating images of a session
#[derive(Debug, Default)]
pub struct FloatingLayer {
    images: Vec<FloatingImage>,
    next_id: u64,
}

impl FloatingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an image, scaled down so its longest side fits
    /// `DEFAULT_MAX_SIDE`
    pub fn add(&mut self, source: impl Into<String>, natural_size: Size, position: Point) -> FloatingImageId {
        self.next_id += 1;
        let id = FloatingImageId(self.next_id);
        let longest = natural_size.width.max(natural_size.height);
        let scale = if longest > DEFAULT_MAX_SIDE {
            DEFAULT_MAX_SIDE / longest
        } else {
            1.0
        };
        let size = Size::new(
            (natural_size.width * scale).max(MIN_IMAGE_SIZE),
            (natural_size.height * scale).max(MIN_IMAGE_SIZE),
        );
        self.images.push(FloatingImage {
            id,
            source: source.into(),
            position,
            size,
            rotation_degrees: 0,
            natural_size,
            aspect_mode: AspectMode::Freeform,
        });
        id
    }

    pub fn get(&self, id: FloatingImageId) -> Option<&FloatingImage> {
        self.images.iter().find(|image| image.id == id)
    }

    pub fn get_mut(&mut self, id: FloatingImageId) -> Option<&mut FloatingImage> {
        self.images.iter_mut().find(|image| image.id == id)
    }

    pub fn remove(&mut self, id: FloatingImageId) -> Option<FloatingImage> {
        let index = self.images.iter().position(|image| image.id == id)?;
        Some(self.images.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FloatingImage> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// Rotate by one step, wrapping at 360
    pub fn rotate(&mut self, id: FloatingImageId) -> Option<u16> {
        let image = self.get_mut(id)?;
        image.rotation_degrees = (image.rotation_degrees + ROTATION_STEP) % 360;
        Some(image.rotation_degrees)
    }

    /// Switch aspect mode; fixed ratios refit the height to the width
    pub fn set_aspect_mode(&mut self, id: FloatingImageId, mode: AspectMode) -> bool {
        let Some(image) = self.get_mut(id) else {
            return false;
        };
        image.aspect_mode = mode;
        if mode.ratio().is_some() {
            image.size = resize_with_aspect(image.size, 0.0, 0.0, mode);
        }
        true
    }

    pub fn set_position(&mut self, id: FloatingImageId, position: Point) -> bool {
        match self.get_mut(id) {
            Some(image) => {
                image.position = position;
                true
            }
            None => false,
        }
    }

    pub fn set_size(&mut self, id: FloatingImageId, size: Size) -> bool {
        match self.get_mut(id) {
            Some(image) => {
                image.size = Size::new(size.width.max(MIN_IMAGE_SIZE), size.height.max(MIN_IMAGE_SIZE));
                true
            }
            None => false,
        }
    }

    /// Topmost image containing the point
    pub fn hit_test(&self, point: Point) -> Option<FloatingImageId> {
        self.images
            .iter()
            .rev()
            .find(|image| {
                point.x >= image.position.x
                    && point.x <= image.position.x + image.size.width
                    && point.y >= image.position.y
                    && point.y <= image.position.y + image.size.height
            })
            .map(|image| image.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freeform_min_size() {
        let size = resize_with_aspect(Size::new(100.0, 50.0), -200.0, 10.0, AspectMode::Freeform);
        assert_eq!(size, Size::new(MIN_IMAGE_SIZE, 60.0));
    }

    #[test]
    fn test_fixed_ratio_larger_delta_drives() {
        let size = resize_with_aspect(Size::new(160.0, 90.0), 32.0, 5.0, AspectMode::Wide);
        assert_eq!(size, Size::new(192.0, 108.0));

        let size = resize_with_aspect(Size::new(100.0, 100.0), 3.0, -40.0, AspectMode::Square);
        assert_eq!(size, Size::new(60.0, 60.0));
    }

    #[test]
    fn test_fixed_ratio_floor_keeps_ratio() {
        let size = resize_with_aspect(Size::new(40.0, 30.0), -100.0, 0.0, AspectMode::Standard);
        assert_eq!(size.height, MIN_IMAGE_SIZE);
        assert!((size.width / size.height - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_wraps() {
        let mut layer = FloatingLayer::new();
        let id = layer.add("logo.png", Size::new(64.0, 64.0), Point::default());
        let angles: Vec<u16> = (0..5).filter_map(|_| layer.rotate(id)).collect();
        assert_eq!(angles, vec![90, 180, 270, 0, 90]);
    }

    #[test]
    fn test_add_scales_large_images() {
        let mut layer = FloatingLayer::new();
        let id = layer.add("photo.jpg", Size::new(1280.0, 640.0), Point::new(5.0, 5.0));
        let image = layer.get(id).unwrap();
        assert_eq!(image.size, Size::new(320.0, 160.0));
        assert_eq!(layer.hit_test(Point::new(10.0, 10.0)), Some(id));
        assert!(layer.remove(id).is_some());
        assert!(layer.hit_test(Point::new(10.0, 10.0)).is_none());
    }
}
