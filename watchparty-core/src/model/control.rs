use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    #[serde(rename = "mousemove")]
    MouseMove,
    #[serde(rename = "click")]
    Click,
    #[serde(rename = "keydown")]
    KeyDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt || self.meta)
    }
}

/// Pixel size of the shared stream, announced by the grantor in `control-grant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDimensions {
    pub width: u32,
    pub height: u32,
}

impl StreamDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scale a normalized point into stream pixel space.
    pub fn to_absolute(&self, point: NormalizedPoint) -> (f64, f64) {
        (
            point.x * f64::from(self.width),
            point.y * f64::from(self.height),
        )
    }
}

/// A point expressed as fractions of the shared video, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub const CENTER: NormalizedPoint = NormalizedPoint { x: 0.5, y: 0.5 };

    /// Clamps both axes into range; NaN collapses to zero.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Normalize viewer-side client coordinates against the rendered video.
    ///
    /// The element usually letterboxes the stream, so the point is measured
    /// against the content box that the intrinsic size occupies inside
    /// `element`, not against the element itself.
    pub fn within_video(
        client_x: f64,
        client_y: f64,
        element: VideoRect,
        intrinsic: StreamDimensions,
    ) -> Self {
        let content = element.content_box(intrinsic);
        if content.width <= 0.0 || content.height <= 0.0 {
            return Self::new(0.0, 0.0);
        }
        Self::new(
            (client_x - content.left) / content.width,
            (client_y - content.top) / content.height,
        )
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Layout box of the video element on the viewer's page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl VideoRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Area actually covered by frames of `intrinsic` size under contain-fit.
    pub fn content_box(&self, intrinsic: StreamDimensions) -> VideoRect {
        if intrinsic.width == 0 || intrinsic.height == 0 {
            return *self;
        }
        let scale = (self.width / f64::from(intrinsic.width))
            .min(self.height / f64::from(intrinsic.height));
        let width = f64::from(intrinsic.width) * scale;
        let height = f64::from(intrinsic.height) * scale;
        VideoRect {
            left: self.left + (self.width - width) / 2.0,
            top: self.top + (self.height - height) / 2.0,
            width,
            height,
        }
    }
}

/// `control-event` payload: one input event in stream pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub abs_x: f64,
    pub abs_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<Modifiers>,
}

/// Input captured on the granted viewer, before scaling to any grantor's stream.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedInput {
    pub kind: InputKind,
    /// Keyboard events carry no position of their own.
    pub position: Option<NormalizedPoint>,
    pub button: Option<i16>,
    pub key: Option<String>,
    pub code: Option<String>,
    pub modifiers: Modifiers,
}

impl CapturedInput {
    pub fn pointer_move(position: NormalizedPoint) -> Self {
        Self {
            kind: InputKind::MouseMove,
            position: Some(position),
            button: None,
            key: None,
            code: None,
            modifiers: Modifiers::default(),
        }
    }

    pub fn click(position: NormalizedPoint, button: i16) -> Self {
        Self {
            kind: InputKind::Click,
            position: Some(position),
            button: Some(button),
            key: None,
            code: None,
            modifiers: Modifiers::default(),
        }
    }

    pub fn key_down(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            kind: InputKind::KeyDown,
            position: None,
            button: None,
            key: Some(key.into()),
            code: Some(code.into()),
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Serialize for one grantor. `fallback` positions events that carry none.
    pub fn to_descriptor(
        &self,
        dims: StreamDimensions,
        fallback: NormalizedPoint,
    ) -> InputDescriptor {
        let (abs_x, abs_y) = dims.to_absolute(self.position.unwrap_or(fallback));
        InputDescriptor {
            kind: self.kind,
            abs_x,
            abs_y,
            button: self.button,
            key: self.key.clone(),
            code: self.code.clone(),
            modifiers: (!self.modifiers.is_empty()).then_some(self.modifiers),
        }
    }
}
