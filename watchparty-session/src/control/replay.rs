use watchparty_core::{InputDescriptor, InputKind, Modifiers, StreamDimensions};

/// Size of the grantor's page in client pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Rounded to whole pixels, for announcing in a grant when no screen
    /// track reports its own size.
    pub fn to_dimensions(self) -> StreamDimensions {
        StreamDimensions::new(
            self.width.max(0.0).round() as u32,
            self.height.max(0.0).round() as u32,
        )
    }
}

/// Opaque handle to whatever element sits under a point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchTarget {
    Element(ElementRef),
    /// Nothing was hit; the event goes to the document itself.
    DocumentRoot,
}

/// A pointer or keyboard event ready to be injected on the grantor.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticEvent {
    pub kind: InputKind,
    pub client_x: f64,
    pub client_y: f64,
    /// The coordinates as sent, in stream pixels.
    pub stream_x: f64,
    pub stream_y: f64,
    pub button: Option<i16>,
    pub key: Option<String>,
    pub code: Option<String>,
    pub modifiers: Modifiers,
}

/// The grantor's page, as far as replay needs it. Only pointer and keyboard
/// events can be produced through this; nothing else is reachable.
pub trait ReplaySurface: Send + Sync + 'static {
    fn viewport(&self) -> Viewport;

    fn element_at(&self, client_x: f64, client_y: f64) -> Option<ElementRef>;

    fn dispatch(&self, target: DispatchTarget, event: SyntheticEvent);
}

/// A surface with a fixed viewport that swallows everything.
#[derive(Debug, Clone, Copy)]
pub struct NullSurface {
    viewport: Viewport,
}

impl NullSurface {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }
}

impl Default for NullSurface {
    fn default() -> Self {
        Self::new(Viewport::new(1920.0, 1080.0))
    }
}

impl ReplaySurface for NullSurface {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn element_at(&self, _client_x: f64, _client_y: f64) -> Option<ElementRef> {
        None
    }

    fn dispatch(&self, _target: DispatchTarget, _event: SyntheticEvent) {}
}

/// Map stream pixels onto the local viewport: `client = abs / grant * viewport`,
/// clamped to the viewport.
pub fn synthesize(
    descriptor: &InputDescriptor,
    grant: StreamDimensions,
    viewport: Viewport,
) -> SyntheticEvent {
    SyntheticEvent {
        kind: descriptor.kind,
        client_x: scale(descriptor.abs_x, grant.width, viewport.width),
        client_y: scale(descriptor.abs_y, grant.height, viewport.height),
        stream_x: descriptor.abs_x,
        stream_y: descriptor.abs_y,
        button: descriptor.button,
        key: descriptor.key.clone(),
        code: descriptor.code.clone(),
        modifiers: descriptor.modifiers.unwrap_or_default(),
    }
}

fn scale(abs: f64, span: u32, extent: f64) -> f64 {
    if span == 0 || !abs.is_finite() {
        return 0.0;
    }
    (abs / f64::from(span) * extent).clamp(0.0, extent.max(0.0))
}
