pub mod controller;
pub mod state;
pub mod surface;

pub use controller::{OverlayController, OverlaySnapshot};
pub use state::{format_remaining, OverlayPhase, OverlayState};
pub use surface::{OverlaySurface, RecordingSurface, SurfaceEvent};
