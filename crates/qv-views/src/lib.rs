//! View system for the query viewer
//!
//! Viewports present render targets, controls turn pointer gestures into
//! parameter changes and pan/zoom, and the browser keeps everything in sync
//! with a query set.

mod browser;
mod controls;
mod matrix;
mod viewport;

pub use browser::{Browser, BrowserOptions};
pub use controls::{
    snap_to_value, ControlMode, ControlsConfig, ControlsPhiTheta, EventResponse, InputEvent, PointerButton,
};
pub use matrix::{MatrixCellView, MatrixView};
pub use viewport::{ViewTransform, Viewport, ViewportEvent, ViewportId};
