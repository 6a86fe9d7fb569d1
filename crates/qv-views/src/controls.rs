//! Pointer controls for a phi/theta camera model
//!
//! Dragging with the secondary button rotates the camera by stepping the
//! `theta` and `phi` parameters through their sampled values; dragging with
//! the primary button pans the viewport and the wheel zooms it. Every
//! gesture requires the modifier key.

use std::sync::Arc;
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};

use qv_core::{ParamValue, Parameter, QuerySet};

use crate::Viewport;

/// Tuning of the pointer controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Parameter units per pixel of drag while rotating
    pub rotation_sensitivity: f64,
    /// Relative scale change per wheel step
    pub zoom_factor: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            rotation_sensitivity: 0.4,
            zoom_factor: 0.1,
        }
    }
}

/// Current gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    Idle,
    Rotating,
    Panning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Input delivered by the viewport. Coordinates are viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f32, y: f32, button: PointerButton, modifier: bool },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    PointerLeave,
    Wheel { x: f32, y: f32, delta_y: f32, modifier: bool },
    ContextMenu,
}

/// Whether the controls handled an event (and suppressed its default action)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    Ignored,
    Consumed,
}

/// The value of `values` numerically closest to `v`; the first one wins ties.
/// Non-numeric values are skipped.
pub fn snap_to_value(v: f64, values: &[ParamValue]) -> Option<&ParamValue> {
    let mut best: Option<(&ParamValue, f64)> = None;
    for value in values {
        let Some(number) = value.as_f64() else {
            continue;
        };
        let distance = (v - number).abs();
        if best.map_or(true, |(_, min)| distance < min) {
            best = Some((value, distance));
        }
    }
    best.map(|(value, _)| value)
}

/// The two rotation parameters and their numeric bounds
struct RotationAxes {
    theta: Arc<Parameter>,
    phi: Arc<Parameter>,
    t_bounds: (f64, f64),
    p_bounds: (f64, f64),
}

#[derive(Debug, Default)]
struct GestureContext {
    mode: ControlMode,
    x0: f32,
    y0: f32,
    /// Unsnapped rotation state
    t: f64,
    p: f64,
    /// Last values written to the parameters
    applied_t: Option<ParamValue>,
    applied_p: Option<ParamValue>,
}

#[derive(Debug, Clone, Copy)]
enum RotationAxis {
    Theta,
    Phi,
}

/// Mouse controls binding a viewport and the `theta`/`phi` parameters
pub struct ControlsPhiTheta {
    viewport: Arc<Viewport>,
    axes: Option<RotationAxes>,
    config: ControlsConfig,
    gesture: Mutex<GestureContext>,
}

impl ControlsPhiTheta {
    /// Bind `viewport` and the `theta`/`phi` parameters of `query_set`.
    ///
    /// Without both parameters (or without numeric values for them) the
    /// controls are disabled and ignore every event.
    pub fn new(viewport: Arc<Viewport>, query_set: &QuerySet, config: ControlsConfig) -> Self {
        let axes = match (query_set.parameter("theta"), query_set.parameter("phi")) {
            (Some(theta), Some(phi)) => match (theta.numeric_bounds(), phi.numeric_bounds()) {
                (Some(t_bounds), Some(p_bounds)) => Some(RotationAxes {
                    theta: theta.clone(),
                    phi: phi.clone(),
                    t_bounds,
                    p_bounds,
                }),
                _ => {
                    tracing::error!("Unable to create controls: \"theta\" or \"phi\" has no numeric values");
                    None
                }
            },
            _ => {
                tracing::error!("Unable to create controls: query set does not have a \"theta\" or \"phi\" parameter");
                None
            }
        };

        Self {
            viewport,
            axes,
            config,
            gesture: Mutex::new(GestureContext::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.axes.is_some()
    }

    pub fn mode(&self) -> ControlMode {
        self.gesture.lock().mode
    }

    pub fn viewport(&self) -> &Arc<Viewport> {
        &self.viewport
    }

    /// Feed one input event through the state machine
    pub fn handle(&self, event: InputEvent) -> EventResponse {
        let Some(axes) = &self.axes else {
            return EventResponse::Ignored;
        };

        match event {
            InputEvent::ContextMenu => EventResponse::Consumed,
            InputEvent::PointerDown { x, y, button, modifier } => self.pointer_down(axes, x, y, button, modifier),
            InputEvent::PointerMove { x, y } => self.pointer_move(axes, x, y),
            InputEvent::PointerUp | InputEvent::PointerLeave => {
                let mut gesture = self.gesture.lock();
                if gesture.mode == ControlMode::Idle {
                    return EventResponse::Ignored;
                }
                tracing::trace!(mode = ?gesture.mode, "gesture finished");
                gesture.mode = ControlMode::Idle;
                EventResponse::Consumed
            }
            InputEvent::Wheel { x, y, delta_y, modifier } => {
                if !modifier {
                    return EventResponse::Ignored;
                }
                let z = self.config.zoom_factor;
                let factor = if delta_y < 0.0 { 1.0 + z } else { 1.0 - z };
                self.viewport.zoom_at(factor, x, y);
                EventResponse::Consumed
            }
        }
    }

    fn pointer_down(&self, axes: &RotationAxes, x: f32, y: f32, button: PointerButton, modifier: bool) -> EventResponse {
        if !modifier {
            return EventResponse::Ignored;
        }
        let mut gesture = self.gesture.lock();
        if gesture.mode != ControlMode::Idle {
            return EventResponse::Ignored;
        }

        gesture.x0 = x;
        gesture.y0 = y;
        match button {
            PointerButton::Primary => gesture.mode = ControlMode::Panning,
            PointerButton::Secondary => {
                let theta = axes.theta.query().first().cloned();
                let phi = axes.phi.query().first().cloned();
                gesture.t = theta.as_ref().and_then(ParamValue::as_f64).unwrap_or(axes.t_bounds.0);
                gesture.p = phi.as_ref().and_then(ParamValue::as_f64).unwrap_or(axes.p_bounds.0);
                gesture.applied_t = theta;
                gesture.applied_p = phi;
                gesture.mode = ControlMode::Rotating;
            }
            PointerButton::Middle => {}
        }
        tracing::trace!(mode = ?gesture.mode, x, y, "gesture started");
        EventResponse::Consumed
    }

    fn pointer_move(&self, axes: &RotationAxes, x: f32, y: f32) -> EventResponse {
        let mut updates = Vec::new();
        let pan = {
            let mut gesture = self.gesture.lock();
            let dx = x - gesture.x0;
            let dy = gesture.y0 - y;

            let pan = match gesture.mode {
                ControlMode::Idle => return EventResponse::Ignored,
                ControlMode::Panning => Some((dx, -dy)),
                ControlMode::Rotating => {
                    let eps = self.config.rotation_sensitivity;
                    let (t_min, t_max) = axes.t_bounds;
                    let (p_min, p_max) = axes.p_bounds;
                    gesture.t = (gesture.t + dy as f64 * eps).clamp(t_min, t_max);
                    gesture.p = (gesture.p + dx as f64 * eps).clamp(p_min, p_max);

                    if let Some(t) = snap_to_value(gesture.t, axes.theta.values()) {
                        if gesture.applied_t.as_ref() != Some(t) {
                            updates.push((RotationAxis::Theta, t.clone()));
                        }
                    }
                    if let Some(p) = snap_to_value(gesture.p, axes.phi.values()) {
                        if gesture.applied_p.as_ref() != Some(p) {
                            updates.push((RotationAxis::Phi, p.clone()));
                        }
                    }
                    None
                }
            };

            gesture.x0 = x;
            gesture.y0 = y;
            pan
        };

        // Listeners run without the gesture lock held
        if let Some((dx, dy)) = pan {
            self.viewport.pan(dx, dy);
        }
        for (axis, value) in updates {
            let parameter = match axis {
                RotationAxis::Theta => &axes.theta,
                RotationAxis::Phi => &axes.phi,
            };
            // A rejected write stays unapplied
            match parameter.set_value(value.clone()) {
                Ok(()) => {
                    let mut gesture = self.gesture.lock();
                    match axis {
                        RotationAxis::Theta => gesture.applied_t = Some(value),
                        RotationAxis::Phi => gesture.applied_p = Some(value),
                    }
                }
                Err(e) => tracing::warn!("rotation not applied: {}", e),
            }
        }
        EventResponse::Consumed
    }
}

impl std::fmt::Debug for ControlsPhiTheta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlsPhiTheta")
            .field("enabled", &self.is_enabled())
            .field("mode", &self.mode())
            .field("config", &self.config)
            .finish()
    }
}
