/// Radians of orbit per pixel of pointer drag.
pub const DRAG_SENSITIVITY: f32 = 0.005;

/// Idle auto-orbit speed in radians per second. Equals the reference
/// 0.003 rad per frame at a 60 Hz cadence, but scaled by measured
/// frame delta so the orbit speed is refresh-rate independent.
pub const AUTO_ROTATE_RATE: f32 = 0.18;

/// Host-facing slider range for the displacement strength.
pub const DEPTH_INTENSITY_MAX: f32 = 0.5;

/// Live parameters supplied by the host UI. Applied at render time as
/// a uniform update; changing them never rebuilds or edits the mesh.
#[derive(Debug, Clone, Copy)]
pub struct ViewerParameters {
    depth_intensity: f32,
    pub auto_rotate: bool,
}

impl Default for ViewerParameters {
    fn default() -> Self {
        Self {
            depth_intensity: 0.1,
            auto_rotate: true,
        }
    }
}

impl ViewerParameters {
    pub fn depth_intensity(&self) -> f32 {
        self.depth_intensity
    }

    pub fn set_depth_intensity(&mut self, value: f32) {
        self.depth_intensity = value.clamp(0.0, DEPTH_INTENSITY_MAX);
    }

    pub fn nudge_depth_intensity(&mut self, delta: f32) {
        self.set_depth_intensity(self.depth_intensity + delta);
    }
}

/// Which input mode currently owns the orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitPhase {
    Idle,
    Dragging,
    AutoRotating,
}

/// Pointer-drag orbit with idle auto-rotation. Plain state mutated by
/// asynchronous input callbacks and integrated once per frame by the
/// render loop; reset whenever the photo is replaced.
///
/// Hovering (pointer over the viewport, no button held) forces Idle
/// so the surface holds still for inspection. Pointer release is fed
/// from device-level events by the host, so a drag that leaves the
/// viewport mid-gesture still terminates.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrbitController {
    dragging: bool,
    hovering: bool,
    last_pointer: (f32, f32),
    rotation_x: f32,
    rotation_y: f32,
}

impl OrbitController {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn phase(&self, params: &ViewerParameters) -> OrbitPhase {
        if self.dragging {
            OrbitPhase::Dragging
        } else if params.auto_rotate && !self.hovering {
            OrbitPhase::AutoRotating
        } else {
            OrbitPhase::Idle
        }
    }

    pub fn pointer_pressed(&mut self, x: f32, y: f32) {
        self.dragging = true;
        self.last_pointer = (x, y);
    }

    /// Drag deltas accumulate into the orientation; moves while not
    /// dragging are ignored apart from hover tracking elsewhere.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if !self.dragging {
            self.last_pointer = (x, y);
            return;
        }
        let dx = x - self.last_pointer.0;
        let dy = y - self.last_pointer.1;
        self.rotation_y += dx * DRAG_SENSITIVITY;
        self.rotation_x += dy * DRAG_SENSITIVITY;
        self.last_pointer = (x, y);
    }

    /// Ends the drag no matter where the pointer is; the position of
    /// the release is irrelevant.
    pub fn pointer_released(&mut self) {
        self.dragging = false;
    }

    pub fn pointer_entered(&mut self) {
        self.hovering = true;
    }

    pub fn pointer_left(&mut self) {
        self.hovering = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Per-frame integration: idle auto-orbit advances the yaw,
    /// additive with whatever the user dragged in.
    pub fn advance(&mut self, dt: f32, params: &ViewerParameters) {
        if self.phase(params) == OrbitPhase::AutoRotating {
            self.rotation_y += AUTO_ROTATE_RATE * dt;
        }
    }

    /// (pitch, yaw) in radians.
    pub fn rotation(&self) -> (f32, f32) {
        (self.rotation_x, self.rotation_y)
    }
}
