use glam::{Mat4, UVec2, Vec2};
use log::trace;

use crate::{gpu, TemporalSettings};

/// How a cloud renderer should produce its image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TemporalMode {
    /// Render a quarter of the texels each frame and accumulate them over
    /// time; used for regular cameras.
    #[default]
    Temporal,

    /// Render every texel straight into the accumulation buffer, without
    /// jitter or reprojection; used for one-off renders (e.g. reflection
    /// probes).
    ///
    /// The sub-pixel phase stays put, and temporal frames that follow
    /// reproject from the pose rendered here.
    Direct,
}

/// Sizes of the buffers used by temporal upsampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemporalExtent {
    /// Size of the accumulation (and reprojection) buffer
    pub full: UVec2,

    /// Size of the buffer raymarched each frame (and of motion vectors)
    pub low: UVec2,
}

impl TemporalExtent {
    pub fn new(
        viewport_size: UVec2,
        stereo: bool,
        settings: &TemporalSettings,
    ) -> Self {
        let factor = gpu::TEMPORAL_UPSCALE_FACTOR;

        // Stereo cameras get both eyes rendered side by side, each with the
        // resolution of a regular camera
        let eye_size = if stereo {
            UVec2::new(viewport_size.x / 2, viewport_size.y)
        } else {
            viewport_size
        };

        let low = (eye_size.as_vec2() * settings.resolution_scale)
            .min(Vec2::splat(settings.max_resolution as f32))
            / (factor as f32);

        let mut low = low.round().max(Vec2::ONE).as_uvec2();

        if stereo {
            low.x *= 2;
        }

        Self {
            full: low * factor,
            low,
        }
    }
}

/// Buffer into which clouds get raymarched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemporalTarget {
    LowRes,
    FullRes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemporalStep {
    /// Raymarch clouds into given buffer
    Sample(TemporalTarget),

    /// Compute motion vectors between the previous and the current frame
    MotionVectors,

    /// Move the accumulated image along motion vectors
    Reproject,

    /// Write the newest low-resolution samples into the accumulation buffer
    UpsampleInsert,
}

/// Work scheduled for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalFrame {
    /// Steps to perform, in order
    pub steps: Vec<TemporalStep>,

    /// Phase whose sub-pixel gets sampled during this frame
    pub phase: u32,

    /// Offset applied to camera rays, in normalized device coordinates
    pub jitter: Vec2,

    /// Whether the accumulation buffer contains anything worth
    /// reprojecting
    pub has_history: bool,

    /// Previous frame's view-projection matrix
    pub prev_view_proj: Mat4,

    /// Whether the composite shows motion vectors instead of clouds
    pub debug_motion_vectors: bool,

    /// Whether the buffers have to be (re)allocated before running this
    /// frame
    pub resized: bool,
}

impl TemporalFrame {
    pub fn contains(&self, step: TemporalStep) -> bool {
        self.steps.contains(&step)
    }

    /// Buffer into which this frame raymarches.
    pub fn target(&self) -> TemporalTarget {
        self.steps
            .iter()
            .find_map(|step| match step {
                TemporalStep::Sample(target) => Some(*target),
                _ => None,
            })
            .unwrap_or(TemporalTarget::FullRes)
    }
}

/// Per-camera state of temporal upsampling: the current sub-pixel phase and
/// what's needed to compute motion vectors.
#[derive(Clone, Debug, Default)]
pub struct TemporalState {
    extent: Option<TemporalExtent>,
    phase: u32,
    prev_view_proj: Option<Mat4>,
}

impl TemporalState {
    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn extent(&self) -> Option<TemporalExtent> {
        self.extent
    }

    /// Schedules the next frame and advances the state.
    ///
    /// `view_proj` must be the non-jittered, translation-less view-projection
    /// matrix of the camera.
    ///
    /// Changing the extent discards all the history, since reprojecting
    /// across different resolutions isn't meaningful.
    pub fn begin_frame(
        &mut self,
        extent: TemporalExtent,
        mode: TemporalMode,
        view_proj: Mat4,
        settings: &TemporalSettings,
    ) -> TemporalFrame {
        let resized = self.extent != Some(extent);

        if resized {
            trace!("Resetting temporal history; extent={extent:?}");

            self.extent = Some(extent);
            self.phase = 0;
            self.prev_view_proj = None;
        }

        let mode = if settings.temporal_sampling {
            mode
        } else {
            TemporalMode::Direct
        };

        if mode == TemporalMode::Direct {
            let frame = TemporalFrame {
                steps: vec![TemporalStep::Sample(TemporalTarget::FullRes)],
                phase: self.phase,
                jitter: Vec2::ZERO,
                has_history: self.prev_view_proj.is_some(),
                prev_view_proj: self.prev_view_proj.unwrap_or(view_proj),
                debug_motion_vectors: false,
                resized,
            };

            // The accumulation buffer now holds this pose
            self.prev_view_proj = Some(view_proj);

            return frame;
        }

        let mut steps = vec![
            TemporalStep::Sample(TemporalTarget::LowRes),
            TemporalStep::MotionVectors,
            TemporalStep::Reproject,
        ];

        if !settings.pause_temporal {
            steps.push(TemporalStep::UpsampleInsert);
        }

        let frame = TemporalFrame {
            steps,
            phase: self.phase,
            jitter: gpu::Temporal::jitter(self.phase, extent.low),
            has_history: self.prev_view_proj.is_some(),
            prev_view_proj: self.prev_view_proj.unwrap_or(view_proj),
            debug_motion_vectors: settings.debug_motion_vectors,
            resized,
        };

        self.prev_view_proj = Some(view_proj);

        if !settings.pause_temporal {
            self.phase = (self.phase + 1) % gpu::TEMPORAL_PHASES;
        }

        trace!(
            "Temporal frame: phase={}, steps={:?}",
            frame.phase,
            frame.steps
        );

        frame
    }
}
