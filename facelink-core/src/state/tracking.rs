//! Latest decoded tracking values, shared between the network worker
//! and any number of reader threads.
//!
//! All fields live in one [`TrackingFrame`] behind a single mutex. The
//! worker applies one block per lock acquisition; readers take the lock
//! only long enough to copy a value out. A reader therefore never sees
//! a half-written field, but may see some blocks of a container applied
//! and others not yet.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::block::Block;
use crate::blendshapes::NUM_BLENDSHAPE_NAMES;
use crate::math::{EyeAngles, Quat, Vec3};

// ── TrackingFrame ────────────────────────────────────────────────

/// Snapshot of every decoded field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingFrame {
    pub timestamp: f64,
    pub tracking_successful: bool,
    pub head_orientation: Quat,
    /// Millimetres, in the server's coordinate frame.
    pub head_position: Vec3,
    pub left_eye: EyeAngles,
    pub right_eye: EyeAngles,
    /// Index-aligned with [`crate::BLENDSHAPE_NAMES`].
    pub blendshape_weights: Vec<f32>,
    pub markers: Vec<Vec3>,
    /// Bumped on every applied Blendshapes block.
    #[serde(skip)]
    pub blendshape_generation: u64,
}

impl Default for TrackingFrame {
    fn default() -> Self {
        Self {
            timestamp: 0.0,
            tracking_successful: false,
            head_orientation: Quat::IDENTITY,
            head_position: Vec3::ZERO,
            left_eye: EyeAngles::default(),
            right_eye: EyeAngles::default(),
            blendshape_weights: vec![0.0; NUM_BLENDSHAPE_NAMES],
            markers: Vec::new(),
            blendshape_generation: 0,
        }
    }
}

impl TrackingFrame {
    /// Overwrite the fields owned by `block`. Unknown blocks are ignored.
    pub fn apply(&mut self, block: Block) {
        match block {
            Block::FrameInfo {
                timestamp,
                tracking_successful,
            } => {
                self.timestamp = timestamp;
                self.tracking_successful = tracking_successful;
            }
            Block::Pose {
                orientation,
                position,
            } => {
                self.head_orientation = orientation;
                self.head_position = position;
            }
            Block::Blendshapes(weights) => {
                self.blendshape_weights.resize(weights.len(), 0.0);
                self.blendshape_weights.copy_from_slice(&weights);
                self.blendshape_generation = self.blendshape_generation.wrapping_add(1);
            }
            Block::Eyes { left, right } => {
                self.left_eye = left;
                self.right_eye = right;
            }
            Block::Markers(markers) => {
                self.markers = markers;
            }
            Block::Unknown(_) => {}
        }
    }
}

// ── TrackingState ────────────────────────────────────────────────

/// Cloneable handle to the shared [`TrackingFrame`].
#[derive(Debug, Clone, Default)]
pub struct TrackingState {
    inner: Arc<Mutex<TrackingFrame>>,
}

impl TrackingState {
    pub fn new() -> Self {
        Self::default()
    }

    // Writes are whole-field assignments; a poisoned frame is still consistent.
    fn lock(&self) -> MutexGuard<'_, TrackingFrame> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one decoded block under the lock.
    pub fn apply(&self, block: Block) {
        self.lock().apply(block);
    }

    /// Copy of the whole frame, taken under a single lock acquisition.
    pub fn snapshot(&self) -> TrackingFrame {
        self.lock().clone()
    }

    pub fn timestamp(&self) -> f64 {
        self.lock().timestamp
    }

    pub fn is_tracking_successful(&self) -> bool {
        self.lock().tracking_successful
    }

    pub fn rotation(&self) -> Quat {
        self.lock().head_orientation
    }

    pub fn position(&self) -> Vec3 {
        self.lock().head_position
    }

    pub fn left_eye_angles(&self) -> EyeAngles {
        self.lock().left_eye
    }

    pub fn right_eye_angles(&self) -> EyeAngles {
        self.lock().right_eye
    }

    pub fn blendshape_weights(&self) -> Vec<f32> {
        self.lock().blendshape_weights.clone()
    }

    pub fn blendshape_weight(&self, i: usize) -> Option<f32> {
        self.lock().blendshape_weights.get(i).copied()
    }

    pub fn num_blendshapes(&self) -> usize {
        self.lock().blendshape_weights.len()
    }

    pub fn markers(&self) -> Vec<Vec3> {
        self.lock().markers.clone()
    }

    pub fn blendshape_generation(&self) -> u64 {
        self.lock().blendshape_generation
    }

    /// Weights together with the generation they belong to.
    pub fn blendshape_snapshot(&self) -> (u64, Vec<f32>) {
        let frame = self.lock();
        (frame.blendshape_generation, frame.blendshape_weights.clone())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn defaults_are_zero_and_identity() {
        let state = TrackingState::new();
        assert_eq!(state.timestamp(), 0.0);
        assert!(!state.is_tracking_successful());
        assert_eq!(state.rotation(), Quat::IDENTITY);
        assert_eq!(state.position(), Vec3::ZERO);
        assert_eq!(state.num_blendshapes(), NUM_BLENDSHAPE_NAMES);
        assert!(state.markers().is_empty());
    }

    #[test]
    fn blendshape_vector_follows_block_count() {
        let state = TrackingState::new();
        let first: Vec<f32> = (0..46).map(|i| i as f32 / 46.0).collect();
        state.apply(Block::Blendshapes(first));
        assert_eq!(state.num_blendshapes(), 46);

        let second: Vec<f32> = (0..10).map(|i| 1.0 - i as f32 / 10.0).collect();
        state.apply(Block::Blendshapes(second.clone()));
        assert_eq!(state.num_blendshapes(), 10);
        for (i, expected) in second.iter().enumerate() {
            assert_eq!(state.blendshape_weight(i), Some(*expected));
        }
        assert_eq!(state.blendshape_weight(10), None);

        state.apply(Block::Blendshapes(vec![0.25; 50]));
        assert_eq!(state.blendshape_weights(), vec![0.25; 50]);
        assert_eq!(state.blendshape_generation(), 3);
    }

    #[test]
    fn markers_are_replaced_not_appended() {
        let state = TrackingState::new();
        state.apply(Block::Markers(vec![Vec3::X, Vec3::Y, Vec3::Z]));
        state.apply(Block::Markers(vec![Vec3::new(9.0, 9.0, 9.0)]));
        assert_eq!(state.markers(), vec![Vec3::new(9.0, 9.0, 9.0)]);
    }

    #[test]
    fn each_block_only_touches_its_fields() {
        let state = TrackingState::new();
        state.apply(Block::Eyes {
            left: EyeAngles::new(1.0, 2.0),
            right: EyeAngles::new(3.0, 4.0),
        });
        state.apply(Block::FrameInfo {
            timestamp: 7.5,
            tracking_successful: true,
        });

        let frame = state.snapshot();
        assert_eq!(frame.left_eye, EyeAngles::new(1.0, 2.0));
        assert_eq!(frame.right_eye, EyeAngles::new(3.0, 4.0));
        assert_eq!(frame.timestamp, 7.5);
        assert!(frame.tracking_successful);
        assert_eq!(frame.head_position, Vec3::ZERO);
        assert_eq!(frame.blendshape_generation, 0);
    }

    #[test]
    fn concurrent_readers_never_see_torn_values() {
        let state = TrackingState::new();
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let state = state.clone();
            let done = done.clone();
            thread::spawn(move || {
                for i in 0..20_000u32 {
                    let v = i as f32;
                    state.apply(Block::Pose {
                        orientation: Quat::new(v, v, v, v),
                        position: Vec3::new(v, v, v),
                    });
                    state.apply(Block::Blendshapes(vec![v; (i % 7 + 1) as usize]));
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let state = state.clone();
                let done = done.clone();
                thread::spawn(move || {
                    while !done.load(Ordering::SeqCst) {
                        let p = state.position();
                        assert!(p.x == p.y && p.y == p.z, "torn position {p:?}");
                        let q = state.rotation();
                        assert!(q.x == q.y && q.y == q.z, "torn rotation {q:?}");
                        let w = state.blendshape_weights();
                        assert!(w.windows(2).all(|pair| pair[0] == pair[1]));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
