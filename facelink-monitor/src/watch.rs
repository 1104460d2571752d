//! Text and JSON rendering of tracking snapshots for `watch`.

use std::fmt::Write;

use facelink_core::{BLENDSHAPE_NAMES, TrackingFrame, Vec3};

/// Millimetres on the wire, metres on screen.
pub fn to_metres(v: Vec3) -> Vec3 {
    v * 0.001
}

/// One human-readable status line.
pub fn format_line(frame: &TrackingFrame, show_blendshapes: bool) -> String {
    let p = to_metres(frame.head_position);
    let q = frame.head_orientation;
    let mut line = format!(
        "t={:>9.3} {} pos=({:+.3}, {:+.3}, {:+.3}) m rot=({:+.3}, {:+.3}, {:+.3}, {:+.3}) \
         eyes L=({:+.1}, {:+.1}) R=({:+.1}, {:+.1}) markers={}",
        frame.timestamp,
        if frame.tracking_successful { "OK  " } else { "LOST" },
        p.x,
        p.y,
        p.z,
        q.x,
        q.y,
        q.z,
        q.w,
        frame.left_eye.theta,
        frame.left_eye.phi,
        frame.right_eye.theta,
        frame.right_eye.phi,
        frame.markers.len(),
    );

    if show_blendshapes {
        for (i, w) in frame.blendshape_weights.iter().enumerate() {
            if *w == 0.0 {
                continue;
            }
            let name = BLENDSHAPE_NAMES.get(i).copied().unwrap_or("?");
            let _ = write!(line, " {name}={w:.2}");
        }
    }
    line
}

/// One JSON object per snapshot, positions converted to metres.
pub fn format_json(frame: &TrackingFrame) -> serde_json::Result<String> {
    let mut frame = frame.clone();
    frame.head_position = to_metres(frame.head_position);
    for m in &mut frame.markers {
        *m = to_metres(*m);
    }
    serde_json::to_string(&frame)
}
