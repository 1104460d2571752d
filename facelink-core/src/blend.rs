//! CPU blendshape mixing.
//!
//! The composite mesh is the neutral mesh displaced by every blendshape
//! delta scaled by its live weight:
//!
//! ```text
//! composite[j] = neutral[j] + Σ_i weight[i] * (blendshape[i][j] - neutral[j])
//! ```
//!
//! It is recomputed only when a Blendshapes block has been applied since
//! the last call; otherwise the cached vertices are returned untouched.

use std::path::Path;

use crate::error::Result;
use crate::math::Vec3;
use crate::state::TrackingState;

// ── Mesh ─────────────────────────────────────────────────────────

/// Indexed triangle mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }
}

/// A neutral mesh and its blendshape targets, index-aligned with the
/// blendshape weights.
#[derive(Debug, Clone, Default)]
pub struct MeshSet {
    pub neutral: Mesh,
    pub blendshapes: Vec<Mesh>,
}

/// Loads a [`MeshSet`] from a folder of exported meshes.
pub trait MeshImporter {
    fn import(&self, folder: &Path) -> Result<MeshSet>;
}

// ── BlendCompositor ──────────────────────────────────────────────

/// Lazily blended view of a [`MeshSet`] driven by live tracking weights.
#[derive(Debug)]
pub struct BlendCompositor {
    tracking: TrackingState,
    meshes: MeshSet,
    composite: Mesh,
    /// Generation of the weights `composite` was built from.
    built_from: Option<u64>,
}

impl BlendCompositor {
    pub fn new(tracking: TrackingState, meshes: MeshSet) -> Self {
        let composite = meshes.neutral.clone();
        Self {
            tracking,
            meshes,
            composite,
            built_from: None,
        }
    }

    /// Import meshes with `importer` and bind them to `tracking`.
    pub fn import(
        tracking: TrackingState,
        importer: &impl MeshImporter,
        folder: &Path,
    ) -> Result<Self> {
        let meshes = importer.import(folder)?;
        tracing::info!(
            folder = %folder.display(),
            vertices = meshes.neutral.num_vertices(),
            blendshapes = meshes.blendshapes.len(),
            "imported meshes"
        );
        Ok(Self::new(tracking, meshes))
    }

    pub fn neutral_mesh(&self) -> &Mesh {
        &self.meshes.neutral
    }

    pub fn blendshape_mesh(&self, i: usize) -> Option<&Mesh> {
        self.meshes.blendshapes.get(i)
    }

    pub fn num_blendshape_meshes(&self) -> usize {
        self.meshes.blendshapes.len()
    }

    /// Whether new weights arrived since the composite was last built.
    pub fn is_dirty(&self) -> bool {
        self.built_from != Some(self.tracking.blendshape_generation())
    }

    /// The composite mesh for the latest weights.
    pub fn blend_mesh(&mut self) -> &Mesh {
        if self.meshes.blendshapes.is_empty() {
            return &self.meshes.neutral;
        }

        let (generation, weights) = self.tracking.blendshape_snapshot();
        if self.built_from != Some(generation) {
            blend_into(&mut self.composite, &self.meshes, &weights);
            self.built_from = Some(generation);
        }
        &self.composite
    }
}

/// Overwrite `out` with the neutral mesh plus weighted deltas.
///
/// Only the first `min(blendshapes, weights)` targets contribute, and a
/// target with fewer vertices than the neutral mesh only displaces the
/// vertices it has.
pub fn blend_into(out: &mut Mesh, meshes: &MeshSet, weights: &[f32]) {
    let neutral = &meshes.neutral;
    out.vertices.clear();
    out.vertices.extend_from_slice(&neutral.vertices);
    if out.indices != neutral.indices {
        out.indices.clone_from(&neutral.indices);
    }

    for (shape, &weight) in meshes.blendshapes.iter().zip(weights) {
        if weight == 0.0 {
            continue;
        }
        for ((v, &target), &base) in out
            .vertices
            .iter_mut()
            .zip(&shape.vertices)
            .zip(&neutral.vertices)
        {
            *v += (target - base) * weight;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
