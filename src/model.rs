//! Assembled in-memory mesh model
//!
//! This is what the loader produces: a renderable mesh with skinning data,
//! fully owned (nothing borrows from the input buffer). Bones live in a
//! dense arena and reference each other by index; the wire-level bone
//! handle is kept alongside for diagnostics only.

use glam::{Quat, Vec2, Vec3};
use hashbrown::HashMap;

/// Rotate/scale/translate transform, applied as
/// `v' = rotate * (scale * v) + translate`.
///
/// Composition and inversion stay in this decomposed form. With non-uniform
/// scale that is an approximation (scale does not commute with rotation),
/// which matches how the format's producers author skeletons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub rotate: Quat,
    pub scale: Vec3,
    pub translate: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotate: Quat::IDENTITY,
        scale: Vec3::ONE,
        translate: Vec3::ZERO,
    };

    /// Inverse in the same decomposed form. Requires a normalized rotation.
    pub fn inverse(&self) -> Self {
        let rotate = self.rotate.inverse();
        let scale = Vec3::ONE / self.scale;
        Self {
            rotate,
            scale,
            translate: rotate * (scale * -self.translate),
        }
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, v: Vec3) -> Vec3 {
        self.rotate * (self.scale * v) + self.translate
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    /// `(lhs * rhs)(v) == lhs(rhs(v))`.
    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            rotate: self.rotate * rhs.rotate,
            scale: self.scale * rhs.scale,
            translate: self.rotate * (self.scale * rhs.translate) + self.translate,
        }
    }
}

/// Axis-aligned bounding box as declared by the mesh chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

/// One skinned vertex. Only the first texcoord set of the declaration is
/// honored; bone weights are normalized to sum to 1 per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub bone_assignments: Vec<VertexBoneAssignment>,
}

/// A normalized (bone index, weight) pair attached to a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexBoneAssignment {
    /// Dense index into [`Skeleton::bones`], not the wire handle.
    pub bone_index: usize,
    pub weight: f32,
}

/// Triangle face, indices into the owning submesh's vertex list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub vertices: [u32; 3],
}

/// A mesh subset with its own material and triangle list.
#[derive(Debug, Clone, Default)]
pub struct SubMesh {
    /// Material name as it appears on the wire, unresolved.
    pub material: String,
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
}

/// One bone of the assembled skeleton.
///
/// `transform` and `inverse_transform` hold the *composed* (root-to-here)
/// transform and its inverse once loading finishes.
#[derive(Debug, Clone)]
pub struct Bone {
    /// Wire-level handle, unique within the skeleton.
    pub handle: u16,
    pub name: String,
    /// Index of the parent bone in the arena; `None` only for the root.
    pub parent: Option<usize>,
    /// Indices of child bones in the arena.
    pub children: Vec<usize>,
    pub transform: Transform,
    pub inverse_transform: Transform,
}

/// Animation keyframe. The translation is stored in the bone's own
/// rest-local space (re-based once at load time).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub transform: Transform,
}

/// Per-bone keyframe track, ordered by time.
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub keyframes: Vec<Keyframe>,
}

/// A named animation with one optional track per bone index.
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: String,
    pub duration: f32,
    /// Dense over the bone arena: `tracks[i]` animates `bones[i]`.
    pub tracks: Vec<Option<Track>>,
}

/// Assembled skeleton: bone arena in root-first order plus animations.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    /// Bones in depth-first order from the master bone, so a parent always
    /// precedes its children.
    pub bones: Vec<Bone>,
    pub animations: HashMap<String, Animation>,
}

impl Skeleton {
    /// Dense index of the bone with the given wire handle.
    pub fn bone_by_handle(&self, handle: u16) -> Option<usize> {
        self.bones.iter().position(|b| b.handle == handle)
    }
}

/// The fully assembled mesh model.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub bounds: BoundingBox,
    pub radius: f32,
    pub submeshes: Vec<SubMesh>,
    pub skeleton: Skeleton,
}
