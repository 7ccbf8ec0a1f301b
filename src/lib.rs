//! ogre-mesh: chunk-based binary mesh/skeleton loader
//!
//! A pure Rust reader for the OGRE binary `.mesh`/`.skeleton` formats:
//! versioned, tree-structured chunk streams carrying vertex geometry,
//! triangle lists, a bone hierarchy and keyframe animations. The loader
//! turns a byte buffer into a fully owned, renderable mesh model with
//! skinning data, or rejects malformed input with a typed error. It never
//! returns a partial mesh.
//!
//! # Key properties
//!
//! - **Bounds-checked**: every read goes through one cursor chokepoint, so
//!   truncated or adversarial input fails with
//!   [`LoadError::InsufficientData`] instead of panicking
//! - **Synchronous and share-nothing**: a pure function from buffer to
//!   model; independent decodes may run on independent threads
//! - **Owned output**: nothing in the model borrows from the input buffer
//!
//! # Usage
//!
//! ```ignore
//! use ogre_mesh::load_mesh;
//!
//! let data = std::fs::read("clonk.mesh")?;
//! let mesh = load_mesh(&data, |skeleton_file| {
//!     std::fs::read(skeleton_file).ok()
//! })?;
//!
//! for submesh in &mesh.submeshes {
//!     println!("{}: {} faces", submesh.material, submesh.faces.len());
//! }
//! ```
//!
//! File access is entirely the caller's responsibility: the only callback
//! is the skeleton-file loader, and material names are returned unresolved.

pub mod chunks;
mod error;
mod loader;
mod model;
mod stream;

pub use error::LoadError;
pub use loader::{load_mesh, load_skeleton};
pub use model::{
    Animation, Bone, BoundingBox, Face, Keyframe, Mesh, Skeleton, SubMesh, Track, Transform,
    Vertex, VertexBoneAssignment,
};
pub use stream::DataStream;

// =============================================================================
// Format constants
// =============================================================================

/// Version markers accepted in a mesh file header. 1.40 differs from 1.41
/// only in LOD chunks, which we skip, so both decode identically.
pub const MESH_VERSIONS: [&str; 2] = ["[MeshSerializer_v1.41]", "[MeshSerializer_v1.40]"];

/// The one version marker accepted in a skeleton file header.
pub const SKELETON_VERSION: &str = "[Serializer_v1.10]";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_markers() {
        assert!(MESH_VERSIONS.contains(&"[MeshSerializer_v1.41]"));
        assert!(MESH_VERSIONS.contains(&"[MeshSerializer_v1.40]"));
        assert_eq!(SKELETON_VERSION, "[Serializer_v1.10]");
    }
}
