//! Mesh and skeleton assembly entry points
//!
//! This is where the decoded chunk trees become the renderable model and
//! where cross-reference integrity is enforced: bone handles resolve
//! through the skeleton's lookup table, bone-assignment vertex indices are
//! range-checked against the owning geometry, and weights are normalized
//! per vertex. Any violation aborts the decode; no partial mesh is ever
//! returned.

use crate::chunks::mesh::{self as chunks, ChunkSubmesh, MeshChunk, SubmeshOperation, id};
use crate::chunks::peek_id;
use crate::error::LoadError;
use crate::model::{Face, Mesh, Skeleton, SubMesh, VertexBoneAssignment};
use crate::stream::DataStream;
use hashbrown::HashMap;

mod geometry;
mod skeleton;


/// Load a binary mesh file.
///
/// `load_skeleton_file` resolves the skeleton file referenced by the mesh
/// (if any) to its raw bytes; returning `None` fails the decode. Material
/// names are passed through unresolved.
pub fn load_mesh<F>(data: &[u8], mut load_skeleton_file: F) -> Result<Mesh, LoadError>
where
    F: FnMut(&str) -> Option<Vec<u8>>,
{
    let mut cursor = DataStream::new(data);

    // First chunk must be the header, second the mesh itself
    if peek_id(&mut cursor)? != id::HEADER {
        return Err(LoadError::InvalidVersion("<missing mesh file header>".into()));
    }
    chunks::read_chunk(&mut cursor)?;
    if peek_id(&mut cursor)? != id::MESH {
        return Err(LoadError::InvalidVersion("<missing root mesh chunk>".into()));
    }
    let MeshChunk::Mesh(chunk_mesh) = chunks::read_chunk(&mut cursor)? else {
        unreachable!("peeked id guarantees a mesh chunk");
    };

    // An empty bounding box is tolerated in X only: that is the view-depth
    // axis in the engine's coordinate convention
    let bounds = chunk_mesh.bounds.unwrap_or(chunks::ChunkBounds {
        bounds: Default::default(),
        radius: 0.0,
    });
    if bounds.bounds.min.y == bounds.bounds.max.y || bounds.bounds.min.z == bounds.bounds.max.z {
        return Err(LoadError::EmptyBoundingBox);
    }

    let skeleton = match &chunk_mesh.skeleton_file {
        Some(file) => {
            let bytes = load_skeleton_file(file)
                .ok_or(LoadError::InsufficientData("skeleton file not found"))?;
            load_skeleton(&bytes)?
        }
        None => Skeleton::default(),
    };

    // Bone handle -> dense index quick access table
    let bone_lookup: HashMap<u16, usize> = skeleton
        .bones
        .iter()
        .enumerate()
        .map(|(i, bone)| (bone.handle, i))
        .collect();

    let mut submeshes = Vec::with_capacity(chunk_mesh.submeshes.len());
    for chunk_submesh in &chunk_mesh.submeshes {
        submeshes.push(assemble_submesh(chunk_submesh, &chunk_mesh, &bone_lookup)?);
    }

    Ok(Mesh {
        bounds: bounds.bounds,
        radius: bounds.radius,
        submeshes,
        skeleton,
    })
}

/// Load a binary skeleton file on its own.
pub fn load_skeleton(data: &[u8]) -> Result<Skeleton, LoadError> {
    skeleton::read_skeleton(data)
}

fn assemble_submesh(
    chunk_submesh: &ChunkSubmesh,
    chunk_mesh: &chunks::ChunkMesh,
    bone_lookup: &HashMap<u16, usize>,
) -> Result<SubMesh, LoadError> {
    if chunk_submesh.operation != SubmeshOperation::TriangleList {
        return Err(LoadError::NotImplemented(
            "submesh operations other than triangle list",
        ));
    }

    let faces = chunk_submesh
        .face_indices
        .chunks_exact(3)
        .map(|tri| Face {
            vertices: [tri[0], tri[1], tri[2]],
        })
        .collect();

    let geometry = if chunk_submesh.shared_vertices {
        chunk_mesh.geometry.as_ref()
    } else {
        chunk_submesh.geometry.as_ref()
    }
    .ok_or(LoadError::InsufficientData("submesh has no geometry"))?;
    let mut vertices = geometry::read_submesh_geometry(geometry)?;

    // Submeshes on shared vertices take the mesh-level assignments
    let assignments = if chunk_submesh.shared_vertices {
        &chunk_mesh.bone_assignments
    } else {
        &chunk_submesh.bone_assignments
    };
    for assignment in assignments {
        let vertex = vertices
            .get_mut(assignment.vertex as usize)
            .ok_or(LoadError::VertexNotFound {
                vertex: assignment.vertex,
            })?;
        let bone_index = *bone_lookup
            .get(&assignment.bone)
            .ok_or(LoadError::BoneNotFound {
                handle: assignment.bone,
            })?;
        vertex.bone_assignments.push(VertexBoneAssignment {
            bone_index,
            weight: assignment.weight,
        });
    }

    // Normalize weights per vertex, once all of its assignments are in
    for vertex in &mut vertices {
        let sum: f32 = vertex.bone_assignments.iter().map(|a| a.weight).sum();
        if sum != 0.0 {
            for assignment in &mut vertex.bone_assignments {
                assignment.weight /= sum;
            }
        }
    }

    Ok(SubMesh {
        material: chunk_submesh.material.clone(),
        vertices,
        faces,
    })
}
