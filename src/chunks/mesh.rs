//! Mesh-domain chunk tree
//!
//! Decodes the chunk stream of a `.mesh` file into typed chunk structs,
//! enforcing the structural invariants that can be checked without looking
//! at other chunks (singletons, shared-vertices contradiction, enum
//! ranges). Cross-reference checks happen later in the assembler.

use crate::MESH_VERSIONS;
use crate::chunks::{peek_id, read_body_len};
use crate::error::LoadError;
use crate::model::BoundingBox;
use crate::stream::DataStream;
use glam::Vec3;

/// Mesh-domain chunk ids.
pub mod id {
    pub const HEADER: u16 = 0x1000;
    pub const MESH: u16 = 0x3000;
    pub const SUBMESH: u16 = 0x4000;
    pub const SUBMESH_OP: u16 = 0x4010;
    pub const SUBMESH_BONE_ASSIGNMENT: u16 = 0x4100;
    pub const SUBMESH_TEXTURE_ALIAS: u16 = 0x4200;
    pub const GEOMETRY: u16 = 0x5000;
    pub const GEOMETRY_VERTEX_DECL: u16 = 0x5100;
    pub const GEOMETRY_VERTEX_DECL_ELEMENT: u16 = 0x5110;
    pub const GEOMETRY_VERTEX_BUFFER: u16 = 0x5200;
    pub const GEOMETRY_VERTEX_DATA: u16 = 0x5210;
    pub const MESH_SKELETON_LINK: u16 = 0x6000;
    pub const MESH_BONE_ASSIGNMENT: u16 = 0x7000;
    pub const MESH_LOD: u16 = 0x8000;
    pub const MESH_BOUNDS: u16 = 0x9000;
    pub const SUBMESH_NAME_TABLE: u16 = 0xA000;
    pub const EDGE_LISTS: u16 = 0xB000;
    pub const POSE_LIST: u16 = 0xC000;
    pub const ANIMATION_LIST: u16 = 0xD000;
}

/// Submesh primitive topology as declared by a submesh-op chunk.
///
/// Only [`SubmeshOperation::TriangleList`] is implemented downstream; the
/// other values are valid on the wire and rejected at assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmeshOperation {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

impl SubmeshOperation {
    fn from_wire(v: u16) -> Result<Self, LoadError> {
        match v {
            1 => Ok(Self::PointList),
            2 => Ok(Self::LineList),
            3 => Ok(Self::LineStrip),
            4 => Ok(Self::TriangleList),
            5 => Ok(Self::TriangleStrip),
            6 => Ok(Self::TriangleFan),
            other => Err(LoadError::InvalidSubmeshOp(other)),
        }
    }
}

/// Vertex declaration element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float1,
    Float2,
    Float3,
    Float4,
    ColorArgb,
    ColorAbgr,
}

impl ElementType {
    fn from_wire(v: u16) -> Result<Self, LoadError> {
        match v {
            0 => Ok(Self::Float1),
            1 => Ok(Self::Float2),
            2 => Ok(Self::Float3),
            3 => Ok(Self::Float4),
            10 => Ok(Self::ColorArgb),
            11 => Ok(Self::ColorAbgr),
            other => Err(LoadError::InvalidVertexType(other)),
        }
    }

    /// Encoded width of one element of this type within a vertex.
    pub fn byte_len(self) -> usize {
        match self {
            Self::Float1 => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::ColorArgb | Self::ColorAbgr => 4,
        }
    }
}

/// Vertex declaration element semantic.
///
/// Position/Normal/Diffuse/Specular may occur at most once per declaration;
/// Texcoords may repeat (only the first set is honored downstream). The
/// remaining semantics are decoded and skipped during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementSemantic {
    Position,
    BlendWeights,
    BlendIndices,
    Normal,
    Diffuse,
    Specular,
    Texcoords,
    Binormal,
    Tangent,
}

impl ElementSemantic {
    fn from_wire(v: u16) -> Result<Self, LoadError> {
        match v {
            1 => Ok(Self::Position),
            2 => Ok(Self::BlendWeights),
            3 => Ok(Self::BlendIndices),
            4 => Ok(Self::Normal),
            5 => Ok(Self::Diffuse),
            6 => Ok(Self::Specular),
            7 => Ok(Self::Texcoords),
            8 => Ok(Self::Binormal),
            9 => Ok(Self::Tangent),
            other => Err(LoadError::InvalidVertexSemantic(other)),
        }
    }

    /// Wire value, kept for error context.
    pub fn wire(self) -> u16 {
        match self {
            Self::Position => 1,
            Self::BlendWeights => 2,
            Self::BlendIndices => 3,
            Self::Normal => 4,
            Self::Diffuse => 5,
            Self::Specular => 6,
            Self::Texcoords => 7,
            Self::Binormal => 8,
            Self::Tangent => 9,
        }
    }
}

/// One element of a vertex declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclElement {
    /// Stream index this element reads from.
    pub source: u16,
    pub ty: ElementType,
    pub semantic: ElementSemantic,
    /// Byte offset of the element within a vertex of its stream.
    pub offset: u16,
    /// Semantic-local index (e.g. which texcoord set).
    pub index: u16,
}

/// Raw vertex buffer bound to one stream index.
#[derive(Debug, Clone)]
pub struct ChunkVertexBuffer {
    pub source: u16,
    /// Vertex stride in bytes.
    pub vertex_size: u16,
    /// Payload copied out of the singleton vertex-data child chunk.
    pub data: Vec<u8>,
}

/// Geometry: a vertex declaration plus one buffer per referenced stream.
#[derive(Debug, Clone, Default)]
pub struct ChunkGeometry {
    pub vertex_count: u32,
    pub declaration: Vec<DeclElement>,
    pub buffers: Vec<ChunkVertexBuffer>,
}

/// Raw, unnormalized bone assignment as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneAssignment {
    pub vertex: u32,
    pub bone: u16,
    pub weight: f32,
}

/// Bounding box chunk payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkBounds {
    pub bounds: BoundingBox,
    pub radius: f32,
}

/// Decoded submesh chunk.
#[derive(Debug, Clone)]
pub struct ChunkSubmesh {
    pub material: String,
    /// Shares the parent mesh's geometry instead of owning its own.
    pub shared_vertices: bool,
    pub operation: SubmeshOperation,
    /// Flat triangle-list indices.
    pub face_indices: Vec<u32>,
    /// Mutually exclusive with `shared_vertices`.
    pub geometry: Option<ChunkGeometry>,
    pub bone_assignments: Vec<BoneAssignment>,
}

/// Decoded root mesh chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkMesh {
    pub has_animated_skeleton: bool,
    /// Shared geometry used by submeshes with the shared-vertices flag.
    pub geometry: Option<ChunkGeometry>,
    pub submeshes: Vec<ChunkSubmesh>,
    pub skeleton_file: Option<String>,
    /// Bone assignments scoped to the shared geometry.
    pub bone_assignments: Vec<BoneAssignment>,
    pub bounds: Option<ChunkBounds>,
}

/// Closed union over mesh-domain chunks.
#[derive(Debug, Clone)]
pub enum MeshChunk {
    /// File header, version already validated.
    FileHeader,
    Mesh(ChunkMesh),
    Submesh(Box<ChunkSubmesh>),
    SubmeshOp(SubmeshOperation),
    BoneAssignments(Vec<BoneAssignment>),
    SkeletonLink(String),
    Bounds(ChunkBounds),
    Geometry(ChunkGeometry),
    VertexDecl(Vec<DeclElement>),
    DeclElement(DeclElement),
    VertexBuffer(ChunkVertexBuffer),
    VertexData(Vec<u8>),
    /// Recognized-but-ignored or unknown chunk; its body has been consumed.
    Ignored(u16),
}

/// Read one chunk, header included, dispatching on the chunk id.
///
/// Ids we do not care about (edge lists, name tables, LOD data, ...)
/// consume exactly their declared body and come back as
/// [`MeshChunk::Ignored`], so they never block loading.
pub fn read_chunk(cursor: &mut DataStream) -> Result<MeshChunk, LoadError> {
    let chunk_id = cursor.read_u16()?;

    // The file header has no length field.
    if chunk_id == id::HEADER {
        let version = cursor.read_string()?;
        if !MESH_VERSIONS.contains(&version.as_str()) {
            return Err(LoadError::InvalidVersion(version));
        }
        return Ok(MeshChunk::FileHeader);
    }

    let body_len = read_body_len(cursor)?;
    match chunk_id {
        id::MESH => Ok(MeshChunk::Mesh(read_mesh(cursor)?)),
        id::SUBMESH => Ok(MeshChunk::Submesh(Box::new(read_submesh(cursor)?))),
        id::SUBMESH_OP => Ok(MeshChunk::SubmeshOp(SubmeshOperation::from_wire(
            cursor.read_u16()?,
        )?)),
        id::MESH_BONE_ASSIGNMENT | id::SUBMESH_BONE_ASSIGNMENT => Ok(
            MeshChunk::BoneAssignments(read_bone_assignments(cursor, body_len)?),
        ),
        id::MESH_SKELETON_LINK => Ok(MeshChunk::SkeletonLink(cursor.read_string()?)),
        id::MESH_BOUNDS => Ok(MeshChunk::Bounds(read_bounds(cursor)?)),
        id::GEOMETRY => Ok(MeshChunk::Geometry(read_geometry(cursor)?)),
        id::GEOMETRY_VERTEX_DECL => Ok(MeshChunk::VertexDecl(read_vertex_decl(cursor)?)),
        id::GEOMETRY_VERTEX_DECL_ELEMENT => {
            Ok(MeshChunk::DeclElement(read_decl_element(cursor)?))
        }
        id::GEOMETRY_VERTEX_BUFFER => {
            Ok(MeshChunk::VertexBuffer(read_vertex_buffer(cursor)?))
        }
        id::GEOMETRY_VERTEX_DATA => Ok(MeshChunk::VertexData(
            cursor.read_bytes(body_len as usize)?,
        )),
        id::EDGE_LISTS | id::SUBMESH_NAME_TABLE | id::SUBMESH_TEXTURE_ALIAS => {
            // We don't care about these
            cursor.skip(body_len as usize)?;
            Ok(MeshChunk::Ignored(chunk_id))
        }
        other => {
            log::warn!("mesh loader: skipping unhandled chunk type {other:#06x}");
            cursor.skip(body_len as usize)?;
            Ok(MeshChunk::Ignored(other))
        }
    }
}

fn read_mesh(cursor: &mut DataStream) -> Result<ChunkMesh, LoadError> {
    let mut mesh = ChunkMesh {
        has_animated_skeleton: cursor.read_bool()?,
        ..ChunkMesh::default()
    };

    while !cursor.at_eof() {
        match peek_id(cursor)? {
            id::GEOMETRY
            | id::SUBMESH
            | id::MESH_SKELETON_LINK
            | id::MESH_BONE_ASSIGNMENT
            | id::MESH_LOD
            | id::SUBMESH_NAME_TABLE
            | id::MESH_BOUNDS
            | id::EDGE_LISTS
            | id::POSE_LIST
            | id::ANIMATION_LIST => {}
            _ => break,
        }
        match read_chunk(cursor)? {
            MeshChunk::Geometry(geometry) => {
                if mesh.geometry.is_some() {
                    return Err(LoadError::MultipleSingletonChunks(
                        "only one geometry chunk is allowed within a mesh chunk",
                    ));
                }
                mesh.geometry = Some(geometry);
            }
            MeshChunk::Submesh(submesh) => mesh.submeshes.push(*submesh),
            MeshChunk::SkeletonLink(file) => {
                if mesh.skeleton_file.is_some() {
                    return Err(LoadError::MultipleSingletonChunks(
                        "only one skeleton link chunk is allowed within a mesh chunk",
                    ));
                }
                mesh.skeleton_file = Some(file);
            }
            MeshChunk::Bounds(bounds) => {
                if mesh.bounds.is_some() {
                    return Err(LoadError::MultipleSingletonChunks(
                        "only one bounds chunk is allowed within a mesh chunk",
                    ));
                }
                mesh.bounds = Some(bounds);
            }
            MeshChunk::BoneAssignments(mut assignments) => {
                mesh.bone_assignments.append(&mut assignments);
            }
            MeshChunk::Ignored(_) => {}
            other => {
                log::warn!("mesh loader: unexpected {other:?} inside a mesh chunk");
            }
        }
    }
    Ok(mesh)
}

fn read_submesh(cursor: &mut DataStream) -> Result<ChunkSubmesh, LoadError> {
    let material = cursor.read_string()?;
    let shared_vertices = cursor.read_bool()?;
    let index_count = cursor.read_u32()?;
    let indexes_are_32bit = cursor.read_bool()?;
    let mut face_indices = Vec::with_capacity(index_count as usize);
    for _ in 0..index_count {
        let index = if indexes_are_32bit {
            cursor.read_u32()?
        } else {
            u32::from(cursor.read_u16()?)
        };
        face_indices.push(index);
    }

    let mut submesh = ChunkSubmesh {
        material,
        shared_vertices,
        // Default when no submesh-op chunk follows
        operation: SubmeshOperation::TriangleList,
        face_indices,
        geometry: None,
        bone_assignments: Vec::new(),
    };

    while !cursor.at_eof() {
        match peek_id(cursor)? {
            id::GEOMETRY
            | id::SUBMESH_OP
            | id::SUBMESH_BONE_ASSIGNMENT
            | id::SUBMESH_TEXTURE_ALIAS => {}
            _ => break,
        }
        match read_chunk(cursor)? {
            MeshChunk::Geometry(geometry) => {
                if submesh.shared_vertices {
                    // Can't use the parent's vertices and own some at the same time
                    return Err(LoadError::SharedVertexGeometryForbidden);
                }
                if submesh.geometry.is_some() {
                    return Err(LoadError::MultipleSingletonChunks(
                        "only one geometry chunk is allowed within a submesh chunk",
                    ));
                }
                submesh.geometry = Some(geometry);
            }
            MeshChunk::SubmeshOp(op) => submesh.operation = op,
            MeshChunk::BoneAssignments(mut assignments) => {
                submesh.bone_assignments.append(&mut assignments);
            }
            MeshChunk::Ignored(_) => {}
            other => {
                log::warn!("mesh loader: unexpected {other:?} inside a submesh chunk");
            }
        }
    }
    Ok(submesh)
}

fn read_bone_assignments(
    cursor: &mut DataStream,
    body_len: u32,
) -> Result<Vec<BoneAssignment>, LoadError> {
    // vertex u32 + bone u16 + weight f32
    let count = body_len as usize / 10;
    let mut assignments = Vec::with_capacity(count);
    for _ in 0..count {
        assignments.push(BoneAssignment {
            vertex: cursor.read_u32()?,
            bone: cursor.read_u16()?,
            weight: cursor.read_f32()?,
        });
    }
    Ok(assignments)
}

fn read_bounds(cursor: &mut DataStream) -> Result<ChunkBounds, LoadError> {
    let min = read_vec3(cursor)?;
    let max = read_vec3(cursor)?;
    let radius = cursor.read_f32()?;
    Ok(ChunkBounds {
        bounds: BoundingBox { min, max },
        radius,
    })
}

fn read_geometry(cursor: &mut DataStream) -> Result<ChunkGeometry, LoadError> {
    let mut geometry = ChunkGeometry {
        vertex_count: cursor.read_u32()?,
        ..ChunkGeometry::default()
    };

    while !cursor.at_eof() {
        match peek_id(cursor)? {
            id::GEOMETRY_VERTEX_DECL | id::GEOMETRY_VERTEX_BUFFER => {}
            _ => break,
        }
        match read_chunk(cursor)? {
            MeshChunk::VertexDecl(declaration) => {
                if !geometry.declaration.is_empty() {
                    return Err(LoadError::MultipleSingletonChunks(
                        "only one vertex declaration chunk is allowed within a geometry chunk",
                    ));
                }
                geometry.declaration = declaration;
            }
            MeshChunk::VertexBuffer(buffer) => geometry.buffers.push(buffer),
            MeshChunk::Ignored(_) => {}
            other => {
                log::warn!("mesh loader: unexpected {other:?} inside a geometry chunk");
            }
        }
    }
    Ok(geometry)
}

fn read_vertex_decl(cursor: &mut DataStream) -> Result<Vec<DeclElement>, LoadError> {
    let mut declaration = Vec::new();
    while !cursor.at_eof() && peek_id(cursor)? == id::GEOMETRY_VERTEX_DECL_ELEMENT {
        match read_chunk(cursor)? {
            MeshChunk::DeclElement(element) => declaration.push(element),
            _ => unreachable!("peeked id guarantees a declaration element"),
        }
    }
    Ok(declaration)
}

fn read_decl_element(cursor: &mut DataStream) -> Result<DeclElement, LoadError> {
    let source = cursor.read_u16()?;
    let ty = ElementType::from_wire(cursor.read_u16()?)?;
    let semantic = ElementSemantic::from_wire(cursor.read_u16()?)?;
    let offset = cursor.read_u16()?;
    let index = cursor.read_u16()?;
    Ok(DeclElement {
        source,
        ty,
        semantic,
        offset,
        index,
    })
}

fn read_vertex_buffer(cursor: &mut DataStream) -> Result<ChunkVertexBuffer, LoadError> {
    let source = cursor.read_u16()?;
    let vertex_size = cursor.read_u16()?;
    let mut data: Option<Vec<u8>> = None;

    while !cursor.at_eof() && peek_id(cursor)? == id::GEOMETRY_VERTEX_DATA {
        match read_chunk(cursor)? {
            MeshChunk::VertexData(payload) => {
                if data.is_some() {
                    return Err(LoadError::MultipleSingletonChunks(
                        "only one vertex data chunk is allowed within a vertex buffer chunk",
                    ));
                }
                data = Some(payload);
            }
            _ => unreachable!("peeked id guarantees a vertex data chunk"),
        }
    }

    Ok(ChunkVertexBuffer {
        source,
        vertex_size,
        data: data.ok_or(LoadError::InsufficientData(
            "vertex buffer chunk without vertex data",
        ))?,
    })
}

fn read_vec3(cursor: &mut DataStream) -> Result<Vec3, LoadError> {
    Ok(Vec3::new(
        cursor.read_f32()?,
        cursor.read_f32()?,
        cursor.read_f32()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_wire_range() {
        assert_eq!(ElementType::from_wire(0).unwrap(), ElementType::Float1);
        assert_eq!(ElementType::from_wire(3).unwrap(), ElementType::Float4);
        assert_eq!(ElementType::from_wire(10).unwrap(), ElementType::ColorArgb);
        assert_eq!(ElementType::from_wire(11).unwrap(), ElementType::ColorAbgr);
        // The gap between Float4 and the color encodings is invalid
        assert!(matches!(
            ElementType::from_wire(4),
            Err(LoadError::InvalidVertexType(4))
        ));
        assert!(matches!(
            ElementType::from_wire(12),
            Err(LoadError::InvalidVertexType(12))
        ));
    }

    #[test]
    fn test_element_byte_len() {
        assert_eq!(ElementType::Float1.byte_len(), 4);
        assert_eq!(ElementType::Float4.byte_len(), 16);
        assert_eq!(ElementType::ColorArgb.byte_len(), 4);
        assert_eq!(ElementType::ColorAbgr.byte_len(), 4);
    }

    #[test]
    fn test_semantic_wire_range() {
        assert_eq!(
            ElementSemantic::from_wire(1).unwrap(),
            ElementSemantic::Position
        );
        assert_eq!(
            ElementSemantic::from_wire(9).unwrap(),
            ElementSemantic::Tangent
        );
        assert!(matches!(
            ElementSemantic::from_wire(0),
            Err(LoadError::InvalidVertexSemantic(0))
        ));
        assert!(matches!(
            ElementSemantic::from_wire(10),
            Err(LoadError::InvalidVertexSemantic(10))
        ));
    }

    #[test]
    fn test_submesh_op_range() {
        assert_eq!(
            SubmeshOperation::from_wire(4).unwrap(),
            SubmeshOperation::TriangleList
        );
        assert!(matches!(
            SubmeshOperation::from_wire(0),
            Err(LoadError::InvalidSubmeshOp(0))
        ));
        assert!(matches!(
            SubmeshOperation::from_wire(7),
            Err(LoadError::InvalidSubmeshOp(7))
        ));
    }
}
