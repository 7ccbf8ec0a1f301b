//! Vertex geometry extraction
//!
//! Turns a decoded geometry chunk (declaration + per-stream buffers) into
//! plain vertices. All buffer bounds are proven up front so the per-vertex
//! loop can index the payloads directly.

use crate::chunks::mesh::{ChunkGeometry, DeclElement, ElementSemantic, ElementType};
use crate::error::LoadError;
use crate::model::Vertex;
use glam::{Vec2, Vec3};
use hashbrown::HashMap;

/// Read cursor over one stream's payload.
struct StreamCursor<'a> {
    data: &'a [u8],
    pos: usize,
    stride: usize,
}

/// Reject declarations with a duplicate single-valued semantic.
///
/// Texcoords may repeat (multiple UV sets); only the first set is honored
/// downstream, a known limitation of the format's consumers that we
/// preserve rather than fix. Unhandled semantics may also repeat.
fn check_declaration(declaration: &[DeclElement]) -> Result<(), LoadError> {
    let mut position_seen = false;
    let mut normal_seen = false;
    let mut diffuse_seen = false;
    let mut specular_seen = false;
    for element in declaration {
        let seen = match element.semantic {
            ElementSemantic::Position => &mut position_seen,
            ElementSemantic::Normal => &mut normal_seen,
            ElementSemantic::Diffuse => &mut diffuse_seen,
            ElementSemantic::Specular => &mut specular_seen,
            _ => continue,
        };
        if *seen {
            return Err(LoadError::InvalidVertexDeclaration {
                semantic: element.semantic.wire(),
            });
        }
        *seen = true;
    }
    Ok(())
}

/// Decode one element into up to four floats, `[x, y, z, w]` defaulting to
/// `[0, 0, 0, 1]`. Color channels are normalized to `[0, 1]` and exposed as
/// `[r, g, b, a]` regardless of the byte order named by the type.
fn decode_element(src: &[u8], ty: ElementType) -> [f32; 4] {
    let mut values = [0.0, 0.0, 0.0, 1.0];
    match ty {
        ElementType::Float1 | ElementType::Float2 | ElementType::Float3 | ElementType::Float4 => {
            let count = ty.byte_len() / 4;
            for (i, value) in values.iter_mut().enumerate().take(count) {
                let b = &src[i * 4..i * 4 + 4];
                *value = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            }
        }
        ElementType::ColorAbgr => {
            values[3] = f32::from(src[0]) / 255.0;
            for i in 0..3 {
                values[i] = f32::from(src[3 - i]) / 255.0;
            }
        }
        ElementType::ColorArgb => {
            values[3] = f32::from(src[0]) / 255.0;
            for i in 0..3 {
                values[i] = f32::from(src[i + 1]) / 255.0;
            }
        }
    }
    values
}

/// Extract all vertices of a geometry chunk.
///
/// Validates the declaration, the stride of every bound stream against the
/// maximum element end offset, and every buffer's payload length against
/// `(vertex_count - 1) * stride + max_offset` before touching any bytes.
pub fn read_submesh_geometry(geometry: &ChunkGeometry) -> Result<Vec<Vertex>, LoadError> {
    check_declaration(&geometry.declaration)?;

    // Maximum byte offset the declaration implies, per stream
    let mut max_offset: HashMap<u16, usize> = HashMap::new();
    for element in &geometry.declaration {
        let end = element.offset as usize + element.ty.byte_len();
        let entry = max_offset.entry(element.source).or_insert(0);
        *entry = (*entry).max(end);
    }

    let mut cursors: HashMap<u16, StreamCursor> = HashMap::new();
    for buffer in &geometry.buffers {
        if cursors.contains_key(&buffer.source) {
            return Err(LoadError::MultipleSingletonChunks(
                "multiple vertex buffers bound to the same stream",
            ));
        }
        let need = max_offset.remove(&buffer.source).unwrap_or(0);
        let stride = buffer.vertex_size as usize;
        if stride < need {
            return Err(LoadError::VerticesOverlapping {
                stream: buffer.source,
            });
        }
        let min_len = (geometry.vertex_count as usize).saturating_sub(1) * stride + need;
        if buffer.data.len() < min_len {
            return Err(LoadError::InsufficientData("vertex buffer too small"));
        }
        cursors.insert(
            buffer.source,
            StreamCursor {
                data: &buffer.data,
                pos: 0,
                stride,
            },
        );
    }

    // Anything left in max_offset was referenced but never bound
    if let Some(&stream) = max_offset.keys().min() {
        return Err(LoadError::UnboundStream { stream });
    }

    let mut vertices = Vec::with_capacity(geometry.vertex_count as usize);
    for _ in 0..geometry.vertex_count {
        let mut vertex = Vertex::default();
        let mut texcoords_read = false;
        for element in &geometry.declaration {
            let cursor = &cursors[&element.source];
            let start = cursor.pos + element.offset as usize;
            let values = decode_element(&cursor.data[start..start + element.ty.byte_len()], element.ty);
            match element.semantic {
                ElementSemantic::Position => {
                    vertex.position = Vec3::new(values[0], values[1], values[2]);
                }
                ElementSemantic::Normal => {
                    vertex.normal = Vec3::new(values[0], values[1], values[2]);
                }
                ElementSemantic::Texcoords => {
                    // Only the first texcoord set is honored
                    if !texcoords_read {
                        vertex.uv = Vec2::new(values[0], values[1]);
                        texcoords_read = true;
                    }
                }
                // Decoded, then skipped: the vertex model has no color slot
                // and blend data arrives through bone-assignment chunks
                _ => {}
            }
        }
        vertices.push(vertex);
        for cursor in cursors.values_mut() {
            cursor.pos += cursor.stride;
        }
    }

    Ok(vertices)
}
