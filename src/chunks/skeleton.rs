//! Skeleton-domain chunk tree
//!
//! Decodes the chunk stream of a `.skeleton` file. Bones and keyframes may
//! carry an optional trailing scale triple whose presence is inferred from
//! the declared body length alone (the wire format's contract, not a
//! version flag); both readers go through the shared
//! [`body_has_remaining`] helper for that.

use crate::SKELETON_VERSION;
use crate::chunks::{body_has_remaining, peek_id, read_body_len};
use crate::error::LoadError;
use crate::stream::DataStream;
use glam::{Quat, Vec3};

/// Skeleton-domain chunk ids.
pub mod id {
    pub const HEADER: u16 = 0x1000;
    pub const BLEND_MODE: u16 = 0x1010;
    pub const BONE: u16 = 0x2000;
    pub const BONE_PARENT: u16 = 0x3000;
    pub const ANIMATION: u16 = 0x4000;
    pub const ANIMATION_TRACK: u16 = 0x4100;
    pub const ANIMATION_TRACK_KEYFRAME: u16 = 0x4110;
    pub const ANIMATION_LINK: u16 = 0x5000;
}

/// Decoded bone chunk. Scale defaults to unit when the chunk body is too
/// short to contain it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkBone {
    pub handle: u16,
    pub name: String,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

/// (child, parent) handle pair declared by a bone-parent chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBoneParent {
    pub child: u16,
    pub parent: u16,
}

/// Raw keyframe; the translation is still in the parent bone's space here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkKeyframe {
    pub time: f32,
    pub rotation: Quat,
    pub translation: Vec3,
    pub scale: Vec3,
}

/// Keyframe track for one bone handle.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkAnimationTrack {
    pub bone: u16,
    pub keyframes: Vec<ChunkKeyframe>,
}

/// Named animation with its tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkAnimation {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<ChunkAnimationTrack>,
}

/// Reference to an external skeleton whose animations should be reused.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkAnimationLink {
    pub file: String,
    pub scale: Vec3,
}

/// Closed union over skeleton-domain chunks.
#[derive(Debug, Clone, PartialEq)]
pub enum SkeletonChunk {
    /// File header, version already validated.
    FileHeader,
    /// Bone-blend mode: 0 = average, 1 = cumulative.
    BlendMode(u16),
    Bone(ChunkBone),
    BoneParent(ChunkBoneParent),
    Animation(ChunkAnimation),
    Track(ChunkAnimationTrack),
    Keyframe(ChunkKeyframe),
    AnimationLink(ChunkAnimationLink),
    /// Unknown chunk; its body has been consumed.
    Ignored(u16),
}

/// Read one chunk, header included, dispatching on the chunk id.
pub fn read_chunk(cursor: &mut DataStream) -> Result<SkeletonChunk, LoadError> {
    let chunk_id = cursor.read_u16()?;

    // The file header has no length field.
    if chunk_id == id::HEADER {
        let version = cursor.read_string()?;
        if version != SKELETON_VERSION {
            return Err(LoadError::InvalidVersion(version));
        }
        return Ok(SkeletonChunk::FileHeader);
    }

    let body_len = read_body_len(cursor)?;
    let body_start = cursor.position();
    match chunk_id {
        id::BLEND_MODE => Ok(SkeletonChunk::BlendMode(cursor.read_u16()?)),
        id::BONE => Ok(SkeletonChunk::Bone(read_bone(cursor, body_start, body_len)?)),
        id::BONE_PARENT => Ok(SkeletonChunk::BoneParent(ChunkBoneParent {
            child: cursor.read_u16()?,
            parent: cursor.read_u16()?,
        })),
        id::ANIMATION => Ok(SkeletonChunk::Animation(read_animation(cursor)?)),
        id::ANIMATION_TRACK => Ok(SkeletonChunk::Track(read_track(cursor)?)),
        id::ANIMATION_TRACK_KEYFRAME => Ok(SkeletonChunk::Keyframe(read_keyframe(
            cursor, body_start, body_len,
        )?)),
        id::ANIMATION_LINK => Ok(SkeletonChunk::AnimationLink(ChunkAnimationLink {
            file: cursor.read_string()?,
            scale: read_vec3(cursor)?,
        })),
        other => {
            log::warn!("skeleton loader: skipping unhandled chunk type {other:#06x}");
            cursor.skip(body_len as usize)?;
            Ok(SkeletonChunk::Ignored(other))
        }
    }
}

fn read_bone(
    cursor: &mut DataStream,
    body_start: usize,
    body_len: u32,
) -> Result<ChunkBone, LoadError> {
    let name = cursor.read_string()?;
    let handle = cursor.read_u16()?;
    let position = read_vec3(cursor)?;
    let orientation = read_quat(cursor)?;
    // Trailing scale is present only if the declared body is long enough
    let scale = if body_has_remaining(cursor, body_start, body_len) {
        read_vec3(cursor)?
    } else {
        Vec3::ONE
    };
    Ok(ChunkBone {
        handle,
        name,
        position,
        orientation,
        scale,
    })
}

fn read_animation(cursor: &mut DataStream) -> Result<ChunkAnimation, LoadError> {
    let name = cursor.read_string()?;
    let duration = cursor.read_f32()?;
    let mut tracks = Vec::new();
    while !cursor.at_eof() && peek_id(cursor)? == id::ANIMATION_TRACK {
        match read_chunk(cursor)? {
            SkeletonChunk::Track(track) => tracks.push(track),
            _ => unreachable!("peeked id guarantees a track chunk"),
        }
    }
    Ok(ChunkAnimation {
        name,
        duration,
        tracks,
    })
}

fn read_track(cursor: &mut DataStream) -> Result<ChunkAnimationTrack, LoadError> {
    let bone = cursor.read_u16()?;
    let mut keyframes = Vec::new();
    while !cursor.at_eof() && peek_id(cursor)? == id::ANIMATION_TRACK_KEYFRAME {
        match read_chunk(cursor)? {
            SkeletonChunk::Keyframe(keyframe) => keyframes.push(keyframe),
            _ => unreachable!("peeked id guarantees a keyframe chunk"),
        }
    }
    Ok(ChunkAnimationTrack { bone, keyframes })
}

fn read_keyframe(
    cursor: &mut DataStream,
    body_start: usize,
    body_len: u32,
) -> Result<ChunkKeyframe, LoadError> {
    let time = cursor.read_f32()?;
    let rotation = read_quat(cursor)?;
    let translation = read_vec3(cursor)?;
    let scale = if body_has_remaining(cursor, body_start, body_len) {
        read_vec3(cursor)?
    } else {
        Vec3::ONE
    };
    Ok(ChunkKeyframe {
        time,
        rotation,
        translation,
        scale,
    })
}

fn read_vec3(cursor: &mut DataStream) -> Result<Vec3, LoadError> {
    Ok(Vec3::new(
        cursor.read_f32()?,
        cursor.read_f32()?,
        cursor.read_f32()?,
    ))
}

fn read_quat(cursor: &mut DataStream) -> Result<Quat, LoadError> {
    let x = cursor.read_f32()?;
    let y = cursor.read_f32()?;
    let z = cursor.read_f32()?;
    let w = cursor.read_f32()?;
    Ok(Quat::from_xyzw(x, y, z, w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::CHUNK_HEADER_SIZE;

    fn chunk(id: u16, body: &[u8]) -> Vec<u8> {
        let mut out = id.to_le_bytes().to_vec();
        out.extend_from_slice(&(CHUNK_HEADER_SIZE + body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn bone_body(name: &str, handle: u16, scale: Option<[f32; 3]>) -> Vec<u8> {
        let mut body = (name.len() as u32).to_le_bytes().to_vec();
        body.extend_from_slice(name.as_bytes());
        body.extend_from_slice(&handle.to_le_bytes());
        for f in [0.0f32, 1.0, 2.0] {
            body.extend_from_slice(&f.to_le_bytes());
        }
        for f in [0.0f32, 0.0, 0.0, 1.0] {
            body.extend_from_slice(&f.to_le_bytes());
        }
        if let Some(scale) = scale {
            for f in scale {
                body.extend_from_slice(&f.to_le_bytes());
            }
        }
        body
    }

    #[test]
    fn test_bone_without_scale_defaults_to_unit() {
        let data = chunk(id::BONE, &bone_body("spine", 3, None));
        let mut cursor = DataStream::new(&data);
        let SkeletonChunk::Bone(bone) = read_chunk(&mut cursor).unwrap() else {
            panic!("expected bone chunk");
        };
        assert_eq!(bone.handle, 3);
        assert_eq!(bone.name, "spine");
        assert_eq!(bone.position, Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(bone.scale, Vec3::ONE);
        assert!(cursor.at_eof());
    }

    #[test]
    fn test_bone_with_trailing_scale() {
        let data = chunk(id::BONE, &bone_body("spine", 3, Some([2.0, 2.0, 2.0])));
        let mut cursor = DataStream::new(&data);
        let SkeletonChunk::Bone(bone) = read_chunk(&mut cursor).unwrap() else {
            panic!("expected bone chunk");
        };
        assert_eq!(bone.scale, Vec3::splat(2.0));
        assert!(cursor.at_eof());
    }

    #[test]
    fn test_keyframe_scale_is_length_driven() {
        let mut body = Vec::new();
        for f in [0.5f32, 0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 3.0] {
            body.extend_from_slice(&f.to_le_bytes());
        }
        let data = chunk(id::ANIMATION_TRACK_KEYFRAME, &body);
        let mut cursor = DataStream::new(&data);
        let SkeletonChunk::Keyframe(kf) = read_chunk(&mut cursor).unwrap() else {
            panic!("expected keyframe chunk");
        };
        assert_eq!(kf.time, 0.5);
        assert_eq!(kf.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(kf.scale, Vec3::ONE);
    }

    #[test]
    fn test_header_rejects_close_version_string() {
        // One byte different from the supported marker
        let mut data = id::HEADER.to_le_bytes().to_vec();
        let version = b"[Serializer_v1.11]";
        data.extend_from_slice(&(version.len() as u32).to_le_bytes());
        data.extend_from_slice(version);
        let mut cursor = DataStream::new(&data);
        assert!(matches!(
            read_chunk(&mut cursor),
            Err(LoadError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_unknown_chunk_consumes_exact_body() {
        let mut data = chunk(0x7777, &[1, 2, 3, 4, 5]);
        data.extend_from_slice(&chunk(id::BONE_PARENT, &[1, 0, 0, 0]));
        let mut cursor = DataStream::new(&data);
        assert_eq!(read_chunk(&mut cursor).unwrap(), SkeletonChunk::Ignored(0x7777));
        assert_eq!(
            read_chunk(&mut cursor).unwrap(),
            SkeletonChunk::BoneParent(ChunkBoneParent { child: 1, parent: 0 })
        );
        assert!(cursor.at_eof());
    }
}
