//! Skeleton assembly
//!
//! Walks the decoded skeleton chunk stream and builds the bone arena,
//! resolves parent links, re-bases animation keyframes into bone-local
//! space and composes the root-to-bone transforms. Bones end up in
//! depth-first order from the master bone, so a parent always precedes its
//! children and composition is a single forward pass.

use crate::chunks::peek_id;
use crate::chunks::skeleton::{self as chunks, ChunkAnimation, ChunkBone, SkeletonChunk, id};
use crate::error::LoadError;
use crate::model::{Animation, Bone, Keyframe, Skeleton, Track, Transform};
use crate::stream::DataStream;
use hashbrown::HashMap;

/// Bone as collected from the chunk stream, with links still expressed as
/// indices into the collection order.
struct RawBone {
    chunk: ChunkBone,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Decode a complete skeleton file into an assembled [`Skeleton`].
pub(crate) fn read_skeleton(data: &[u8]) -> Result<Skeleton, LoadError> {
    let mut cursor = DataStream::new(data);

    // First chunk must be the header
    if peek_id(&mut cursor)? != id::HEADER {
        return Err(LoadError::InvalidVersion(
            "<missing skeleton file header>".into(),
        ));
    }
    chunks::read_chunk(&mut cursor)?;

    let mut raw: Vec<RawBone> = Vec::new();
    let mut by_handle: HashMap<u16, usize> = HashMap::new();
    let mut animations: Vec<ChunkAnimation> = Vec::new();

    while !cursor.at_eof() {
        match peek_id(&mut cursor)? {
            id::BLEND_MODE | id::BONE | id::BONE_PARENT | id::ANIMATION | id::ANIMATION_LINK => {}
            _ => break,
        }
        match chunks::read_chunk(&mut cursor)? {
            SkeletonChunk::BlendMode(mode) => {
                // 0 is average, 1 is cumulative; only averaging is
                // implemented. Known format-compatibility gap.
                if mode != 0 {
                    log::warn!(
                        "skeleton loader: cumulative bone blending not implemented, \
                         proceeding with averaging"
                    );
                }
            }
            SkeletonChunk::Bone(bone) => {
                if by_handle.contains_key(&bone.handle) {
                    return Err(LoadError::IdNotUnique {
                        handle: bone.handle,
                    });
                }
                by_handle.insert(bone.handle, raw.len());
                raw.push(RawBone {
                    chunk: bone,
                    parent: None,
                    children: Vec::new(),
                });
            }
            SkeletonChunk::BoneParent(link) => {
                let child = *by_handle
                    .get(&link.child)
                    .ok_or(LoadError::BoneNotFound { handle: link.child })?;
                let parent = *by_handle
                    .get(&link.parent)
                    .ok_or(LoadError::BoneNotFound {
                        handle: link.parent,
                    })?;
                raw[child].parent = Some(parent);
                raw[parent].children.push(child);
            }
            SkeletonChunk::Animation(animation) => {
                // Collected for later: track fixup needs the dense bone
                // indices, which don't exist until all bones are linked
                animations.push(animation);
            }
            SkeletonChunk::AnimationLink(link) => {
                log::warn!(
                    "skeleton loader: animation links not implemented, skipping {:?}",
                    link.file
                );
            }
            SkeletonChunk::Ignored(_) => {}
            other => {
                log::warn!("skeleton loader: unexpected {other:?} at skeleton top level");
            }
        }
    }

    // Exactly one bone may be without a parent: the master bone
    let mut roots = raw
        .iter()
        .enumerate()
        .filter(|(_, bone)| bone.parent.is_none())
        .map(|(i, _)| i);
    let root = match (roots.next(), roots.next()) {
        (Some(root), None) => root,
        _ => return Err(LoadError::MissingMasterBone),
    };

    // Depth-first order from the master bone; parents precede children
    let mut order = Vec::with_capacity(raw.len());
    let mut stack = vec![root];
    while let Some(i) = stack.pop() {
        order.push(i);
        for &child in raw[i].children.iter().rev() {
            stack.push(child);
        }
    }

    let dense: HashMap<usize, usize> = order
        .iter()
        .enumerate()
        .map(|(dense_index, &raw_index)| (raw_index, dense_index))
        .collect();
    let mut bones: Vec<Bone> = order
        .iter()
        .map(|&raw_index| {
            let bone = &raw[raw_index];
            let transform = Transform {
                rotate: bone.chunk.orientation,
                scale: bone.chunk.scale,
                translate: bone.chunk.position,
            };
            Bone {
                handle: bone.chunk.handle,
                name: bone.chunk.name.clone(),
                parent: bone.parent.map(|p| dense[&p]),
                children: bone.children.iter().map(|c| dense[c]).collect(),
                transform,
                inverse_transform: transform.inverse(),
            }
        })
        .collect();
    let handle_to_index: HashMap<u16, usize> = bones
        .iter()
        .enumerate()
        .map(|(i, bone)| (bone.handle, i))
        .collect();

    // Fixup animations. This happens while the bones still hold their
    // local transforms: keyframe translations arrive in the parent's space
    // and are re-based into the bone's own rest-local space exactly once.
    let mut animation_map = HashMap::with_capacity(animations.len());
    for chunk_animation in animations {
        let mut tracks: Vec<Option<Track>> = vec![None; bones.len()];
        for chunk_track in chunk_animation.tracks {
            let bone_index = *handle_to_index
                .get(&chunk_track.bone)
                .ok_or(LoadError::BoneNotFound {
                    handle: chunk_track.bone,
                })?;
            if tracks[bone_index].is_some() {
                return Err(LoadError::MultipleSingletonChunks(
                    "only one track per bone is allowed within an animation",
                ));
            }
            let inverse = bones[bone_index].inverse_transform;
            let mut keyframes: Vec<Keyframe> = chunk_track
                .keyframes
                .iter()
                .map(|kf| Keyframe {
                    time: kf.time,
                    transform: Transform {
                        rotate: kf.rotation,
                        scale: kf.scale,
                        translate: inverse.rotate * (inverse.scale * kf.translation),
                    },
                })
                .collect();
            keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
            tracks[bone_index] = Some(Track { keyframes });
        }
        animation_map.insert(
            chunk_animation.name.clone(),
            Animation {
                name: chunk_animation.name,
                duration: chunk_animation.duration,
                tracks,
            },
        );
    }

    // Compose transforms root-first; the depth-first bone order guarantees
    // every parent is already composed when its children are visited
    for i in 0..bones.len() {
        if let Some(parent) = bones[i].parent {
            let composed = bones[parent].transform * bones[i].transform;
            bones[i].transform = composed;
            bones[i].inverse_transform = composed.inverse();
        }
    }

    Ok(Skeleton {
        bones,
        animations: animation_map,
    })
}
