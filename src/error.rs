//! Loader error types
//!
//! Every error is fatal for the decode it occurs in: the loader never
//! returns a partial mesh. Variants carry the offending chunk id, bone
//! handle or vertex index where one exists, so callers can log a useful
//! reason for the rejected asset.

/// Errors produced while decoding a mesh or skeleton file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    /// Header chunk's version string is not in the supported table
    #[error("unsupported format version: {0:?}")]
    InvalidVersion(String),
    /// A read ran past the end of the buffer, or a vertex buffer is smaller
    /// than its declared stride and vertex count require
    #[error("not enough data: {0}")]
    InsufficientData(&'static str),
    /// Duplicate single-valued semantic within one vertex declaration
    #[error("invalid vertex declaration: semantic {semantic:?} declared more than once")]
    InvalidVertexDeclaration { semantic: u16 },
    /// Declaration element type outside the known range
    #[error("invalid vertex element type: {0}")]
    InvalidVertexType(u16),
    /// Declaration element semantic outside the known range
    #[error("invalid vertex element semantic: {0}")]
    InvalidVertexSemantic(u16),
    /// Declared stride too small to hold all element offsets bound to a stream
    #[error("vertices overlapping in stream {stream}")]
    VerticesOverlapping { stream: u16 },
    /// A declaration element references a stream with no bound vertex buffer
    #[error("vertex element references unbound stream {stream}")]
    UnboundStream { stream: u16 },
    /// A submesh declares both shared vertices and an owned geometry chunk
    #[error("submesh with shared vertices may not carry its own geometry")]
    SharedVertexGeometryForbidden,
    /// Second occurrence of a chunk type allowed at most once in its context
    #[error("multiple singleton chunks: {0}")]
    MultipleSingletonChunks(&'static str),
    /// Submesh operation value outside the known range
    #[error("invalid submesh operation: {0}")]
    InvalidSubmeshOp(u16),
    /// Bone assignment references a vertex index past the owning geometry
    #[error("bone assignment references vertex {vertex} out of range")]
    VertexNotFound { vertex: u32 },
    /// A parent link, bone assignment or animation track names an unknown bone
    #[error("bone handle {handle} not found")]
    BoneNotFound { handle: u16 },
    /// Two bones in one skeleton share a handle
    #[error("bone handle {handle} is not unique")]
    IdNotUnique { handle: u16 },
    /// Zero or more than one bone has no parent
    #[error("skeleton does not have exactly one master bone")]
    MissingMasterBone,
    /// Bounding box degenerate on the Y or Z axis
    #[error("mesh bounding box is empty")]
    EmptyBoundingBox,
    /// Structurally valid but unsupported feature
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            LoadError::InvalidVersion("[MeshSerializer_v9.99]".into()).to_string(),
            "unsupported format version: \"[MeshSerializer_v9.99]\""
        );
        assert_eq!(
            LoadError::UnboundStream { stream: 2 }.to_string(),
            "vertex element references unbound stream 2"
        );
        assert_eq!(
            LoadError::BoneNotFound { handle: 7 }.to_string(),
            "bone handle 7 not found"
        );
        assert_eq!(
            LoadError::InsufficientData("truncated chunk body").to_string(),
            "not enough data: truncated chunk body"
        );
    }
}
