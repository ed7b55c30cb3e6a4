//! Error taxonomy for scene construction, mutation, and template import.

use crate::id::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown node type `{0}`")]
    InvalidNodeType(String),

    #[error("index {index} out of bounds for {len} layers")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("layer `{0}` is locked")]
    LockedLayerViolation(NodeId),

    #[error("malformed template JSON: {0}")]
    MalformedTemplateJson(String),

    #[error("could not resolve asset `{0}`")]
    AssetResolutionFailure(String),

    #[error("no node with id `{0}`")]
    UnknownNode(NodeId),

    #[error("no group with id `{0}`")]
    UnknownGroup(String),

    #[error("a group needs at least one layer")]
    EmptyGroup,

    #[error("invalid properties for `{id}`: {reason}")]
    InvalidProps { id: NodeId, reason: String },

    #[error("duplicate node id `{0}`")]
    DuplicateNodeId(NodeId),

    #[error("scene snapshot: {0}")]
    Snapshot(String),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
