use serde::{Deserialize, Serialize};

use crate::piece::{BodyKind, PieceId, Vec2f};

/// Commands for the physics collaborator, drained once per frame. The host
/// owns integration; the core only dictates body lifecycle and forces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum PhysicsCommand {
    /// Create a body for a newly spawned piece.
    Spawn {
        id: PieceId,
        pos: Vec2f,
        radius: f32,
        body: BodyKind,
        obstacle: bool,
        gravity_scale: f32,
    },
    Remove { id: PieceId },
    SetKinematic { id: PieceId },
    SetDynamic { id: PieceId, gravity_scale: f32 },
    SetGravityScale { id: PieceId, gravity_scale: f32 },
    Impulse { id: PieceId, impulse: Vec2f },
    Teleport { id: PieceId, pos: Vec2f },
}
