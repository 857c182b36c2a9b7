use serde::{Deserialize, Serialize};

use crate::piece::{Piece, PieceId};

/// Free-list bound. Pieces released past this are discarded, not retained.
pub const POOL_CAPACITY: usize = 60;

/// Free-list entries constructed up front.
pub const POOL_PREWARM: usize = 30;

/// Recycler for piece entities. Every piece is in exactly one of the free
/// list or the active set; all operations are total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecePool {
    free: Vec<Piece>,
    active: Vec<Piece>,
    next_id: PieceId,
    capacity: usize,
}

impl PiecePool {
    pub fn new() -> Self {
        Self::with_capacity(POOL_CAPACITY, POOL_PREWARM)
    }

    pub fn with_capacity(capacity: usize, prewarm: usize) -> Self {
        let prewarm = prewarm.min(capacity);
        Self {
            free: (0..prewarm).map(|_| Piece::new(0)).collect(),
            active: Vec::new(),
            next_id: 1,
            capacity,
        }
    }

    /// Hands out a recycled or freshly constructed piece under a new id and
    /// moves it to the active set. Ids are never reused.
    pub fn acquire(&mut self) -> PieceId {
        let mut piece = self.free.pop().unwrap_or_else(|| Piece::new(0));
        piece.reset();
        piece.id = self.next_id;
        self.next_id += 1;
        let id = piece.id;
        self.active.push(piece);
        id
    }

    /// Resets the piece and returns it to the free list, or discards it when
    /// the list is full. Unknown ids are a no-op.
    pub fn release(&mut self, id: PieceId) -> bool {
        let Some(index) = self.active.iter().position(|p| p.id == id) else {
            return false;
        };
        let mut piece = self.active.remove(index);
        if self.free.len() < self.capacity {
            piece.reset();
            self.free.push(piece);
        }
        true
    }

    pub fn contains(&self, id: PieceId) -> bool {
        self.active.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.active.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.active.iter_mut().find(|p| p.id == id)
    }

    pub fn active(&self) -> &[Piece] {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut [Piece] {
        &mut self.active
    }

    pub fn active_ids(&self) -> Vec<PieceId> {
        self.active.iter().map(|p| p.id).collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Releases every active piece; returns the ids for host-side teardown.
    pub fn release_all(&mut self) -> Vec<PieceId> {
        let ids = self.active_ids();
        for id in &ids {
            self.release(*id);
        }
        ids
    }

    /// Releases pieces whose top edge pokes above `y` (revive sweep).
    pub fn release_above(&mut self, y: f32) -> Vec<PieceId> {
        let ids: Vec<PieceId> = self
            .active
            .iter()
            .filter(|p| p.top() > y)
            .map(|p| p.id)
            .collect();
        for id in &ids {
            self.release(*id);
        }
        ids
    }
}

impl Default for PiecePool {
    fn default() -> Self {
        Self::new()
    }
}
