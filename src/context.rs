use crate::{
    error::Result,
    message_store::{Message, MessageStore},
};

/// Messages shown on each side of a match.
pub const CONTEXT_RADIUS: u64 = 2;

/// Inclusive sequence bounds of the window around position `p`.
///
/// The lower bound clamps at zero. The upper bound is not clamped to the
/// thread length; the store returns only what exists.
pub fn window_bounds(p: u64) -> (u64, u64) {
    (
        p.saturating_sub(CONTEXT_RADIUS),
        p.saturating_add(CONTEXT_RADIUS),
    )
}

/// Fetches the neighbourhood of a matched message. Nothing is cached.
#[derive(Clone, Copy)]
pub struct ContextAssembler<'a> {
    store: &'a dyn MessageStore,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(store: &'a dyn MessageStore) -> Self {
        Self { store }
    }

    /// Messages of `thread_id` around sequence `p`, ascending.
    pub fn window(&self, thread_id: &str, p: u64) -> Result<Vec<Message>> {
        let (lo, hi) = window_bounds(p);
        self.store.messages_in_range(thread_id, lo, hi)
    }
}
