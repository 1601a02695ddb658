//! Committed-node registry - index allocation with generations.
//!
//! Manages the lifecycle of committed node slots:
//! - Free index pool for O(1) reuse
//! - Generation per slot so a stale [`NodeId`] never resolves to the node
//!   that later reused its index
//! - Allocated count for leak checks in tests
//!
//! Released ids are dead forever. Anything that may outlive a node (scheduler
//! entries, animation callbacks, handles) holds a `NodeId` and re-checks it.

use std::fmt;

use super::mounted::Mounted;

/// Handle to a committed node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

// =============================================================================
// Registry State
// =============================================================================

struct Slot {
    generation: u32,
    node: Option<Mounted>,
}

#[derive(Default)]
pub(crate) struct Registry {
    slots: Vec<Slot>,
    /// Pool of freed indices for reuse.
    free: Vec<u32>,
    allocated: usize,
}

impl Registry {
    // =========================================================================
    // Index Allocation
    // =========================================================================

    /// Allocate a slot for a new committed node.
    pub fn allocate(&mut self, node: Mounted) -> NodeId {
        self.allocated += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    /// Release a slot back to the pool, returning its node.
    ///
    /// Stale or already released ids return `None`.
    pub fn release(&mut self, id: NodeId) -> Option<Mounted> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.allocated -= 1;
        Some(node)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn get(&self, id: NodeId) -> Option<&Mounted> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Mounted> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated
    }
}
