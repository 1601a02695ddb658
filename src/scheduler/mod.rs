//! Scheduler - batched component re-renders and post-commit tasks.
//!
//! Work is queued synchronously and run once per microtask:
//!
//! ```text
//! handle.update() ──► enqueue(node, target) ─┐
//! queue_task(f)   ──► enqueue_tasks(..)   ───┼─► one microtask ──► flush()
//! mount/diff      ──► enqueue_tasks(..)   ───┘
//! ```
//!
//! A flush runs in a fixed order:
//!
//! 1. Take the pending set and the task list. Anything queued from here on
//!    lands in the next flush.
//! 2. Mark and measure layout-tracked elements below every pending parent.
//! 3. Capture focus and selection.
//! 4. Drop every pending component that has a pending ancestor, then re-render
//!    the rest.
//! 5. Restore focus and selection if the patch lost them.
//! 6. Play FLIP animations against the post-patch positions.
//! 7. Run the tasks, each exactly once.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::dom::{Document, DomId};
use crate::engine::{NodeId, Place, Runtime};
use crate::types::KeyframeOptions;
use crate::vnode::Task;

// =============================================================================
// State
// =============================================================================

/// Where a component's content lives in the DOM, captured when it was last
/// diffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UpdateTarget {
    pub dom_parent: DomId,
    pub anchor: Option<DomId>,
}

impl From<Place> for UpdateTarget {
    fn from(place: Place) -> Self {
        Self {
            dom_parent: place.dom_parent,
            anchor: place.anchor,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    node: NodeId,
    target: UpdateTarget,
}

#[derive(Default)]
pub(crate) struct Scheduler {
    pending: Vec<Pending>,
    /// Position of each node in `pending`.
    index: FxHashMap<NodeId, usize>,
    tasks: Vec<Task>,
    flush_scheduled: bool,
}

impl Scheduler {
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn task_len(&self) -> usize {
        self.tasks.len()
    }

    fn take(&mut self) -> (Vec<Pending>, Vec<Task>) {
        self.flush_scheduled = false;
        self.index.clear();
        (std::mem::take(&mut self.pending), std::mem::take(&mut self.tasks))
    }
}

/// Focus and selection saved across a flush.
#[derive(Debug, Clone, Copy)]
struct DocumentState {
    active: Option<DomId>,
    selection: Option<(u32, u32)>,
}

impl DocumentState {
    fn capture(doc: &Document) -> Self {
        Self {
            active: doc.active_element(),
            selection: doc.selection(),
        }
    }

    fn restore(self, doc: &Document) {
        let Some(active) = self.active else {
            return;
        };
        if doc.active_element() == Some(active) || !doc.is_connected(active) {
            return;
        }
        match self.selection {
            Some((start, end)) => doc.set_selection(active, start, end),
            None => doc.focus(active),
        }
    }
}

// =============================================================================
// Runtime API
// =============================================================================

impl Runtime {
    /// Schedule a re-render of component `node` into `target`.
    ///
    /// A second enqueue before the flush only replaces the target.
    pub(crate) fn enqueue(&self, node: NodeId, target: UpdateTarget) {
        {
            let mut scheduler = self.scheduler.borrow_mut();
            let scheduler = &mut *scheduler;
            match scheduler.index.get(&node) {
                Some(&position) => scheduler.pending[position].target = target,
                None => {
                    scheduler.index.insert(node, scheduler.pending.len());
                    scheduler.pending.push(Pending { node, target });
                }
            }
        }
        self.schedule_flush();
    }

    /// Queue tasks for after the next commit.
    pub fn enqueue_tasks(&self, tasks: impl IntoIterator<Item = Task>) {
        let added = {
            let mut scheduler = self.scheduler.borrow_mut();
            let before = scheduler.tasks.len();
            scheduler.tasks.extend(tasks);
            scheduler.tasks.len() > before
        };
        if added {
            self.schedule_flush();
        }
    }

    /// Number of components waiting for a re-render.
    pub fn pending_updates(&self) -> usize {
        self.scheduler.borrow().pending_len()
    }

    /// Number of post-commit tasks waiting for the next flush.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.borrow().task_len()
    }

    fn schedule_flush(&self) {
        {
            let mut scheduler = self.scheduler.borrow_mut();
            if scheduler.flush_scheduled {
                return;
            }
            scheduler.flush_scheduled = true;
        }
        let weak = self.weak();
        self.queue_microtask(move || {
            if let Some(runtime) = weak.upgrade() {
                runtime.flush();
            }
        });
    }

    /// Run the pending batch now.
    pub fn flush(&self) {
        let (pending, tasks) = self.scheduler.borrow_mut().take();
        if pending.is_empty() && tasks.is_empty() {
            return;
        }
        let doc = self.doc();
        let pending: Vec<Pending> = pending.into_iter().filter(|p| self.is_mounted(p.node)).collect();

        let parents: Vec<DomId> = pending.iter().map(|p| p.target.dom_parent).collect();
        if !parents.is_empty() {
            let mut layout = self.layout.borrow_mut();
            layout.mark_pending(doc, &parents);
            layout.snapshot(doc);
        }
        let saved = DocumentState::capture(doc);

        let survivors = self.prune_dominated(&pending);
        let skipped = pending.len() - survivors.len();
        let mut rendered = 0;
        for entry in survivors {
            if self.rerender(entry) {
                rendered += 1;
            }
        }

        saved.restore(doc);
        let animated = if parents.is_empty() {
            0
        } else {
            let options = KeyframeOptions {
                duration: self.options().layout_duration,
                easing: self.options().easing.clone(),
            };
            self.layout.borrow_mut().apply(doc, options)
        };

        let task_count = tasks.len();
        for task in tasks {
            task();
        }
        log::debug!(
            "flush: {rendered} re-rendered, {skipped} covered by an ancestor, {animated} layout animations, {task_count} tasks"
        );
    }

    /// Pending entries with no pending strict ancestor, in enqueue order.
    ///
    /// Ancestry is read from the committed tree as it stands before any of
    /// the batch re-renders.
    fn prune_dominated(&self, pending: &[Pending]) -> Vec<Pending> {
        let scheduled: FxHashSet<NodeId> = pending.iter().map(|p| p.node).collect();
        // Nodes known to have no pending strict ancestor.
        let mut clear: FxHashSet<NodeId> = FxHashSet::default();
        let mut survivors = Vec::with_capacity(pending.len());

        for entry in pending {
            let mut path = vec![entry.node];
            let mut dominated = false;
            let mut current = self.parent_of(entry.node);
            while let Some(ancestor) = current {
                if scheduled.contains(&ancestor) {
                    dominated = true;
                    break;
                }
                if clear.contains(&ancestor) {
                    break;
                }
                path.push(ancestor);
                current = self.parent_of(ancestor);
            }
            if dominated {
                log::trace!("skipping {:?}: an ancestor re-renders in this batch", entry.node);
                continue;
            }
            clear.extend(path);
            survivors.push(*entry);
        }
        survivors
    }

    /// Re-render one component. Returns whether its render function ran.
    fn rerender(&self, entry: Pending) -> bool {
        let node = entry.node;
        let Some((svg, parent)) = self
            .with_node(node, |n| n.as_component().map(|c| (c.svg, n.parent)))
            .flatten()
        else {
            return false;
        };
        let doc = self.doc();
        let target = entry.target;
        let anchor = target
            .anchor
            .filter(|&anchor| doc.parent(anchor) == Some(target.dom_parent))
            .or_else(|| self.anchor_after(node));
        let place = Place {
            dom_parent: target.dom_parent,
            anchor,
            parent,
            svg,
        };

        self.enter_diff();
        let result = self.render_component(node, place);
        self.exit_diff();
        if let Err(err) = result {
            self.route_error(parent, err);
        }
        true
    }
}
