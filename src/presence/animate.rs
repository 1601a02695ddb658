//! Enter, exit and reclaim transitions on committed host elements.

use super::{Direction, PresenceState};
use crate::dom::Animation;
use crate::engine::mounted::{Mounted, MountedKind};
use crate::engine::{NodeId, Place, Runtime};
use crate::error::RenderError;
use crate::vnode::{Element, Task};

impl Runtime {
    /// Play the enter transition of `id` after the current commit.
    ///
    /// Queued behind the element's listener and connect tasks.
    pub(crate) fn enqueue_enter(&self, id: NodeId) {
        let weak = self.weak();
        self.enqueue_tasks([Box::new(move || {
            if let Some(runtime) = weak.upgrade() {
                runtime.start_enter(id);
            }
        }) as Task]);
    }

    fn start_enter(&self, id: NodeId) {
        let Some((dom, enter)) = self
            .with_node(id, |n| {
                let host = n.as_host()?;
                if host.state != PresenceState::Idle {
                    return None;
                }
                Some((host.dom, host.presence.as_ref()?.enter.clone()?))
            })
            .flatten()
        else {
            return;
        };
        let doc = self.doc();
        if !doc.is_connected(dom) {
            return;
        }
        let (frames, timing) = enter.resolve(Direction::Enter, self.options());
        let animation = doc.animate(dom, frames, timing);
        self.set_animation(id, PresenceState::Entering, animation.clone());
        self.settle_on_finish(id, &animation);
    }

    /// Back to `Idle` once the entering animation of `id` finishes.
    fn settle_on_finish(&self, id: NodeId, animation: &Animation) {
        let weak = self.weak();
        let animation_id = animation.id();
        animation.on_finish(move || {
            let Some(runtime) = weak.upgrade() else {
                return;
            };
            runtime.with_node_mut(id, |n| {
                if let Some(host) = n.as_host_mut() {
                    let current = host.animation.as_ref().map(Animation::id);
                    if host.state == PresenceState::Entering && current == Some(animation_id) {
                        host.state = PresenceState::Idle;
                    }
                }
            });
        });
    }

    fn set_animation(&self, id: NodeId, state: PresenceState, animation: Animation) {
        self.with_node_mut(id, |n| {
            if let Some(host) = n.as_host_mut() {
                host.state = state;
                host.animation = Some(animation);
            }
        });
    }

    /// Remove a host element, animating it out when `animate` is set and the
    /// element has an exit transition.
    ///
    /// An animating element stays attached and listed as exiting until its
    /// animation finishes.
    pub(crate) fn remove_host(&self, id: NodeId, animate: bool) {
        let Some((dom, tag, key, state, exit, animation)) = self
            .with_node(id, |n| {
                let host = n.as_host()?;
                Some((
                    host.dom,
                    host.tag.clone(),
                    n.key.clone(),
                    host.state,
                    host.presence.as_ref().and_then(|p| p.exit.clone()),
                    host.animation.clone(),
                ))
            })
            .flatten()
        else {
            return;
        };
        if state == PresenceState::Exiting && animate {
            return;
        }

        let doc = self.doc();
        if let (true, Some(exit)) = (animate && state != PresenceState::Exiting, exit) {
            let running_enter = animation
                .as_ref()
                .filter(|a| state == PresenceState::Entering && a.is_running());
            let exit_animation = match running_enter {
                Some(running) => {
                    running.reverse();
                    running.clone()
                }
                None => {
                    if let Some(previous) = &animation {
                        previous.cancel();
                    }
                    let (frames, timing) = exit.resolve(Direction::Exit, self.options());
                    doc.animate(dom, frames, timing)
                }
            };
            self.set_animation(id, PresenceState::Exiting, exit_animation.clone());
            self.exiting
                .borrow_mut()
                .add(id, dom, doc.parent(dom), &tag, key);

            let weak = self.weak();
            exit_animation.on_finish(move || {
                if let Some(runtime) = weak.upgrade() {
                    runtime.complete_exit(id);
                }
            });
            return;
        }

        if let Some(animation) = animation.filter(Animation::is_running) {
            animation.cancel();
        }
        doc.remove(dom);
        self.cleanup(id);
    }

    /// Detach an element whose exit animation finished, unless it was
    /// reclaimed in the meantime.
    fn complete_exit(&self, id: NodeId) {
        let dom = self
            .with_node(id, |n| {
                n.as_host()
                    .filter(|h| h.state == PresenceState::Exiting)
                    .map(|h| h.dom)
            })
            .flatten();
        let Some(dom) = dom else {
            return;
        };
        log::trace!("exit finished for {id:?}");
        self.doc().remove(dom);
        self.cleanup(id);
    }

    /// Take over an exiting element for a new keyed element of the same tag.
    ///
    /// The DOM node, listeners, abort controller and animation move to a new
    /// committed node. A running exit animation is reversed into an enter.
    /// Props and children are then diffed onto the element as an update.
    pub(crate) fn reclaim(&self, exiting: NodeId, element: Element, place: Place) -> Result<NodeId, RenderError> {
        let released = self.registry.borrow_mut().release(exiting);
        let Some(Mounted {
            kind: MountedKind::Host(mut host),
            ..
        }) = released
        else {
            return self.insert_host(element, place);
        };

        let reversed = match host.animation.as_ref() {
            Some(animation) if animation.is_running() => {
                animation.reverse();
                host.state = PresenceState::Entering;
                Some(animation.clone())
            }
            _ => {
                host.state = PresenceState::Idle;
                None
            }
        };
        let dom = host.dom;
        let id = self.allocate(Mounted::new(
            element.props.key.clone(),
            place.parent,
            MountedKind::Host(host),
        ));
        if let Some(animation) = &reversed {
            self.settle_on_finish(id, animation);
        }
        log::trace!("reclaimed exiting element {exiting:?} as {id:?}");

        let doc = self.doc();
        let anchor = self.insertion_anchor(place);
        let in_place = doc.parent(dom) == Some(place.dom_parent) && doc.next_sibling(dom) == anchor;
        if !in_place && anchor != Some(dom) {
            doc.insert_before(place.dom_parent, dom, anchor);
        }
        self.diff_host(id, element)
    }
}
