//! Presence animations: enter, exit, reclaim and layout (FLIP).
//!
//! # Lifecycle of an animated host element
//!
//! ```text
//!            mount                       remove
//!   (none) ─────────▶ Entering ──────────────────────▶ Exiting ──finish──▶ detached
//!                        │   (reverse running enter)     │  ▲
//!                  finish│                               │  │ remove
//!                        ▼        remove (fresh exit)    │  │
//!                      Idle ─────────────────────────────┘  │
//!                        ▲                                  │
//!                        └──── reclaim (reverse exit) ◀─────┘
//! ```
//!
//! An exiting element stays attached and is listed in the [`ExitingRegistry`]
//! until its animation finishes. A keyed element of the same tag rendered
//! into the same DOM parent before then reclaims it instead of mounting a
//! fresh node.

mod animate;
mod layout;

pub(crate) use layout::LayoutTracker;

use crate::dom::DomId;
use crate::engine::{NodeId, Options};
use crate::types::{Key, Keyframe, KeyframeOptions};

// =============================================================================
// Configuration
// =============================================================================

/// Per-element animation descriptor (the `presence` prop).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Presence {
    pub(crate) enter: Option<Transition>,
    pub(crate) exit: Option<Transition>,
    pub(crate) layout: bool,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default fade in both directions.
    pub fn fade() -> Self {
        Self::new().enter(true).exit(true)
    }

    pub fn enter(mut self, transition: impl Into<TransitionSetting>) -> Self {
        self.enter = transition.into().0;
        self
    }

    pub fn exit(mut self, transition: impl Into<TransitionSetting>) -> Self {
        self.exit = transition.into().0;
        self
    }

    /// Animate position changes caused by re-renders.
    pub fn layout(mut self, enabled: bool) -> Self {
        self.layout = enabled;
        self
    }

    pub fn has_enter(&self) -> bool {
        self.enter.is_some()
    }

    pub fn has_exit(&self) -> bool {
        self.exit.is_some()
    }

    pub fn tracks_layout(&self) -> bool {
        self.layout
    }
}

/// One direction's animation.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Opacity fade using the runtime's default durations.
    Fade,
    Keyframes {
        frames: Vec<Keyframe>,
        options: Option<KeyframeOptions>,
    },
}

impl Transition {
    pub fn keyframes(frames: impl IntoIterator<Item = Keyframe>) -> Self {
        Transition::Keyframes {
            frames: frames.into_iter().collect(),
            options: None,
        }
    }

    /// Override timing. No effect on [`Transition::Fade`].
    pub fn with_options(self, options: KeyframeOptions) -> Self {
        match self {
            Transition::Keyframes { frames, .. } => Transition::Keyframes {
                frames,
                options: Some(options),
            },
            fade => fade,
        }
    }

    pub(crate) fn resolve(&self, direction: Direction, options: &Options) -> (Vec<Keyframe>, KeyframeOptions) {
        match self {
            Transition::Fade => {
                let (from, to, duration) = match direction {
                    Direction::Enter => ("0", "1", options.enter_duration),
                    Direction::Exit => ("1", "0", options.exit_duration),
                };
                (
                    vec![
                        Keyframe::new().set("opacity", from),
                        Keyframe::new().set("opacity", to),
                    ],
                    KeyframeOptions {
                        duration,
                        easing: options.easing.clone(),
                    },
                )
            }
            Transition::Keyframes { frames, options: timing } => {
                let timing = timing.clone().unwrap_or_else(|| KeyframeOptions {
                    duration: match direction {
                        Direction::Enter => options.enter_duration,
                        Direction::Exit => options.exit_duration,
                    },
                    easing: options.easing.clone(),
                });
                (frames.clone(), timing)
            }
        }
    }
}

/// Accepts `true`/`false` shorthand or an explicit [`Transition`].
pub struct TransitionSetting(Option<Transition>);

impl From<bool> for TransitionSetting {
    fn from(enabled: bool) -> Self {
        TransitionSetting(enabled.then_some(Transition::Fade))
    }
}

impl From<Transition> for TransitionSetting {
    fn from(transition: Transition) -> Self {
        TransitionSetting(Some(transition))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Enter,
    Exit,
}

/// Animation phase of a committed host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum PresenceState {
    #[default]
    Idle,
    Entering,
    Exiting,
}

// =============================================================================
// Exiting registry
// =============================================================================

#[derive(Debug, Clone)]
struct ExitingEntry {
    node: NodeId,
    dom: DomId,
    dom_parent: Option<DomId>,
    tag: String,
    key: Option<Key>,
}

/// Host elements that are animating out but still attached.
#[derive(Debug, Default)]
pub(crate) struct ExitingRegistry {
    entries: Vec<ExitingEntry>,
}

impl ExitingRegistry {
    pub fn add(&mut self, node: NodeId, dom: DomId, dom_parent: Option<DomId>, tag: &str, key: Option<Key>) {
        self.remove(node);
        self.entries.push(ExitingEntry {
            node,
            dom,
            dom_parent,
            tag: tag.to_string(),
            key,
        });
    }

    pub fn remove(&mut self, node: NodeId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.node != node);
        self.entries.len() != before
    }

    /// Remove and return the exiting element that a keyed `tag` rendered into
    /// `dom_parent` may reclaim.
    pub fn take_match(&mut self, dom_parent: DomId, tag: &str, key: &Key) -> Option<NodeId> {
        let index = self.entries.iter().position(|e| {
            e.dom_parent == Some(dom_parent) && e.tag == tag && e.key.as_ref() == Some(key)
        })?;
        Some(self.entries.remove(index).node)
    }

    pub fn contains_dom(&self, dom: DomId) -> bool {
        self.entries.iter().any(|e| e.dom == dom)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_shorthand_is_fade() {
        let presence = Presence::new().enter(true).exit(false);
        assert_eq!(presence.enter, Some(Transition::Fade));
        assert!(!presence.has_exit());
    }

    #[test]
    fn test_fade_resolves_to_opacity_frames() {
        let options = Options::default();
        let (frames, timing) = Transition::Fade.resolve(Direction::Exit, &options);
        assert_eq!(frames[0].get("opacity"), Some("1"));
        assert_eq!(frames[1].get("opacity"), Some("0"));
        assert_eq!(timing.duration, 200.0);
    }

    #[test]
    fn test_custom_keyframes_keep_their_timing() {
        let options = Options::default();
        let transition = Transition::keyframes([
            Keyframe::new().set("transform", "scale(0)"),
            Keyframe::new().set("transform", "scale(1)"),
        ])
        .with_options(KeyframeOptions {
            duration: 50.0,
            easing: "linear".into(),
        });
        let (frames, timing) = transition.resolve(Direction::Enter, &options);
        assert_eq!(frames.len(), 2);
        assert_eq!(timing.duration, 50.0);
    }

    #[test]
    fn test_registry_matches_parent_tag_and_key() {
        let mut registry = ExitingRegistry::default();
        let node = NodeId::new(3, 1);
        registry.add(node, DomId(10), Some(DomId(2)), "li", Some(Key::new("a")));

        assert_eq!(registry.take_match(DomId(9), "li", &Key::new("a")), None);
        assert_eq!(registry.take_match(DomId(2), "div", &Key::new("a")), None);
        assert_eq!(registry.take_match(DomId(2), "li", &Key::new("b")), None);
        assert!(registry.contains_dom(DomId(10)));
        assert_eq!(registry.take_match(DomId(2), "li", &Key::new("a")), Some(node));
        assert_eq!(registry.len(), 0);
    }
}
