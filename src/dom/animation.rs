//! Keyframe animations on live elements.
//!
//! An [`Animation`] is a shared handle, like the object returned by
//! `Element.animate()`: every clone observes the same play state. Time only
//! moves when the owning document's timeline is advanced
//! ([`Document::advance`](super::Document::advance)) or when the animation is
//! finished explicitly.
//!
//! # Play states
//!
//! ```text
//! Running ──finish()/timeline──▶ Finished
//!    │  ▲
//!    │  └── reverse() (also restarts a Finished animation backwards)
//!    └──cancel()──▶ Idle
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::DomId;
use crate::types::{Keyframe, KeyframeOptions};

/// Play state of an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Running,
    Finished,
    /// Cancelled. A cancelled animation never resolves its finished signal.
    Idle,
}

struct AnimationInner {
    id: u64,
    target: DomId,
    keyframes: Vec<Keyframe>,
    options: KeyframeOptions,
    current: Cell<f64>,
    rate: Cell<f64>,
    state: Cell<PlayState>,
    on_finish: RefCell<Vec<Box<dyn FnOnce()>>>,
}

/// Handle to a running (or settled) keyframe animation.
#[derive(Clone)]
pub struct Animation(Rc<AnimationInner>);

impl Animation {
    pub(crate) fn new(
        id: u64,
        target: DomId,
        keyframes: Vec<Keyframe>,
        options: KeyframeOptions,
    ) -> Self {
        Self(Rc::new(AnimationInner {
            id,
            target,
            keyframes,
            options,
            current: Cell::new(0.0),
            rate: Cell::new(1.0),
            state: Cell::new(PlayState::Running),
            on_finish: RefCell::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn target(&self) -> DomId {
        self.0.target
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.0.keyframes
    }

    pub fn options(&self) -> &KeyframeOptions {
        &self.0.options
    }

    pub fn play_state(&self) -> PlayState {
        self.0.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.play_state() == PlayState::Running
    }

    /// True when playing backwards.
    pub fn is_reversed(&self) -> bool {
        self.0.rate.get() < 0.0
    }

    /// Elapsed time in milliseconds, between 0 and the duration.
    pub fn current_time(&self) -> f64 {
        self.0.current.get()
    }

    /// Flip the playback direction, keeping the current time.
    ///
    /// A finished animation starts running again from its end point.
    pub fn reverse(&self) {
        self.0.rate.set(-self.0.rate.get());
        if self.play_state() == PlayState::Finished {
            self.0.state.set(PlayState::Running);
        }
    }

    /// Stop without resolving the finished signal.
    pub fn cancel(&self) {
        self.0.state.set(PlayState::Idle);
        self.0.current.set(0.0);
        self.0.on_finish.borrow_mut().clear();
    }

    /// Jump to the end (or start, when reversed) and resolve the finished signal.
    pub fn finish(&self) {
        if self.play_state() != PlayState::Running {
            return;
        }
        let end = if self.is_reversed() {
            0.0
        } else {
            self.0.options.duration
        };
        self.0.current.set(end);
        self.0.state.set(PlayState::Finished);

        let callbacks = std::mem::take(&mut *self.0.on_finish.borrow_mut());
        for callback in callbacks {
            callback();
        }
    }

    /// Run `callback` once the animation finishes.
    ///
    /// Runs immediately if it already has.
    pub fn on_finish(&self, callback: impl FnOnce() + 'static) {
        match self.play_state() {
            PlayState::Finished => callback(),
            PlayState::Idle => {}
            PlayState::Running => self.0.on_finish.borrow_mut().push(Box::new(callback)),
        }
    }

    /// Advance by `ms`. Returns true when the animation reached its end point.
    pub(crate) fn tick(&self, ms: f64) -> bool {
        if !self.is_running() {
            return false;
        }
        let next = self.0.current.get() + ms * self.0.rate.get();
        let duration = self.0.options.duration;
        self.0.current.set(next.clamp(0.0, duration));
        if self.is_reversed() {
            next <= 0.0
        } else {
            next >= duration
        }
    }

    pub fn ptr_eq(&self, other: &Animation) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("id", &self.0.id)
            .field("target", &self.0.target)
            .field("state", &self.play_state())
            .field("reversed", &self.is_reversed())
            .field("current", &self.current_time())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(duration: f64) -> Animation {
        Animation::new(
            1,
            DomId(0),
            vec![Keyframe::new().set("opacity", "0"), Keyframe::new().set("opacity", "1")],
            KeyframeOptions {
                duration,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_tick_to_end() {
        let anim = make(100.0);
        assert!(!anim.tick(60.0));
        assert!(anim.tick(60.0));
        assert_eq!(anim.current_time(), 100.0);
    }

    #[test]
    fn test_reverse_runs_back_to_start() {
        let anim = make(100.0);
        anim.tick(30.0);
        anim.reverse();
        assert!(anim.is_reversed());
        assert!(!anim.tick(20.0));
        assert!(anim.tick(20.0));
    }

    #[test]
    fn test_finish_runs_callbacks_once() {
        use std::cell::Cell;

        let anim = make(100.0);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        anim.on_finish(move || c.set(c.get() + 1));
        anim.finish();
        anim.finish();
        assert_eq!(count.get(), 1);
        assert_eq!(anim.play_state(), PlayState::Finished);
    }

    #[test]
    fn test_cancel_drops_callbacks() {
        use std::cell::Cell;

        let anim = make(100.0);
        let called = Rc::new(Cell::new(false));
        let c = called.clone();
        anim.on_finish(move || c.set(true));
        anim.cancel();
        anim.finish();
        assert!(!called.get());
        assert_eq!(anim.play_state(), PlayState::Idle);
    }
}
