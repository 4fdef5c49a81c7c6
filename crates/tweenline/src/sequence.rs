//! Sequence timelines
//!
//! A [`Sequence`] composes child tweens and callbacks at absolute offsets on
//! an internal timeline and satisfies the [`Tween`] contract itself, so
//! sequences nest. A child passed to a placement method is owned by the
//! sequence from then on; the sequence alone positions it, which rules out
//! double-advancement by the scheduler.

use std::any::Any;

use smallvec::SmallVec;

use crate::ease;
use crate::tween::{Tween, TweenCore, TweenDefaults};

enum SequenceItem {
    Child { child: Box<dyn Tween>, at: f32 },
    Callback { run: Box<dyn FnMut()>, at: f32 },
}

impl SequenceItem {
    fn at(&self) -> f32 {
        match self {
            SequenceItem::Child { at, .. } | SequenceItem::Callback { at, .. } => *at,
        }
    }

    fn shift(&mut self, by: f32) {
        match self {
            SequenceItem::Child { at, .. } | SequenceItem::Callback { at, .. } => *at += by,
        }
    }
}

/// A timeline of child tweens and callbacks at absolute offsets
pub struct Sequence {
    core: TweenCore,
    items: SmallVec<[SequenceItem; 8]>,
    total: f32,
    /// Timeline position applied by the previous tick; callbacks fire when
    /// the position crosses their offset between two applications. Starts
    /// below zero so offset-0 callbacks fire on the first forward pass.
    last_position: f32,
}

impl Sequence {
    pub fn new() -> Self {
        let mut core = TweenCore::new();
        core.ease = Some(crate::ease::Ease::Linear);
        Self {
            core,
            items: SmallVec::new(),
            total: 0.0,
            last_position: f32::NEG_INFINITY,
        }
    }

    /// Total timeline duration, including child delays
    pub fn total_duration(&self) -> f32 {
        self.total
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Place a child at the end of the timeline.
    pub fn append(&mut self, child: impl Tween) -> &mut Self {
        if self.reject_started() {
            return self;
        }
        let span = child.core().duration + child.core().delay;
        let at = self.total;
        self.items.push(SequenceItem::Child {
            child: Box::new(child),
            at,
        });
        self.total += span;
        self.core.duration = self.total;
        self
    }

    /// Place a child at offset 0, shifting every existing item forward.
    pub fn prepend(&mut self, child: impl Tween) -> &mut Self {
        if self.reject_started() {
            return self;
        }
        let span = child.core().duration + child.core().delay;
        for item in &mut self.items {
            item.shift(span);
        }
        self.items.push(SequenceItem::Child {
            child: Box::new(child),
            at: 0.0,
        });
        self.total += span;
        self.core.duration = self.total;
        self
    }

    /// Place a child alongside the most recently placed child tween, so the
    /// two run in parallel.
    pub fn join(&mut self, child: impl Tween) -> &mut Self {
        if self.reject_started() {
            return self;
        }
        let at = self.last_child_offset();
        let span = child.core().duration + child.core().delay;
        self.items.push(SequenceItem::Child {
            child: Box::new(child),
            at,
        });
        self.total = self.total.max(at + span);
        self.core.duration = self.total;
        self
    }

    /// Place a child at an arbitrary absolute offset.
    pub fn insert(&mut self, at: f32, child: impl Tween) -> &mut Self {
        if self.reject_started() {
            return self;
        }
        let at = at.max(0.0);
        let span = child.core().duration + child.core().delay;
        self.items.push(SequenceItem::Child {
            child: Box::new(child),
            at,
        });
        self.total = self.total.max(at + span);
        self.core.duration = self.total;
        self
    }

    /// Pad the end of the timeline with empty time.
    pub fn append_interval(&mut self, interval: f32) -> &mut Self {
        if self.reject_started() {
            return self;
        }
        self.total += interval.max(0.0);
        self.core.duration = self.total;
        self
    }

    /// Pad the start of the timeline, shifting every existing item forward.
    pub fn prepend_interval(&mut self, interval: f32) -> &mut Self {
        if self.reject_started() {
            return self;
        }
        let interval = interval.max(0.0);
        for item in &mut self.items {
            item.shift(interval);
        }
        self.total += interval;
        self.core.duration = self.total;
        self
    }

    /// Fire a callback when the timeline reaches its current end.
    pub fn append_callback(&mut self, callback: impl FnMut() + 'static) -> &mut Self {
        if self.reject_started() {
            return self;
        }
        let at = self.total;
        self.items.push(SequenceItem::Callback {
            run: Box::new(callback),
            at,
        });
        self
    }

    /// Fire a callback at offset 0. Existing items keep their offsets since
    /// callbacks occupy no span.
    pub fn prepend_callback(&mut self, callback: impl FnMut() + 'static) -> &mut Self {
        if self.reject_started() {
            return self;
        }
        self.items.push(SequenceItem::Callback {
            run: Box::new(callback),
            at: 0.0,
        });
        self
    }

    /// Fire a callback at an arbitrary absolute offset.
    pub fn insert_callback(&mut self, at: f32, callback: impl FnMut() + 'static) -> &mut Self {
        if self.reject_started() {
            return self;
        }
        self.items.push(SequenceItem::Callback {
            run: Box::new(callback),
            at: at.max(0.0),
        });
        self
    }

    fn last_child_offset(&self) -> f32 {
        self.items
            .iter()
            .rev()
            .find_map(|item| match item {
                SequenceItem::Child { at, .. } => Some(*at),
                SequenceItem::Callback { .. } => None,
            })
            .unwrap_or(0.0)
    }

    fn reject_started(&self) -> bool {
        if self.core.startup_done {
            tracing::warn!("sequence already started; structural change ignored");
            true
        } else {
            false
        }
    }

    /// Drive every item from an absolute timeline position.
    ///
    /// Children inside their window get the clamped, normalized, eased local
    /// time; children outside it are pinned to their initial or terminal
    /// value, so seeking to any position leaves every child value-consistent.
    fn apply_at(&mut self, position: f32) {
        let last = self.last_position;
        for item in &mut self.items {
            match item {
                SequenceItem::Callback { run, at } => {
                    let crossed_forward = last < *at && position >= *at;
                    let crossed_backward = last > *at && position <= *at;
                    if crossed_forward || crossed_backward {
                        run();
                    }
                }
                SequenceItem::Child { child, at } => {
                    let duration = child.core().duration;
                    if duration <= 0.0 {
                        continue;
                    }
                    let delay = child.core().delay;
                    let window_end = *at + duration + delay;
                    let eased = if position >= *at && position <= window_end {
                        let local = (position - *at - delay).clamp(0.0, duration);
                        let normalized = local / duration;
                        ease::evaluate(
                            child.core().ease(),
                            normalized,
                            child.core().custom_ease.as_ref(),
                        )
                    } else if position > window_end {
                        ease::evaluate(child.core().ease(), 1.0, child.core().custom_ease.as_ref())
                    } else {
                        ease::evaluate(child.core().ease(), 0.0, child.core().custom_ease.as_ref())
                    };
                    child.apply_value(eased);
                }
            }
        }
        self.last_position = position;
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Tween for Sequence {
    fn core(&self) -> &TweenCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TweenCore {
        &mut self.core
    }

    fn startup(&mut self) {
        // Resolve every child before the first value application so lazily
        // captured start values see the pre-animation state.
        for item in &mut self.items {
            if let SequenceItem::Child { child, .. } = item {
                if !child.core().startup_done {
                    child.core_mut().startup_done = true;
                    child.startup();
                }
            }
        }
    }

    fn apply_value(&mut self, eased: f32) {
        let position = eased * self.total;
        self.apply_at(position);
    }

    fn on_restart(&mut self) {
        self.last_position = f32::NEG_INFINITY;
    }

    fn bind_defaults(&mut self, defaults: &TweenDefaults) {
        self.core.bind_defaults(defaults);
        for item in &mut self.items {
            if let SequenceItem::Child { child, .. } = item {
                child.bind_defaults(defaults);
            }
        }
    }

    fn reset(&mut self) {
        self.core.reset();
        self.items.clear();
        self.total = 0.0;
        self.last_position = f32::NEG_INFINITY;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
