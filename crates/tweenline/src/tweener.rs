//! Generic leaf animation
//!
//! A [`Tweener`] binds a getter/setter pair to a start/end value of some
//! [`TweenValue`] type and applies eased interpolation through the setter.
//! The start value is captured lazily from the getter on the first advancing
//! tick unless an explicit from-value was supplied.

use std::any::Any;

use crate::tween::{Tween, TweenCore, TweenDefaults};
use crate::value::TweenValue;

type Getter<T> = Box<dyn FnMut() -> T>;
type Setter<T> = Box<dyn FnMut(T)>;

/// A value animation driving a setter toward an end value
pub struct Tweener<T: TweenValue> {
    core: TweenCore,
    getter: Option<Getter<T>>,
    setter: Option<Setter<T>>,
    start: T,
    end: T,
    is_from: bool,
    from_value: Option<T>,
    start_captured: bool,
}

impl<T: TweenValue> Tweener<T> {
    /// Build an animation from the target's current value toward `end`.
    ///
    /// The tween is inactive until spawned into a scheduler (or absorbed
    /// into a sequence, which then drives it).
    pub fn new(
        getter: impl FnMut() -> T + 'static,
        setter: impl FnMut(T) + 'static,
        end: T,
        duration: f32,
    ) -> Self {
        let mut core = TweenCore::new();
        core.duration = duration.max(0.0);
        Self {
            core,
            getter: Some(Box::new(getter)),
            setter: Some(Box::new(setter)),
            start: T::default(),
            end,
            is_from: false,
            from_value: None,
            start_captured: false,
        }
    }

    /// Play from `value` toward the value the target holds when the tween
    /// starts (captured from the getter immediately before the first tick).
    pub fn from(mut self, value: T) -> Self {
        self.is_from = true;
        self.from_value = Some(value);
        self
    }

    /// Play from the configured end value back toward the value the target
    /// holds when the tween starts.
    pub fn from_end(mut self) -> Self {
        self.is_from = true;
        self.from_value = None;
        self
    }

    pub fn start_value(&self) -> T {
        self.start
    }

    pub fn end_value(&self) -> T {
        self.end
    }
}

impl<T: TweenValue> Default for Tweener<T> {
    fn default() -> Self {
        Self {
            core: TweenCore::new(),
            getter: None,
            setter: None,
            start: T::default(),
            end: T::default(),
            is_from: false,
            from_value: None,
            start_captured: false,
        }
    }
}

impl<T: TweenValue> Tween for Tweener<T> {
    fn core(&self) -> &TweenCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TweenCore {
        &mut self.core
    }

    fn startup(&mut self) {
        if self.is_from {
            // The captured current value becomes the destination
            let current = match self.getter.as_mut() {
                Some(get) => get(),
                None => self.end,
            };
            self.start = self.from_value.take().unwrap_or(self.end);
            self.end = current;
            self.start_captured = true;
        } else if !self.start_captured {
            if let Some(get) = self.getter.as_mut() {
                self.start = get();
            }
            self.start_captured = true;
        }

        if self.core.relative {
            self.end = T::add(self.start, self.end);
        }
    }

    fn apply_value(&mut self, eased: f32) {
        if let Some(set) = self.setter.as_mut() {
            set(T::interpolate(self.start, self.end, eased));
        }
    }

    fn on_incremental_loop(&mut self) {
        let delta = T::subtract(self.end, self.start);
        self.start = self.end;
        self.end = T::add(self.end, delta);
    }

    fn bind_defaults(&mut self, defaults: &TweenDefaults) {
        self.core.bind_defaults(defaults);
    }

    fn reset(&mut self) {
        self.core.reset();
        self.getter = None;
        self.setter = None;
        self.start = T::default();
        self.end = T::default();
        self.is_from = false;
        self.from_value = None;
        self.start_captured = false;
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
