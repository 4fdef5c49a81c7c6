//! Core tween state machine
//!
//! [`TweenCore`] holds the timing, looping, and lifecycle state shared by
//! every animation. The [`Tween`] trait is the abstract contract a concrete
//! animation (a [`Tweener`](crate::Tweener) leaf or a
//! [`Sequence`](crate::Sequence) composite) fulfils: expose the core, resolve
//! start values on startup, and apply an eased fraction. [`TweenExt`] adds the
//! fluent configuration surface to every concrete type.
//!
//! Lifecycle: Idle (built, inactive) → Delayed → Running → Complete → Killed,
//! with Paused as an orthogonal flag that suppresses advancement.

use std::any::Any;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::ease::{self, Ease, EaseCurve};

/// Loop continuation behavior
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopType {
    /// Wrap back to the start of the range
    #[default]
    Restart,
    /// Reflect and reverse playback direction
    Yoyo,
    /// Wrap, shifting the value range forward by one step each loop
    Incremental,
}

/// Which scheduler pass advances a tween
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateChannel {
    #[default]
    Normal,
    Late,
    Manual,
}

/// Engine-level defaults applied at spawn to settings the builder left unset.
///
/// This is the two-key preference store a host may persist.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TweenDefaults {
    pub ease: Ease,
    pub auto_kill: bool,
}

impl Default for TweenDefaults {
    fn default() -> Self {
        Self {
            ease: Ease::OutQuad,
            auto_kill: true,
        }
    }
}

/// Grouping identity, compared by equality
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TweenTag {
    Id(u64),
    Name(String),
}

impl From<u64> for TweenTag {
    fn from(id: u64) -> Self {
        TweenTag::Id(id)
    }
}

impl From<&str> for TweenTag {
    fn from(name: &str) -> Self {
        TweenTag::Name(name.to_owned())
    }
}

impl From<String> for TweenTag {
    fn from(name: String) -> Self {
        TweenTag::Name(name)
    }
}

/// Opaque handle to the object an animation targets, compared by identity.
///
/// The engine never dereferences the handle; it exists only so collaborators
/// can group-control (typically group-kill) every tween attached to an object
/// they are about to destroy.
#[derive(Clone)]
pub struct TweenTarget(Rc<dyn Any>);

impl TweenTarget {
    pub fn new<T: 'static>(object: Rc<T>) -> Self {
        Self(object)
    }

    /// Identity comparison (same allocation)
    pub fn same(&self, other: &TweenTarget) -> bool {
        Rc::as_ptr(&self.0) as *const () == Rc::as_ptr(&other.0) as *const ()
    }
}

impl std::fmt::Debug for TweenTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TweenTarget({:p})", Rc::as_ptr(&self.0))
    }
}

type Callback = Box<dyn FnMut()>;

/// Timing, looping, and lifecycle state shared by every tween
pub struct TweenCore {
    // Lifecycle
    pub(crate) active: bool,
    pub(crate) playing: bool,
    pub(crate) paused: bool,
    pub(crate) complete: bool,
    pub(crate) backwards: bool,
    pub(crate) auto_kill: Option<bool>,

    // Timing
    pub(crate) duration: f32,
    pub(crate) delay: f32,
    pub(crate) elapsed: f32,
    pub(crate) elapsed_delay: f32,
    pub(crate) delay_done: bool,
    pub(crate) time_scale: f32,

    // Easing
    pub(crate) ease: Option<Ease>,
    pub(crate) custom_ease: Option<EaseCurve>,

    // Looping
    pub(crate) loops: i32,
    pub(crate) loop_type: LoopType,
    pub(crate) completed_loops: i32,

    // Identity
    pub(crate) relative: bool,
    pub(crate) channel: UpdateChannel,
    pub(crate) tag: Option<TweenTag>,
    pub(crate) target: Option<TweenTarget>,

    // Start tracking: `started` gates on_start (re-armed by restart),
    // `startup_done` gates value resolution (runs once ever)
    pub(crate) started: bool,
    pub(crate) startup_done: bool,

    // Callbacks
    pub(crate) on_start: Option<Callback>,
    pub(crate) on_play: Option<Callback>,
    pub(crate) on_update: Option<Box<dyn FnMut(f32)>>,
    pub(crate) on_complete: Option<Callback>,
    pub(crate) on_kill: Option<Callback>,
    pub(crate) on_step_complete: Option<Callback>,
    pub(crate) on_pause: Option<Callback>,
    pub(crate) on_rewind: Option<Callback>,
}

impl TweenCore {
    pub(crate) fn new() -> Self {
        Self {
            active: false,
            playing: false,
            paused: false,
            complete: false,
            backwards: false,
            auto_kill: None,
            duration: 0.0,
            delay: 0.0,
            elapsed: 0.0,
            elapsed_delay: 0.0,
            delay_done: false,
            time_scale: 1.0,
            ease: None,
            custom_ease: None,
            loops: 1,
            loop_type: LoopType::Restart,
            completed_loops: 0,
            relative: false,
            channel: UpdateChannel::Normal,
            tag: None,
            target: None,
            started: false,
            startup_done: false,
            on_start: None,
            on_play: None,
            on_update: None,
            on_complete: None,
            on_kill: None,
            on_step_complete: None,
            on_pause: None,
            on_rewind: None,
        }
    }

    /// Restore every field to its construction-time default, clearing all
    /// callback slots. Used when an instance is returned to the pool.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn bind_defaults(&mut self, defaults: &TweenDefaults) {
        if self.ease.is_none() {
            self.ease = Some(defaults.ease);
        }
        if self.auto_kill.is_none() {
            self.auto_kill = Some(defaults.auto_kill);
        }
    }

    /// Effective easing kind
    pub fn ease(&self) -> Ease {
        self.ease.unwrap_or_default()
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Elapsed fraction of the duration, clamped to `[0, 1]`
    pub fn fraction(&self) -> f32 {
        if self.duration > 0.0 {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Effectively running: playing and not suppressed by pause
    pub fn is_playing(&self) -> bool {
        self.playing && !self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_backwards(&self) -> bool {
        self.backwards
    }

    pub fn loops(&self) -> i32 {
        self.loops
    }

    pub fn completed_loops(&self) -> i32 {
        self.completed_loops
    }

    pub fn tag(&self) -> Option<&TweenTag> {
        self.tag.as_ref()
    }

    pub fn channel(&self) -> UpdateChannel {
        self.channel
    }

    fn eased(&self, normalized: f32) -> f32 {
        ease::evaluate(self.ease(), normalized, self.custom_ease.as_ref())
    }

    fn fire_start(&mut self) {
        if let Some(cb) = self.on_start.as_mut() {
            cb();
        }
    }

    fn fire_play(&mut self) {
        if let Some(cb) = self.on_play.as_mut() {
            cb();
        }
    }

    fn fire_update(&mut self, normalized: f32) {
        if let Some(cb) = self.on_update.as_mut() {
            cb(normalized);
        }
    }

    fn fire_complete(&mut self) {
        if let Some(cb) = self.on_complete.as_mut() {
            cb();
        }
    }

    fn fire_kill(&mut self) {
        if let Some(cb) = self.on_kill.as_mut() {
            cb();
        }
    }

    fn fire_step_complete(&mut self) {
        if let Some(cb) = self.on_step_complete.as_mut() {
            cb();
        }
    }

    fn fire_pause(&mut self) {
        if let Some(cb) = self.on_pause.as_mut() {
            cb();
        }
    }

    fn fire_rewind(&mut self) {
        if let Some(cb) = self.on_rewind.as_mut() {
            cb();
        }
    }
}

/// The abstract animation contract.
///
/// Concrete animations compose a [`TweenCore`] and supply the type-specific
/// hooks: `startup` resolves lazily-captured values once, `apply_value` maps
/// an eased fraction onto the animated payload.
pub trait Tween: 'static {
    fn core(&self) -> &TweenCore;
    fn core_mut(&mut self) -> &mut TweenCore;

    /// One-time resolution hook, invoked before the first value application
    fn startup(&mut self) {}

    /// Apply an eased fraction to the payload
    fn apply_value(&mut self, eased: f32);

    /// Invoked once per completed non-terminal incremental loop
    fn on_incremental_loop(&mut self) {}

    /// Invoked when playback state is rewound to the beginning
    fn on_restart(&mut self) {}

    /// Fill unset settings from engine defaults at spawn
    fn bind_defaults(&mut self, defaults: &TweenDefaults) {
        self.core_mut().bind_defaults(defaults);
    }

    /// Restore construction-time defaults so the instance can be pooled
    fn reset(&mut self);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Fluent configuration, available on every concrete tween type.
///
/// Builder methods return the concrete `Self`, so chains stay typed without
/// any override shadowing.
pub trait TweenExt: Tween + Sized {
    fn ease(mut self, ease: Ease) -> Self {
        self.core_mut().ease = Some(ease);
        self.core_mut().custom_ease = None;
        self
    }

    /// Ease through an arbitrary curve sampled by normalized time
    fn ease_with(mut self, curve: impl Fn(f32) -> f32 + 'static) -> Self {
        self.core_mut().ease = Some(Ease::Custom);
        self.core_mut().custom_ease = Some(Rc::new(curve));
        self
    }

    /// Loop `count` times (`count <= 0` loops forever)
    fn loops(mut self, count: i32, loop_type: LoopType) -> Self {
        self.core_mut().loops = count;
        self.core_mut().loop_type = loop_type;
        self
    }

    fn delay(mut self, seconds: f32) -> Self {
        self.core_mut().delay = seconds.max(0.0);
        self
    }

    /// Interpret the end value as an offset from the resolved start value
    fn relative(mut self) -> Self {
        self.core_mut().relative = true;
        self
    }

    fn auto_kill(mut self, enabled: bool) -> Self {
        self.core_mut().auto_kill = Some(enabled);
        self
    }

    fn tag(mut self, tag: impl Into<TweenTag>) -> Self {
        self.core_mut().tag = Some(tag.into());
        self
    }

    fn target(mut self, target: TweenTarget) -> Self {
        self.core_mut().target = Some(target);
        self
    }

    fn channel(mut self, channel: UpdateChannel) -> Self {
        self.core_mut().channel = channel;
        self
    }

    /// Multiplier applied to every incoming tick delta
    fn time_scale(mut self, scale: f32) -> Self {
        self.core_mut().time_scale = scale;
        self
    }

    fn on_start(mut self, callback: impl FnMut() + 'static) -> Self {
        self.core_mut().on_start = Some(Box::new(callback));
        self
    }

    fn on_play(mut self, callback: impl FnMut() + 'static) -> Self {
        self.core_mut().on_play = Some(Box::new(callback));
        self
    }

    fn on_update(mut self, callback: impl FnMut(f32) + 'static) -> Self {
        self.core_mut().on_update = Some(Box::new(callback));
        self
    }

    fn on_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.core_mut().on_complete = Some(Box::new(callback));
        self
    }

    fn on_kill(mut self, callback: impl FnMut() + 'static) -> Self {
        self.core_mut().on_kill = Some(Box::new(callback));
        self
    }

    fn on_step_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.core_mut().on_step_complete = Some(Box::new(callback));
        self
    }

    fn on_pause(mut self, callback: impl FnMut() + 'static) -> Self {
        self.core_mut().on_pause = Some(Box::new(callback));
        self
    }

    fn on_rewind(mut self, callback: impl FnMut() + 'static) -> Self {
        self.core_mut().on_rewind = Some(Box::new(callback));
        self
    }
}

impl<T: Tween + Sized> TweenExt for T {}

/// Outcome of one per-tick advance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Advance {
    /// Inactive, paused, or still inside the delay window
    Skipped,
    /// Advanced and applied a value
    Stepped,
    /// Reached terminal completion this tick
    Completed {
        /// Auto-kill fired; the scheduler must drop the registration
        killed: bool,
    },
}

/// Run startup resolution exactly once over the tween's lifetime.
pub(crate) fn ensure_startup(tween: &mut dyn Tween) {
    if tween.core().startup_done {
        return;
    }
    tween.core_mut().startup_done = true;
    tween.startup();
}

/// Advance a tween by one tick.
///
/// Implements the per-tick contract: gate on lifecycle flags, scale the
/// delta, consume delay, resolve startup and announce the first advancing
/// tick, integrate elapsed time, process loop boundaries (one oversized tick
/// may cross several), then apply the eased value.
pub(crate) fn advance(tween: &mut dyn Tween, delta: f32) -> Advance {
    {
        let core = tween.core();
        if !core.active || !core.playing || core.paused {
            return Advance::Skipped;
        }
    }

    let mut step = delta * tween.core().time_scale;

    {
        let core = tween.core_mut();
        if !core.delay_done {
            core.elapsed_delay += step;
            if core.elapsed_delay < core.delay {
                return Advance::Skipped;
            }
            // Carry the overshoot into this tick
            step = core.elapsed_delay - core.delay;
            core.delay_done = true;
        }
    }

    if !tween.core().started {
        ensure_startup(tween);
        let core = tween.core_mut();
        core.started = true;
        core.fire_start();
    }

    {
        let core = tween.core_mut();
        if core.backwards {
            core.elapsed -= step;
        } else {
            core.elapsed += step;
        }
    }

    // Loop boundaries: re-check after every rebase because yoyo flips the
    // direction mid-processing and a large delta can cross several loops.
    // Crossings are direction-gated so a reflection landing exactly on a
    // bound does not count twice.
    loop {
        let (elapsed, duration, backwards) = {
            let core = tween.core();
            (core.elapsed, core.duration, core.backwards)
        };

        if !backwards && elapsed >= duration {
            if let Some(done) = cross_forward(tween) {
                return done;
            }
        } else if backwards && elapsed < 0.0 {
            if let Some(done) = cross_backward(tween) {
                return done;
            }
        } else {
            break;
        }
        if tween.core().duration <= 0.0 {
            break;
        }
    }

    let normalized = tween.core().fraction();
    let eased = tween.core().eased(normalized);
    tween.apply_value(eased);
    tween.core_mut().fire_update(normalized);

    Advance::Stepped
}

/// Handle an elapsed-time crossing of the upper bound. Returns the terminal
/// outcome when this crossing completes the final loop.
fn cross_forward(tween: &mut dyn Tween) -> Option<Advance> {
    {
        let core = tween.core_mut();
        core.completed_loops += 1;
        core.fire_step_complete();
    }

    let terminal = {
        let core = tween.core();
        core.loops > 0 && core.completed_loops >= core.loops
    };
    if terminal {
        tween.core_mut().elapsed = tween.core().duration;
        let eased = tween.core().eased(1.0);
        tween.apply_value(eased);
        {
            let core = tween.core_mut();
            core.fire_update(1.0);
            core.complete = true;
            core.playing = false;
            core.fire_complete();
        }
        let killed = tween.core().auto_kill.unwrap_or(true) && kill_in_place(tween, false);
        return Some(Advance::Completed { killed });
    }

    match tween.core().loop_type {
        LoopType::Restart => {
            let core = tween.core_mut();
            core.elapsed -= core.duration;
        }
        LoopType::Yoyo => {
            let core = tween.core_mut();
            core.backwards = !core.backwards;
            core.elapsed = 2.0 * core.duration - core.elapsed;
        }
        LoopType::Incremental => {
            {
                let core = tween.core_mut();
                core.elapsed -= core.duration;
            }
            tween.on_incremental_loop();
        }
    }
    None
}

/// Handle an elapsed-time crossing of the lower bound (reverse playback).
fn cross_backward(tween: &mut dyn Tween) -> Option<Advance> {
    {
        let core = tween.core_mut();
        core.completed_loops += 1;
        core.fire_step_complete();
    }

    let terminal = {
        let core = tween.core();
        core.loops > 0 && core.completed_loops >= core.loops
    };
    if terminal {
        tween.core_mut().elapsed = 0.0;
        let eased = tween.core().eased(0.0);
        tween.apply_value(eased);
        {
            let core = tween.core_mut();
            core.fire_update(0.0);
            core.complete = true;
            core.playing = false;
            core.fire_complete();
        }
        let killed = tween.core().auto_kill.unwrap_or(true) && kill_in_place(tween, false);
        return Some(Advance::Completed { killed });
    }

    match tween.core().loop_type {
        LoopType::Restart | LoopType::Incremental => {
            let core = tween.core_mut();
            core.elapsed += core.duration;
        }
        LoopType::Yoyo => {
            let core = tween.core_mut();
            core.backwards = !core.backwards;
            core.elapsed = -core.elapsed;
        }
    }
    None
}

/// Resume playback; fires on_play only when leaving the paused state.
pub(crate) fn play_in_place(tween: &mut dyn Tween) {
    let core = tween.core_mut();
    if !core.active {
        return;
    }
    if core.paused {
        core.paused = false;
        core.fire_play();
    }
    core.playing = true;
}

/// Suspend a currently-playing tween.
pub(crate) fn pause_in_place(tween: &mut dyn Tween) {
    let core = tween.core_mut();
    if !core.active || !core.playing || core.paused {
        return;
    }
    core.paused = true;
    core.fire_pause();
}

/// Deactivate, optionally forcing completion first. Returns true when the
/// tween was alive and now needs its registration dropped.
pub(crate) fn kill_in_place(tween: &mut dyn Tween, complete: bool) -> bool {
    if !tween.core().active {
        return false;
    }
    if complete {
        complete_in_place(tween);
    }
    let core = tween.core_mut();
    core.active = false;
    core.playing = false;
    core.fire_kill();
    true
}

/// Snap to the terminal value for the current direction and fire on_complete.
pub(crate) fn complete_in_place(tween: &mut dyn Tween) {
    {
        let core = tween.core();
        if !core.active || core.complete {
            return;
        }
    }
    ensure_startup(tween);
    tween.core_mut().elapsed = tween.core().duration;
    let terminal = if tween.core().backwards { 0.0 } else { 1.0 };
    let eased = tween.core().eased(terminal);
    tween.apply_value(eased);
    let core = tween.core_mut();
    core.complete = true;
    core.playing = false;
    core.fire_complete();
}

/// Reset elapsed/loop/direction state and resume from the beginning.
pub(crate) fn restart_in_place(tween: &mut dyn Tween, include_delay: bool) {
    if !tween.core().active {
        return;
    }
    {
        let core = tween.core_mut();
        core.elapsed = 0.0;
        core.completed_loops = 0;
        core.complete = false;
        core.backwards = false;
        core.started = false;
        if include_delay {
            core.elapsed_delay = 0.0;
            core.delay_done = core.delay <= 0.0;
        }
        core.playing = true;
        core.paused = false;
    }
    tween.on_restart();
}

/// Like restart, but also forces the value back to the start and leaves the
/// tween not playing.
pub(crate) fn rewind_in_place(tween: &mut dyn Tween, include_delay: bool) {
    if !tween.core().active {
        return;
    }
    ensure_startup(tween);
    {
        let core = tween.core_mut();
        core.elapsed = 0.0;
        core.completed_loops = 0;
        core.complete = false;
        core.backwards = false;
        core.started = false;
        if include_delay {
            core.elapsed_delay = 0.0;
            core.delay_done = core.delay <= 0.0;
        }
        core.playing = false;
    }
    let eased = tween.core().eased(0.0);
    tween.apply_value(eased);
    tween.core_mut().fire_rewind();
}

/// Jump to an absolute time, applying the corresponding eased value
/// regardless of the running state.
pub(crate) fn seek_in_place(tween: &mut dyn Tween, time: f32, and_play: bool) {
    if !tween.core().active {
        return;
    }
    ensure_startup(tween);
    {
        let core = tween.core_mut();
        core.elapsed = time.clamp(0.0, core.duration);
    }
    let normalized = tween.core().fraction();
    let eased = tween.core().eased(normalized);
    tween.apply_value(eased);
    if and_play {
        play_in_place(tween);
    }
}

/// Resume playing toward the end value.
pub(crate) fn play_forward_in_place(tween: &mut dyn Tween) {
    if !tween.core().active {
        return;
    }
    tween.core_mut().backwards = false;
    play_in_place(tween);
}

/// Resume playing back toward the start value.
pub(crate) fn play_backwards_in_place(tween: &mut dyn Tween) {
    if !tween.core().active {
        return;
    }
    tween.core_mut().backwards = true;
    play_in_place(tween);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tweener::Tweener;
    use std::cell::Cell;

    fn cell_tween(cell: &Rc<Cell<f32>>, end: f32, duration: f32) -> Tweener<f32> {
        let get = Rc::clone(cell);
        let set = Rc::clone(cell);
        Tweener::new(move || get.get(), move |v| set.set(v), end, duration).ease(Ease::Linear)
    }

    fn activate(tween: &mut Tweener<f32>) {
        let core = tween.core_mut();
        core.active = true;
        core.playing = true;
        core.delay_done = core.delay <= 0.0;
        core.bind_defaults(&TweenDefaults::default());
    }

    #[test]
    fn test_advance_skips_paused_and_inactive() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 1.0);
        assert_eq!(advance(&mut tween, 0.5), Advance::Skipped);

        activate(&mut tween);
        tween.core_mut().paused = true;
        assert_eq!(advance(&mut tween, 0.5), Advance::Skipped);
        assert_eq!(value.get(), 0.0);
    }

    #[test]
    fn test_delay_consumes_before_advancing() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 1.0).delay(0.5);
        activate(&mut tween);

        assert_eq!(advance(&mut tween, 0.3), Advance::Skipped);
        assert_eq!(value.get(), 0.0);

        // 0.7 total: 0.2 of delay remained, so 0.5 carries into the tween
        assert_eq!(advance(&mut tween, 0.4), Advance::Stepped);
        assert!((value.get() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_on_start_fires_once() {
        let value = Rc::new(Cell::new(0.0));
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let mut tween = cell_tween(&value, 1.0, 1.0).on_start(move || c.set(c.get() + 1));
        activate(&mut tween);

        advance(&mut tween, 0.1);
        advance(&mut tween, 0.1);
        advance(&mut tween, 0.1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_single_large_tick_crosses_multiple_loops() {
        let value = Rc::new(Cell::new(0.0));
        let steps = Rc::new(Cell::new(0u32));
        let s = Rc::clone(&steps);
        let mut tween = cell_tween(&value, 10.0, 0.5)
            .loops(3, LoopType::Restart)
            .auto_kill(false)
            .on_step_complete(move || s.set(s.get() + 1));
        activate(&mut tween);

        assert_eq!(advance(&mut tween, 1.6), Advance::Completed { killed: false });
        assert_eq!(steps.get(), 3);
        assert!((value.get() - 10.0).abs() < 1e-4);
        assert!(tween.core().is_complete());
    }

    #[test]
    fn test_yoyo_reflects_through_peak() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 1.0)
            .loops(2, LoopType::Yoyo)
            .auto_kill(false);
        activate(&mut tween);

        advance(&mut tween, 0.5);
        assert!((value.get() - 5.0).abs() < 1e-3);
        advance(&mut tween, 0.5);
        assert!((value.get() - 10.0).abs() < 1e-3);
        advance(&mut tween, 0.5);
        assert!((value.get() - 5.0).abs() < 1e-3);
        assert!(tween.core().is_backwards());
    }

    #[test]
    fn test_incremental_loops_rebase_range() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 1.0)
            .loops(3, LoopType::Incremental)
            .auto_kill(false);
        activate(&mut tween);

        advance(&mut tween, 1.0);
        advance(&mut tween, 0.5);
        // Second loop runs 10 -> 20
        assert!((value.get() - 15.0).abs() < 1e-3);
        advance(&mut tween, 1.5);
        // Third loop ends at 30
        assert!((value.get() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_duration_completes_on_first_tick() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 0.0).auto_kill(false);
        activate(&mut tween);

        assert_eq!(advance(&mut tween, 0.01), Advance::Completed { killed: false });
        assert!((value.get() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_terminal_completion_order_and_auto_kill() {
        let value = Rc::new(Cell::new(0.0));
        let log = Rc::new(std::cell::RefCell::new(Vec::new()));
        let (l1, l2, l3) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let mut tween = cell_tween(&value, 10.0, 0.5)
            .on_update(move |_| l1.borrow_mut().push("update"))
            .on_complete(move || l2.borrow_mut().push("complete"))
            .on_kill(move || l3.borrow_mut().push("kill"));
        activate(&mut tween);

        assert_eq!(advance(&mut tween, 0.6), Advance::Completed { killed: true });
        assert_eq!(log.borrow().as_slice(), &["update", "complete", "kill"]);
        assert!(!tween.core().is_active());
    }

    #[test]
    fn test_pause_play_round_trip() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 1.0);
        activate(&mut tween);

        advance(&mut tween, 0.3);
        let frozen = value.get();

        pause_in_place(&mut tween);
        advance(&mut tween, 0.3);
        assert_eq!(value.get(), frozen);

        play_in_place(&mut tween);
        advance(&mut tween, 0.3);
        assert!(value.get() > frozen);
    }

    #[test]
    fn test_kill_is_idempotent() {
        let value = Rc::new(Cell::new(0.0));
        let kills = Rc::new(Cell::new(0u32));
        let k = Rc::clone(&kills);
        let mut tween = cell_tween(&value, 10.0, 1.0).on_kill(move || k.set(k.get() + 1));
        activate(&mut tween);

        assert!(kill_in_place(&mut tween, false));
        assert!(!kill_in_place(&mut tween, false));
        assert_eq!(kills.get(), 1);
    }

    #[test]
    fn test_kill_complete_jumps_to_end() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 1.0);
        activate(&mut tween);

        kill_in_place(&mut tween, true);
        assert!((value.get() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_restart_refires_start_without_rerunning_resolution() {
        let value = Rc::new(Cell::new(4.0));
        let starts = Rc::new(Cell::new(0u32));
        let s = Rc::clone(&starts);
        let get = Rc::clone(&value);
        let set = Rc::clone(&value);
        let mut tween = Tweener::new(move || get.get(), move |v| set.set(v), 10.0, 1.0)
            .ease(Ease::Linear)
            .relative()
            .auto_kill(false)
            .on_start(move || s.set(s.get() + 1));
        activate(&mut tween);

        advance(&mut tween, 1.0);
        // Relative: end resolved once to 4 + 10
        assert!((value.get() - 14.0).abs() < 1e-3);

        restart_in_place(&mut tween, true);
        advance(&mut tween, 1.0);
        // A second resolution would have produced 24
        assert!((value.get() - 14.0).abs() < 1e-3);
        assert_eq!(starts.get(), 2);
    }

    #[test]
    fn test_rewind_applies_start_and_stops() {
        let value = Rc::new(Cell::new(0.0));
        let rewinds = Rc::new(Cell::new(0u32));
        let r = Rc::clone(&rewinds);
        let mut tween = cell_tween(&value, 10.0, 1.0).on_rewind(move || r.set(r.get() + 1));
        activate(&mut tween);

        advance(&mut tween, 0.6);
        rewind_in_place(&mut tween, true);
        assert!((value.get()).abs() < 1e-4);
        assert!(!tween.core().playing);
        assert_eq!(rewinds.get(), 1);
    }

    #[test]
    fn test_seek_applies_immediately_while_paused() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 1.0);
        activate(&mut tween);
        pause_in_place(&mut tween);

        seek_in_place(&mut tween, 0.75, false);
        assert!((value.get() - 7.5).abs() < 1e-3);
        assert!(tween.core().is_paused());

        // Out-of-range times clamp to the duration
        seek_in_place(&mut tween, 9.0, false);
        assert!((value.get() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_play_backwards_returns_to_start() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 1.0).auto_kill(false);
        activate(&mut tween);

        advance(&mut tween, 0.8);
        play_backwards_in_place(&mut tween);
        advance(&mut tween, 0.4);
        assert!((value.get() - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_time_scale_multiplies_delta() {
        let value = Rc::new(Cell::new(0.0));
        let mut tween = cell_tween(&value, 10.0, 1.0).time_scale(2.0).auto_kill(false);
        activate(&mut tween);

        advance(&mut tween, 0.5);
        assert!((value.get() - 10.0).abs() < 1e-3);
    }
}
