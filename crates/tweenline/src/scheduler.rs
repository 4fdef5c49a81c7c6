//! Tween scheduler
//!
//! Owns the single registry of active tweens and advances them once per
//! externally driven tick, partitioned by update channel. Structural
//! mutation requested while a pass is in progress is staged through
//! pending-add/pending-remove lists and flushed after the pass, so callbacks
//! fired mid-update may freely spawn, kill, pause, or resume tweens
//! (including the one whose callback is running) without corrupting the
//! iteration.
//!
//! The scheduler is a cheap-clone handle; clones share one registry and one
//! pool. Everything is single-threaded and cooperative.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::pool::{Recycle, TweenPool};
use crate::sequence::Sequence;
use crate::tween::{
    self, advance, Advance, Tween, TweenCore, TweenDefaults, TweenTag, TweenTarget, UpdateChannel,
};
use crate::tweener::Tweener;
use crate::value::{Color, Quat, Vec2, Vec3};

new_key_type! {
    /// Handle to a registered tween.
    ///
    /// Keys are generational: a handle to a tween that has since been killed
    /// and recycled simply stops matching, so control calls through stale
    /// handles are silent no-ops.
    pub struct TweenId;
}

type TweenCell = Rc<RefCell<Box<dyn Tween>>>;

/// Registry entry. Tag, target, and channel are configured before spawn and
/// never change afterwards, so they are snapshotted here where group matching
/// can read them without touching a possibly mid-callback tween cell.
struct Entry {
    cell: TweenCell,
    tag: Option<TweenTag>,
    target: Option<TweenTarget>,
    channel: UpdateChannel,
}

/// A control operation addressed to a tween whose cell was busy (its own
/// callback was running); applied as soon as the cell is released.
#[derive(Clone, Copy, Debug)]
enum ControlOp {
    Play,
    Pause,
    Kill { complete: bool },
    Complete,
    Restart { include_delay: bool },
    Rewind { include_delay: bool },
    Seek { time: f32, and_play: bool },
    PlayForward,
    PlayBackwards,
}

struct SchedulerState {
    slots: SlotMap<TweenId, Entry>,
    /// Insertion-ordered ids, iterated back-to-front each pass
    order: Vec<TweenId>,
    pending_add: SmallVec<[TweenId; 16]>,
    pending_remove: SmallVec<[TweenId; 16]>,
    deferred: SmallVec<[(TweenId, ControlOp); 4]>,
    updating: bool,
    defaults: TweenDefaults,
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            order: Vec::with_capacity(64),
            pending_add: SmallVec::new(),
            pending_remove: SmallVec::new(),
            deferred: SmallVec::new(),
            updating: false,
            defaults: TweenDefaults::default(),
        }
    }
}

/// The tween engine façade.
///
/// # Example
///
/// ```
/// use tweenline::{Ease, TweenExt, TweenScheduler, Tweener, UpdateChannel};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scheduler = TweenScheduler::new();
/// let value = Rc::new(Cell::new(0.0f32));
/// let (get, set) = (Rc::clone(&value), Rc::clone(&value));
///
/// scheduler.spawn(
///     Tweener::new(move || get.get(), move |v| set.set(v), 10.0, 1.0)
///         .ease(Ease::Linear),
/// );
/// scheduler.update(0.5, UpdateChannel::Normal);
/// assert!((value.get() - 5.0).abs() < 1e-4);
/// ```
#[derive(Clone)]
pub struct TweenScheduler {
    state: Rc<RefCell<SchedulerState>>,
    pool: Rc<RefCell<TweenPool>>,
}

impl Default for TweenScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TweenScheduler {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState::new())),
            pool: Rc::new(RefCell::new(TweenPool::new())),
        }
    }

    /// Engine defaults applied to settings a builder left unset
    pub fn defaults(&self) -> TweenDefaults {
        self.state.borrow().defaults
    }

    pub fn set_defaults(&self, defaults: TweenDefaults) {
        self.state.borrow_mut().defaults = defaults;
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Activate a built tween and register it for ticking.
    ///
    /// The boxed shell comes from the pool, so steady-state spawn/kill
    /// traffic reuses allocations. Registration requested from a callback
    /// during an update pass is staged and lands after the pass.
    pub fn spawn<T: Recycle>(&self, tween: T) -> TweenId {
        let mut shell: Box<T> = self.pool.borrow_mut().acquire::<T>();
        *shell = tween;
        let mut unit: Box<dyn Tween> = shell;

        {
            let st = self.state.borrow();
            unit.bind_defaults(&st.defaults);
        }
        {
            let core = unit.core_mut();
            core.active = true;
            core.playing = true;
            core.delay_done = core.delay <= 0.0;
        }

        let tag = unit.core().tag().cloned();
        let target = unit.core().target.clone();
        let channel = unit.core().channel();

        let mut st = self.state.borrow_mut();
        let id = st.slots.insert(Entry {
            cell: Rc::new(RefCell::new(unit)),
            tag,
            target,
            channel,
        });
        if st.updating {
            st.pending_add.push(id);
        } else {
            st.order.push(id);
        }
        tracing::trace!(?id, "tween spawned");
        id
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Advance every active tween on `channel` by `delta`.
    ///
    /// Iterates the registry back-to-front so entries removed in place do
    /// not skip or double-visit survivors. Structural mutation requested by
    /// callbacks is staged and flushed (removals first, then additions) once
    /// the pass ends. A re-entrant update call is absorbed as a no-op.
    pub fn update(&self, delta: f32, channel: UpdateChannel) {
        {
            let mut st = self.state.borrow_mut();
            if st.updating || st.order.is_empty() {
                return;
            }
            st.updating = true;
        }

        let mut index = self.state.borrow().order.len();
        while index > 0 {
            index -= 1;

            let (id, cell, tween_channel) = {
                let mut st = self.state.borrow_mut();
                let Some(&id) = st.order.get(index) else {
                    continue;
                };
                match st.slots.get(id) {
                    Some(entry) => (id, Rc::clone(&entry.cell), entry.channel),
                    None => {
                        st.order.remove(index);
                        continue;
                    }
                }
            };

            let alive = cell
                .try_borrow()
                .map(|unit| unit.core().is_active())
                .unwrap_or(true);
            if !alive {
                drop(cell);
                self.remove_at(index, id);
                continue;
            }
            if tween_channel != channel {
                continue;
            }

            let outcome = match cell.try_borrow_mut() {
                Ok(mut unit) => Some(advance(&mut **unit, delta)),
                Err(_) => None,
            };
            drop(cell);
            if let Some(Advance::Completed { killed: true }) = outcome {
                self.unregister(id);
            }
            self.drain_deferred();
        }

        self.state.borrow_mut().updating = false;
        self.flush_pending();
    }

    /// Advance tweens on the manual channel with a caller-supplied delta
    pub fn manual_update(&self, delta: f32) {
        self.update(delta, UpdateChannel::Manual);
    }

    // =========================================================================
    // Per-tween control
    // =========================================================================

    pub fn play(&self, id: TweenId) {
        self.control(id, ControlOp::Play);
    }

    pub fn pause(&self, id: TweenId) {
        self.control(id, ControlOp::Pause);
    }

    /// Deactivate and unregister, optionally forcing completion first.
    /// Safe to call at any time, including from callbacks mid-update, and
    /// idempotent on dead handles.
    pub fn kill(&self, id: TweenId, complete: bool) {
        self.control(id, ControlOp::Kill { complete });
    }

    /// Snap to the terminal value and fire on_complete (without killing)
    pub fn complete(&self, id: TweenId) {
        self.control(id, ControlOp::Complete);
    }

    pub fn restart(&self, id: TweenId, include_delay: bool) {
        self.control(id, ControlOp::Restart { include_delay });
    }

    /// Reset to the start, force the value back to fraction 0, and leave the
    /// tween not playing
    pub fn rewind(&self, id: TweenId, include_delay: bool) {
        self.control(id, ControlOp::Rewind { include_delay });
    }

    /// Jump to an absolute time, applying the eased value immediately
    pub fn seek(&self, id: TweenId, time: f32, and_play: bool) {
        self.control(id, ControlOp::Seek { time, and_play });
    }

    pub fn play_forward(&self, id: TweenId) {
        self.control(id, ControlOp::PlayForward);
    }

    pub fn play_backwards(&self, id: TweenId) {
        self.control(id, ControlOp::PlayBackwards);
    }

    // =========================================================================
    // Group control
    // =========================================================================

    pub fn pause_all(&self) {
        self.group(false, |_| true, ControlOp::Pause);
    }

    pub fn play_all(&self) {
        self.group(false, |_| true, ControlOp::Play);
    }

    /// Kill every tween and guarantee a fully empty registry, even for kills
    /// that had to be deferred.
    pub fn kill_all(&self, complete: bool) {
        let ids: Vec<TweenId> = {
            let st = self.state.borrow();
            st.order.iter().rev().copied().collect()
        };
        // Defer removals so the sweep below observes one consistent snapshot
        let was_updating = {
            let mut st = self.state.borrow_mut();
            std::mem::replace(&mut st.updating, true)
        };
        for id in ids {
            self.apply_op(id, ControlOp::Kill { complete });
        }
        self.state.borrow_mut().updating = was_updating;
        self.drain_deferred();

        let leftovers: Vec<TweenCell> = {
            let mut st = self.state.borrow_mut();
            st.order.clear();
            st.pending_add.clear();
            st.pending_remove.clear();
            st.slots.drain().map(|(_, entry)| entry.cell).collect()
        };
        for cell in leftovers {
            self.recycle(cell);
        }
        tracing::debug!("killed all tweens");
    }

    pub fn pause_tagged(&self, tag: impl Into<TweenTag>) {
        let tag = tag.into();
        self.group(false, move |e| e.tag.as_ref() == Some(&tag), ControlOp::Pause);
    }

    pub fn play_tagged(&self, tag: impl Into<TweenTag>) {
        let tag = tag.into();
        self.group(false, move |e| e.tag.as_ref() == Some(&tag), ControlOp::Play);
    }

    pub fn kill_tagged(&self, tag: impl Into<TweenTag>, complete: bool) {
        let tag = tag.into();
        self.group(
            true,
            move |e| e.tag.as_ref() == Some(&tag),
            ControlOp::Kill { complete },
        );
    }

    pub fn pause_target(&self, target: &TweenTarget) {
        let target = target.clone();
        self.group(
            false,
            move |e| e.target.as_ref().is_some_and(|t| t.same(&target)),
            ControlOp::Pause,
        );
    }

    pub fn play_target(&self, target: &TweenTarget) {
        let target = target.clone();
        self.group(
            false,
            move |e| e.target.as_ref().is_some_and(|t| t.same(&target)),
            ControlOp::Play,
        );
    }

    /// Kill every tween animating `target`. Collaborators that own the
    /// animated objects call this when an object is destroyed, since the
    /// engine never observes destruction itself.
    pub fn kill_target(&self, target: &TweenTarget, complete: bool) {
        let target = target.clone();
        self.group(
            true,
            move |e| e.target.as_ref().is_some_and(|t| t.same(&target)),
            ControlOp::Kill { complete },
        );
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of registered tweens (staged additions land after the pass)
    pub fn active_count(&self) -> usize {
        self.state.borrow().order.len()
    }

    pub fn count_tagged(&self, tag: impl Into<TweenTag>) -> usize {
        let tag = tag.into();
        self.count_matching(|e| e.tag.as_ref() == Some(&tag))
    }

    pub fn count_target(&self, target: &TweenTarget) -> usize {
        self.count_matching(|e| e.target.as_ref().is_some_and(|t| t.same(target)))
    }

    pub fn is_active(&self, id: TweenId) -> bool {
        self.with_core(id, |core| core.is_active()).unwrap_or(false)
    }

    pub fn is_playing(&self, id: TweenId) -> bool {
        self.with_core(id, |core| core.is_playing()).unwrap_or(false)
    }

    pub fn is_complete(&self, id: TweenId) -> bool {
        self.with_core(id, |core| core.is_complete()).unwrap_or(false)
    }

    pub fn elapsed(&self, id: TweenId) -> Option<f32> {
        self.with_core(id, |core| core.elapsed())
    }

    /// Elapsed fraction of the duration, clamped to `[0, 1]`
    pub fn fraction(&self, id: TweenId) -> Option<f32> {
        self.with_core(id, |core| core.fraction())
    }

    /// Run a closure against a registered [`Sequence`].
    ///
    /// Returns `None` when the id is dead, mid-callback, or not a sequence.
    /// Structural mutation through this accessor is still rejected once the
    /// sequence has started.
    pub fn with_sequence<R>(&self, id: TweenId, f: impl FnOnce(&mut Sequence) -> R) -> Option<R> {
        let cell = self.cell_of(id)?;
        let mut unit = cell.try_borrow_mut().ok()?;
        let seq = unit.as_any_mut().downcast_mut::<Sequence>()?;
        Some(f(seq))
    }

    // =========================================================================
    // Pool management
    // =========================================================================

    /// Pre-populate the pool for a concrete tween type
    pub fn warmup<T: Recycle>(&self, count: usize) {
        self.pool.borrow_mut().warmup::<T>(count);
    }

    /// Pre-populate every built-in tweener type plus sequences
    pub fn set_capacity(&self, tweener_capacity: usize, sequence_capacity: usize) {
        let mut pool = self.pool.borrow_mut();
        pool.warmup::<Tweener<f32>>(tweener_capacity);
        pool.warmup::<Tweener<Vec2>>(tweener_capacity);
        pool.warmup::<Tweener<Vec3>>(tweener_capacity);
        pool.warmup::<Tweener<Color>>(tweener_capacity);
        pool.warmup::<Tweener<Quat>>(tweener_capacity);
        pool.warmup::<Sequence>(sequence_capacity);
    }

    /// Retired instances currently pooled for a concrete tween type
    pub fn pooled<T: Recycle>(&self) -> usize {
        self.pool.borrow().pooled::<T>()
    }

    pub fn clear_pools(&self) {
        self.pool.borrow_mut().clear();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn cell_of(&self, id: TweenId) -> Option<TweenCell> {
        let st = self.state.borrow();
        st.slots.get(id).map(|entry| Rc::clone(&entry.cell))
    }

    fn with_core<R>(&self, id: TweenId, f: impl FnOnce(&TweenCore) -> R) -> Option<R> {
        let cell = self.cell_of(id)?;
        let unit = cell.try_borrow().ok()?;
        Some(f(unit.core()))
    }

    fn control(&self, id: TweenId, op: ControlOp) {
        self.apply_op(id, op);
        self.drain_deferred();
    }

    /// Apply an operation now if the tween's cell is free, otherwise queue it
    /// until the in-flight advance releases the cell. Returns whether the
    /// operation executed.
    fn apply_op(&self, id: TweenId, op: ControlOp) -> bool {
        let Some(cell) = self.cell_of(id) else {
            return true;
        };
        let outcome = match cell.try_borrow_mut() {
            Ok(mut unit) => {
                let unregister = run_control(&mut **unit, op);
                drop(unit);
                Some(unregister)
            }
            Err(_) => None,
        };
        drop(cell);
        match outcome {
            Some(unregister) => {
                if unregister {
                    self.unregister(id);
                }
                true
            }
            None => {
                self.state.borrow_mut().deferred.push((id, op));
                false
            }
        }
    }

    /// Apply operations that were queued against busy cells. Stops when a
    /// full pass makes no progress; the advance that holds the borrow drains
    /// again as soon as it returns.
    fn drain_deferred(&self) {
        loop {
            let batch: SmallVec<[(TweenId, ControlOp); 4]> = {
                let mut st = self.state.borrow_mut();
                if st.deferred.is_empty() {
                    return;
                }
                std::mem::take(&mut st.deferred)
            };
            let mut progressed = false;
            for (id, op) in batch {
                if self.apply_op(id, op) {
                    progressed = true;
                }
            }
            if !progressed {
                return;
            }
        }
    }

    /// Group operations snapshot matching ids first, so matching never
    /// contends with callbacks mutating the registry while ops run.
    fn group(&self, back_to_front: bool, pred: impl Fn(&Entry) -> bool, op: ControlOp) {
        let mut ids: Vec<TweenId> = {
            let st = self.state.borrow();
            st.order
                .iter()
                .filter(|&&id| st.slots.get(id).map(&pred).unwrap_or(false))
                .copied()
                .collect()
        };
        if back_to_front {
            ids.reverse();
        }
        for id in ids {
            self.apply_op(id, op);
        }
        self.drain_deferred();
    }

    fn count_matching(&self, pred: impl Fn(&Entry) -> bool) -> usize {
        let st = self.state.borrow();
        st.order
            .iter()
            .filter(|&&id| {
                st.slots.get(id).is_some_and(|entry| {
                    pred(entry)
                        && entry
                            .cell
                            .try_borrow()
                            .map(|unit| unit.core().is_active())
                            .unwrap_or(true)
                })
            })
            .count()
    }

    /// Drop a registration: immediately outside a pass, staged during one.
    fn unregister(&self, id: TweenId) {
        let removed = {
            let mut st = self.state.borrow_mut();
            if st.updating {
                st.pending_remove.push(id);
                None
            } else {
                if let Some(pos) = st.order.iter().position(|&x| x == id) {
                    st.order.remove(pos);
                }
                st.slots.remove(id)
            }
        };
        if let Some(entry) = removed {
            self.recycle(entry.cell);
        }
    }

    /// In-pass removal of an entry the iteration found already inactive
    fn remove_at(&self, index: usize, id: TweenId) {
        let removed = {
            let mut st = self.state.borrow_mut();
            if st.order.get(index) == Some(&id) {
                st.order.remove(index);
            }
            st.pending_remove.retain(|pending| *pending != id);
            st.slots.remove(id)
        };
        if let Some(entry) = removed {
            self.recycle(entry.cell);
        }
    }

    /// Flush staged structural mutation: removals first, then additions
    fn flush_pending(&self) {
        loop {
            let id = {
                let mut st = self.state.borrow_mut();
                st.pending_remove.pop()
            };
            let Some(id) = id else { break };
            let removed = {
                let mut st = self.state.borrow_mut();
                if let Some(pos) = st.order.iter().position(|&x| x == id) {
                    st.order.remove(pos);
                }
                st.slots.remove(id)
            };
            if let Some(entry) = removed {
                self.recycle(entry.cell);
            }
        }

        let additions = {
            let mut st = self.state.borrow_mut();
            std::mem::take(&mut st.pending_add)
        };
        if !additions.is_empty() {
            let mut st = self.state.borrow_mut();
            for id in additions {
                if st.slots.contains_key(id) {
                    st.order.push(id);
                }
            }
        }
    }

    /// Return a sole-owned tween box to the pool
    fn recycle(&self, cell: TweenCell) {
        if let Ok(inner) = Rc::try_unwrap(cell) {
            self.pool.borrow_mut().release(inner.into_inner());
        }
    }
}

/// Run a control operation against a tween. Returns true when the tween was
/// killed and its registration must be dropped.
fn run_control(unit: &mut dyn Tween, op: ControlOp) -> bool {
    match op {
        ControlOp::Play => {
            tween::play_in_place(unit);
            false
        }
        ControlOp::Pause => {
            tween::pause_in_place(unit);
            false
        }
        ControlOp::Kill { complete } => tween::kill_in_place(unit, complete),
        ControlOp::Complete => {
            tween::complete_in_place(unit);
            false
        }
        ControlOp::Restart { include_delay } => {
            tween::restart_in_place(unit, include_delay);
            false
        }
        ControlOp::Rewind { include_delay } => {
            tween::rewind_in_place(unit, include_delay);
            false
        }
        ControlOp::Seek { time, and_play } => {
            tween::seek_in_place(unit, time, and_play);
            false
        }
        ControlOp::PlayForward => {
            tween::play_forward_in_place(unit);
            false
        }
        ControlOp::PlayBackwards => {
            tween::play_backwards_in_place(unit);
            false
        }
    }
}
