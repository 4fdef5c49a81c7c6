//! Object recycling for tween instances
//!
//! A per-type stack of retired, reset-cleared instances. The scheduler draws
//! spawn shells from here and returns killed tweens, so steady-state
//! animation traffic stops allocating tween boxes. The pool never checks
//! whether a returned instance is still registered; the scheduler is the
//! only caller that returns instances, and it does so on removal.

use std::any::TypeId;

use rustc_hash::FxHashMap;

use crate::tween::Tween;

/// A tween type that can live in the pool: resettable plus default-constructible.
pub trait Recycle: Tween + Default {}

impl<T: Tween + Default> Recycle for T {}

#[derive(Default)]
struct PoolStack {
    free: Vec<Box<dyn Tween>>,
    total_created: u64,
}

/// Recycling store keyed by concrete tween type
#[derive(Default)]
pub struct TweenPool {
    stacks: FxHashMap<TypeId, PoolStack>,
}

impl TweenPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop a reset instance of `T`, constructing one when the stack is empty.
    pub fn acquire<T: Recycle>(&mut self) -> Box<T> {
        let stack = self.stacks.entry(TypeId::of::<T>()).or_default();
        if let Some(unit) = stack.free.pop() {
            if let Ok(concrete) = unit.into_any().downcast::<T>() {
                return concrete;
            }
        }
        stack.total_created += 1;
        Box::new(T::default())
    }

    /// Reset an instance and push it back onto its type's stack.
    pub fn release(&mut self, mut unit: Box<dyn Tween>) {
        unit.reset();
        let key = (*unit).as_any().type_id();
        self.stacks.entry(key).or_default().free.push(unit);
    }

    /// Pre-populate a type's stack to avoid first-use allocation spikes.
    pub fn warmup<T: Recycle>(&mut self, count: usize) {
        let stack = self.stacks.entry(TypeId::of::<T>()).or_default();
        stack.free.reserve(count);
        for _ in 0..count {
            stack.free.push(Box::new(T::default()));
            stack.total_created += 1;
        }
    }

    /// Number of retired instances currently held for `T`
    pub fn pooled<T: Recycle>(&self) -> usize {
        self.stacks
            .get(&TypeId::of::<T>())
            .map(|stack| stack.free.len())
            .unwrap_or(0)
    }

    /// Diagnostic: how many `T` instances this pool has ever constructed
    pub fn total_created<T: Recycle>(&self) -> u64 {
        self.stacks
            .get(&TypeId::of::<T>())
            .map(|stack| stack.total_created)
            .unwrap_or(0)
    }

    /// Drop every retired instance in every stack
    pub fn clear(&mut self) {
        self.stacks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;
    use crate::tweener::Tweener;

    #[test]
    fn test_acquire_constructs_when_empty() {
        let mut pool = TweenPool::new();
        let tween = pool.acquire::<Tweener<f32>>();
        assert!(!tween.core().is_active());
        assert_eq!(pool.total_created::<Tweener<f32>>(), 1);
    }

    #[test]
    fn test_release_increases_pooled_count() {
        let mut pool = TweenPool::new();
        let tween = pool.acquire::<Tweener<f32>>();
        assert_eq!(pool.pooled::<Tweener<f32>>(), 0);

        pool.release(tween);
        assert_eq!(pool.pooled::<Tweener<f32>>(), 1);
    }

    #[test]
    fn test_acquire_after_release_reuses_instance() {
        let mut pool = TweenPool::new();
        let first = pool.acquire::<Tweener<f32>>();
        let address = &*first as *const Tweener<f32>;
        pool.release(first);

        let second = pool.acquire::<Tweener<f32>>();
        assert_eq!(&*second as *const Tweener<f32>, address);
        assert_eq!(pool.total_created::<Tweener<f32>>(), 1);
    }

    #[test]
    fn test_release_resets_state() {
        let mut pool = TweenPool::new();
        let mut tween = pool.acquire::<Tweener<f32>>();
        {
            let core = tween.core_mut();
            core.active = true;
            core.playing = true;
            core.duration = 5.0;
            core.on_complete = Some(Box::new(|| {}));
        }
        pool.release(tween);

        let reused = pool.acquire::<Tweener<f32>>();
        let core = reused.core();
        assert!(!core.is_active());
        assert!(!core.playing);
        assert_eq!(core.duration(), 0.0);
        assert!(core.on_complete.is_none());
    }

    #[test]
    fn test_stacks_are_kept_per_type() {
        let mut pool = TweenPool::new();
        pool.release(Box::new(Tweener::<f32>::default()));
        pool.release(Box::new(Sequence::default()));

        assert_eq!(pool.pooled::<Tweener<f32>>(), 1);
        assert_eq!(pool.pooled::<Sequence>(), 1);
        // Acquiring one type leaves the other stack untouched
        let _seq = pool.acquire::<Sequence>();
        assert_eq!(pool.pooled::<Tweener<f32>>(), 1);
        assert_eq!(pool.pooled::<Sequence>(), 0);
    }

    #[test]
    fn test_warmup_preallocates() {
        let mut pool = TweenPool::new();
        pool.warmup::<Tweener<f32>>(10);
        assert_eq!(pool.pooled::<Tweener<f32>>(), 10);
        assert_eq!(pool.total_created::<Tweener<f32>>(), 10);
    }

    #[test]
    fn test_clear_empties_all_stacks() {
        let mut pool = TweenPool::new();
        pool.warmup::<Tweener<f32>>(5);
        pool.warmup::<Sequence>(3);

        pool.clear();
        assert_eq!(pool.pooled::<Tweener<f32>>(), 0);
        assert_eq!(pool.pooled::<Sequence>(), 0);
    }
}
