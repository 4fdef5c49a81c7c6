//! Tweenline
//!
//! A per-frame value-interpolation engine: bind a getter/setter pair to a
//! start and end value, pick a duration and an easing curve, and the
//! scheduler drives the setter toward the end value over time.
//!
//! # Features
//!
//! - **Tweeners**: generic leaf animations over any [`TweenValue`] algebra
//!   (floats, vectors, colors, rotations, or your own types)
//! - **Sequences**: absolute-offset timelines of tweens and callbacks that
//!   nest and scrub consistently in either direction
//! - **Scheduling**: one registry advanced per external tick across normal,
//!   late, and manual channels, safe against structural mutation from
//!   callbacks mid-update
//! - **Looping**: restart, yoyo, and incremental loop modes with delay,
//!   time scaling, and reverse playback
//! - **Recycling**: killed tweens return to a per-type pool, so steady-state
//!   animation traffic stops allocating
//!
//! The engine owns no clock and renders nothing; a host ticks it with
//! elapsed time and the setters push values wherever they belong.

pub mod ease;
pub mod pool;
pub mod scheduler;
pub mod sequence;
pub mod tween;
pub mod tweener;
pub mod value;

pub use ease::{Ease, EaseCurve};
pub use pool::{Recycle, TweenPool};
pub use scheduler::{TweenId, TweenScheduler};
pub use sequence::Sequence;
pub use tween::{
    LoopType, Tween, TweenDefaults, TweenExt, TweenTag, TweenTarget, UpdateChannel,
};
pub use tweener::Tweener;
pub use value::{Color, Quat, TweenValue, Vec2, Vec3};
