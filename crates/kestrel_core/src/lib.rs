//! # KESTREL Core
//!
//! Primitives shared by the combat scheduler and the position engine:
//!
//! - **`Vec4`**: homogeneous 3-vector (`w = 1` for points, `w = 0` for
//!   directions), `Pod` so it can be read straight off the wire
//! - **`Clock`**: monotonic time source. Production code uses
//!   [`SystemClock`]; tests drive a [`ManualClock`] so eviction and
//!   interpolation windows are deterministic
//!
//! ## Example
//!
//! ```rust,ignore
//! use kestrel_core::{Clock, ManualClock, Vec4};
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(std::time::Duration::from_secs(1));
//! assert_eq!(clock.now() - start, std::time::Duration::from_secs(1));
//!
//! let p = Vec4::point(1.0, 2.0, 3.0);
//! assert_eq!(p.w, 1.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod clock;
pub mod math;

pub use clock::{offset_instant, Clock, ManualClock, SharedClock, SystemClock};
pub use math::{angle_difference, clamp, lerp, smooth_step, smoother_step, Vec4};
