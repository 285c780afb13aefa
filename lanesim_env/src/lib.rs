//! lanesim Environment Abstraction Layer
//!
//! Everything a simulation driver needs from the host process, behind
//! explicit values instead of process-global state:
//! - Time (`now()`, `sleep()`) via [`SimClock`], so drivers pace against
//!   the wall clock in production and a [`VirtualClock`] under test
//! - Search roots via [`SearchPath`], an ordered list the caller owns
//!   rather than a mutated global import path
//!
//! # Example
//!
//! ```ignore
//! use lanesim_env::{pacing_interval, SimClock, WallClock};
//!
//! let clock = WallClock::new();
//! let pause = pacing_interval(0.2, 1.0)?;
//! for _ in 0..50 {
//!     runtime.step()?;
//!     clock.sleep(pause);
//! }
//! ```

mod clock;
mod error;
pub mod runfiles;

pub use clock::{pacing_interval, SimClock, VirtualClock, WallClock};
pub use error::EnvError;
pub use runfiles::{runfiles_dir, SearchPath, DEFAULT_REPO_PATHS};
