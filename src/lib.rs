//! Stepcount: a streaming pedometer engine
//!
//! Turns a stream of three-axis accelerometer samples into a step count,
//! distance travelled, cadence and an energy-expenditure estimate.
//!
//! # Design Philosophy
//!
//! - **Staged pipeline**: each sample runs through a fixed chain of stages
//!   (pre-process, motion detect, optional filter, scoring, detection,
//!   post-process) connected by bounded ring buffers.
//! - **Pluggable stages**: every stage sits behind the `Stage` trait, so any
//!   of them can be swapped through a `StageFactory` without touching the
//!   chain.
//! - **Fixed footprint**: buffers and stage state are allocated once per
//!   session; per-sample work is bounded.
//! - **No globals**: all state lives in a `Session`.
//!
//! # Example
//!
//! ```
//! use stepcount::{EngineConfig, Gender, Session, UserProfile};
//!
//! let profile = UserProfile::new(Gender::Female, 30, 165, 60);
//! let mut session = Session::new(EngineConfig::default(), profile).unwrap();
//!
//! for i in 0..500u64 {
//!     let t = i as f32 * 0.02;
//!     let z = 9.81 + 3.0 * (2.0 * std::f32::consts::PI * 2.0 * t).sin();
//!     session.process_sample(i * 20, 0.1, 0.2, z);
//! }
//!
//! assert!(session.steps() > 0);
//! println!("{} steps, {:.2} m", session.steps(), session.distance());
//! ```

pub mod config;
pub mod error;
pub mod ffi;
pub mod metrics;
pub mod pipeline;
pub mod ring_buffer;
pub mod session;
pub mod stage;
pub mod types;

// Reference stages
pub mod detection;
pub mod motion_detect;
pub mod post_process;
pub mod preprocess;
pub mod scoring;
pub mod smoothing;


// Re-export commonly used types
pub use config::{DetectionThreshold, EngineConfig, Tuning};
pub use error::{PedometerError, Result};
pub use metrics::{DerivedConstants, SessionMetrics};
pub use pipeline::Pipeline;
pub use ring_buffer::RingBuffer;
pub use session::Session;
pub use stage::{PointBuffer, Stage, StageContext, StageFactory, StandardStages};
pub use types::{AccelSample, DataPoint, Gender, StageRole, Topology, UserProfile};
