//! headcheck-session — runs a liveness session against a camera and a
//! landmark provider.
//!
//! The session owns its [`headcheck_core::LivenessMachine`] inside a single
//! task. Callers drive it through a cloneable [`SessionHandle`] and observe
//! it through a watch channel of [`headcheck_core::SessionState`] snapshots.

pub mod camera;
pub mod config;
pub mod script;
pub mod session;

pub use camera::{Camera, CameraError, StillCamera};
pub use config::{Config, ConfigError};
pub use script::{ScriptedProvider, Trace, TraceEntry};
pub use session::{spawn_session, SessionError, SessionHandle};
