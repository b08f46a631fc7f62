pub mod backend;
pub mod config;
pub mod directory;
pub mod driver;
pub mod error;
pub mod io;
pub mod local;
pub mod paths;
pub mod state;
pub mod transition;
pub mod types;

pub use error::{DirMapError, Result};
pub use transition::{is_idle, transit, Transition, TransitionKey};
pub use types::{ActionType, LifecycleState, PolicyAction};
