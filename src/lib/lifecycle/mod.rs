//! Display power, termination handling and the sampling loop.

pub mod controller;
pub mod shutdown;

pub use controller::Controller;
pub use shutdown::{listen_for_termination, ShutdownSignal};

/// Whether the display is lit. Tracks the last successful `set_power` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PowerState {
    #[default]
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Initializing,
    Running,
    Stopping,
    Stopped,
}

/// State the controller owns for the whole process lifetime.
#[derive(Debug, Clone, Default)]
pub struct LifecycleContext {
    pub power: PowerState,
    pub shutdown: ShutdownSignal,
}

impl LifecycleContext {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            power: PowerState::Off,
            shutdown,
        }
    }
}
