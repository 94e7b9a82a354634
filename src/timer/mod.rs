mod controller;
mod state;

pub use controller::{TimerController, TimerSnapshot};
pub use state::{TimerMode, TimerState, TimerStatus};
