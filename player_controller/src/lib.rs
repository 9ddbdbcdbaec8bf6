//! Player locomotion composition: input intents, the locomotion state machine
//! and the rapier body binding.
#![forbid(unsafe_code)]

mod body;
mod context;
mod controller;
mod events;
mod input;
mod settings;
mod states;

pub use body::PlayerBody;
pub use context::MovementContext;
pub use controller::{LocomotionController, TickReport};
pub use events::MovementEvent;
pub use input::{DirectInputAdapter, InputAdapter, MovementIntents, RawInput};
pub use settings::{ConfigError, ConfigValidation, LocomotionConfig, CONFIG_VERSION};
pub use states::LocomotionState;
