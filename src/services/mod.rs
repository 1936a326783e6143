// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Long-running services that talk to the outside world.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{AudioService, AudioServiceEvent, AudioServiceInput, ProvidesService};
}
pub use audio::{AudioService, AudioServiceEvent, AudioServiceInput};
pub use traits::ProvidesService;

mod audio;
mod traits;
