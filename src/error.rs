// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Errors a session can report back to its caller.

use crate::uid::SlotId;
use thiserror::Error;

/// Things that can go wrong when operating a [crate::session::Session].
/// Everything here is recoverable; the session's state is unchanged when one
/// of these comes back.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SessionError {
    /// The catalog has no sound by this name.
    #[error("no sound named '{0}' in the catalog")]
    UnknownSound(String),

    /// The slot id is beyond the session's slot count.
    #[error("slot {0} doesn't exist")]
    InvalidSlot(SlotId),

    /// There's neither a loaded sample nor a synthesis recipe for the sound.
    #[error("sound '{0}' has no sample available and nothing to synthesize it with")]
    NoPlayableSource(String),

    /// Tempos must be finite and positive.
    #[error("{0} isn't a usable tempo")]
    InvalidTempo(f64),

    /// The session can't be built as configured.
    #[error("can't initialize: {0}")]
    Initialization(String),
}
