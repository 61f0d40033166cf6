//! GeoGebra engine integration
//!
//! Session abstraction, the HTTP bridge session, input validation and
//! command synthesis.

pub mod bridge;
pub mod commands;
pub mod session;
pub mod validation;

pub use bridge::BridgeEngine;
pub use session::{CommandOutcome, EngineObject, EngineSession, ViewOptions};
pub use validation::{ValidationError, ValidationOutcome};
