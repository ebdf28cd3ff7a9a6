//! Veilpost Key Registration Client
//!
//! Publishes the device's public key to the server-side directory so other
//! parties can encrypt to this device, and drives the per-session key
//! lifecycle:
//!
//! ```text
//! Idle ──activate──▶ Loading ──▶ Ready { key_pair, registered }
//!   ▲                   │
//!   │                   └──────▶ Error { reason }
//!   └── end_session (any state)
//! ```
//!
//! Registration failure never blocks the app: a device that failed to
//! register can still decrypt and read, it just cannot guarantee others can
//! encrypt new messages to it until a retry succeeds. Key-store failure is
//! fatal to the feature for the session.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod directory;
mod error;
mod session;

pub use directory::{Directory, HttpDirectory, RegisterOutcome};
pub use error::RegistrationError;
pub use session::{KeySession, SessionState};
