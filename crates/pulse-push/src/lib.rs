//! Push delivery for the Pulse backend.
//!
//! The [`PushDispatcher`] resolves each recipient's registered device
//! tokens, sends them in bulk through a [`PushTransport`], and removes the
//! tokens the transport reports as permanently invalid. Delivery failures
//! are logged and never propagated to the caller.
//!
//! [`FcmTransport`] is the production transport (FCM HTTP v1 over
//! `reqwest`). Tests supply their own transport implementation.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fcm;
pub mod transport;

pub use config::PushConfig;
pub use dispatcher::{DispatchReport, PushDispatcher, PushMessage};
pub use error::PushError;
pub use fcm::FcmTransport;
pub use transport::{BatchResponse, MulticastMessage, PushErrorCode, PushTransport, SendResponse};
