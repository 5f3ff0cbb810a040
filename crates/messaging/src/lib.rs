//! # Harvestchat Messaging Crate
//!
//! The realtime chat core: per-conversation fanout, session lifecycle,
//! read receipts, and the conversation service behind both the socket and
//! the HTTP surface.
//!
//! - **registry**: conversation id → live subscriber channel
//! - **session**: one connection's membership gate and event dispatch
//! - **read_receipts**: the mark-read rule and its bulk variant
//! - **conversations**: find-or-create pairs, inbox overviews, gated access
//! - **events**: the tagged client/server wire events

pub mod conversations;
pub mod events;
pub mod principal;
pub mod read_receipts;
pub mod registry;
pub mod session;

pub use conversations::{ConversationOverview, ConversationService};
pub use events::{ClientEvent, ServerEvent};
pub use principal::Principal;
pub use read_receipts::{ReadReceipt, ReadReceiptCoordinator};
pub use registry::ChannelRegistry;
pub use session::ChatSession;
