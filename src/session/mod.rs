//! Session bookkeeping: roster, histories, usage, pricing and idle eviction.

pub mod cleanup;
pub mod pricing;
pub mod roster;
pub mod state;
pub mod usage;

pub use cleanup::SessionSweeper;
pub use pricing::{ModelPricing, PricingTable};
pub use roster::{ModelConfig, default_catalog, resolve_credential, verify_key};
pub use state::{ModelSlot, SessionSnapshot, SessionState, SessionStore, SharedSession};
pub use usage::UsageRecord;
