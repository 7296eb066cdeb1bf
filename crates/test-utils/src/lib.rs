pub mod builders;
pub mod fake_bridge;

pub use builders::{CommandOptionsBuilder, SettingsBuilder};
pub use fake_bridge::FakeBridge;
