//! Test harness utilities shared by unit and behavioural suites.

mod config_loader;
mod doubles;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use doubles::{FakeProbe, FakeSettings, RecordingEnforcer};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{PollerWorld, RETRY_INTERVAL, world};
