//! Utilities used in tests across multiple crates in this workspace.

mod fakes;
mod matchers;
mod tokens;

pub use fakes::{FakeLlmClient, FakeTokenizer};
pub use matchers::anyhow_downcasts_to;
pub use tokens::{row, token, PAGE_HEIGHT, PAGE_WIDTH};
