pub mod builders;
pub mod fake_runner;

pub use builders::{graph, StepBuilder};
pub use fake_runner::{FakeRunner, Recorder};
