pub mod builders;
pub mod fake_executor;

pub use builders::{fail_work, flaky_work, graph, graph_with, ok_work, sleep_work, transient_work};
pub use fake_executor::FakeExecutor;
