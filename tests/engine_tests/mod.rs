pub mod emission_test;
pub mod queue_test;
pub mod sandbox_test;
pub mod watchdog_test;
