pub mod app;
pub mod cmd;
pub mod ledger;
pub mod log;
pub mod lots;
pub mod tracing;
pub mod util;

#[cfg(any(test, feature = "testlib"))]
pub mod testlib;
