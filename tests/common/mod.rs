#![allow(dead_code)]

pub use toolrun_test_utils::builders;
pub use toolrun_test_utils::{init_tracing, with_timeout};
