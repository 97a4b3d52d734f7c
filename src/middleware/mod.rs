pub mod timing;

pub use timing::{Interceptor, DEFAULT_SLOW_THRESHOLD};
