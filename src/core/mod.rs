//! 시간 분할 주문 실행

pub mod cancel;
pub mod twap_scheduler;

pub use cancel::{cancellable_delay, CancelToken};
pub use twap_scheduler::{TwapExecution, TwapPlan, TwapScheduler};
