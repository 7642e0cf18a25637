//! TWAP 중단 신호와 취소 가능한 대기

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::TradingError;

/// 협조적 취소 토큰 (복제본끼리 같은 신호 공유)
#[derive(Clone, Debug)]
pub struct CancelToken {
  sender: Arc<watch::Sender<bool>>,
  receiver: watch::Receiver<bool>,
}

impl CancelToken {
  pub fn new() -> Self {
    let (sender, receiver) = watch::channel(false);
    CancelToken { sender: Arc::new(sender), receiver }
  }

  pub fn cancel(&self) {
    self.sender.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.receiver.borrow()
  }

  /// 취소될 때까지 대기
  pub async fn cancelled(&self) {
    let mut receiver = self.receiver.clone();
    // sender 는 토큰이 들고 있으므로 닫히지 않음
    let _ = receiver.wait_for(|cancelled| *cancelled).await;
  }
}

impl Default for CancelToken {
  fn default() -> Self {
    Self::new()
  }
}

/// `interval` 만큼 대기. 도중에 취소되면 `Cancelled`
pub async fn cancellable_delay(interval: Duration, cancel: &CancelToken) -> Result<(), TradingError> {
  if cancel.is_cancelled() {
    return Err(TradingError::Cancelled);
  }
  tokio::select! {
    _ = tokio::time::sleep(interval) => Ok(()),
    _ = cancel.cancelled() => Err(TradingError::Cancelled),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::time::Instant;

  #[tokio::test(start_paused = true)]
  async fn test_delay_runs_in_full() {
    let token = CancelToken::new();
    let start = Instant::now();
    cancellable_delay(Duration::from_secs(10), &token).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(10));
  }

  #[tokio::test(start_paused = true)]
  async fn test_cancel_interrupts_delay() {
    let token = CancelToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_secs(3)).await;
      trigger.cancel();
    });

    let start = Instant::now();
    let result = cancellable_delay(Duration::from_secs(60), &token).await;
    assert!(matches!(result, Err(TradingError::Cancelled)));
    assert!(start.elapsed() < Duration::from_secs(60));
    assert!(token.is_cancelled());
  }

  #[tokio::test]
  async fn test_already_cancelled_returns_immediately() {
    let token = CancelToken::new();
    token.cancel();
    let result = cancellable_delay(Duration::from_secs(3600), &token).await;
    assert!(matches!(result, Err(TradingError::Cancelled)));
  }
}
