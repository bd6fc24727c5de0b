use std::{future::Future, time::Duration};

use tracing::debug;

pub const RETRY_ATTEMPTS: u32 = 3;
pub const RETRY_STEP: Duration = Duration::from_millis(1500);

/// Decides whether a failed attempt is worth another go.
pub trait Transient {
  fn is_transient(&self) -> bool;
}

// Runs `op` up to `attempts` times, sleeping `step * n` after the n-th
// transient failure. Non-transient errors are returned immediately, and
// so is the last error once attempts run out.
pub async fn retry_linear<T, E, F, Fut>(
  attempts: u32,
  step: Duration,
  mut op: F,
) -> Result<T, E>
where
  E: Transient + std::fmt::Display,
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let mut attempt = 1;
  loop {
    match op(attempt).await {
      Ok(value) => return Ok(value),
      Err(e) if attempt < attempts && e.is_transient() => {
        let wait = step * attempt;
        debug!("attempt {attempt} failed ({e}), retrying in {wait:?}");
        tokio::time::sleep(wait).await;
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

/// Bounds `fut` by `limit`; `None` means the deadline passed first.
pub async fn with_deadline<T>(
  limit: Duration,
  fut: impl Future<Output = T>,
) -> Option<T> {
  tokio::time::timeout(limit, fut).await.ok()
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{AtomicU32, Ordering};

  use tokio::time::Instant;

  use super::*;

  #[derive(Debug, PartialEq)]
  struct Flaky(bool);

  impl std::fmt::Display for Flaky {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      write!(f, "flaky({})", self.0)
    }
  }

  impl Transient for Flaky {
    fn is_transient(&self) -> bool {
      self.0
    }
  }

  #[tokio::test(start_paused = true)]
  async fn succeeds_on_third_attempt_after_linear_backoff() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let start = Instant::now();

    let res = retry_linear(RETRY_ATTEMPTS, RETRY_STEP, move |_| async move {
      if calls.fetch_add(1, Ordering::SeqCst) < 2 {
        Err(Flaky(true))
      } else {
        Ok("done")
      }
    })
    .await;

    assert_eq!(res, Ok("done"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 1500ms after the first failure, 3000ms after the second
    assert_eq!(start.elapsed(), Duration::from_millis(4500));
  }

  #[tokio::test(start_paused = true)]
  async fn gives_up_after_three_attempts() {
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let res: Result<(), _> = retry_linear(RETRY_ATTEMPTS, RETRY_STEP, move |_| async move {
      calls.fetch_add(1, Ordering::SeqCst);
      Err(Flaky(true))
    })
    .await;

    assert_eq!(res, Err(Flaky(true)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn permanent_failure_is_not_retried() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let start = Instant::now();

    let res: Result<(), _> = retry_linear(RETRY_ATTEMPTS, RETRY_STEP, move |_| async move {
      calls.fetch_add(1, Ordering::SeqCst);
      Err(Flaky(false))
    })
    .await;

    assert_eq!(res, Err(Flaky(false)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
  }

  #[tokio::test(start_paused = true)]
  async fn deadline_cuts_off_slow_futures() {
    let slow = async {
      tokio::time::sleep(Duration::from_secs(10)).await;
      1
    };
    assert_eq!(with_deadline(Duration::from_secs(1), slow).await, None);
    assert_eq!(with_deadline(Duration::from_secs(1), async { 2 }).await, Some(2));
  }
}
