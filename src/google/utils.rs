use std::{future::Future, time::Duration};

use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::*;

pub struct Res(Response);

impl Res {
    /// Passes successful responses through, turns every other status into an [`Error`].
    pub async fn checked(self) -> Result<Response> {
        let res = self.0;
        let status = res.status();

        if status.is_success() {
            return Ok(res);
        }

        let text = res.text().await.unwrap_or_default();
        Err(Error::from_status(status, &text))
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.checked().await?.bytes().await?;
        let t = serde_json::from_slice::<T>(&bytes)
            .map_err(|e| Error::MalformedResponse(format!("unexpected response body: {e}")))?;
        Ok(t)
    }
}

impl From<Response> for Res {
    fn from(r: Response) -> Self {
        Self(r)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1 << attempt.min(16))
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy runs out of retries.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay(attempt);
                warn!(error = %e, attempt = attempt + 1, ?delay, "{what} failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            r => return r,
        }
    }
}
