use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Exponential backoff between readiness attempts, capped at [`MAX_BACKOFF`].
#[derive(Debug)]
pub(crate) struct Backoff {
    next: Duration,
}

impl Backoff {
    pub(crate) fn new() -> Self {
        Self {
            next: INITIAL_BACKOFF,
        }
    }

    pub(crate) fn advance(&mut self) -> Duration {
        let current = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        current
    }
}

/// Repeatedly dial and probe a freshly launched service until it accepts a
/// connection, bounded by one overall `budget`.
///
/// Each attempt calls `dial` to establish a client, then `probe` to verify
/// the service actually answers. The first successful probe returns the
/// client immediately. Any error backs off and retries. A container can be
/// up at the process level long before it accepts connections, so attempts
/// keep going until the deadline; once the budget expires the in-flight
/// attempt is abandoned and the last attempt's error is returned, wrapped in
/// a readiness-timeout context. The caller is responsible for purging the
/// container on error.
pub async fn wait_ready<T, C, D, DFut, P, PFut>(
    budget: Duration,
    mut dial: D,
    mut probe: P,
) -> Result<C>
where
    D: FnMut() -> DFut,
    DFut: Future<Output = Result<T>>,
    P: FnMut(T) -> PFut,
    PFut: Future<Output = Result<C>>,
{
    let deadline = Instant::now() + budget;
    let mut backoff = Backoff::new();
    let mut last_err = anyhow!("no connection attempt was made");

    loop {
        let attempt = async { probe(dial().await?).await };
        match timeout_at(deadline, attempt).await {
            Ok(Ok(client)) => return Ok(client),
            Ok(Err(err)) => last_err = err,
            Err(_) => return Err(last_err).context(timeout_message(budget)),
        }

        let pause = backoff.advance();
        if Instant::now() + pause >= deadline {
            return Err(last_err).context(timeout_message(budget));
        }
        sleep(pause).await;
    }
}

fn timeout_message(budget: Duration) -> String {
    format!("service did not become ready within {}s", budget.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn backoff_doubles_until_capped() {
        let mut backoff = Backoff::new();
        assert_eq!(backoff.advance(), Duration::from_millis(500));
        assert_eq!(backoff.advance(), Duration::from_secs(1));
        assert_eq!(backoff.advance(), Duration::from_secs(2));
        assert_eq!(backoff.advance(), Duration::from_secs(4));
        assert_eq!(backoff.advance(), Duration::from_secs(5));
        assert_eq!(backoff.advance(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_client_once_probe_succeeds() {
        let probes = AtomicUsize::new(0);
        let result = wait_ready(
            Duration::from_secs(30),
            || async { Ok::<_, anyhow::Error>(42u32) },
            |client| {
                let attempt = probes.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(anyhow!("still starting up"))
                    } else {
                        Ok(client)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(probes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_dial_failures() {
        let dials = AtomicUsize::new(0);
        let result = wait_ready(
            Duration::from_secs(30),
            || {
                let attempt = dials.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(anyhow!("connection refused"))
                    } else {
                        Ok(7u8)
                    }
                }
            },
            |client| async move { Ok(client) },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(dials.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_timeout_when_probe_never_succeeds() {
        let started = Instant::now();
        let result: Result<u32> = wait_ready(
            Duration::from_secs(5),
            || async { Ok::<_, anyhow::Error>(0u32) },
            |_| async { Err(anyhow!("connection refused")) },
        )
        .await;

        let err = result.unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("service did not become ready within 5s"));
        assert!(rendered.contains("connection refused"));
        // The loop gives up at the deadline instead of hanging past it.
        assert!(started.elapsed() <= Duration::from_secs(5));
    }
}
