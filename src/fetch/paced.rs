use super::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

/// An [`HttpClient`] wrapper that waits `delay` before every request, keeping
/// sequential downloads polite towards the results API.
pub struct Paced<C> {
    pub inner: C,
    pub delay: Duration,
}

impl<C> Paced<C> {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

    pub fn new(inner: C, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for Paced<C> {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        tokio::time::sleep(self.delay).await;
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct Counting(AtomicUsize);

    #[async_trait]
    impl HttpClient for Counting {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(http::Response::new("[]").into())
        }
    }

    #[tokio::test]
    async fn test_paced_waits_before_each_request() {
        let client = Paced::new(Counting(AtomicUsize::new(0)), Duration::from_millis(20));
        let start = Instant::now();

        for _ in 0..3 {
            let req = reqwest::Request::new(
                reqwest::Method::GET,
                "http://localhost/".parse().unwrap(),
            );
            client.execute(req).await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(60));
        assert_eq!(client.inner.0.load(Ordering::SeqCst), 3);
    }
}
