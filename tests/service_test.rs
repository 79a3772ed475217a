//! Request-path tests for CrawlService

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{service, service_with_prober, BrokenTransportProber, CountingFetcher};
use tiercrawl::error::Error;
use tiercrawl::models::Tier;

#[tokio::test]
async fn test_unreachable_url_never_reaches_the_queue() {
    let fetcher = Arc::new(CountingFetcher::new(&["https://example.com/a"]));
    let svc = service(fetcher.clone(), false, 10, 100);

    let err = svc.crawl("https://example.com", Tier::Paid).await.unwrap_err();

    assert!(matches!(err, Error::Unreachable { .. }));
    assert_eq!(err.status_code(), 404);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(svc.quota().current_pages(), 0);
}

#[tokio::test]
async fn test_transport_failure_maps_to_unreachable() {
    let fetcher = Arc::new(CountingFetcher::new(&["https://example.com/a"]));
    let svc = service_with_prober(Arc::new(BrokenTransportProber), fetcher.clone(), 10, 100);

    let err = svc.crawl("https://example.com", Tier::Free).await.unwrap_err();

    assert!(matches!(err, Error::Unreachable { .. }));
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.public_message(), "Web page not found");
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(svc.quota().current_pages(), 0);
}

#[tokio::test]
async fn test_invalid_url_rejected_before_reachability_check() {
    let svc = service(Arc::new(CountingFetcher::new(&[])), true, 10, 100);

    let err = svc.crawl("", Tier::Free).await.unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.public_message(), "URL is required");
}

#[tokio::test]
async fn test_permits_released_after_each_crawl() {
    let fetcher = Arc::new(CountingFetcher::new(&["https://example.com/a"]));
    let svc = service(fetcher.clone(), true, 10, 100);

    let data = svc.crawl("https://example.com", Tier::Paid).await.unwrap();
    assert_eq!(data.links, vec!["https://example.com/a".to_string()]);
    assert_eq!(svc.quota().current_workers(), 0);
    assert_eq!(svc.quota().current_pages(), 1);

    // Cached: no second fetch, but admission still counts the page
    svc.crawl("https://example.com", Tier::Free).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(svc.quota().current_pages(), 2);
    assert_eq!(svc.cache_stats().hits, 1);
}

#[tokio::test]
async fn test_fetch_failure_is_internal_and_releases_slots() {
    let svc = service(Arc::new(CountingFetcher::failing()), true, 10, 100);

    let err = svc.crawl("https://example.com", Tier::Paid).await.unwrap_err();

    assert!(matches!(err, Error::Fetch(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(svc.quota().current_workers(), 0);
}

#[tokio::test]
async fn test_concurrent_paid_crawls_over_worker_limit() {
    let fetcher = Arc::new(
        CountingFetcher::new(&["https://example.com/a"]).with_delay(Duration::from_millis(100)),
    );
    // Room for a single paid crawl (cost 5) at a time
    let svc = Arc::new(service(fetcher, true, 5, 100));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move {
                svc.crawl(&format!("https://example.com/{i}"), Tier::Paid)
                    .await
            })
        })
        .collect();

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(Error::WorkerLimitReached) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert!(admitted >= 1);
    assert_eq!(admitted + rejected, 4);
    assert_eq!(svc.quota().current_workers(), 0);
    assert_eq!(svc.queue_depth().paid, 0);
}

#[tokio::test]
async fn test_shutdown_on_idle_service() {
    let svc = service(Arc::new(CountingFetcher::new(&[])), true, 10, 100);
    svc.crawl("https://example.com", Tier::Free).await.unwrap();

    assert_eq!(svc.shutdown(), 0);
    assert_eq!(svc.queue_depth().free, 0);
}
