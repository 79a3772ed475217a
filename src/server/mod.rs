//! HTTP server for tiercrawl
//!
//! Exposes the crawl endpoint together with quota administration, health,
//! stats and Prometheus metrics.
//!
//! # Endpoints
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET, POST | `/crawl?url=..&customerType=..` | Crawl a URL |
//! | GET, POST | `/workers?workers=N` | Set max workers |
//! | GET, POST | `/pages?pages=N` | Set max pages per window |
//! | GET | `/getworkers`, `/getpages` | Current limits |
//! | GET | `/getCurrWorkers`, `/getCurrPages` | Current usage |
//! | GET | `/api/quota` | Full quota snapshot |
//! | GET | `/api/health`, `/api/stats` | Health and runtime stats |
//! | GET | `/metrics` | Prometheus exposition |

pub mod api;
pub mod http;

pub use api::create_router;
pub use http::{AppState, CrawlServer, ServerError, ServerInfo};
