pub mod dispatch;
pub mod ingest;
pub mod rates;
pub mod subscriptions;

pub use dispatch::{DispatchEngine, DispatchJob};
pub use ingest::{IngestReport, IngestService};
pub use rates::RateAnalytics;
pub use subscriptions::SubscriptionService;
