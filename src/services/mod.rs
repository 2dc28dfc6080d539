//! Outbound service clients and shared request infrastructure.

pub mod api;
pub mod identity;
pub mod image_host;
pub mod rate_limit;

pub use api::{BlogClient, MonthCounts};
pub use identity::IdentityPool;
pub use image_host::{ImageBed, ImageHost};
pub use rate_limit::RateLimiter;
