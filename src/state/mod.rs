//! State module for tracking site crawl progress
//!
//! - `SiteState`: the lifecycle of a site in the crawl queue and its legal transitions

mod site_state;

pub use site_state::SiteState;
