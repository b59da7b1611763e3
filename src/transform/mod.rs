//! Finding URLs in text and replacing them with embeds.
//!
//! [`OEmbed`] holds the provider registry, fetchers, formatters and template
//! settings. A transform walks the candidate URLs of a text in order:
//!
//! 1. Resolve the provider whose scheme matches the URL
//! 2. Fetch the provider's response and decode it into metadata
//! 3. Build a [`Response`](crate::response::Response) and hand it to the handler, if any
//! 4. Substitute the rendered content for the URL

pub mod engine;
pub mod extract;

pub use engine::{Handler, OEmbed, Substitution};
pub use extract::{extract_candidate_urls, CandidateUrls};
