pub mod api;
pub mod error;
pub mod format;
pub mod invoker;
pub mod record;
pub mod request;

pub use api::{
    expand_home, ApiError, AvailabilityResponse, SearchHandler, SearchParams, SearchResponse,
};
pub use error::SearchError;
pub use format::{format_matches, FormattedMatch};
pub use invoker::{FailurePolicy, Invoker};
pub use record::{parse_output, RawMatchRecord};
pub use request::SearchRequest;
