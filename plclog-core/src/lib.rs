mod client;

pub use client::{
    ClientOptions, DEFAULT_BASE_URL, DataLogClient, DataLogError, HttpStatusError, HttpStatusKind,
    LIST_PATH, parse_listing,
};
