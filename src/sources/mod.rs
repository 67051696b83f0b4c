pub mod corpus;

pub use corpus::{load_corpus, parse_timestamp};
