pub mod derive;
pub mod filter;
pub mod summary;

pub use derive::{coerce, derive, derive_all};
pub use filter::{filter_records, AsRaw, CategoryFilter, FilterCriteria, FilterOptions, SearchScope};
pub use summary::{summarize, Summary};
