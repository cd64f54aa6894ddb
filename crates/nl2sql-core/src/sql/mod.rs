pub mod executor;
pub mod normalize;
pub mod sqlite;

pub use executor::{Database, SqlExecutor};
pub use normalize::{exact_match, normalize};
