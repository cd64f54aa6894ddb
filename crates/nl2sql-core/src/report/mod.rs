pub mod console;
pub mod summary;
pub mod table;
