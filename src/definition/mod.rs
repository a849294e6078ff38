pub mod conversion;
pub mod schema;

pub use conversion::*;
pub use schema::*;
