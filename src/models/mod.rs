//! Schema model: predicates, declarations and violation reports

pub mod predicate;
pub mod schema;
pub mod violation;

pub use predicate::*;
pub use schema::*;
pub use violation::*;
