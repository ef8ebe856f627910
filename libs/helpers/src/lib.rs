pub mod collection;
pub mod documents;
pub mod model;
