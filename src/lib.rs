pub mod cli;
pub mod engine;
pub mod entity;
pub mod error;
pub mod month;
pub mod resolver;
pub mod rowstore;
pub mod store;

pub use engine::Engine;
pub use error::{FunilError, Result};
pub use month::MonthToken;
