//! Tag management module.
//!
//! Tags are global, uniquely named labels. Credentials reference them through
//! a link table.

mod model;
mod repository;

pub use model::{DEFAULT_COLOR, NewTag, Tag, TagId, TagUpdate, default_tags};
pub use repository::TagRepository;
