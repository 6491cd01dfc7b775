pub mod entity;
pub mod generic;
pub mod post;

pub use entity::{Entity, RowReader};
pub use generic::{CqlRepository, Repository};
pub use post::{PostRepository, DEFAULT_PAGE_SIZE};
