//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod article_repo;
pub mod article_version_repo;
pub mod category_repo;
pub mod member_repo;

pub use article_repo::ArticleRepo;
pub use article_version_repo::ArticleVersionRepo;
pub use category_repo::CategoryRepo;
pub use member_repo::MemberRepo;
