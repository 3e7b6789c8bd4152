//! Repository structs with static query functions over a `PgPool`.

mod job_repo;
mod lock_repo;

pub use job_repo::JobRepo;
pub use lock_repo::LockRepo;
