mod brand_repo;
mod conflict_repo;
mod session_repo;
mod variant_repo;

pub use brand_repo::BrandRepo;
pub use conflict_repo::ConflictRepo;
pub use session_repo::SessionRepo;
pub use variant_repo::{VariantRepo, INSERT_BATCH_SIZE};
