pub mod codegen;
pub mod deletion_actor;
pub mod identity;
pub mod sealer;
pub mod urls;

pub use deletion_actor::DeletionHandle;
pub use identity::{Identity, IdentityService};
pub use sealer::{AesBlockSealer, IdentitySealer};
pub use urls::{BatchOutcome, Shortened, UrlService};
