pub mod identity;

pub use identity::{CallerId, establish_identity};
