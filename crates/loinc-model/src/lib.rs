pub mod credentials;
pub mod release;
pub mod outcome;

pub use credentials::*;
pub use release::*;
pub use outcome::*;
