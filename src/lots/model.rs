pub mod detail;
pub mod lot;
pub mod security;
pub mod split_ratio;

pub use self::detail::*;
pub use self::lot::*;
pub use self::security::*;
pub use self::split_ratio::*;
