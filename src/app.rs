pub mod approot;
pub mod config;
pub mod dialog;
pub mod outfmt;
pub mod render;

pub use self::approot::Error;

// Version is of the format 0.YY.MM[.i], or 0.year.month.optional_minor_increment,
// rather than what Cargo.toml carries. This gives a more immediate reference for
// when the tool was last updated.
pub const TAXLOT_APP_VERSION: &str = "0.26.10";
