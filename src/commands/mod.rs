//! CLI commands implementation

pub mod analyse;
pub mod init;
pub mod scrape;
pub mod status;

pub use analyse::*;
pub use init::*;
pub use scrape::*;
pub use status::*;
