pub mod check;
pub mod extract;
pub mod libraries;
pub mod util;

pub use check::*;
pub use extract::*;
pub use libraries::*;
pub use util::*;
