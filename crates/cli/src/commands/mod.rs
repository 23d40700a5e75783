pub mod escape;
pub mod goto;
pub mod scan;
pub mod util;

pub use escape::*;
pub use goto::*;
pub use scan::*;
pub use util::*;
