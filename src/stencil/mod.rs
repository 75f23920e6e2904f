mod operator;

pub mod standard_stencils;
pub mod transport;

pub use operator::*;
pub use transport::shift_along_path;
