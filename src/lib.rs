pub mod build_info;
pub mod checks;
pub mod comm;
pub mod error;
pub mod field;
pub mod gather;
pub mod geometry;
pub mod par_slice;
pub mod params;
pub mod partition;
pub mod pipeline;
pub mod stencil;
pub mod util;
