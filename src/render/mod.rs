pub mod frame;
pub mod gpu;
pub mod pipeline;
pub mod surface;
pub mod text;
