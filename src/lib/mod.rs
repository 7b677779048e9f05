pub mod accel;
pub mod geom;
pub mod scene;
pub mod tree;

pub use accel::{AccelPack, Accelerator, Purpose};
