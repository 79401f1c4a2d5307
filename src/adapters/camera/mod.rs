pub mod synthetic;
pub mod v4l2;
