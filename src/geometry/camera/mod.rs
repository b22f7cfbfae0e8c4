/// Pinhole camera intrinsics and back-projection.
pub mod pinhole_camera;
