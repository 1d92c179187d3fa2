mod perspective;
pub use perspective::{inverse_perspective_matrix, warp_perspective};
