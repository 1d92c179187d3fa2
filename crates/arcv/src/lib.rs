#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use arcv_image as image;

#[doc(inline)]
pub use arcv_imgproc as imgproc;

#[doc(inline)]
pub use arcv_optim as optim;

#[doc(inline)]
pub use arcv_3d as threed;

#[doc(inline)]
pub use arcv_pnp as pnp;

#[doc(inline)]
pub use arcv_calib as calib;

#[doc(inline)]
pub use arcv_ar as ar;
