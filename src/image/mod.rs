pub mod f32;
pub mod io;
pub mod normalize;
pub mod planes;
pub mod tensor;
pub mod traits;

pub use self::f32::ImageF32;
pub use self::planes::{Planes, RgbImage, RgbdImage, DEPTH_PLANE};
pub use self::traits::{ImageView, Rows};
