//! Feature preprocessing codecs
//!
//! Both codecs are fitted offline and only applied at serving time:
//! - Standard scaling: `(x - mean) / scale` per feature
//! - Label encoding: category string → position in the fitted class list,
//!   with unseen categories mapped to the first class

mod encoder;
mod scaler;

pub use encoder::{CategoryEncoders, LabelEncoder, RawValue};
pub use scaler::StandardScaler;
