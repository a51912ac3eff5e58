mod resolution;
mod stamp;
mod stream;
mod video;

pub use resolution::Resolution;
pub use stamp::{format_stamp, parse_stamp_from_name};
pub use stream::{Catalog, StreamDescriptor, StreamKind};
pub use video::{RawFormat, VideoInfo};
