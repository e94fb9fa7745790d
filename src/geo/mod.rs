pub mod distance;
pub mod sample;
pub mod sampler;

pub use distance::{haversine_m, mps_to_kmh, path_length_m};
pub use sample::{Coordinate, GpsSample};
pub use sampler::{ChannelSampler, GeoSampler};
