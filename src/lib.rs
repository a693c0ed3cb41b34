pub mod blocks;
pub mod carving;
pub mod config;
pub mod district;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod heightmap;
pub mod hydrology;
pub mod map;
pub mod naming;
pub mod png;
pub mod roads;
pub mod settlement;
pub mod tessellation;
pub mod urban;

pub use config::{Density, MapConfig, MapType};
pub use district::{District, DistrictType};
pub use error::{AttemptError, GenerationError, RecordError};
pub use generator::generate;
pub use map::{DistrictRecord, Map, MapRecord, MapWarning};
