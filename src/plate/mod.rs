pub mod mapping;
pub mod scheme;
pub mod wells;

pub use mapping::{ConfirmedMapping, MappingReport, MappingState, SampleWellMap};
pub use scheme::PlateScheme;
pub use wells::{PlateLayout, PlateType, Well};
