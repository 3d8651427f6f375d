pub mod layer;
pub mod points;
pub mod symbology;
pub mod updater;

pub use layer::*;
pub use points::*;
pub use symbology::*;
pub use updater::*;
