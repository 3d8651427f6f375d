//! Keeps a tile map and a GPU point overlay looking at the same place.
//!
//! Each renderer owns its camera in its own convention. The bridge owns the one
//! authoritative [`ViewState`] and converts between the two on every change.

pub mod bridge;
pub mod overlay;
pub mod session;
pub mod tile;
pub mod view_state;

pub use bridge::*;
pub use overlay::*;
pub use session::*;
pub use tile::*;
pub use view_state::*;
