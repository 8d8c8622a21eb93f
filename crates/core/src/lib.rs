//! Core domain types, image-map extraction, and path resolution for
//! converting a Freeplane HTML export into a clickable slide.

pub mod error;
pub mod html;
pub mod imagemap;
pub mod paths;
pub mod types;
pub mod units;

pub use error::{Error, Result};
pub use imagemap::MapExtractor;
pub use paths::{find_background, find_html, make_output_path};
pub use types::{Clickable, EmuRect, ImageMap, Rect};
pub use units::{checked_px_to_emu, px_to_emu, EMU_PER_PX};
