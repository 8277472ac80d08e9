//! inkscene Render Library
//!
//! Retained scene node trees and the reconciler that keeps them in sync with
//! immediate-style draw calls. Two backends share one properties-diff
//! contract: an SVG element tree (the reference) and a display tree of
//! prebuilt draw commands, which the `vello-renderer` feature can paint with
//! Vello.

mod arena;
mod backend;
pub mod diff;
mod error;
pub mod raster;
mod renderer;
pub mod scene;
pub mod shapes;
pub mod svg;

#[cfg(feature = "vello-renderer")]
mod vello_paint;

#[cfg(test)]
mod conformance;

pub use arena::{NodeArena, NodeId, NodeMeta, NodeOwner};
pub use backend::{NodeKind, NodePayload, SceneBackend, Setter, setter_for};
pub use error::{RasterError, RenderError, RenderResult};
pub use raster::{FileImageLoader, ImageLoader, LoadRequest, MemoryImageLoader, RasterImage, load_all};
pub use renderer::Renderer;
pub use scene::{DisplayObject, DisplayTree, DrawCommand};
pub use svg::{SvgElement, SvgScene};
