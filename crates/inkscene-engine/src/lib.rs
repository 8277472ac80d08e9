//! inkscene Engine Library
//!
//! The layer shape plugins and adorners program against: an [`Engine`] over
//! any scene backend, layers of engine objects with deferred writes, engine
//! items rendered by [`ShapePlugin`]s, and the interaction pipeline that
//! turns native input into content-space hit events.

pub mod config;
pub mod cursor;
mod engine;
pub mod hit;
pub mod interaction;
mod item;
mod layer;
mod object;

pub use config::{ConfigError, EngineConfig};
pub use cursor::resolve_cursor;
pub use engine::Engine;
pub use hit::{HitOwners, resolve_owners};
pub use interaction::{
    BlurEvent, Callback, EventKind, Handler, InteractionPipeline, KeyEvent, Listener, ListenerId,
    MouseEvent,
};
pub use item::{DiagramItem, EngineItem, ItemRef, RenderContext, ShapePlugin};
pub use layer::{EngineLayer, LayerId};
pub use object::{
    EllipseHandle, EngineEllipse, EngineLine, EngineObject, EngineRect, EngineText, Handle,
    ItemHandle, KindMarker, LineHandle, ObjectId, ObjectKind, RectHandle, TextHandle, marker,
};
