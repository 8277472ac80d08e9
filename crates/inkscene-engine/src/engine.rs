//! The engine facade.
//!
//! An [`Engine`] owns a backend, a content container carrying the camera
//! transform, the layers inside it and the engine objects inside those. It
//! turns native input into content-space hit events and runs them through
//! the interaction pipeline.

use crate::config::EngineConfig;
use crate::cursor::resolve_cursor;
use crate::hit::resolve_owners;
use crate::interaction::{EventKind, InteractionPipeline, Listener, ListenerId, MouseEvent};
use crate::item::{EngineItem, ItemRef, ItemState, ShapePlugin};
use crate::layer::{EngineLayer, LayerId, LayerRecord};
use crate::object::{EngineObject, Handle, ItemHandle, KindMarker, ObjectCore, ObjectId, ObjectKind};
use inkscene_core::{Camera, Cursor, InputState, NativeEvent, PointerInput};
use inkscene_render::{
    ImageLoader, LoadRequest, NodeId, NodeKind, NodeOwner, RasterError, RasterImage,
    RenderError, RenderResult, SceneBackend, load_all,
};
use kurbo::{Point, Vec2};
use std::collections::HashMap;
use std::rc::Rc;
use winit::window::CursorIcon;

enum ObjectBody {
    Primitive(ObjectCore),
    Item(ItemState),
}

struct ObjectRecord {
    layer: LayerId,
    kind: ObjectKind,
    body: ObjectBody,
}

impl ObjectRecord {
    fn node(&self) -> NodeId {
        match &self.body {
            ObjectBody::Primitive(core) => core.node(),
            ObjectBody::Item(state) => state.node(),
        }
    }
}

/// Retained scene engine over backend `B`.
pub struct Engine<B: SceneBackend> {
    backend: B,
    config: EngineConfig,
    /// Parent of every layer; holds the camera transform.
    content: NodeId,
    camera: Camera,
    layers: Vec<LayerRecord>,
    objects: HashMap<ObjectId, ObjectRecord>,
    next_id: u64,
    pipeline: InteractionPipeline,
    input: InputState,
    click_layer: Option<LayerId>,
    cursor: Cursor,
    hit_events: usize,
}

impl<B: SceneBackend> Engine<B> {
    /// Create an engine drawing into `backend`, whose root stays owned by
    /// the caller's canvas.
    pub fn new(mut backend: B, config: EngineConfig) -> Self {
        let content = backend.create(NodeKind::Group);
        let root = backend.root();
        if let Err(err) = backend.append_child(root, content) {
            log::warn!("{}: cannot attach content container: {err}", backend.backend_name());
        }
        let camera = Camera::with_zoom_limits(config.min_zoom, config.max_zoom);
        backend.set_transform(content, camera.transform());
        let input = InputState::with_thresholds(
            config.click_tolerance,
            config.double_click_ms,
            config.double_click_distance,
        );
        log::debug!("engine created on the {} backend", backend.backend_name());
        Self {
            backend,
            config,
            content,
            camera,
            layers: Vec::new(),
            objects: HashMap::new(),
            next_id: 0,
            pipeline: InteractionPipeline::new(),
            input,
            click_layer: None,
            cursor: Cursor::Default,
            hit_events: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The container holding every layer.
    pub fn content_node(&self) -> NodeId {
        self.content
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    fn next_raw_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // -- Camera --

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.sync_camera();
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
        self.sync_camera();
    }

    /// Zoom by `factor` keeping `screen_point` fixed. Returns whether the
    /// zoom changed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) -> bool {
        let changed = self.camera.zoom_at(screen_point, factor);
        if changed {
            self.sync_camera();
        }
        changed
    }

    fn sync_camera(&mut self) {
        self.backend.set_transform(self.content, self.camera.transform());
    }

    // -- Layers --

    /// Create a layer above every existing one.
    pub fn layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId(self.next_raw_id());
        let node = self.backend.create(NodeKind::Group);
        if let Some(meta) = self.backend.meta_mut(node) {
            meta.owner = Some(NodeOwner::Layer(id.0));
        }
        if let Err(err) = self.backend.append_child(self.content, node) {
            log::warn!("cannot attach layer {id:?}: {err}");
        }
        let name = name.into();
        log::debug!("created layer {id:?} \"{name}\"");
        self.layers.push(LayerRecord {
            id,
            name,
            node,
            objects: Vec::new(),
        });
        id
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<EngineLayer<'_, B>> {
        self.layer_record(id)?;
        Some(EngineLayer::new(self, id))
    }

    /// First layer called `name`.
    pub fn find_layer(&self, name: &str) -> Option<LayerId> {
        self.layers
            .iter()
            .find(|layer| layer.name == name)
            .map(|layer| layer.id)
    }

    /// Layers, bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.iter().map(|layer| layer.id)
    }

    pub(crate) fn layer_record(&self, id: LayerId) -> Option<&LayerRecord> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Destroy a layer and every object in it.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(index) = self.layers.iter().position(|layer| layer.id == id) else {
            return false;
        };
        let layer = self.layers.remove(index);
        for object in &layer.objects {
            if let Some(record) = self.objects.remove(object) {
                // Detached items are not reached through the layer node.
                self.backend.destroy(record.node());
            }
        }
        self.backend.destroy(layer.node);
        if self.click_layer == Some(id) {
            self.click_layer = None;
        }
        log::debug!("removed layer {id:?} with {} objects", layer.objects.len());
        true
    }

    /// Restrict pointer hit testing to one layer, or `None` for all.
    pub fn set_click_layer(&mut self, layer: Option<LayerId>) {
        self.click_layer = layer.filter(|id| self.layer_record(*id).is_some());
    }

    pub fn click_layer(&self) -> Option<LayerId> {
        self.click_layer
    }

    // -- Objects --

    pub(crate) fn add_object(
        &mut self,
        layer: LayerId,
        kind: ObjectKind,
        plugin: Option<Rc<dyn ShapePlugin>>,
    ) -> RenderResult<ObjectId> {
        let id = ObjectId(self.next_raw_id());
        let node = self.backend.create(kind.node_kind());
        if let Some(meta) = self.backend.meta_mut(node) {
            meta.owner = Some(NodeOwner::Object(id.0));
        }
        let Some(record) = self.layers.iter_mut().find(|l| l.id == layer) else {
            self.backend.destroy(node);
            return Err(RenderError::StaleNode(node));
        };
        if let Err(err) = self.backend.append_child(record.node, node) {
            self.backend.destroy(node);
            return Err(err);
        }
        record.objects.push(id);

        let body = match plugin {
            Some(plugin) => {
                ObjectBody::Item(ItemState::new(node, plugin, self.config.text_cache_capacity))
            }
            None => ObjectBody::Primitive(ObjectCore::new(node, kind)),
        };
        self.objects.insert(id, ObjectRecord { layer, kind, body });
        Ok(id)
    }

    /// Mutation guard for a primitive object.
    pub fn object<K: KindMarker>(&mut self, handle: Handle<K>) -> Option<EngineObject<'_, K>> {
        let id = handle.id();
        let record = self.objects.get_mut(&id)?;
        if record.kind != K::KIND {
            return None;
        }
        match &mut record.body {
            ObjectBody::Primitive(core) => Some(EngineObject::new(id, core, &mut self.backend)),
            ObjectBody::Item(_) => None,
        }
    }

    /// Mutation guard for an item.
    pub fn item(&mut self, handle: ItemHandle) -> Option<EngineItem<'_>> {
        let id = handle.id();
        let record = self.objects.get_mut(&id)?;
        let layer_node = self
            .layers
            .iter()
            .find(|layer| layer.id == record.layer)?
            .node;
        match &mut record.body {
            ObjectBody::Item(state) => {
                Some(EngineItem::new(id, layer_node, state, &mut self.backend))
            }
            ObjectBody::Primitive(_) => None,
        }
    }

    pub fn object_kind(&self, id: ObjectId) -> Option<ObjectKind> {
        self.objects.get(&id).map(|record| record.kind)
    }

    pub fn object_node(&self, id: ObjectId) -> Option<NodeId> {
        self.objects.get(&id).map(ObjectRecord::node)
    }

    pub fn object_layer(&self, id: ObjectId) -> Option<LayerId> {
        self.objects.get(&id).map(|record| record.layer)
    }

    /// Model item last rendered by an item object.
    pub fn rendered_item(&self, id: ObjectId) -> Option<ItemRef> {
        match &self.objects.get(&id)?.body {
            ObjectBody::Item(state) => state.rendered().cloned(),
            ObjectBody::Primitive(_) => None,
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Destroy one object.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let Some(record) = self.objects.remove(&id) else {
            return false;
        };
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == record.layer) {
            layer.objects.retain(|object| *object != id);
        }
        self.backend.destroy(record.node());
        true
    }

    /// Write every dirty primitive, layer by layer. Returns how many objects
    /// touched the backend.
    pub fn invalidate_all(&mut self) -> RenderResult<usize> {
        let mut written = 0;
        for layer in &self.layers {
            for id in &layer.objects {
                if let Some(ObjectRecord {
                    body: ObjectBody::Primitive(core),
                    ..
                }) = self.objects.get_mut(id)
                {
                    if core.invalidate(&mut self.backend)? {
                        written += 1;
                    }
                }
            }
        }
        Ok(written)
    }

    // -- Raster loading --

    pub fn take_load_requests(&mut self) -> Vec<LoadRequest> {
        self.backend.take_load_requests()
    }

    pub fn complete_load(
        &mut self,
        request: &LoadRequest,
        result: Result<RasterImage, RasterError>,
    ) -> bool {
        self.backend.complete_load(request, result)
    }

    /// Resolve every pending load through `loader`. Returns how many images
    /// were installed. Failed loads are logged by the backend.
    pub async fn load_images(&mut self, loader: &dyn ImageLoader) -> usize {
        let requests = self.take_load_requests();
        if requests.is_empty() {
            return 0;
        }
        let mut installed = 0;
        for (request, result) in load_all(loader, requests).await {
            if self.complete_load(&request, result) {
                installed += 1;
            }
        }
        installed
    }

    // -- Interaction --

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.pipeline.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.pipeline.unsubscribe(id)
    }

    pub fn pipeline(&self) -> &InteractionPipeline {
        &self.pipeline
    }

    /// Cursor resolved on the last pointer move.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn cursor_icon(&self) -> CursorIcon {
        self.cursor.into()
    }

    /// Number of hit events built so far.
    pub fn hit_events_built(&self) -> usize {
        self.hit_events
    }

    fn hit_container(&self) -> NodeId {
        self.click_layer
            .and_then(|id| self.layer_record(id))
            .map_or(self.content, |layer| layer.node)
    }

    /// Topmost scene node under a screen point.
    pub fn hit_node(&self, screen: Point) -> Option<NodeId> {
        let position = self.camera.screen_to_content(screen);
        self.backend.hit_test(self.hit_container(), position)
    }

    /// Resolve `input` against the scene.
    pub fn hit_event(&self, input: &PointerInput) -> MouseEvent {
        let position = self.camera.screen_to_content(input.position);
        let hit = self.backend.hit_test(self.hit_container(), position);
        let owners = hit
            .map(|node| {
                resolve_owners(&self.backend, node, |id| self.rendered_item(id).is_some())
            })
            .unwrap_or_default();
        MouseEvent {
            position,
            object: owners.object,
            item: owners.item.and_then(|id| self.rendered_item(id)),
            input: *input,
        }
    }

    fn emit_pointer(&mut self, kind: EventKind, input: &PointerInput) {
        let Some(handler) = self.pipeline.mouse_handler(kind) else {
            return;
        };
        let event = self.hit_event(input);
        self.hit_events += 1;
        handler(&event);
    }

    /// Feed one native event through input tracking and the pipeline.
    pub fn handle_input(&mut self, event: NativeEvent) {
        match event {
            NativeEvent::PointerDown(input) => {
                let gesture = self.input.pointer_down(&input);
                self.emit_pointer(EventKind::MouseDown, &input);
                if gesture.double_click {
                    self.emit_pointer(EventKind::DoubleClick, &input);
                }
            }
            NativeEvent::PointerMove(input) => {
                let dragging = self.input.pointer_move(&input);
                if self.config.track_cursor {
                    self.cursor = resolve_cursor(&self.backend, self.hit_node(input.position));
                }
                let kind = if dragging {
                    EventKind::MouseDrag
                } else {
                    EventKind::MouseMove
                };
                self.emit_pointer(kind, &input);
            }
            NativeEvent::PointerUp(input) => {
                let gesture = self.input.pointer_up(&input);
                self.emit_pointer(EventKind::MouseUp, &input);
                if gesture.click {
                    self.emit_pointer(EventKind::Click, &input);
                }
            }
            NativeEvent::KeyDown(input) => {
                self.input.key_down(&input);
                self.pipeline.emit_key(EventKind::KeyDown, &input);
            }
            NativeEvent::KeyUp(input) => {
                self.input.key_up(&input);
                self.pipeline.emit_key(EventKind::KeyUp, &input);
            }
            NativeEvent::Blur => {
                self.input.reset();
                self.pipeline.emit_blur();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::tests::{Card, CardPlugin};
    use crate::item::RenderContext;
    use crate::item::DiagramItem;
    use inkscene_core::{DrawProps, PropKey, Rgba, Rotation};
    use inkscene_render::{DisplayTree, MemoryImageLoader, SvgScene};
    use kurbo::Rect;
    use std::cell::RefCell;

    fn engine() -> Engine<SvgScene> {
        Engine::new(SvgScene::new(), EngineConfig::default())
    }

    fn click_at(engine: &mut Engine<impl SceneBackend>, x: f64, y: f64, t: u64) {
        let input = PointerInput::at(Point::new(x, y)).at_time(t);
        engine.handle_input(NativeEvent::PointerDown(input));
        engine.handle_input(NativeEvent::PointerUp(input));
    }

    fn record_clicks(engine: &mut Engine<impl SceneBackend>) -> Rc<RefCell<Vec<MouseEvent>>> {
        let clicks = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&clicks);
        engine.subscribe(Listener::new().on_click(move |event, next| {
            sink.borrow_mut().push(event.clone());
            next(event);
        }));
        clicks
    }

    fn filled_rect(engine: &mut Engine<impl SceneBackend>, layer: LayerId, bounds: Rect) -> ObjectId {
        let handle = engine.layer_mut(layer).unwrap().rect().unwrap();
        let mut rect = engine.object(handle).unwrap();
        rect.plot(bounds).fill(Rgba::rgb(200, 0, 0));
        rect.invalidate().unwrap();
        handle.id()
    }

    #[test]
    fn test_layers_and_objects_in_call_order() {
        let mut engine = engine();
        let bottom = engine.layer("shapes");
        let top = engine.layer("adorners");
        let content = engine.content_node();
        let layer_nodes: Vec<_> = [bottom, top]
            .iter()
            .map(|id| engine.layer_mut(*id).unwrap().node())
            .collect();
        assert_eq!(engine.backend().children(content), layer_nodes.as_slice());

        let mut layer = engine.layer_mut(bottom).unwrap();
        let a = layer.rect().unwrap();
        let b = layer.ellipse().unwrap();
        let c = layer.text().unwrap();
        assert_eq!(layer.objects(), &[a.id(), b.id(), c.id()]);
        let kinds: Vec<_> = engine
            .backend()
            .children(layer_nodes[0])
            .iter()
            .map(|node| engine.backend().kind(*node))
            .collect();
        assert_eq!(
            kinds,
            vec![Some(NodeKind::Rect), Some(NodeKind::Ellipse), Some(NodeKind::Text)]
        );
        assert_eq!(engine.find_layer("adorners"), Some(top));
        assert_eq!(engine.object_kind(b.id()), Some(ObjectKind::Ellipse));
    }

    #[test]
    fn test_invalidate_all_bounds_writes() {
        let mut engine = engine();
        let layer = engine.layer("shapes");
        let handle = engine.layer_mut(layer).unwrap().rect().unwrap();
        assert_eq!(engine.invalidate_all().unwrap(), 1);
        assert_eq!(engine.invalidate_all().unwrap(), 0);

        engine.backend_mut().reset_setter_calls();
        let mut rect = engine.object(handle).unwrap();
        rect.stroke_color(Rgba::rgb(1, 2, 3))
            .stroke_color(Rgba::rgb(4, 5, 6))
            .stroke_color(Rgba::rgb(7, 8, 9));
        assert_eq!(engine.invalidate_all().unwrap(), 1);
        assert_eq!(engine.backend().setter_calls(PropKey::StrokeColor), 1);
        assert_eq!(engine.backend().total_setter_calls(), 1);
    }

    #[test]
    fn test_wrong_handle_kind_gives_no_guard() {
        let mut engine = engine();
        let layer = engine.layer("shapes");
        let plugin: Rc<dyn ShapePlugin> = Rc::new(CardPlugin::default());
        let item = engine.layer_mut(layer).unwrap().item(plugin).unwrap();
        assert!(engine.object(Handle::<crate::object::marker::Rect>::new(item.id())).is_none());
        assert!(engine.item(item).is_some());
    }

    #[test]
    fn test_click_reports_hit_object() {
        let mut engine = engine();
        let layer = engine.layer("shapes");
        let id = filled_rect(&mut engine, layer, Rect::new(0.0, 0.0, 100.0, 100.0));
        let clicks = record_clicks(&mut engine);

        click_at(&mut engine, 50.0, 50.0, 0);
        click_at(&mut engine, 500.0, 500.0, 1000);
        let clicks = clicks.borrow();
        assert_eq!(clicks.len(), 2);
        assert_eq!(clicks[0].object, Some(id));
        assert_eq!(clicks[1].object, None);
        assert!(clicks[0].item.is_none());
    }

    #[test]
    fn test_hit_events_use_camera() {
        let mut engine = engine();
        let layer = engine.layer("shapes");
        let id = filled_rect(&mut engine, layer, Rect::new(40.0, 40.0, 60.0, 60.0));
        let clicks = record_clicks(&mut engine);

        assert!(engine.zoom_at(Point::ZERO, 2.0));
        click_at(&mut engine, 100.0, 100.0, 0);
        let event = clicks.borrow()[0].clone();
        assert_eq!(event.position, Point::new(50.0, 50.0));
        assert_eq!(event.screen_position(), Point::new(100.0, 100.0));
        assert_eq!(event.object, Some(id));
        assert_eq!(
            engine.backend().transform(engine.content_node()),
            engine.camera().transform()
        );
    }

    #[test]
    fn test_item_and_object_resolved_for_item_hits() {
        let mut engine = engine();
        let layer = engine.layer("items");
        let plugin: Rc<dyn ShapePlugin> = Rc::new(CardPlugin::default());
        let handle = engine.layer_mut(layer).unwrap().item(plugin).unwrap();
        let card = Card::new(Rect::new(100.0, 100.0, 200.0, 150.0), "card");
        engine.item(handle).unwrap().plot(Some(card.clone())).unwrap();
        let clicks = record_clicks(&mut engine);

        click_at(&mut engine, 150.0, 120.0, 0);
        let event = clicks.borrow()[0].clone();
        assert_eq!(event.object, Some(handle.id()));
        assert!(Rc::ptr_eq(event.item.as_ref().unwrap(), &card));
        let model = event.item.unwrap();
        assert!(model.as_any().downcast_ref::<Card>().is_some());
    }

    #[test]
    fn test_click_layer_restricts_hits() {
        let mut engine = engine();
        let bottom = engine.layer("shapes");
        let top = engine.layer("adorners");
        let below = filled_rect(&mut engine, bottom, Rect::new(0.0, 0.0, 100.0, 100.0));
        let above = filled_rect(&mut engine, top, Rect::new(0.0, 0.0, 100.0, 100.0));
        let clicks = record_clicks(&mut engine);

        click_at(&mut engine, 10.0, 10.0, 0);
        engine.set_click_layer(Some(bottom));
        click_at(&mut engine, 10.0, 10.0, 1000);
        let objects: Vec<_> = clicks.borrow().iter().map(|e| e.object).collect();
        assert_eq!(objects, vec![Some(above), Some(below)]);
        assert_eq!(engine.layer_mut(top).unwrap().hit_test(Point::new(5.0, 5.0)), Some(above));
    }

    #[test]
    fn test_no_hit_event_without_listener() {
        let mut engine = engine();
        let layer = engine.layer("shapes");
        filled_rect(&mut engine, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        click_at(&mut engine, 5.0, 5.0, 0);
        let moved = PointerInput::at(Point::new(6.0, 6.0));
        engine.handle_input(NativeEvent::PointerMove(moved));
        assert_eq!(engine.hit_events_built(), 0);

        record_clicks(&mut engine);
        click_at(&mut engine, 5.0, 5.0, 1000);
        engine.handle_input(NativeEvent::PointerMove(moved));
        assert_eq!(engine.hit_events_built(), 1);
    }

    #[test]
    fn test_down_move_up_dispatch_order() {
        let mut engine = engine();
        let log = Rc::new(RefCell::new(Vec::new()));
        let push = |name: &'static str| {
            let log = Rc::clone(&log);
            move |event: &MouseEvent, next: &dyn Fn(&MouseEvent)| {
                log.borrow_mut().push(name);
                next(event);
            }
        };
        engine.subscribe(
            Listener::new()
                .on_mouse_down(push("down"))
                .on_mouse_move(push("move"))
                .on_mouse_drag(push("drag"))
                .on_mouse_up(push("up"))
                .on_click(push("click"))
                .on_double_click(push("double")),
        );
        let at = |x: f64, t: u64| PointerInput::at(Point::new(x, 0.0)).at_time(t);
        engine.handle_input(NativeEvent::PointerMove(at(0.0, 0)));
        engine.handle_input(NativeEvent::PointerDown(at(0.0, 10)));
        engine.handle_input(NativeEvent::PointerMove(at(1.0, 20)));
        engine.handle_input(NativeEvent::PointerUp(at(1.0, 30)));
        engine.handle_input(NativeEvent::PointerDown(at(1.0, 100)));
        engine.handle_input(NativeEvent::PointerMove(at(50.0, 110)));
        engine.handle_input(NativeEvent::PointerUp(at(50.0, 120)));
        assert_eq!(
            *log.borrow(),
            vec!["move", "down", "drag", "up", "click", "down", "double", "drag", "up"]
        );
    }

    #[test]
    fn test_blur_resets_pending_click() {
        let mut engine = engine();
        let clicks = record_clicks(&mut engine);
        let blurred = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&blurred);
        engine.subscribe(Listener::new().on_blur(move |_, _| *counter.borrow_mut() += 1));

        let input = PointerInput::at(Point::new(1.0, 1.0)).at_time(0);
        engine.handle_input(NativeEvent::PointerDown(input));
        engine.handle_input(NativeEvent::Blur);
        engine.handle_input(NativeEvent::PointerUp(input));
        assert!(clicks.borrow().is_empty());
        assert_eq!(*blurred.borrow(), 1);
        assert!(!engine.input().is_dragging());
    }

    #[test]
    fn test_cursor_tracks_rotated_handle() {
        let mut engine = engine();
        let layer = engine.layer("adorners");
        let handle = engine.layer_mut(layer).unwrap().rect().unwrap();
        let bounds = Rect::new(90.0, 40.0, 110.0, 60.0);
        let mut rect = engine.object(handle).unwrap();
        rect.plot(bounds)
            .fill(Rgba::WHITE)
            .rotation(Rotation::about_rect(40.0, bounds));
        rect.invalidate().unwrap();
        let node = rect.node();
        engine.backend_mut().meta_mut(node).unwrap().cursor_angle = Some(0.0);

        engine.handle_input(NativeEvent::PointerMove(PointerInput::at(Point::new(100.0, 50.0))));
        assert_eq!(engine.cursor(), Cursor::NeResize);
        assert_eq!(engine.cursor_icon(), CursorIcon::NeResize);

        engine.handle_input(NativeEvent::PointerMove(PointerInput::at(Point::new(300.0, 50.0))));
        assert_eq!(engine.cursor(), Cursor::Default);
    }

    #[test]
    fn test_remove_object_and_layer() {
        let mut engine = engine();
        let layer = engine.layer("shapes");
        let keep = filled_rect(&mut engine, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        let gone = filled_rect(&mut engine, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        let gone_node = engine.object_node(gone).unwrap();

        assert!(engine.remove_object(gone));
        assert!(!engine.remove_object(gone));
        assert!(!engine.backend().is_alive(gone_node));
        assert_eq!(engine.layer_mut(layer).unwrap().objects(), &[keep]);

        let plugin: Rc<dyn ShapePlugin> = Rc::new(CardPlugin::default());
        let item = engine.layer_mut(layer).unwrap().item(plugin).unwrap();
        let card = Card::new(Rect::new(0.0, 0.0, 10.0, 10.0), "x");
        let mut guard = engine.item(item).unwrap();
        guard.plot(Some(card)).unwrap();
        guard.plot(None).unwrap();
        let item_node = guard.node();

        engine.set_click_layer(Some(layer));
        let layer_node = engine.layer_mut(layer).unwrap().node();
        assert!(engine.remove_layer(layer));
        assert!(!engine.remove_layer(layer));
        assert!(!engine.backend().is_alive(layer_node));
        assert!(!engine.backend().is_alive(item_node));
        assert_eq!(engine.click_layer(), None);
        assert_eq!(engine.object_count(), 0);
        assert_eq!(engine.backend().node_count(), 2);
    }

    #[test]
    fn test_hidden_layer_is_not_hit() {
        let mut engine = engine();
        let layer = engine.layer("shapes");
        filled_rect(&mut engine, layer, Rect::new(0.0, 0.0, 10.0, 10.0));
        engine.layer_mut(layer).unwrap().hide();
        assert!(!engine.layer_mut(layer).unwrap().is_visible());
        assert_eq!(engine.hit_node(Point::new(5.0, 5.0)), None);
        engine.layer_mut(layer).unwrap().show();
        assert!(engine.hit_node(Point::new(5.0, 5.0)).is_some());
    }

    struct Picture;

    impl ShapePlugin for Picture {
        fn render(&self, _item: &dyn DiagramItem, ctx: &mut RenderContext<'_>) -> RenderResult<()> {
            let bounds = ctx.bounds();
            ctx.raster(Some("mem:dot"), bounds, true, &DrawProps::new())?;
            Ok(())
        }
    }

    #[test]
    fn test_load_images_installs_pending_rasters() {
        let mut engine = Engine::new(DisplayTree::new(), EngineConfig::default());
        let layer = engine.layer("images");
        let handle = engine.layer_mut(layer).unwrap().item(Rc::new(Picture)).unwrap();
        let card = Card::new(Rect::new(0.0, 0.0, 40.0, 20.0), "");
        engine.item(handle).unwrap().plot(Some(card)).unwrap();

        let mut loader = MemoryImageLoader::new();
        loader.insert("mem:dot", RasterImage::from_rgba8(1, 1, vec![0, 0, 0, 255]).unwrap());
        assert_eq!(pollster::block_on(engine.load_images(&loader)), 1);
        assert_eq!(pollster::block_on(engine.load_images(&loader)), 0);

        let item_node = engine.object_node(handle.id()).unwrap();
        let raster = engine.backend().children(item_node)[1];
        assert!(engine.backend().has_image(raster));
    }

    #[test]
    fn test_failed_load_installs_nothing() {
        let mut engine = Engine::new(SvgScene::new(), EngineConfig::default());
        let layer = engine.layer("images");
        let handle = engine.layer_mut(layer).unwrap().item(Rc::new(Picture)).unwrap();
        let card = Card::new(Rect::new(0.0, 0.0, 40.0, 20.0), "");
        engine.item(handle).unwrap().plot(Some(card)).unwrap();

        let empty = MemoryImageLoader::new();
        assert_eq!(pollster::block_on(engine.load_images(&empty)), 0);
        assert!(engine.take_load_requests().is_empty());

        let item_node = engine.object_node(handle.id()).unwrap();
        let raster = engine.backend().children(item_node)[1];
        assert!(!engine.backend().has_image(raster));
    }
}
