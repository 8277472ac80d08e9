//! inkscene demo: draws a small diagram through both backends.
//!
//! Usage: `inkscene-demo [config.json]`. The SVG document goes to stdout,
//! everything else to the log (`RUST_LOG=debug` for details).

mod model;
mod plugins;

use inkscene_core::{NativeEvent, PointerInput, Rgba, TextAlign};
use inkscene_engine::{
    ConfigError, Engine, EngineConfig, ItemHandle, ItemRef, LayerId, Listener, MouseEvent,
};
use inkscene_render::{
    DisplayTree, FileImageLoader, RasterError, RasterImage, RenderError, SceneBackend, SvgScene,
};
use kurbo::{Point, Rect, Vec2};
use model::{Button, Picture};
use plugins::{ButtonPlugin, PicturePlugin};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Handles of the demo diagram in one engine.
struct Diagram {
    buttons: Vec<(ItemHandle, Button)>,
    shapes: LayerId,
    adorners: LayerId,
}

fn build<B: SceneBackend>(engine: &mut Engine<B>, checker: &str) -> Result<Diagram, DemoError> {
    let shapes = engine.layer("shapes");
    let adorners = engine.layer("adorners");
    let button_plugin = Rc::new(ButtonPlugin);
    let picture_plugin = Rc::new(PicturePlugin);

    let mut buttons = Vec::new();
    let specs = [
        ("**Save**", Rect::new(40.0, 40.0, 160.0, 80.0), Rgba::rgb(190, 230, 200)),
        ("*Cancel*", Rect::new(180.0, 40.0, 300.0, 80.0), Rgba::rgb(240, 210, 210)),
    ];
    for (label, bounds, fill) in specs {
        let Some(mut layer) = engine.layer_mut(shapes) else {
            break;
        };
        let handle = layer.item(button_plugin.clone())?;
        let button = Button::new(label, bounds, fill);
        if let Some(mut item) = engine.item(handle) {
            item.plot(Some(button.clone().into_ref()))?;
        }
        buttons.push((handle, button));
    }

    let pictures = [
        Picture::new(Some(checker.to_string()), Rect::new(40.0, 120.0, 200.0, 220.0)),
        Picture::new(Some("logo.png".to_string()), Rect::new(220.0, 120.0, 300.0, 220.0)),
    ];
    for picture in pictures {
        if let Some(mut layer) = engine.layer_mut(shapes) {
            let handle = layer.item(picture_plugin.clone())?;
            if let Some(mut item) = engine.item(handle) {
                item.plot(Some(picture))?;
            }
        }
    }

    let Some(mut layer) = engine.layer_mut(adorners) else {
        return Ok(Diagram { buttons, shapes, adorners });
    };
    let (outline, guide, caption) = (layer.rect()?, layer.line()?, layer.text()?);
    if let Some(mut rect) = engine.object(outline) {
        rect.plot(Rect::new(36.0, 36.0, 164.0, 84.0))
            .stroke_color(Rgba::rgb(30, 120, 220))
            .stroke_width(1.5)
            .corner_radius(8.0);
    }
    if let Some(mut line) = engine.object(guide) {
        line.plot(Point::new(20.0, 100.0), Point::new(320.0, 100.0))
            .stroke_color(Rgba::rgb(200, 200, 200));
    }
    if let Some(mut text) = engine.object(caption) {
        text.markdown("Demo *diagram*")
            .plot(Rect::new(20.0, 240.0, 320.0, 260.0))
            .align(TextAlign::Left)
            .font_size(12.0);
    }
    let written = engine.invalidate_all()?;
    log::debug!("wrote {written} adorner objects");

    Ok(Diagram { buttons, shapes, adorners })
}

/// Subscribe a listener recording the model item of every click.
fn track_clicks<B: SceneBackend>(engine: &mut Engine<B>) -> Rc<RefCell<Vec<Uuid>>> {
    let clicked = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&clicked);
    engine.subscribe(Listener::new().on_click(move |event: &MouseEvent, next| {
        if let Some(item) = &event.item {
            log::info!("clicked item {} at {:?}", item.id(), event.position);
            sink.borrow_mut().push(item.id());
        }
        next(event);
    }));
    engine.subscribe(Listener::new().on_mouse_move(|event, next| {
        log::trace!("pointer over {:?}", event.object);
        next(event);
    }));
    clicked
}

fn click<B: SceneBackend>(engine: &mut Engine<B>, at: Point, time_ms: u64) {
    let input = PointerInput::at(at).at_time(time_ms);
    engine.handle_input(NativeEvent::PointerMove(input));
    engine.handle_input(NativeEvent::PointerDown(input));
    engine.handle_input(NativeEvent::PointerUp(input));
}

/// Press every clicked button by plotting its toggled value.
fn apply_clicks<B: SceneBackend>(
    engine: &mut Engine<B>,
    diagram: &mut Diagram,
    clicked: &[Uuid],
) -> Result<(), DemoError> {
    for (handle, button) in &mut diagram.buttons {
        if !clicked.contains(&button.id) {
            continue;
        }
        *button = button.toggled();
        let next: ItemRef = button.clone().into_ref();
        if let Some(mut item) = engine.item(*handle) {
            item.plot(Some(next))?;
            log::info!("button {} rendered {} times", button.label, item.render_count());
        }
    }
    Ok(())
}

fn run() -> Result<(), DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let checker = RasterImage::from_rgba8(
        2,
        2,
        vec![
            40, 40, 40, 255, 220, 220, 220, 255, //
            220, 220, 220, 255, 40, 40, 40, 255,
        ],
    )
    .ok_or_else(|| RasterError::UnsupportedSource("checker".to_string()))?
    .to_png_data_url()?;
    let loader = FileImageLoader::new(".");

    // SVG backend: the reference rendering, printed to stdout.
    let mut engine = Engine::new(SvgScene::new(), config.clone());
    let mut diagram = build(&mut engine, &checker)?;
    let clicked = track_clicks(&mut engine);
    engine.pan(Vec2::new(10.0, 10.0));
    engine.set_click_layer(Some(diagram.shapes));
    click(&mut engine, Point::new(110.0, 70.0), 0);
    log::info!("cursor over the save button: {}", engine.cursor().css_name());
    let ids = clicked.borrow().clone();
    apply_clicks(&mut engine, &mut diagram, &ids)?;
    if let Some(mut adorners) = engine.layer_mut(diagram.adorners) {
        adorners.hide();
    }
    let installed = pollster::block_on(engine.load_images(&loader));
    log::info!("svg backend: {installed} images installed, {} nodes", engine.backend().node_count());
    println!("{}", engine.backend().to_svg_string());

    // Display tree backend: same diagram, prebuilt draw commands.
    let mut engine = Engine::new(DisplayTree::new(), config);
    build(&mut engine, &checker)?;
    let installed = pollster::block_on(engine.load_images(&loader));
    let tree = engine.backend();
    let commands: usize = tree.payloads().map(|(_, obj)| obj.commands().len()).sum();
    log::info!(
        "display tree: {installed} images installed, {} nodes, {commands} draw commands, {} rebuilds",
        tree.node_count(),
        tree.rebuilds()
    );

    #[cfg(feature = "vello-renderer")]
    {
        let mut scene = vello::Scene::new();
        tree.paint(&mut scene, kurbo::Affine::IDENTITY);
        log::info!("painted display tree into a vello scene");
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
