#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for the custom-element controllers.
//!
//! A controller shares its renderer between JS calls and the closures it
//! hands to the browser (resize observer, image load handlers) through
//! `Rc<RefCell<_>>`; the closures hold `Weak` references. Host actions run
//! with no borrow held, so event listeners may call straight back in.
//! Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Reflect};
use pixlated_core::background::BACKGROUND_KEYS;
use pixlated_core::image::IMAGE_KEYS;
use pixlated_core::lifecycle::Attributes;
use pixlated_core::{
    BackgroundRenderer, ConfigKey, HostAction, HostEnv, ImageRenderer, SurfaceEvent,
    SurfaceLifecycle,
};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CustomEvent, CustomEventInit, Event, HtmlCanvasElement, HtmlElement, HtmlImageElement,
    ResizeObserver,
};

use crate::canvas::{CanvasSurface, js_message};
use crate::logging;
use crate::options::{ElementOptions, observed_attributes, seed_from_number, seed_from_unit};

type BgRenderer = BackgroundRenderer<CanvasSurface>;
type ImgRenderer = ImageRenderer<CanvasSurface>;

/// What the host glue needs from a renderer beyond its lifecycle.
trait HostedRenderer: SurfaceLifecycle + 'static {
    fn config_json(&self) -> String;

    fn image_loaded(
        &mut self,
        _ticket: u64,
        _image: HtmlImageElement,
        _width: u32,
        _height: u32,
    ) -> Vec<HostAction> {
        Vec::new()
    }

    fn image_failed(&mut self, _ticket: u64, _kind: &str) -> Vec<HostAction> {
        Vec::new()
    }
}

impl HostedRenderer for BgRenderer {
    fn config_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_owned())
    }
}

impl HostedRenderer for ImgRenderer {
    fn config_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_owned())
    }

    fn image_loaded(
        &mut self,
        ticket: u64,
        image: HtmlImageElement,
        width: u32,
        height: u32,
    ) -> Vec<HostAction> {
        self.on_image_loaded(ticket, image, width, height)
    }

    fn image_failed(&mut self, ticket: u64, kind: &str) -> Vec<HostAction> {
        self.on_image_error(ticket, kind)
    }
}

/// In-flight image load. Handlers are detached before the closures drop.
struct PendingLoad {
    image: HtmlImageElement,
    _on_load: Closure<dyn FnMut()>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl PendingLoad {
    fn detach(&self) {
        self.image.set_onload(None);
        self.image.set_onerror(None);
    }
}

struct Host<T> {
    renderer: T,
    element: HtmlElement,
    observer: Option<ResizeObserver>,
    on_resize: Option<Closure<dyn FnMut(Array, ResizeObserver)>>,
    pending: Option<PendingLoad>,
}

impl<T> Host<T> {
    fn env(&self) -> HostEnv {
        let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
        let rect = self.element.get_bounding_client_rect();
        HostEnv::new(dpr, rect.width(), rect.height())
    }
}

impl<T> Drop for Host<T> {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        if let Some(pending) = self.pending.take() {
            pending.detach();
        }
    }
}

type Shared<T> = Rc<RefCell<Host<T>>>;

// =============================================================================
// Options and attributes
// =============================================================================

fn parse_init_bool(options: &Option<JsValue>, key: &str) -> Option<bool> {
    let obj = options.as_ref()?;
    let v = Reflect::get(obj, &JsValue::from_str(key)).ok()?;
    if v.is_null() || v.is_undefined() {
        return None;
    }
    v.as_bool()
}

fn parse_init_f64(options: &Option<JsValue>, key: &str) -> Option<f64> {
    let obj = options.as_ref()?;
    let v = Reflect::get(obj, &JsValue::from_str(key)).ok()?;
    v.as_f64()
}

fn parse_options(options: &Option<JsValue>) -> ElementOptions {
    ElementOptions {
        debug: parse_init_bool(options, "debug").unwrap_or(false),
        seed: parse_init_f64(options, "seed").and_then(seed_from_number),
    }
}

fn random_seed() -> u64 {
    seed_from_unit(js_sys::Math::random())
}

fn read_attributes(element: &HtmlElement, keys: &[ConfigKey]) -> Attributes {
    let mut attrs = Attributes::default();
    for key in keys {
        attrs.set(*key, element.get_attribute(key.as_str()).as_deref());
    }
    attrs
}

fn names_array(keys: &[ConfigKey]) -> Array {
    observed_attributes(keys)
        .into_iter()
        .map(JsValue::from_str)
        .collect()
}

// =============================================================================
// Host action execution
// =============================================================================

fn create<T: HostedRenderer>(
    element: HtmlElement,
    canvas: HtmlCanvasElement,
    options: &Option<JsValue>,
    build: impl FnOnce(Option<CanvasSurface>, ElementOptions) -> T,
) -> Shared<T> {
    logging::install();
    let opts = parse_options(options);
    let surface = match CanvasSurface::new(canvas) {
        Ok(surface) => Some(surface),
        Err(err) => {
            if opts.debug {
                debug!(%err, "canvas surface unavailable");
            }
            None
        }
    };
    let renderer = build(surface, opts);
    Rc::new(RefCell::new(Host {
        renderer,
        element,
        observer: None,
        on_resize: None,
        pending: None,
    }))
}

fn step<T: HostedRenderer>(shared: &Shared<T>, f: impl FnOnce(&mut Host<T>) -> Vec<HostAction>) {
    let actions = f(&mut shared.borrow_mut());
    execute(shared, actions);
}

fn execute<T: HostedRenderer>(shared: &Shared<T>, actions: Vec<HostAction>) {
    for action in actions {
        match action {
            HostAction::ObserveResize => observe(shared),
            HostAction::DisconnectResizeObserver => disconnect(shared),
            HostAction::LoadImage { src, ticket } => load_image(shared, &src, ticket),
            HostAction::Emit(event) => {
                let element = shared.borrow().element.clone();
                dispatch(&element, &event);
            }
        }
    }
}

fn observe<T: HostedRenderer>(shared: &Shared<T>) {
    let weak = Rc::downgrade(shared);
    let mut host = shared.borrow_mut();
    if host.observer.is_some() {
        return;
    }
    let on_resize = Closure::<dyn FnMut(Array, ResizeObserver)>::new(
        move |_entries: Array, _observer: ResizeObserver| {
            if let Some(shared) = weak.upgrade() {
                step(&shared, |host| {
                    let env = host.env();
                    host.renderer.on_resize(env)
                });
            }
        },
    );
    match ResizeObserver::new(on_resize.as_ref().unchecked_ref()) {
        Ok(observer) => {
            observer.observe(&host.element);
            host.observer = Some(observer);
            host.on_resize = Some(on_resize);
        }
        Err(err) => warn!(err = %js_message(&err), "ResizeObserver unavailable"),
    }
}

fn disconnect<T>(shared: &Shared<T>) {
    let mut host = shared.borrow_mut();
    if let Some(observer) = host.observer.take() {
        observer.disconnect();
    }
    host.on_resize = None;
}

fn load_image<T: HostedRenderer>(shared: &Shared<T>, src: &str, ticket: u64) {
    let image = match HtmlImageElement::new() {
        Ok(image) => image,
        Err(err) => {
            warn!(err = %js_message(&err), "could not create image element");
            step(shared, |host| host.renderer.image_failed(ticket, "error"));
            return;
        }
    };
    image.set_cross_origin(Some("anonymous"));

    let weak = Rc::downgrade(shared);
    let loaded = image.clone();
    let on_load = Closure::<dyn FnMut()>::new(move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let (width, height) = (loaded.natural_width(), loaded.natural_height());
        let image = loaded.clone();
        step(&shared, move |host| {
            host.renderer.image_loaded(ticket, image, width, height)
        });
    });

    let weak = Rc::downgrade(shared);
    let on_error = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let kind = event.type_();
        step(&shared, |host| host.renderer.image_failed(ticket, &kind));
    });

    image.set_onload(Some(on_load.as_ref().unchecked_ref()));
    image.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    image.set_src(src);

    let previous = shared.borrow_mut().pending.replace(PendingLoad {
        image,
        _on_load: on_load,
        _on_error: on_error,
    });
    if let Some(previous) = previous {
        previous.detach();
    }
}

fn dispatch(element: &HtmlElement, event: &SurfaceEvent) {
    let init = CustomEventInit::new();
    init.set_bubbles(true);
    init.set_composed(true);
    let detail = js_sys::JSON::parse(&event.detail_json()).unwrap_or(JsValue::NULL);
    init.set_detail(&detail);
    match CustomEvent::new_with_event_init_dict(event.name(), &init) {
        Ok(custom) => {
            if let Err(err) = element.dispatch_event(&custom) {
                warn!(event = event.name(), err = %js_message(&err), "dispatch failed");
            }
        }
        Err(err) => warn!(event = event.name(), err = %js_message(&err), "event construction failed"),
    }
}

fn config_value<T: HostedRenderer>(shared: &Shared<T>) -> JsValue {
    let json = shared.borrow().renderer.config_json();
    js_sys::JSON::parse(&json).unwrap_or(JsValue::NULL)
}

fn mount<T: HostedRenderer>(shared: &Shared<T>) {
    step(shared, |host| {
        let env = host.env();
        host.renderer.on_mount(env)
    });
}

fn resized<T: HostedRenderer>(shared: &Shared<T>) {
    step(shared, |host| {
        let env = host.env();
        host.renderer.on_resize(env)
    });
}

// =============================================================================
// Exports
// =============================================================================

#[wasm_bindgen(start)]
pub fn wasm_start() {
    logging::install();
}

/// Controller for `<pixlated-bg>`: a flat color with grain, sized to the
/// element box unless `width` and `height` are both given.
#[wasm_bindgen]
pub struct PixlatedBg {
    inner: Shared<BgRenderer>,
}

#[wasm_bindgen]
impl PixlatedBg {
    /// Bind to `host` and draw into `canvas`.
    ///
    /// `options`: `{ debug?: boolean, seed?: number }`.
    #[wasm_bindgen(constructor)]
    pub fn new(host: HtmlElement, canvas: HtmlCanvasElement, options: Option<JsValue>) -> Self {
        // Attributes present before upgrade are seeded without drawing.
        let attrs = read_attributes(&host, BACKGROUND_KEYS);
        let inner = create(host, canvas, &options, |surface, opts| {
            BackgroundRenderer::new(surface, opts.rng(random_seed), opts.renderer_config())
                .with_attributes(attrs)
        });
        Self { inner }
    }

    /// `connectedCallback`.
    pub fn connected(&self) {
        mount(&self.inner);
    }

    /// `disconnectedCallback`.
    pub fn disconnected(&self) {
        step(&self.inner, |host| host.renderer.on_unmount());
    }

    /// `attributeChangedCallback`. `null` means the attribute is absent.
    #[wasm_bindgen(js_name = attributeChanged)]
    pub fn attribute_changed(&self, name: &str, old: Option<String>, new: Option<String>) {
        step(&self.inner, |host| {
            host.renderer
                .on_config_changed(name, old.as_deref(), new.as_deref())
        });
    }

    /// Re-measure and redraw, e.g. after a device pixel ratio change.
    pub fn resized(&self) {
        resized(&self.inner);
    }

    /// Redraw with fresh grain.
    pub fn reload(&self) {
        step(&self.inner, |host| host.renderer.reload());
    }

    /// `{ color, intensity, width, height }` with device-pixel dimensions.
    #[wasm_bindgen(js_name = getConfig)]
    pub fn get_config(&self) -> JsValue {
        config_value(&self.inner)
    }

    #[wasm_bindgen(js_name = observedAttributes)]
    pub fn observed_attributes() -> Array {
        names_array(BACKGROUND_KEYS)
    }
}

/// Controller for `<pixlated-image>`: a loaded image with grain.
///
/// Emits `pixlated:loaded` and `pixlated:error` from the host element.
#[wasm_bindgen]
pub struct PixlatedImage {
    inner: Shared<ImgRenderer>,
}

#[wasm_bindgen]
impl PixlatedImage {
    /// Bind to `host` and draw into `canvas`.
    ///
    /// `options`: `{ debug?: boolean, seed?: number }`.
    #[wasm_bindgen(constructor)]
    pub fn new(host: HtmlElement, canvas: HtmlCanvasElement, options: Option<JsValue>) -> Self {
        let attrs = read_attributes(&host, IMAGE_KEYS);
        let inner = create(host, canvas, &options, |surface, opts| {
            ImageRenderer::new(surface, opts.rng(random_seed), opts.renderer_config())
                .with_attributes(attrs)
        });
        Self { inner }
    }

    pub fn connected(&self) {
        mount(&self.inner);
    }

    pub fn disconnected(&self) {
        step(&self.inner, |host| host.renderer.on_unmount());
    }

    #[wasm_bindgen(js_name = attributeChanged)]
    pub fn attribute_changed(&self, name: &str, old: Option<String>, new: Option<String>) {
        step(&self.inner, |host| {
            host.renderer
                .on_config_changed(name, old.as_deref(), new.as_deref())
        });
    }

    pub fn resized(&self) {
        resized(&self.inner);
    }

    /// Redraw the loaded image, or retry a failed load.
    pub fn reload(&self) {
        step(&self.inner, |host| host.renderer.reload());
    }

    /// `{ src, intensity, width, height, alt }` with device-pixel dimensions.
    #[wasm_bindgen(js_name = getConfig)]
    pub fn get_config(&self) -> JsValue {
        config_value(&self.inner)
    }

    #[wasm_bindgen(js_name = observedAttributes)]
    pub fn observed_attributes() -> Array {
        names_array(IMAGE_KEYS)
    }

    /// Current load state: `unloaded`, `loading`, `loaded` or `failed`.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.inner.borrow().renderer.state().as_str().to_owned()
    }
}
