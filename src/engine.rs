use crate::browser;
use anyhow::{anyhow, Error, Result};
// wasm is single threaded, so Rc RefCell over Mutex
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

pub mod input;

use self::input::{InputEvent, InputQueue};

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    /// Advance the simulation by `delta_ms` milliseconds, consuming the input
    /// events collected since the previous frame.
    fn update(&mut self, delta_ms: f64, events: &[InputEvent]);
    fn draw(&self, renderer: &Renderer);
}

pub struct GameLoop {
    last_frame: f64,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    /// Drive the game with one `update` + `draw` per animation frame, passing
    /// the raw elapsed time between frames. Resize events size the canvas
    /// before the game sees them.
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let mut input = InputQueue::prepare()?;
        let mut game = game.initialize().await?;
        let mut game_loop = GameLoop {
            last_frame: browser::now()?,
        };
        let renderer = Renderer {
            context: browser::context()?,
        };
        let mut frame_events: Vec<InputEvent> = Vec::new();
        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            let delta_ms = perf - game_loop.last_frame;
            game_loop.last_frame = perf;

            frame_events.clear();
            input.drain_into(&mut frame_events);
            for event in &frame_events {
                if let InputEvent::Resized { width, height } = event {
                    if let Err(err) = browser::set_canvas_size(*width, *height) {
                        log!("Could not resize canvas : {:#?}", err);
                    }
                }
            }

            game.update(delta_ms, &frame_events);
            game.draw(&renderer);
            let _ = browser::request_animation_frame(f.borrow().as_ref().unwrap());
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn clear(&self, rect: &Rect) {
        self.context
            .clear_rect(rect.x, rect.y, rect.width, rect.height);
    }

    pub fn fill_rect(&self, rect: &Rect) {
        self.context
            .fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    pub fn set_fill_style(&self, style: &str) {
        self.context.set_fill_style_str(style);
    }

    pub fn set_line_width(&self, width: f64) {
        self.context.set_line_width(width);
    }

    pub fn set_font(&self, font: &str) {
        self.context.set_font(font);
    }

    pub fn set_text_align(&self, align: &str) {
        self.context.set_text_align(align);
    }

    pub fn fill_text(&self, text: &str, x: f64, y: f64) {
        self.context
            .fill_text(text, x, y)
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }

    pub fn stroke_circle(&self, x: f64, y: f64, radius: f64) {
        self.context.begin_path();
        self.context
            .arc(x, y, radius, 0.0, std::f64::consts::PI * 2.0)
            .expect("Drawing is throwing exceptions! Unrecoverable error");
        self.context.stroke();
    }

    pub fn draw_image(&self, image: &HtmlImageElement, frame: &Rect, destination: &Rect) {
        self.context
            .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                image,
                frame.x,
                frame.y,
                frame.width,
                frame.height,
                destination.x,
                destination.y,
                destination.width,
                destination.height,
            )
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }

    pub fn save(&self) {
        self.context.save();
    }

    pub fn restore(&self) {
        self.context.restore();
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine.rs::load_image] Error loading image: {:#?}",
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    rx.await??;

    Ok(image)
}
