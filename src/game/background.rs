//! Scrolling skyline backdrop. Pure decoration, scrolled by the current game
//! speed and wrapped at one tile width.

use super::{Assets, Viewport};
use crate::engine::{Rect, Renderer};

pub(crate) const IMAGE_ID: &str = "background";

const SPRITE_WIDTH: f64 = 1920.0;
const SPRITE_HEIGHT: f64 = 720.0;

pub struct Background {
    x: f64,
    scaled_width: f64,
    scaled_height: f64,
    canvas_width: f64,
}

impl Background {
    pub fn new(viewport: &Viewport) -> Self {
        let mut background = Background {
            x: 0.0,
            scaled_width: 0.0,
            scaled_height: 0.0,
            canvas_width: 0.0,
        };
        background.resize(viewport);
        background
    }

    pub fn update(&mut self, speed: f64) {
        self.x -= speed;
        if self.x <= -self.scaled_width {
            self.x = 0.0;
        }
    }

    pub fn draw(&self, renderer: &Renderer, assets: &Assets) {
        let Some(image) = assets.get(IMAGE_ID) else {
            return;
        };
        let frame = Rect::new(0.0, 0.0, SPRITE_WIDTH, SPRITE_HEIGHT);
        // one extra tile so the wrap seam is never visible
        let tiles = (self.canvas_width / self.scaled_width).ceil() as i32 + 1;
        for i in 0..tiles {
            renderer.draw_image(
                image,
                &frame,
                &Rect::new(
                    self.x + f64::from(i) * self.scaled_width,
                    0.0,
                    self.scaled_width,
                    self.scaled_height,
                ),
            );
        }
    }

    pub fn resize(&mut self, viewport: &Viewport) {
        self.scaled_width = SPRITE_WIDTH * viewport.ratio;
        self.scaled_height = SPRITE_HEIGHT * viewport.ratio;
        self.canvas_width = viewport.width;
        self.x = 0.0;
    }
}
