//! The player sprite: gravity-driven glide with flap impulses and an energy
//! meter that pays for speed charges.

use super::{Assets, Collider, Round, Viewport};
use crate::engine::{Rect, Renderer};

pub(crate) const IMAGE_ID: &str = "player";

const SPRITE_WIDTH: f64 = 200.0;
const SPRITE_HEIGHT: f64 = 200.0;
const X_OFFSET: f64 = 60.0;
const FLAP_SPEED: f64 = 5.0;
const STARTING_ENERGY: i32 = 30;
const MIN_CHARGE_ENERGY: i32 = 15;
const CHARGE_DRAIN: i32 = 3;

/// Sprite-sheet row for the current wing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WingPose {
    Up,
    Down,
    Charge,
}

impl WingPose {
    fn row(self) -> f64 {
        match self {
            WingPose::Up => 0.0,
            WingPose::Down => 1.0,
            WingPose::Charge => 2.0,
        }
    }
}

pub struct Player {
    x: f64,
    y: f64,
    speed_y: f64,
    scaled_width: f64,
    scaled_height: f64,
    collision_x: f64,
    collision_y: f64,
    collision_radius: f64,
    energy: i32,
    charging: bool,
    collided: bool,
    pose: WingPose,
}

impl Player {
    pub(crate) const MAX_ENERGY: i32 = 60;
    pub(crate) const LOW_ENERGY: i32 = 20;

    pub fn new(viewport: &Viewport) -> Self {
        let mut player = Player {
            x: 0.0,
            y: 0.0,
            speed_y: 0.0,
            scaled_width: 0.0,
            scaled_height: 0.0,
            collision_x: 0.0,
            collision_y: 0.0,
            collision_radius: 0.0,
            energy: STARTING_ENERGY,
            charging: false,
            collided: false,
            pose: WingPose::Up,
        };
        player.resize(viewport);
        player
    }

    pub fn update(&mut self, viewport: &Viewport, round: &mut Round) {
        self.handle_energy(viewport, round);

        if self.speed_y >= 0.0 {
            self.wings_up();
        }

        self.y += self.speed_y;
        if !self.is_touching_bottom(viewport) && !self.charging {
            self.speed_y += viewport.gravity;
        } else {
            self.speed_y = 0.0;
        }

        if self.is_touching_bottom(viewport) {
            self.y = viewport.height - self.scaled_height - viewport.bottom_margin;
        }

        self.collision_x = self.x + self.scaled_width * 0.5;
        self.collision_y = self.y + self.scaled_height * 0.5;
    }

    /// Energy ticks on the periodic event: regenerate one point, and while
    /// charging pay the drain until the meter empties.
    fn handle_energy(&mut self, viewport: &Viewport, round: &mut Round) {
        if round.event_update() {
            if self.energy < Self::MAX_ENERGY {
                self.energy += 1;
            }
            if self.charging {
                self.energy -= CHARGE_DRAIN;
                if self.energy <= 0 {
                    self.energy = 0;
                    self.stop_charge(viewport, round);
                }
            }
        }
    }

    pub fn flap(&mut self, viewport: &Viewport, round: &mut Round) {
        if self.collided {
            return;
        }
        self.stop_charge(viewport, round);
        self.speed_y = -FLAP_SPEED * viewport.ratio;
        self.pose = WingPose::Down;
    }

    /// A charge pins the game speed to its maximum while energy lasts. Too
    /// little energy degrades the request to a plain flap.
    pub fn start_charge(&mut self, viewport: &Viewport, round: &mut Round) {
        if self.collided || self.charging {
            return;
        }
        if self.energy >= MIN_CHARGE_ENERGY {
            self.charging = true;
            self.pose = WingPose::Charge;
            round.speed = viewport.max_speed;
        } else {
            self.flap(viewport, round);
        }
    }

    pub fn stop_charge(&mut self, viewport: &Viewport, round: &mut Round) {
        self.charging = false;
        round.speed = viewport.min_speed;
    }

    pub fn wings_up(&mut self) {
        if !self.charging {
            self.pose = WingPose::Up;
        }
    }

    pub fn collide(&mut self) {
        self.collided = true;
    }

    pub fn resize(&mut self, viewport: &Viewport) {
        self.scaled_width = SPRITE_WIDTH * viewport.ratio;
        self.scaled_height = SPRITE_HEIGHT * viewport.ratio;
        self.x = X_OFFSET * viewport.ratio;
        self.y = viewport.height * 0.5 - self.scaled_height * 0.5;
        self.speed_y = 0.0;
        self.collision_radius = self.scaled_width * 0.4;
        self.collision_x = self.x + self.scaled_width * 0.5;
        self.collision_y = self.y + self.scaled_height * 0.5;
        self.energy = STARTING_ENERGY;
        self.charging = false;
        self.collided = false;
        self.pose = WingPose::Up;
    }

    pub fn draw(&self, renderer: &Renderer, assets: &Assets, debug: bool) {
        if let Some(image) = assets.get(IMAGE_ID) {
            renderer.draw_image(
                image,
                &Rect::new(
                    0.0,
                    self.pose.row() * SPRITE_HEIGHT,
                    SPRITE_WIDTH,
                    SPRITE_HEIGHT,
                ),
                &Rect::new(self.x, self.y, self.scaled_width, self.scaled_height),
            );
        }

        if debug {
            renderer.stroke_circle(self.collision_x, self.collision_y, self.collision_radius);
        }
    }

    fn is_touching_bottom(&self, viewport: &Viewport) -> bool {
        self.y >= viewport.height - self.scaled_height - viewport.bottom_margin
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn energy(&self) -> i32 {
        self.energy
    }

    pub(crate) fn speed_y(&self) -> f64 {
        self.speed_y
    }

    pub(crate) fn charging(&self) -> bool {
        self.charging
    }

    pub(crate) fn collided(&self) -> bool {
        self.collided
    }
}

impl Collider for Player {
    fn collision_center(&self) -> (f64, f64) {
        (self.collision_x, self.collision_y)
    }

    fn collision_radius(&self) -> f64 {
        self.collision_radius
    }
}
