use crate::browser;
use crate::engine::input::InputEvent;
use crate::engine::{self, Rect, Renderer};
use crate::sound::{AudioControl, Cue};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::join;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashMap;
use web_sys::{HtmlElement, HtmlImageElement};

pub mod background;
pub mod obstacle;
pub mod player;

use background::Background;
use obstacle::Obstacle;
use player::Player;

pub const NUMBER_OF_OBSTACLES: usize = 12;

const STARTING_SCORE: u32 = 18;
const EVENT_INTERVAL_MS: f64 = 150.0;
const OBSTACLE_START_OFFSET: f64 = 100.0;
const OBSTACLE_SPACING: f64 = 600.0;
const SWIPE_DISTANCE: f64 = 50.0;
const WINGS_UP_DELAY_MS: f64 = 50.0;
const NEXT_LEVEL_DELAY_MS: f64 = 2000.0;

const STATUS_COLOR: &str = "rgb(254, 247, 233)";
const OVERLAY_COLOR: &str = "rgba(254, 247, 233, 0.9)";
const MESSAGE_COLOR: &str = "rgba(6, 74, 118, 0.8)";
const FONT_FAMILY: &str = "citrus-gothic-solid";

/// Anything that carries a collision circle.
pub trait Collider {
    fn collision_center(&self) -> (f64, f64);
    fn collision_radius(&self) -> f64;
}

/// Circle-circle intersection; a boundary touch counts as a collision.
pub fn check_collision(a: &impl Collider, b: &impl Collider) -> bool {
    let (ax, ay) = a.collision_center();
    let (bx, by) = b.collision_center();
    let distance = (ax - bx).hypot(ay - by);
    distance <= a.collision_radius() + b.collision_radius()
}

/// Canvas geometry and every ratio-derived constant. Recomputed as a unit on
/// resize so the game scales with display height.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) ratio: f64,
    pub(crate) gravity: f64,
    pub(crate) min_speed: f64,
    pub(crate) max_speed: f64,
    pub(crate) bottom_margin: f64,
    pub(crate) small_font: f64,
    pub(crate) large_font: f64,
}

impl Viewport {
    const BASE_HEIGHT: f64 = 720.0;

    pub fn new(width: f64, height: f64) -> Self {
        let mut viewport = Viewport {
            width,
            height,
            ratio: 1.0,
            gravity: 0.0,
            min_speed: 0.0,
            max_speed: 0.0,
            bottom_margin: 0.0,
            small_font: 0.0,
            large_font: 0.0,
        };
        viewport.resize(width, height);
        viewport
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.ratio = height / Self::BASE_HEIGHT;
        self.bottom_margin = (50.0 * self.ratio).floor();
        self.small_font = (20.0 * self.ratio).ceil();
        self.large_font = (40.0 * self.ratio).ceil();
        self.gravity = 0.15 * self.ratio;
        self.min_speed = 4.0 * self.ratio;
        self.max_speed = self.min_speed * 5.0;
    }

    fn small_font_str(&self) -> String {
        format!("{}px {}", self.small_font, FONT_FAMILY)
    }

    fn large_font_str(&self) -> String {
        format!("{}px {}", self.large_font, FONT_FAMILY)
    }
}

/// Per-round state. `game_over` and `game_win` are terminal until the next
/// resize; the triggers guard against re-entry so firing them twice is a
/// no-op.
pub struct Round {
    pub(crate) score: u32,
    pub(crate) level_score: u32,
    pub(crate) speed: f64,
    timer: f64,
    game_over: bool,
    game_win: bool,
    event_timer: f64,
    event_update: bool,
    message1: String,
    message2: String,
}

impl Round {
    fn new(min_speed: f64) -> Self {
        Round {
            score: STARTING_SCORE,
            level_score: 0,
            speed: min_speed,
            timer: 0.0,
            game_over: false,
            game_win: false,
            event_timer: 0.0,
            event_update: false,
            message1: String::new(),
            message2: String::new(),
        }
    }

    fn reset(&mut self, min_speed: f64) {
        *self = Round::new(min_speed);
    }

    pub fn is_playing(&self) -> bool {
        !self.game_over && !self.game_win
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn game_win(&self) -> bool {
        self.game_win
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level_score(&self) -> u32 {
        self.level_score
    }

    pub fn timer(&self) -> f64 {
        self.timer
    }

    fn advance_timer(&mut self, delta_ms: f64) {
        self.timer += delta_ms;
    }

    /// Raise a one-shot event flag roughly every `EVENT_INTERVAL_MS`. The
    /// timer wraps modulo the interval on the frame the flag fires.
    fn handle_periodic_events(&mut self, delta_ms: f64) {
        if self.event_timer < EVENT_INTERVAL_MS {
            self.event_timer += delta_ms;
            self.event_update = false;
        } else {
            self.event_timer %= EVENT_INTERVAL_MS;
            self.event_update = true;
        }
    }

    pub(crate) fn event_update(&self) -> bool {
        self.event_update
    }

    fn formatted_timer(&self) -> String {
        format!("{:.1}", self.timer * 0.001)
    }

    pub(crate) fn trigger_game_over(&mut self, sound: &AudioControl) {
        if self.is_playing() {
            self.game_over = true;
            sound.play(Cue::Lose);
            self.message1 = "NO MAYO! NO WAY!".to_string();
            self.message2 = format!(
                "GET BACK IN THERE! COLLISION TIME: {} SECONDS",
                self.formatted_timer()
            );
        }
    }

    /// Returns true only on the transition frame, so the caller can schedule
    /// the one-time next-level reveal.
    fn trigger_game_win(&mut self, sound: &AudioControl) -> bool {
        if self.is_playing() {
            self.game_win = true;
            sound.play(Cue::Win);
            self.message1 = "A TRUE HERO!".to_string();
            self.message2 = format!(
                "CAN YOU DO IT FASTER THAN {} SECONDS?",
                self.formatted_timer()
            );
            true
        } else {
            false
        }
    }
}

/// Actions the original ran through `setTimeout`, replayed deterministically
/// against the frame clock instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    WingsUp,
    RevealNextLevel,
}

#[derive(Default)]
struct Scheduler {
    pending: Vec<(f64, Deferred)>,
}

impl Scheduler {
    fn schedule(&mut self, due: f64, action: Deferred) {
        self.pending.push((due, action));
    }

    fn drain_due(&mut self, now: f64, out: &mut Vec<Deferred>) {
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].0 <= now {
                out.push(self.pending.remove(index).1);
            } else {
                index += 1;
            }
        }
    }

    fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Image store keyed by id. A missing image skips drawing rather than
/// failing.
#[derive(Default)]
pub struct Assets {
    images: HashMap<String, HtmlImageElement>,
}

impl Assets {
    pub fn insert(&mut self, id: &str, image: HtmlImageElement) {
        self.images.insert(id.to_string(), image);
    }

    pub fn get(&self, id: &str) -> Option<&HtmlImageElement> {
        self.images.get(id)
    }
}

/// The host page's "next world" affordance; absent on pages that don't
/// provide one.
#[derive(Default)]
pub struct NextLevelButton {
    element: Option<HtmlElement>,
}

impl NextLevelButton {
    const ELEMENT_ID: &'static str = "nextWorldButton";

    pub fn lookup() -> Self {
        NextLevelButton {
            element: browser::element_by_id(Self::ELEMENT_ID).ok(),
        }
    }

    fn reveal(&self) {
        if let Some(element) = &self.element {
            if let Err(err) = element.style().set_property("display", "block") {
                log!("Could not reveal next level button : {:#?}", err);
            }
        }
    }
}

/// The whole playfield: round state, player, obstacle collection and the
/// external collaborators (audio, assets, next-level button).
pub struct World {
    viewport: Viewport,
    round: Round,
    background: Background,
    player: Player,
    obstacles: Vec<Obstacle>,
    sound: AudioControl,
    assets: Assets,
    next_level: NextLevelButton,
    scheduler: Scheduler,
    deferred: Vec<Deferred>,
    clock: f64,
    rng: SmallRng,
    touch_start_x: Option<f64>,
    debug: bool,
}

impl World {
    pub fn new(
        width: f64,
        height: f64,
        assets: Assets,
        sound: AudioControl,
        next_level: NextLevelButton,
    ) -> Self {
        let viewport = Viewport::new(width, height);
        let mut world = World {
            round: Round::new(viewport.min_speed),
            background: Background::new(&viewport),
            player: Player::new(&viewport),
            obstacles: Vec::with_capacity(NUMBER_OF_OBSTACLES),
            viewport,
            sound,
            assets,
            next_level,
            scheduler: Scheduler::default(),
            deferred: Vec::new(),
            clock: 0.0,
            rng: SmallRng::from_entropy(),
            touch_start_x: None,
            debug: false,
        };
        world.resize(width, height);
        world
    }

    /// The authoritative reset point: recompute every ratio-derived value,
    /// rebuild the obstacle field and start a fresh round.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
        self.background.resize(&self.viewport);
        self.player.resize(&self.viewport);
        self.create_obstacles();
        self.round.reset(self.viewport.min_speed);
        self.scheduler.clear();
        self.touch_start_x = None;
    }

    fn create_obstacles(&mut self) {
        self.obstacles.clear();
        let start_x = self.viewport.width + OBSTACLE_START_OFFSET;
        let spacing = OBSTACLE_SPACING * self.viewport.ratio;
        for i in 0..NUMBER_OF_OBSTACLES {
            self.obstacles.push(Obstacle::new(
                &self.viewport,
                start_x + i as f64 * spacing,
                &mut self.rng,
            ));
        }
    }

    pub fn update(&mut self, delta_ms: f64, events: &[InputEvent]) {
        for event in events {
            self.handle_input(event);
        }

        self.clock += delta_ms;
        self.round.advance_timer(delta_ms);
        self.round.handle_periodic_events(delta_ms);

        self.background.update(self.round.speed);
        self.player.update(&self.viewport, &mut self.round);

        if self.round.is_playing() {
            for obstacle in &mut self.obstacles {
                obstacle.update(
                    &self.viewport,
                    &mut self.round,
                    &mut self.player,
                    &self.sound,
                );
            }
            self.obstacles
                .retain(|obstacle| !obstacle.marked_for_deletion());
        }

        if self.round.is_playing() && self.round.level_score >= NUMBER_OF_OBSTACLES as u32 {
            if self.round.trigger_game_win(&self.sound) {
                self.scheduler
                    .schedule(self.clock + NEXT_LEVEL_DELAY_MS, Deferred::RevealNextLevel);
            }
        }

        let mut due = std::mem::take(&mut self.deferred);
        self.scheduler.drain_due(self.clock, &mut due);
        for action in due.drain(..) {
            match action {
                Deferred::WingsUp => self.player.wings_up(),
                Deferred::RevealNextLevel => self.next_level.reveal(),
            }
        }
        self.deferred = due;
    }

    fn handle_input(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Resized { width, height } => self.resize(*width, *height),
            InputEvent::PointerDown => self.player.flap(&self.viewport, &mut self.round),
            InputEvent::PointerUp => {
                self.scheduler
                    .schedule(self.clock + WINGS_UP_DELAY_MS, Deferred::WingsUp);
            }
            InputEvent::KeyDown(key) => {
                if key == " " || key == "Enter" {
                    self.player.flap(&self.viewport, &mut self.round);
                }
                if key == "Shift" || key.eq_ignore_ascii_case("c") {
                    self.player.start_charge(&self.viewport, &mut self.round);
                }
            }
            InputEvent::KeyUp(_) => self.player.wings_up(),
            InputEvent::TouchStart(x) => {
                self.player.flap(&self.viewport, &mut self.round);
                self.touch_start_x = Some(*x);
            }
            InputEvent::TouchEnd(x) => {
                let start = self.touch_start_x.take().unwrap_or(*x);
                if x - start > SWIPE_DISTANCE {
                    self.player.start_charge(&self.viewport, &mut self.round);
                } else {
                    self.player.flap(&self.viewport, &mut self.round);
                }
            }
        }
    }

    pub fn draw(&self, renderer: &Renderer) {
        let full = Rect::new(0.0, 0.0, self.viewport.width, self.viewport.height);
        renderer.clear(&full);
        renderer.set_line_width(1.0);

        self.background.draw(renderer, &self.assets);
        self.player.draw(renderer, &self.assets, self.debug);

        if self.round.is_playing() {
            for obstacle in &self.obstacles {
                obstacle.draw(renderer, &self.assets, self.debug);
            }
        }

        self.draw_status_text(renderer);

        if !self.round.is_playing() {
            self.draw_end_screen(renderer, &full);
        }
    }

    fn draw_status_text(&self, renderer: &Renderer) {
        renderer.save();

        renderer.set_font(&self.viewport.small_font_str());
        renderer.set_fill_style(STATUS_COLOR);
        renderer.set_text_align("right");
        renderer.fill_text(
            &format!("SCORE: {}", self.round.score),
            self.viewport.width - self.viewport.small_font,
            self.viewport.large_font,
        );
        renderer.set_text_align("left");
        renderer.fill_text(
            &format!("TIMER: {}", self.round.formatted_timer()),
            self.viewport.small_font,
            self.viewport.large_font,
        );

        if self.player.energy() <= Player::LOW_ENERGY {
            renderer.set_fill_style("red");
        } else if self.player.energy() >= Player::MAX_ENERGY {
            renderer.set_fill_style("green");
        }
        for i in 0..self.player.energy().max(0) {
            renderer.fill_rect(&Rect::new(
                10.0,
                self.viewport.height - 10.0 - 2.0 * f64::from(i),
                15.0,
                2.0,
            ));
        }

        renderer.restore();
    }

    fn draw_end_screen(&self, renderer: &Renderer, full: &Rect) {
        renderer.set_fill_style(OVERLAY_COLOR);
        renderer.fill_rect(full);

        renderer.set_fill_style(MESSAGE_COLOR);
        renderer.set_text_align("center");

        let center_x = self.viewport.width * 0.5;
        let center_y = self.viewport.height * 0.5;

        renderer.set_font(&self.viewport.large_font_str());
        renderer.fill_text(
            &self.round.message1,
            center_x,
            center_y - self.viewport.large_font,
        );

        renderer.set_font(&self.viewport.small_font_str());
        renderer.fill_text(
            &self.round.message2,
            center_x,
            center_y - self.viewport.small_font + 20.0,
        );
        renderer.fill_text("REFRESH TO RESTART", center_x, center_y + 40.0);
    }
}

pub enum TokyoGlide {
    /// Initialize state while resources are being loaded
    /// Transition to `Loaded` once initialization is complete
    Loading,

    /// Active game state with a fully built playfield
    Loaded(World),
}

impl TokyoGlide {
    const PLAYER_IMAGE: &'static str = "player.png";
    const OBSTACLE_IMAGE: &'static str = "ketchup.png";
    const BACKGROUND_IMAGE: &'static str = "background.png";

    pub fn new() -> Self {
        TokyoGlide::Loading
    }
}

impl Default for TokyoGlide {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl engine::Game for TokyoGlide {
    async fn initialize(&self) -> Result<Box<dyn engine::Game>> {
        match self {
            TokyoGlide::Loading => {
                // load sprites in parallel; total time is the slowest resource
                let (player, ketchup, background) = join!(
                    engine::load_image(Self::PLAYER_IMAGE),
                    engine::load_image(Self::OBSTACLE_IMAGE),
                    engine::load_image(Self::BACKGROUND_IMAGE),
                );

                let mut assets = Assets::default();
                for (id, result) in [
                    (player::IMAGE_ID, player),
                    (obstacle::IMAGE_ID, ketchup),
                    (background::IMAGE_ID, background),
                ] {
                    match result {
                        Ok(image) => assets.insert(id, image),
                        Err(err) => log!("Missing image '{}' : {:#?}", id, err),
                    }
                }

                let (width, height) = browser::inner_size()?;
                browser::set_canvas_size(width, height)?;

                let world = World::new(
                    width,
                    height,
                    assets,
                    AudioControl::load(),
                    NextLevelButton::lookup(),
                );
                Ok(Box::new(TokyoGlide::Loaded(world)))
            }
            TokyoGlide::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, delta_ms: f64, events: &[InputEvent]) {
        if let TokyoGlide::Loaded(world) = self {
            world.update(delta_ms, events);
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let TokyoGlide::Loaded(world) = self {
            world.draw(renderer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Circle {
        x: f64,
        y: f64,
        radius: f64,
    }

    impl Collider for Circle {
        fn collision_center(&self) -> (f64, f64) {
            (self.x, self.y)
        }

        fn collision_radius(&self) -> f64 {
            self.radius
        }
    }

    fn test_world() -> World {
        World::new(
            1280.0,
            720.0,
            Assets::default(),
            AudioControl::default(),
            NextLevelButton::default(),
        )
    }

    #[test]
    fn collision_is_symmetric() {
        let a = Circle {
            x: 0.0,
            y: 0.0,
            radius: 5.0,
        };
        let b = Circle {
            x: 8.0,
            y: 0.0,
            radius: 4.0,
        };
        assert_eq!(check_collision(&a, &b), check_collision(&b, &a));
        assert!(check_collision(&a, &b));
    }

    #[test]
    fn boundary_touch_counts_as_collision() {
        let a = Circle {
            x: 0.0,
            y: 0.0,
            radius: 5.0,
        };
        let b = Circle {
            x: 9.0,
            y: 0.0,
            radius: 4.0,
        };
        assert!(check_collision(&a, &b));

        let c = Circle {
            x: 9.1,
            y: 0.0,
            radius: 4.0,
        };
        assert!(!check_collision(&a, &c));
    }

    #[test]
    fn periodic_event_fires_and_wraps() {
        let mut round = Round::new(4.0);

        round.handle_periodic_events(100.0);
        assert!(!round.event_update());

        // timer sits at 100ms, still below the interval
        round.handle_periodic_events(100.0);
        assert!(!round.event_update());

        // timer reached 200ms on the previous frame; fire and wrap
        round.handle_periodic_events(16.0);
        assert!(round.event_update());
        assert_relative_eq!(round.event_timer, 50.0);
    }

    #[test]
    fn game_over_is_idempotent() {
        let sound = AudioControl::default();
        let mut round = Round::new(4.0);
        round.advance_timer(1234.0);

        round.trigger_game_over(&sound);
        assert!(round.game_over());
        let message = round.message2.clone();

        round.advance_timer(5000.0);
        round.trigger_game_over(&sound);
        assert_eq!(round.message2, message);
    }

    #[test]
    fn win_blocks_later_game_over() {
        let sound = AudioControl::default();
        let mut round = Round::new(4.0);

        assert!(round.trigger_game_win(&sound));
        assert!(round.game_win());
        assert!(!round.game_over());

        round.trigger_game_over(&sound);
        assert!(!round.game_over());

        // win transition only reports true once
        assert!(!round.trigger_game_win(&sound));
    }

    #[test]
    fn resize_resets_the_round() {
        let mut world = test_world();
        world.round.score = 25;
        world.round.level_score = 7;
        world.round.game_over = true;
        world.round.advance_timer(9000.0);
        world.obstacles.truncate(3);

        world.resize(1280.0, 720.0);

        assert_eq!(world.round.score(), STARTING_SCORE);
        assert_eq!(world.round.level_score(), 0);
        assert!(!world.round.game_over());
        assert!(!world.round.game_win());
        assert_relative_eq!(world.round.timer(), 0.0);
        assert_eq!(world.obstacles.len(), NUMBER_OF_OBSTACLES);
    }

    #[test]
    fn win_triggers_when_level_score_reaches_target() {
        let mut world = test_world();
        world.round.level_score = NUMBER_OF_OBSTACLES as u32;

        world.update(16.0, &[]);

        assert!(world.round.game_win());
        assert!(!world.round.game_over());
    }

    #[test]
    fn pointer_down_flaps_the_player() {
        let mut world = test_world();
        world.update(16.0, &[InputEvent::PointerDown]);
        assert!(world.player.speed_y() < 0.0);
    }

    #[test]
    fn swipe_right_starts_a_charge() {
        let mut world = test_world();
        world.update(
            16.0,
            &[InputEvent::TouchStart(10.0), InputEvent::TouchEnd(100.0)],
        );
        assert!(world.player.charging());
        assert_relative_eq!(world.round.speed, world.viewport.max_speed);
    }

    #[test]
    fn short_tap_flaps_instead_of_charging() {
        let mut world = test_world();
        world.update(
            16.0,
            &[InputEvent::TouchStart(10.0), InputEvent::TouchEnd(30.0)],
        );
        assert!(!world.player.charging());
    }

    #[test]
    fn resize_event_rebuilds_the_field() {
        let mut world = test_world();
        world.round.game_over = true;
        world.update(
            16.0,
            &[InputEvent::Resized {
                width: 640.0,
                height: 360.0,
            }],
        );
        assert!(world.round.is_playing());
        assert_relative_eq!(world.viewport.ratio, 0.5);
        assert_eq!(world.obstacles.len(), NUMBER_OF_OBSTACLES);
    }

    #[test]
    fn scheduler_delivers_due_actions_once() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(100.0, Deferred::RevealNextLevel);
        scheduler.schedule(50.0, Deferred::WingsUp);

        let mut due = Vec::new();
        scheduler.drain_due(60.0, &mut due);
        assert_eq!(due, vec![Deferred::WingsUp]);

        due.clear();
        scheduler.drain_due(60.0, &mut due);
        assert!(due.is_empty());

        scheduler.drain_due(200.0, &mut due);
        assert_eq!(due, vec![Deferred::RevealNextLevel]);
    }

    #[test]
    fn wings_up_is_deferred_after_pointer_release() {
        let mut world = test_world();
        world.update(16.0, &[InputEvent::PointerDown, InputEvent::PointerUp]);
        assert_eq!(world.scheduler.pending.len(), 1);

        // well past the 50ms delay
        world.update(100.0, &[]);
        assert!(world.scheduler.pending.is_empty());
    }
}
