//! A vertically bouncing hazard, spawned beyond the right edge and recycled
//! once it scrolls fully off the left edge.

use super::{check_collision, Assets, Collider, Round, Viewport};
use crate::engine::{Rect, Renderer};
use crate::game::player::Player;
use crate::sound::AudioControl;
use rand::rngs::SmallRng;
use rand::Rng;

pub(crate) const IMAGE_ID: &str = "ketchup";

const SPRITE_WIDTH: f64 = 120.0;
const SPRITE_HEIGHT: f64 = 120.0;
// source crop inside the sprite image
const SOURCE_FRAME: Rect = Rect {
    x: 20.0,
    y: 0.0,
    width: 550.0,
    height: 550.0,
};

pub struct Obstacle {
    x: f64,
    y: f64,
    scaled_width: f64,
    scaled_height: f64,
    collision_x: f64,
    collision_y: f64,
    collision_radius: f64,
    speed_y: f64,
    scored: bool,
    marked_for_deletion: bool,
}

impl Obstacle {
    pub fn new(viewport: &Viewport, x: f64, rng: &mut SmallRng) -> Self {
        let scaled_width = SPRITE_WIDTH * viewport.ratio;
        let scaled_height = SPRITE_HEIGHT * viewport.ratio;
        // keep the range non-empty even for a degenerate zero-height window
        let y_span = (viewport.height - scaled_height).max(f64::MIN_POSITIVE);
        let y = rng.gen_range(0.0..y_span);
        let speed_y = if rng.gen_bool(0.5) {
            -viewport.ratio
        } else {
            viewport.ratio
        };
        Obstacle {
            x,
            y,
            scaled_width,
            scaled_height,
            collision_x: 0.0,
            collision_y: 0.0,
            collision_radius: scaled_width * 0.5,
            speed_y,
            scored: false,
            marked_for_deletion: false,
        }
    }

    /// Per-frame step. Movement, bouncing, collision and scoring only happen
    /// while the round is active; the collision center and off-screen check
    /// track the bounding box regardless.
    pub fn update(
        &mut self,
        viewport: &Viewport,
        round: &mut Round,
        player: &mut Player,
        sound: &AudioControl,
    ) {
        if round.is_playing() {
            self.x -= round.speed;
            self.y += self.speed_y;

            // bounce off the field bounds, no energy loss
            if self.y <= 0.0 || self.y >= viewport.height - self.scaled_height {
                self.speed_y = -self.speed_y;
            }

            if check_collision(self, player) {
                player.collide();
                player.stop_charge(viewport, round);
                round.trigger_game_over(sound);
            }

            // score each obstacle once, when its right edge passes the player
            if !self.scored && self.x + self.scaled_width < player.x() {
                self.scored = true;
                round.score += 1;
                round.level_score += 1;
            }
        }

        self.collision_x = self.x + self.scaled_width * 0.5;
        self.collision_y = self.y + self.scaled_height * 0.5;

        if self.x + self.scaled_width < 0.0 {
            self.marked_for_deletion = true;
        }
    }

    pub fn draw(&self, renderer: &Renderer, assets: &Assets, debug: bool) {
        if let Some(image) = assets.get(IMAGE_ID) {
            renderer.draw_image(
                image,
                &SOURCE_FRAME,
                &Rect::new(self.x, self.y, self.scaled_width, self.scaled_height),
            );
        }

        if debug {
            renderer.stroke_circle(self.collision_x, self.collision_y, self.collision_radius);
        }
    }

    pub fn resize(&mut self, viewport: &Viewport) {
        self.scaled_width = SPRITE_WIDTH * viewport.ratio;
        self.scaled_height = SPRITE_HEIGHT * viewport.ratio;
        self.collision_radius = self.scaled_width * 0.5;
    }

    pub fn marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }
}

impl Collider for Obstacle {
    fn collision_center(&self) -> (f64, f64) {
        (self.collision_x, self.collision_y)
    }

    fn collision_radius(&self) -> f64 {
        self.collision_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn viewport() -> Viewport {
        Viewport::new(1280.0, 720.0)
    }

    fn fixture(viewport: &Viewport, x: f64) -> (Obstacle, Round, Player, AudioControl) {
        let mut rng = SmallRng::seed_from_u64(7);
        let obstacle = Obstacle::new(viewport, x, &mut rng);
        let round = Round::new(viewport.min_speed);
        let player = Player::new(viewport);
        (obstacle, round, player, AudioControl::default())
    }

    #[test]
    fn collision_center_tracks_the_bounding_box() {
        let viewport = viewport();
        let (mut obstacle, mut round, mut player, sound) = fixture(&viewport, 2000.0);

        obstacle.update(&viewport, &mut round, &mut player, &sound);

        assert_relative_eq!(
            obstacle.collision_x,
            obstacle.x + obstacle.scaled_width * 0.5
        );
        assert_relative_eq!(
            obstacle.collision_y,
            obstacle.y + obstacle.scaled_height * 0.5
        );
    }

    #[test]
    fn bounces_at_the_field_bounds_only() {
        let viewport = viewport();
        let (mut obstacle, mut round, mut player, sound) = fixture(&viewport, 2000.0);
        obstacle.y = viewport.height * 0.5;
        obstacle.speed_y = viewport.ratio;

        obstacle.update(&viewport, &mut round, &mut player, &sound);
        assert_relative_eq!(obstacle.speed_y, viewport.ratio);

        obstacle.y = viewport.height - obstacle.scaled_height - 0.5;
        obstacle.update(&viewport, &mut round, &mut player, &sound);
        assert_relative_eq!(obstacle.speed_y, -viewport.ratio);

        obstacle.y = 0.5;
        obstacle.update(&viewport, &mut round, &mut player, &sound);
        assert_relative_eq!(obstacle.speed_y, viewport.ratio);
    }

    #[test]
    fn scores_exactly_once_when_passed() {
        let viewport = viewport();
        let (mut obstacle, mut round, mut player, sound) = fixture(&viewport, 0.0);
        obstacle.x = player.x() - obstacle.scaled_width - round.speed - 1.0;
        // high above the player so passing never collides
        obstacle.y = 10.0;

        let score = round.score();
        let level_score = round.level_score();

        obstacle.update(&viewport, &mut round, &mut player, &sound);
        assert!(obstacle.scored);
        assert_eq!(round.score(), score + 1);
        assert_eq!(round.level_score(), level_score + 1);

        obstacle.update(&viewport, &mut round, &mut player, &sound);
        assert_eq!(round.score(), score + 1);
        assert_eq!(round.level_score(), level_score + 1);
    }

    #[test]
    fn collision_with_player_ends_the_round() {
        let viewport = viewport();
        let (mut obstacle, mut round, mut player, sound) = fixture(&viewport, 0.0);
        player.start_charge(&viewport, &mut round);

        // drop the obstacle on top of the player; its collision center only
        // catches up at the end of a frame, so prime one update first
        obstacle.x = player.x();
        obstacle.y = viewport.height * 0.5 - obstacle.scaled_height * 0.5;
        obstacle.update(&viewport, &mut round, &mut player, &sound);
        obstacle.update(&viewport, &mut round, &mut player, &sound);

        assert!(round.game_over());
        assert!(player.collided());
        assert!(!player.charging());
        assert_relative_eq!(round.speed, viewport.min_speed);
    }

    #[test]
    fn frozen_once_the_round_has_ended() {
        let viewport = viewport();
        let (mut obstacle, mut round, mut player, sound) = fixture(&viewport, 2000.0);
        round.trigger_game_over(&sound);

        let (x, y, speed_y) = (obstacle.x, obstacle.y, obstacle.speed_y);
        obstacle.update(&viewport, &mut round, &mut player, &sound);

        assert_relative_eq!(obstacle.x, x);
        assert_relative_eq!(obstacle.y, y);
        assert_relative_eq!(obstacle.speed_y, speed_y);
    }

    #[test]
    fn deletion_mark_latches_off_screen() {
        let viewport = viewport();
        let (mut obstacle, mut round, mut player, sound) = fixture(&viewport, 0.0);
        obstacle.x = -obstacle.scaled_width + round.speed - 1.0;
        // high above the player so the exit never collides
        obstacle.y = 10.0;

        obstacle.update(&viewport, &mut round, &mut player, &sound);
        assert!(obstacle.marked_for_deletion());

        obstacle.update(&viewport, &mut round, &mut player, &sound);
        assert!(obstacle.marked_for_deletion());
    }

    #[test]
    fn spawns_in_a_degenerate_viewport() {
        let viewport = Viewport::new(0.0, 0.0);
        let mut rng = SmallRng::seed_from_u64(7);

        let obstacle = Obstacle::new(&viewport, viewport.width + 100.0, &mut rng);

        assert!(obstacle.y >= 0.0);
        assert!(!obstacle.marked_for_deletion());
    }

    #[test]
    fn resize_rescales_geometry() {
        let viewport = viewport();
        let (mut obstacle, ..) = fixture(&viewport, 2000.0);

        let mut smaller = viewport;
        smaller.resize(640.0, 360.0);
        obstacle.resize(&smaller);

        assert_relative_eq!(obstacle.scaled_width, SPRITE_WIDTH * 0.5);
        assert_relative_eq!(obstacle.collision_radius, SPRITE_WIDTH * 0.25);
    }
}
