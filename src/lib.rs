// ==================== Imports ====================
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

#[macro_use]
mod browser;
pub mod engine;
pub mod game;
pub mod sound;

use engine::GameLoop;
use game::TokyoGlide;

// ==================== Main Functions ====================
/// Main entry for the Webassembly module
/// - sizes the canvas to the window
/// - loads assets and starts the game loop
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    browser::spawn_local(async move {
        GameLoop::start(TokyoGlide::new())
            .await
            .expect("Could not start game loop");
    });

    Ok(())
}
