//! Audio collaborator. Cues that failed to load stay `None` and `play`
//! silently does nothing, matching how the rest of the game treats missing
//! assets.

use crate::browser;
use web_sys::HtmlAudioElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Win,
    Lose,
}

#[derive(Default)]
pub struct AudioControl {
    win: Option<HtmlAudioElement>,
    lose: Option<HtmlAudioElement>,
}

impl AudioControl {
    const WIN_SRC: &'static str = "sounds/win.mp3";
    const LOSE_SRC: &'static str = "sounds/lose.mp3";

    pub fn load() -> Self {
        AudioControl {
            win: Self::load_cue(Self::WIN_SRC),
            lose: Self::load_cue(Self::LOSE_SRC),
        }
    }

    fn load_cue(src: &str) -> Option<HtmlAudioElement> {
        match browser::new_audio(src) {
            Ok(audio) => Some(audio),
            Err(err) => {
                log!("Could not load audio cue : {:#?}", err);
                None
            }
        }
    }

    pub fn play(&self, cue: Cue) {
        let audio = match cue {
            Cue::Win => &self.win,
            Cue::Lose => &self.lose,
        };
        if let Some(audio) = audio {
            // restart from the top if the cue is already playing
            audio.set_current_time(0.0);
            if let Ok(promise) = audio.play() {
                let _ = promise;
            }
        }
    }
}
