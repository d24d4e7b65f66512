//! Event-listener plumbing. Browser callbacks push into a shared queue; the
//! game loop drains it once per frame so all input lands synchronously inside
//! `update`.

use crate::browser;
use anyhow::Result;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use web_sys::{Event, KeyboardEvent, MouseEvent, TouchEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown,
    PointerUp,
    KeyDown(String),
    KeyUp(String),
    /// Touch start with the page x coordinate, for swipe detection.
    TouchStart(f64),
    TouchEnd(f64),
    Resized {
        width: f64,
        height: f64,
    },
}

type SharedEvents = Rc<RefCell<VecDeque<InputEvent>>>;

pub struct InputQueue {
    events: SharedEvents,
}

impl InputQueue {
    /// Wire up every listener the game needs. Touch-move only suppresses the
    /// browser's scroll gesture; it never reaches the game.
    pub fn prepare() -> Result<InputQueue> {
        let events: SharedEvents = Rc::new(RefCell::new(VecDeque::new()));

        let queue = events.clone();
        browser::add_canvas_listener("mousedown", move |_: MouseEvent| {
            queue.borrow_mut().push_back(InputEvent::PointerDown);
        })?;

        let queue = events.clone();
        browser::add_canvas_listener("mouseup", move |_: MouseEvent| {
            queue.borrow_mut().push_back(InputEvent::PointerUp);
        })?;

        let queue = events.clone();
        browser::add_window_listener("keydown", move |event: KeyboardEvent| {
            queue.borrow_mut().push_back(InputEvent::KeyDown(event.key()));
        })?;

        let queue = events.clone();
        browser::add_window_listener("keyup", move |event: KeyboardEvent| {
            queue.borrow_mut().push_back(InputEvent::KeyUp(event.key()));
        })?;

        let queue = events.clone();
        browser::add_canvas_listener("touchstart", move |event: TouchEvent| {
            if let Some(touch) = event.changed_touches().get(0) {
                let x = f64::from(touch.page_x());
                queue.borrow_mut().push_back(InputEvent::TouchStart(x));
            }
        })?;

        browser::add_canvas_listener("touchmove", move |event: TouchEvent| {
            event.prevent_default();
        })?;

        let queue = events.clone();
        browser::add_canvas_listener("touchend", move |event: TouchEvent| {
            if let Some(touch) = event.changed_touches().get(0) {
                let x = f64::from(touch.page_x());
                queue.borrow_mut().push_back(InputEvent::TouchEnd(x));
            }
        })?;

        let queue = events.clone();
        browser::add_window_listener("resize", move |_: Event| {
            match browser::inner_size() {
                Ok((width, height)) => {
                    queue
                        .borrow_mut()
                        .push_back(InputEvent::Resized { width, height });
                }
                Err(err) => log!("Could not read window size : {:#?}", err),
            }
        })?;

        Ok(InputQueue { events })
    }

    pub fn drain_into(&mut self, out: &mut Vec<InputEvent>) {
        out.extend(self.events.borrow_mut().drain(..));
    }
}
