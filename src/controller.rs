use std::time::Duration;
use tracing::trace;

use crate::domain::{AVError, Message, ViewConfig};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ViewConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self) -> Result<Option<Message>, AVError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => self.handle_key(key),
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Message::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp(1)),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown(1)),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::PageUp => Some(Message::PageUp),
            KeyCode::PageDown => Some(Message::PageDown),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::End | KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Enter => Some(Message::FollowLink),
            KeyCode::Char('y') => Some(Message::CopyCell),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
