use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

use crate::collaborators::{
    PerkCatalog, PlayerProgress, SoundPlayer, UiMessageKind, UiMessageSink, VrInputState, XpInfo,
    PLACEHOLDER_XP,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    PlaySound { sound_id: String },
    PlayPerkSound { clip: String },
    StopPerkSound,
    SelectPerk { clip: String, rank: i64 },
    PerkInfo { clip: String, rank: i64, found: bool },
    XpQuery,
    VrConfirmation { active: bool },
}

/// Domain layer that remembers every request, for tests and the prototype
/// host.
#[derive(Clone)]
pub struct RecordingDomain {
    events: Rc<RefCell<Vec<DomainEvent>>>,
    xp: XpInfo,
    descriptions: BTreeMap<(String, i64), String>,
}

impl Default for RecordingDomain {
    fn default() -> Self {
        RecordingDomain {
            events: Rc::default(),
            xp: PLACEHOLDER_XP,
            descriptions: BTreeMap::new(),
        }
    }
}

impl RecordingDomain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_xp(mut self, xp: XpInfo) -> Self {
        self.xp = xp;
        self
    }

    pub fn with_description(mut self, clip: &str, rank: i64, text: &str) -> Self {
        self.descriptions
            .insert((clip.to_string(), rank), text.to_string());
        self
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.borrow().clone()
    }

    pub fn selections(&self) -> Vec<(String, i64)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                DomainEvent::SelectPerk { clip, rank } => Some((clip.clone(), *rank)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: DomainEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl SoundPlayer for RecordingDomain {
    fn play_sound(&self, sound_id: &str) {
        self.push(DomainEvent::PlaySound {
            sound_id: sound_id.to_string(),
        });
    }

    fn play_perk_sound(&self, clip: &str) {
        self.push(DomainEvent::PlayPerkSound {
            clip: clip.to_string(),
        });
    }

    fn stop_perk_sound(&self) {
        self.push(DomainEvent::StopPerkSound);
    }
}

impl PerkCatalog for RecordingDomain {
    fn select_perk(&self, clip: &str, rank: i64) {
        self.push(DomainEvent::SelectPerk {
            clip: clip.to_string(),
            rank,
        });
    }

    fn perk_description(&self, clip: &str, rank: i64) -> Option<String> {
        let text = self.descriptions.get(&(clip.to_string(), rank)).cloned();
        self.push(DomainEvent::PerkInfo {
            clip: clip.to_string(),
            rank,
            found: text.is_some(),
        });
        text
    }
}

impl PlayerProgress for RecordingDomain {
    fn xp_info(&self) -> XpInfo {
        self.push(DomainEvent::XpQuery);
        self.xp
    }
}

impl VrInputState for RecordingDomain {
    fn set_confirmation_active(&self, active: bool) {
        self.push(DomainEvent::VrConfirmation { active });
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UiMessage {
    pub menu: String,
    pub kind: UiMessageKind,
}

/// Pending UI messages, drained by the host between frames.
#[derive(Debug, Clone, Default)]
pub struct UiMessageQueue {
    pending: Rc<RefCell<Vec<UiMessage>>>,
    history: Rc<RefCell<Vec<UiMessage>>>,
}

impl UiMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<UiMessage> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    pub fn history(&self) -> Vec<UiMessage> {
        self.history.borrow().clone()
    }
}

impl UiMessageSink for UiMessageQueue {
    fn send_message(&self, menu: &str, kind: UiMessageKind) {
        let message = UiMessage {
            menu: menu.to_string(),
            kind,
        };
        self.pending.borrow_mut().push(message.clone());
        self.history.borrow_mut().push(message);
    }
}
