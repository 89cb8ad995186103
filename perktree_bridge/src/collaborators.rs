//! Integration points the bridge hands work off to. The game logic behind
//! them lives outside this crate.

use std::fmt;
use std::rc::Rc;

use log::info;
use serde::{Deserialize, Serialize};

pub trait SoundPlayer {
    fn play_sound(&self, sound_id: &str);
    fn play_perk_sound(&self, clip: &str);
    fn stop_perk_sound(&self) {}
}

pub trait PerkCatalog {
    fn select_perk(&self, clip: &str, rank: i64);
    /// Descriptive text for a perk at a rank, `None` for unknown perks.
    fn perk_description(&self, clip: &str, rank: i64) -> Option<String>;
}

pub trait PlayerProgress {
    fn xp_info(&self) -> XpInfo;
}

pub trait VrInputState {
    fn set_confirmation_active(&self, active: bool);
}

pub trait UiMessageSink {
    fn send_message(&self, menu: &str, kind: UiMessageKind);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpInfo {
    pub level: i64,
    pub current_xp: i64,
    pub max_xp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiMessageKind {
    Open,
    Close,
    Update,
}

/// Everything the native handlers may call into. Missing entries make the
/// matching handlers log and do nothing.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub sound: Option<Rc<dyn SoundPlayer>>,
    pub perks: Option<Rc<dyn PerkCatalog>>,
    pub player: Option<Rc<dyn PlayerProgress>>,
    pub vr_input: Option<Rc<dyn VrInputState>>,
    pub ui_messages: Option<Rc<dyn UiMessageSink>>,
}

impl Collaborators {
    /// Route every domain concern to one implementation.
    pub fn from_domain<D>(domain: Rc<D>) -> Self
    where
        D: SoundPlayer + PerkCatalog + PlayerProgress + VrInputState + 'static,
    {
        Collaborators {
            sound: Some(domain.clone()),
            perks: Some(domain.clone()),
            player: Some(domain.clone()),
            vr_input: Some(domain),
            ui_messages: None,
        }
    }

    /// The stand-in domain layer used until real game hooks exist.
    pub fn placeholder() -> Self {
        Self::from_domain(Rc::new(PlaceholderDomain))
    }

    pub fn with_ui_messages(mut self, sink: Rc<dyn UiMessageSink>) -> Self {
        self.ui_messages = Some(sink);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("sound", &self.sound.is_some())
            .field("perks", &self.perks.is_some())
            .field("player", &self.player.is_some())
            .field("vr_input", &self.vr_input.is_some())
            .field("ui_messages", &self.ui_messages.is_some())
            .finish()
    }
}

pub const PLACEHOLDER_PERK_DESCRIPTION: &str = "Test Perk Description\nRequirements: Level 1";

pub const PLACEHOLDER_XP: XpInfo = XpInfo {
    level: 1,
    current_xp: 0,
    max_xp: 100,
};

/// Logs every request and answers with fixed values.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderDomain;

impl SoundPlayer for PlaceholderDomain {
    fn play_sound(&self, sound_id: &str) {
        info!("placeholder: play sound {sound_id}");
    }

    fn play_perk_sound(&self, clip: &str) {
        info!("placeholder: play perk sound for {clip}");
    }

    fn stop_perk_sound(&self) {
        info!("placeholder: stop perk sound");
    }
}

impl PerkCatalog for PlaceholderDomain {
    fn select_perk(&self, clip: &str, rank: i64) {
        info!("placeholder: select perk {clip} rank {rank}");
    }

    fn perk_description(&self, _clip: &str, _rank: i64) -> Option<String> {
        Some(PLACEHOLDER_PERK_DESCRIPTION.to_string())
    }
}

impl PlayerProgress for PlaceholderDomain {
    fn xp_info(&self) -> XpInfo {
        PLACEHOLDER_XP
    }
}

impl VrInputState for PlaceholderDomain {
    fn set_confirmation_active(&self, active: bool) {
        info!(
            "placeholder: VR confirmation {}",
            if active { "starting" } else { "ending" }
        );
    }
}
