//! The native functions exposed to the level-up view.
//!
//! Every handler checks argument count and type tags before it touches a
//! payload: the script side is untyped and may pass anything.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, info, warn};
use mlua::{Lua, RegistryKey};

use crate::collaborators::{
    PerkCatalog, PlayerProgress, SoundPlayer, UiMessageKind, VrInputState,
};
use crate::context::ShimContext;
use crate::error::CallError;
use crate::value::{MarshaledValue, ObjectRef, ValueError, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NativeHandler {
    PlaySound,
    PlayPerkSound,
    StopPerkSound,
    SelectPerk,
    GetPerkInfo,
    CloseMenu,
    GetXpInfo,
    RegisterGrid,
    GridAdded,
    VrConfirmation,
}

impl NativeHandler {
    pub const ALL: [NativeHandler; 10] = [
        NativeHandler::PlaySound,
        NativeHandler::PlayPerkSound,
        NativeHandler::StopPerkSound,
        NativeHandler::SelectPerk,
        NativeHandler::GetPerkInfo,
        NativeHandler::CloseMenu,
        NativeHandler::GetXpInfo,
        NativeHandler::RegisterGrid,
        NativeHandler::GridAdded,
        NativeHandler::VrConfirmation,
    ];

    /// Name the view scripts call the handler by. `OnVRConfimationStart` is
    /// spelled the way existing view assets expect.
    pub fn exposed_name(self) -> &'static str {
        match self {
            NativeHandler::PlaySound => "PlaySound",
            NativeHandler::PlayPerkSound => "PlayPerkSound",
            NativeHandler::StopPerkSound => "StopPerkSound",
            NativeHandler::SelectPerk => "SelectPerk",
            NativeHandler::GetPerkInfo => "GetPerkInfoByRank",
            NativeHandler::CloseMenu => "CloseMenu",
            NativeHandler::GetXpInfo => "GetXPInfo",
            NativeHandler::RegisterGrid => "RegisterPerkGridComponents",
            NativeHandler::GridAdded => "onGridAddedToStage",
            NativeHandler::VrConfirmation => "OnVRConfimationStart",
        }
    }

    pub fn from_exposed_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|handler| handler.exposed_name() == name)
    }

    pub fn invoke<'lua>(
        self,
        scope: &HandlerScope,
        call: &mut NativeCall<'lua>,
    ) -> Result<(), CallError> {
        debug!("{} called with {} arg(s)", self.exposed_name(), call.len());
        scope.state.borrow_mut().record_call(self);
        match self {
            NativeHandler::PlaySound => {
                let sound_id = call.string_arg(0)?;
                let sound = scope.sound()?;
                info!("playing sound {sound_id}");
                sound.play_sound(sound_id);
            }
            NativeHandler::PlayPerkSound => {
                let clip = call.string_arg(0)?;
                let sound = scope.sound()?;
                info!("playing perk sound for {clip}");
                sound.play_perk_sound(clip);
            }
            NativeHandler::StopPerkSound => match scope.context.collaborators().sound.as_ref() {
                Some(sound) => sound.stop_perk_sound(),
                None => debug!("no sound player; nothing to stop"),
            },
            NativeHandler::SelectPerk => {
                call.require_args(2)?;
                let clip = call.string_arg(0)?;
                let rank = call.int_arg(1)?;
                let perks = scope.perks()?;
                info!("selecting perk {clip} rank {rank}");
                perks.select_perk(clip, rank);
            }
            NativeHandler::GetPerkInfo => {
                call.require_args(2)?;
                let clip = call.string_arg(0)?.to_string();
                let rank = call.int_arg(1)?;
                let perks = scope.perks()?;
                match perks.perk_description(&clip, rank) {
                    Some(text) => {
                        debug!("description for {clip} rank {rank}: {text:?}");
                        call.set_result(MarshaledValue::String(text));
                    }
                    None => warn!("no description for perk {clip} rank {rank}"),
                }
            }
            NativeHandler::CloseMenu => {
                let sink = scope
                    .context
                    .collaborators()
                    .ui_messages
                    .as_ref()
                    .ok_or(CallError::CollaboratorUnavailable("UI message manager"))?;
                sink.send_message(&scope.menu_name, UiMessageKind::Close);
                info!("close message sent for {}", scope.menu_name);
            }
            NativeHandler::GetXpInfo => {
                let target = call.object_arg(0)?;
                let player = scope.player()?;
                let xp = player.xp_info();
                target.set_member("level", MarshaledValue::Integer(xp.level))?;
                target.set_member("currXP", MarshaledValue::Integer(xp.current_xp))?;
                target.set_member("maxXP", MarshaledValue::Integer(xp.max_xp))?;
                for member in ["level", "currXP", "maxXP"] {
                    match target.get_member(member)? {
                        Some(value) => debug!("set {member}: {value}"),
                        None => warn!("{member} did not stick on the XP object"),
                    }
                }
            }
            NativeHandler::RegisterGrid => {
                let grid = call.object_arg(0)?.clone();
                let visible = match grid.get_member("visible") {
                    Ok(member) => member.and_then(|value| value.as_bool()),
                    Err(err) => {
                        warn!("reading grid visibility: {err}");
                        None
                    }
                };
                match visible {
                    Some(flag) => info!("perk grid registered (visible: {flag})"),
                    None => info!("perk grid registered"),
                }
                let key = call.lua().create_registry_value(grid.into_table())?;
                let mut state = scope.state.borrow_mut();
                state.grid = Some(key);
                state.grid_visible = visible;
            }
            NativeHandler::GridAdded => {
                scope.state.borrow_mut().grid_on_stage = true;
                info!("grid initialization can proceed");
            }
            NativeHandler::VrConfirmation => {
                let active = call.bool_arg(0)?;
                let input = scope.vr_input()?;
                info!(
                    "VR confirmation {}",
                    if active { "starting" } else { "ending" }
                );
                input.set_confirmation_active(active);
                scope.state.borrow_mut().vr_confirming = active;
            }
        }
        Ok(())
    }
}

impl fmt::Display for NativeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.exposed_name())
    }
}

/// Per-menu bookkeeping updated by the handlers.
#[derive(Debug, Default)]
pub struct BridgeState {
    grid: Option<RegistryKey>,
    grid_visible: Option<bool>,
    grid_on_stage: bool,
    vr_confirming: bool,
    ready_signaled: bool,
    calls: BTreeMap<NativeHandler, u32>,
}

impl BridgeState {
    fn record_call(&mut self, handler: NativeHandler) {
        *self.calls.entry(handler).or_insert(0) += 1;
    }

    pub(crate) fn mark_ready_signaled(&mut self) {
        self.ready_signaled = true;
    }

    pub fn grid_registered(&self) -> bool {
        self.grid.is_some()
    }

    pub fn grid_key(&self) -> Option<&RegistryKey> {
        self.grid.as_ref()
    }

    pub fn grid_visible(&self) -> Option<bool> {
        self.grid_visible
    }

    pub fn grid_on_stage(&self) -> bool {
        self.grid_on_stage
    }

    pub fn vr_confirming(&self) -> bool {
        self.vr_confirming
    }

    pub fn ready_signaled(&self) -> bool {
        self.ready_signaled
    }

    pub fn call_count(&self, handler: NativeHandler) -> u32 {
        self.calls.get(&handler).copied().unwrap_or(0)
    }
}

/// What a handler can reach: the owning menu, the shared context and the
/// menu's bridge state.
#[derive(Debug, Clone)]
pub struct HandlerScope {
    pub(crate) menu_name: Rc<str>,
    pub(crate) context: Rc<ShimContext>,
    pub(crate) state: Rc<RefCell<BridgeState>>,
}

impl HandlerScope {
    pub fn new(
        menu_name: &str,
        context: Rc<ShimContext>,
        state: Rc<RefCell<BridgeState>>,
    ) -> Self {
        HandlerScope {
            menu_name: Rc::from(menu_name),
            context,
            state,
        }
    }

    pub fn menu_name(&self) -> &str {
        &self.menu_name
    }

    pub fn context(&self) -> &Rc<ShimContext> {
        &self.context
    }

    fn sound(&self) -> Result<&Rc<dyn SoundPlayer>, CallError> {
        self.context
            .collaborators()
            .sound
            .as_ref()
            .ok_or(CallError::CollaboratorUnavailable("sound player"))
    }

    fn perks(&self) -> Result<&Rc<dyn PerkCatalog>, CallError> {
        self.context
            .collaborators()
            .perks
            .as_ref()
            .ok_or(CallError::CollaboratorUnavailable("perk catalog"))
    }

    fn player(&self) -> Result<&Rc<dyn PlayerProgress>, CallError> {
        self.context
            .collaborators()
            .player
            .as_ref()
            .ok_or(CallError::CollaboratorUnavailable("player progress"))
    }

    fn vr_input(&self) -> Result<&Rc<dyn VrInputState>, CallError> {
        self.context
            .collaborators()
            .vr_input
            .as_ref()
            .ok_or(CallError::CollaboratorUnavailable("VR input state"))
    }
}

/// One invocation from the script side: marshaled argument slots plus the
/// result slot. A slot that could not be marshaled only fails the call when
/// the handler reads it.
pub struct NativeCall<'lua> {
    lua: &'lua Lua,
    slots: Vec<Result<MarshaledValue<'lua>, ValueError>>,
    result: Option<MarshaledValue<'lua>>,
}

impl<'lua> NativeCall<'lua> {
    pub fn new(lua: &'lua Lua, args: Vec<MarshaledValue<'lua>>) -> Self {
        Self::from_slots(lua, args.into_iter().map(Ok).collect())
    }

    pub fn from_slots(lua: &'lua Lua, slots: Vec<Result<MarshaledValue<'lua>, ValueError>>) -> Self {
        NativeCall {
            lua,
            slots,
            result: None,
        }
    }

    pub fn lua(&self) -> &'lua Lua {
        self.lua
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn require_args(&self, expected: usize) -> Result<(), CallError> {
        if self.slots.len() < expected {
            return Err(CallError::Arity {
                expected,
                received: self.slots.len(),
            });
        }
        Ok(())
    }

    fn arg(&self, index: usize) -> Result<&MarshaledValue<'lua>, CallError> {
        self.require_args(index + 1)?;
        self.slots[index]
            .as_ref()
            .map_err(|source| CallError::Unmarshalable {
                index,
                source: source.clone(),
            })
    }

    pub fn string_arg(&self, index: usize) -> Result<&str, CallError> {
        let value = self.arg(index)?;
        value
            .as_str()
            .ok_or_else(|| type_mismatch(index, ValueType::String, value))
    }

    pub fn int_arg(&self, index: usize) -> Result<i64, CallError> {
        let value = self.arg(index)?;
        value
            .as_integer()
            .ok_or_else(|| type_mismatch(index, ValueType::Integer, value))
    }

    pub fn bool_arg(&self, index: usize) -> Result<bool, CallError> {
        let value = self.arg(index)?;
        value
            .as_bool()
            .ok_or_else(|| type_mismatch(index, ValueType::Bool, value))
    }

    pub fn object_arg(&self, index: usize) -> Result<&ObjectRef<'lua>, CallError> {
        let value = self.arg(index)?;
        value
            .as_object()
            .ok_or_else(|| type_mismatch(index, ValueType::Object, value))
    }

    pub fn set_result(&mut self, value: MarshaledValue<'lua>) {
        self.result = Some(value);
    }

    pub fn result(&self) -> Option<&MarshaledValue<'lua>> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<MarshaledValue<'lua>> {
        self.result
    }
}

fn type_mismatch(index: usize, expected: ValueType, found: &MarshaledValue<'_>) -> CallError {
    CallError::ArgumentType {
        index,
        expected,
        found: found.value_type(),
    }
}
