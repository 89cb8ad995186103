use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use mlua::{Table, Value};
use perktree_bridge::{
    Collaborators, ConstructionError, DirectoryAssets, DomainEvent, HostMenu, HostMessage,
    InMemoryAssets, InMemoryMenuRegistry, MenuInstance, MenuState, NativeHandler, Plugin,
    RecordingDomain, ShimConfig, ShimContext, UiMessageKind, UiMessageQueue, ViewError,
    ViewLoader, XpInfo,
};

const LISTING_VIEW: &str = r#"
root1 = { seen = {} }

function root1:onCodeObjCreate()
  for name, value in pairs(self.BGSCodeObj) do
    if type(value) == "function" then
      self.seen[#self.seen + 1] = name
    end
  end
  self.xp = {}
  self.BGSCodeObj:GetXPInfo(self.xp)
end
"#;

struct Session {
    context: Rc<ShimContext>,
    domain: RecordingDomain,
    queue: UiMessageQueue,
}

fn session(config: ShimConfig, domain: RecordingDomain) -> Session {
    let queue = UiMessageQueue::new();
    let collaborators =
        Collaborators::from_domain(Rc::new(domain.clone())).with_ui_messages(Rc::new(queue.clone()));
    Session {
        context: Rc::new(ShimContext::new(config, collaborators)),
        domain,
        queue,
    }
}

fn loader_with(asset: &str, source: &str) -> ViewLoader {
    ViewLoader::new(Rc::new(InMemoryAssets::new().with_view(asset, source)))
}

fn root(menu: &MenuInstance) -> Table<'_> {
    menu.view()
        .and_then(|view| view.root())
        .expect("menu should own a view with a root")
}

#[test]
fn ready_callback_sees_every_native_function() {
    let xp = XpInfo {
        level: 5,
        current_xp: 40,
        max_xp: 200,
    };
    let session = session(ShimConfig::default(), RecordingDomain::new().with_xp(xp));
    let menu = MenuInstance::construct(session.context.clone(), &loader_with("LevelUpMenu", LISTING_VIEW));

    assert_eq!(menu.state(), MenuState::Ready);
    assert!(menu.bridge_state().expect("bridge").ready_signaled());

    let root = root(&menu);
    let mut seen: Vec<String> = root
        .get::<_, Table>("seen")
        .expect("seen")
        .sequence_values::<String>()
        .collect::<mlua::Result<_>>()
        .expect("names");
    seen.sort();
    let mut expected: Vec<String> = NativeHandler::ALL
        .iter()
        .map(|handler| handler.exposed_name().to_string())
        .collect();
    expected.sort();
    assert_eq!(seen, expected);

    let xp_table: Table = root.get("xp").expect("xp table");
    assert_eq!(xp_table.get::<_, i64>("level").expect("level"), 5);
    assert_eq!(xp_table.get::<_, i64>("currXP").expect("currXP"), 40);
    assert_eq!(xp_table.get::<_, i64>("maxXP").expect("maxXP"), 200);
    assert_eq!(session.domain.events(), vec![DomainEvent::XpQuery]);
}

#[test]
fn bridge_functions_resolve_through_dotted_paths() {
    let session = session(ShimConfig::default(), RecordingDomain::new());
    let menu = MenuInstance::construct(session.context.clone(), &loader_with("LevelUpMenu", LISTING_VIEW));
    let view = menu.view().expect("view");

    assert!(matches!(
        view.get_variable("root1.BGSCodeObj.OnVRConfimationStart"),
        Ok(Value::Function(_))
    ));
    assert!(matches!(
        view.get_variable("root1.BGSCodeObj.OnVRConfirmationStart"),
        Ok(Value::Nil)
    ));
}

#[test]
fn close_menu_requests_closing_the_owning_menu() -> Result<()> {
    let session = session(ShimConfig::default(), RecordingDomain::new());
    let menu = MenuInstance::construct(session.context.clone(), &loader_with("LevelUpMenu", LISTING_VIEW));

    menu.view()
        .expect("view")
        .exec("root1.BGSCodeObj:CloseMenu()", "close")?;

    let messages = session.queue.drain();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].menu, "LevelUpMenu");
    assert_eq!(messages[0].kind, UiMessageKind::Close);
    assert!(session.queue.drain().is_empty());
    Ok(())
}

#[test]
fn bad_script_calls_do_not_disturb_the_view() -> Result<()> {
    let domain = RecordingDomain::new().with_description("Gunslinger", 1, "Pistols hit harder");
    let session = session(ShimConfig::default(), domain);
    let menu = MenuInstance::construct(session.context.clone(), &loader_with("LevelUpMenu", LISTING_VIEW));
    let view = menu.view().expect("view");

    view.exec(
        r#"
        local code = root1.BGSCodeObj
        root1.bad = code:GetPerkInfoByRank(1, "Gunslinger")
        root1.good = code:GetPerkInfoByRank("Gunslinger", 1, "extra")
        code.SelectPerk("Gunslinger")
        code.PlaySound(print)
        "#,
        "misuse",
    )?;

    let root = root(&menu);
    assert!(matches!(root.get::<_, Value>("bad")?, Value::Nil));
    assert_eq!(root.get::<_, String>("good")?, "Pistols hit harder");
    assert!(session.domain.selections().is_empty());

    let errors = session
        .context
        .journal()
        .into_iter()
        .filter(|entry| entry.starts_with("call.error"))
        .count();
    assert_eq!(errors, 3);
    Ok(())
}

#[test]
fn unread_arguments_of_any_type_are_accepted() -> Result<()> {
    let session = session(ShimConfig::default(), RecordingDomain::new());
    let menu = MenuInstance::construct(session.context.clone(), &loader_with("LevelUpMenu", LISTING_VIEW));

    menu.view().expect("view").exec(
        r#"
        local code = root1.BGSCodeObj
        code:StopPerkSound(function() end)
        code:onGridAddedToStage(print)
        code:PlaySound("UIMenuOK", function() end)
        "#,
        "loose arguments",
    )?;

    assert!(menu.bridge_state().expect("bridge").grid_on_stage());
    assert_eq!(
        session.domain.events(),
        vec![
            DomainEvent::XpQuery,
            DomainEvent::StopPerkSound,
            DomainEvent::PlaySound {
                sound_id: "UIMenuOK".to_string()
            },
        ]
    );
    assert!(!session
        .context
        .journal()
        .iter()
        .any(|entry| entry.starts_with("call.error")));
    Ok(())
}

#[test]
fn missing_root_leaves_the_menu_failed_but_open() {
    let session = session(ShimConfig::default(), RecordingDomain::new());
    let menu = MenuInstance::construct(
        session.context.clone(),
        &loader_with("LevelUpMenu", "local nothing = true"),
    );

    assert_eq!(menu.state(), MenuState::Failed);
    assert!(matches!(
        menu.failure(),
        Some(ConstructionError::MissingRootVariable { binding }) if binding == "root1"
    ));
    assert!(menu.view().is_some());
    assert!(!menu.has_bridge());
}

#[test]
fn missing_asset_fails_before_any_bridge_exists() {
    let session = session(ShimConfig::default(), RecordingDomain::new());
    let menu = MenuInstance::construct(session.context.clone(), &loader_with("Other", LISTING_VIEW));

    assert_eq!(menu.state(), MenuState::Failed);
    assert!(matches!(
        menu.failure(),
        Some(ConstructionError::ViewLoad {
            source: ViewError::AssetNotFound(_),
            ..
        })
    ));
    assert!(menu.view().is_none());
    assert!(session
        .context
        .journal()
        .iter()
        .any(|entry| entry.starts_with("menu.failed LevelUpMenu")));
}

#[test]
fn raising_ready_callback_keeps_the_bridge() {
    let source = r#"
        root1 = {}
        function root1:onCodeObjCreate() error("view not ready") end
    "#;
    let session = session(ShimConfig::default(), RecordingDomain::new());
    let menu = MenuInstance::construct(session.context.clone(), &loader_with("LevelUpMenu", source));

    assert_eq!(menu.state(), MenuState::Ready);
    let state = menu.bridge_state().expect("bridge");
    assert!(!state.ready_signaled());
    assert!(session
        .context
        .journal()
        .contains(&"bridge.ready_failed LevelUpMenu".to_string()));
}

#[test]
fn late_function_registration_leaves_a_ready_menu_untouched() {
    let session = session(ShimConfig::default(), RecordingDomain::new());
    let mut menu =
        MenuInstance::construct(session.context.clone(), &loader_with("LevelUpMenu", LISTING_VIEW));
    assert_eq!(menu.state(), MenuState::Ready);

    menu.register_functions();
    assert_eq!(menu.state(), MenuState::Ready);
    assert!(menu.has_bridge());
    assert!(matches!(
        menu.view()
            .expect("view")
            .get_variable("root1.BGSCodeObj.CloseMenu"),
        Ok(Value::Function(_))
    ));
}

#[test]
fn teardown_destroys_the_view_once() {
    let session = session(ShimConfig::default(), RecordingDomain::new());
    let mut menu =
        MenuInstance::construct(session.context.clone(), &loader_with("LevelUpMenu", LISTING_VIEW));

    menu.teardown();
    menu.teardown();
    assert_eq!(menu.state(), MenuState::Destroyed);
    assert!(menu.view().is_none());
    assert!(menu.bridge_state().is_none());

    let destroys = session
        .context
        .journal()
        .iter()
        .filter(|entry| entry.starts_with("menu.destroy"))
        .count();
    assert_eq!(destroys, 1);
}

#[test]
fn plugin_takeover_opens_the_demo_view() -> Result<()> {
    let views = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("workspace root should exist")
        .join("demos")
        .join("views");
    let domain = RecordingDomain::new().with_description("Gunslinger", 1, "Pistols hit harder");
    let session = session(ShimConfig::default(), domain);
    let loader = ViewLoader::new(Rc::new(DirectoryAssets::new(views)));
    let mut plugin = Plugin::new(session.context.clone(), loader);

    let mut registry = InMemoryMenuRegistry::new();
    plugin.handle_message(HostMessage::GameLoaded, Some(&mut registry))?;
    let mut menu = registry.open("LevelUpMenu").expect("replacement registered");

    let view = menu.view().expect("demo view loaded");
    assert!(matches!(view.get_variable("root1.ready")?, Value::Boolean(true)));
    view.exec(
        r#"root1:hoverPerk("Gunslinger", 1) root1:confirmPerk("Gunslinger", 1)"#,
        "drive",
    )?;
    assert!(matches!(
        view.get_variable("root1.perkGrid.selected")?,
        Value::String(clip) if clip.to_str().ok() == Some("Gunslinger")
    ));
    assert_eq!(session.domain.selections(), vec![("Gunslinger".to_string(), 1)]);

    menu.teardown();
    assert!(menu.view().is_none());
    Ok(())
}
