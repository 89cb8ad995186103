use std::env;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use log::{info, warn};
use perktree_bridge::config::MIN_RUNTIME_VERSION;
use perktree_bridge::logging::{init_file_logging, init_stderr_logging};
use perktree_bridge::plugin::query;
use perktree_bridge::{
    Collaborators, DirectoryAssets, DomainEvent, HostInfo, HostMenu, HostMessage, HostMessaging,
    InMemoryMenuRegistry, MenuFlags, MenuRegistry, MenuState, MessageOutcome, Plugin, PluginInfo,
    RecordingDomain, RegistryOperation, ShimConfig, ShimContext, UiMessage, UiMessageKind,
    UiMessageQueue, ViewLoader,
};
use serde::Serialize;

use crate::cli::Args;

/// Messages the simulated host broadcasts, in order. `GameLoaded` is sent
/// twice to exercise the once-only takeover.
const BOOT_MESSAGES: [HostMessage; 3] = [
    HostMessage::PostLoad,
    HostMessage::GameLoaded,
    HostMessage::GameLoaded,
];

const STOCK_DESCRIPTIONS: [(&str, i64, &str); 2] = [
    ("Gunslinger", 1, "Non-automatic pistols do +20% damage."),
    ("Toughness", 1, "Gain +10 Damage Resistance."),
];

#[derive(Debug, Default)]
struct SimulatedMessaging {
    listeners: Vec<String>,
}

impl HostMessaging for SimulatedMessaging {
    fn register_listener(&mut self, sender: &str) -> bool {
        self.listeners.push(sender.to_string());
        true
    }
}

/// The menu the host ships with, registered before any plugin loads.
struct StockMenu {
    name: String,
    state: MenuState,
}

impl HostMenu for StockMenu {
    fn menu_name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> MenuFlags {
        MenuFlags::LEVEL_UP
    }

    fn depth(&self) -> i32 {
        1
    }

    fn state(&self) -> MenuState {
        self.state
    }

    fn register_functions(&mut self) {}

    fn teardown(&mut self) {
        self.state = MenuState::Destroyed;
    }
}

#[derive(Debug, Serialize)]
pub struct MessageRecord {
    pub message: HostMessage,
    pub outcome: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SessionReport {
    pub plugin: Option<PluginInfo>,
    pub refused: Option<String>,
    pub listeners: Vec<String>,
    pub messages: Vec<MessageRecord>,
    pub registry_operations: Vec<RegistryOperation>,
    pub domain_events: Vec<DomainEvent>,
    pub ui_messages: Vec<UiMessage>,
    pub journal: Vec<String>,
    pub menu_state: Option<MenuState>,
    pub closed_by_view: bool,
}

pub fn run_session(args: &Args) -> Result<SessionReport> {
    let mut config =
        ShimConfig::from_json_file(args.config.as_deref()).context("loading shim config")?;
    setup_logging(args, &mut config)?;

    let host = HostInfo {
        is_editor: args.editor,
        runtime_version: args.runtime_version.unwrap_or(MIN_RUNTIME_VERSION),
    };
    let mut report = SessionReport::default();
    match query(&host, &config) {
        Ok(info) => report.plugin = Some(info),
        Err(err) => {
            warn!("plugin refused to load: {err}");
            report.refused = Some(err.to_string());
            return Ok(report);
        }
    }

    let mut domain = RecordingDomain::new();
    if let Some(xp) = args.xp {
        domain = domain.with_xp(xp);
    }
    for (clip, rank, text) in STOCK_DESCRIPTIONS {
        domain = domain.with_description(clip, rank, text);
    }
    let queue = UiMessageQueue::new();
    let collaborators = Collaborators::from_domain(Rc::new(domain.clone()))
        .with_ui_messages(Rc::new(queue.clone()));
    let menu_name = config.menu_name.clone();
    let context = Rc::new(ShimContext::new(config, collaborators));

    let mut registry = InMemoryMenuRegistry::new();
    if !args.no_stock_menu {
        let stock_name = menu_name.clone();
        registry.register(
            &menu_name,
            Rc::new(move || {
                Box::new(StockMenu {
                    name: stock_name.clone(),
                    state: MenuState::Ready,
                }) as Box<dyn HostMenu>
            }),
        )?;
    }

    let loader = ViewLoader::new(Rc::new(DirectoryAssets::new(&args.views)));
    let mut plugin = Plugin::new(context.clone(), loader);
    let mut messaging = SimulatedMessaging::default();
    plugin.load(Some(&mut messaging))?;
    report.listeners = messaging.listeners.clone();

    for message in BOOT_MESSAGES {
        let outcome = match plugin.handle_message(message, Some(&mut registry)) {
            Ok(MessageOutcome::Ignored) => "ignored".to_string(),
            Ok(MessageOutcome::TookOver(takeover)) => {
                format!("took over (replaced stock: {})", takeover.replaced_stock)
            }
            Ok(MessageOutcome::AlreadyTakenOver) => "already taken over".to_string(),
            Err(err) => format!("failed: {err}"),
        };
        info!("{message:?}: {outcome}");
        report.messages.push(MessageRecord { message, outcome });
    }

    if let Some(mut menu) = registry.open(&menu_name) {
        context.log_event(format!("host.open {menu_name}"));
        if let Some(path) = args.drive.as_ref() {
            drive_menu(menu.as_ref(), path)?;
        }
        for message in queue.drain() {
            if message.menu == menu_name && message.kind == UiMessageKind::Close {
                info!("host closing {menu_name}");
                menu.teardown();
                report.closed_by_view = true;
            }
        }
        report.menu_state = Some(menu.state());
    } else {
        warn!("{menu_name} is not registered; nothing to open");
    }

    report.registry_operations = registry.operations();
    report.domain_events = domain.events();
    report.ui_messages = queue.history();
    report.journal = context.journal();
    Ok(report)
}

fn drive_menu(menu: &dyn HostMenu, path: &Path) -> Result<()> {
    let Some(view) = menu.view() else {
        warn!("{} has no view to drive", menu.menu_name());
        return Ok(());
    };
    let source = fs::read_to_string(path)
        .with_context(|| format!("reading drive script {}", path.display()))?;
    view.exec(&source, &path.display().to_string())
        .with_context(|| format!("running drive script {}", path.display()))?;
    Ok(())
}

fn setup_logging(args: &Args, config: &mut ShimConfig) -> Result<()> {
    if args.verbose {
        return init_stderr_logging(&config.log_level);
    }
    if let Some(path) = args.log_file.as_ref() {
        config.log_file = env::current_dir()
            .context("resolving current directory")?
            .join(path);
    }
    match init_file_logging(config) {
        Ok(path) => println!("Logging to {}", path.display()),
        Err(err) => eprintln!("file logging disabled: {err:#}"),
    }
    Ok(())
}

pub fn print_summary(report: &SessionReport) {
    match (&report.plugin, &report.refused) {
        (Some(info), _) => println!("Plugin: {} v{}", info.name, info.version),
        (None, Some(reason)) => println!("Plugin refused: {reason}"),
        (None, None) => println!("Plugin: not queried"),
    }
    println!("Listeners: {}", report.listeners.join(", "));

    println!("\nHost messages:");
    for record in &report.messages {
        println!("  {:?} -> {}", record.message, record.outcome);
    }

    println!("\nRegistry operations: {}", report.registry_operations.len());
    println!("Domain events:");
    for event in &report.domain_events {
        println!("  {event:?}");
    }
    match report.menu_state {
        Some(state) => println!(
            "\nMenu state: {state}{}",
            if report.closed_by_view {
                " (closed by view)"
            } else {
                ""
            }
        ),
        None => println!("\nMenu state: not opened"),
    }
}
