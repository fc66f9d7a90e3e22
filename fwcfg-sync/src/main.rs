use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use fwcfg_sync::detect::{detect_config, detect_version_info, DeviceFlavor};
use fwcfg_sync::emulator::MemoryDevice;
use fwcfg_sync::inspect::render_tree;
use fwcfg_sync::objects::{DeviceGroup, Firewall, NodeKind, Panorama};
use fwcfg_sync::report::{render_objects, render_plan, render_summary, render_text};
use fwcfg_sync::settings::SyncSettings;
use fwcfg_sync::value::Value;
use fwcfg_sync::{ConfigTree, NodeId, Session};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use xml_doc_core::{diff_with_options, format_json, parse_file, DiffOptions, XPath};

mod cli;

use cli::{Cli, Command, DiffArgs, ObjectsArgs, OutputFormat, PlanArgs, ScopeArgs, ShowArgs};

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (settings, source) = SyncSettings::load(cli.settings.as_deref())
        .context("failed to load session settings")?;
    debug!(?source, "settings loaded");

    match cli.command {
        Command::Show(args) => run_show(args),
        Command::Objects(args) => run_objects(args, settings),
        Command::Plan(args) => run_plan(args, settings),
        Command::Diff(args) => run_diff(args),
    }
}

fn run_show(args: ShowArgs) -> Result<()> {
    let node = parse_file(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    if args.detect {
        let flavor = match detect_config(&node) {
            DeviceFlavor::Firewall => "firewall",
            DeviceFlavor::Panorama => "panorama",
            DeviceFlavor::Unknown => "unknown",
        };
        let version = detect_version_info(&node);
        println!(
            "type={flavor} version={} version_source={} version_confidence={}",
            version.value, version.source, version.confidence
        );
    }

    let target = match &args.xpath {
        Some(raw) => {
            let xpath = XPath::parse(raw).with_context(|| format!("invalid xpath '{raw}'"))?;
            xpath
                .select_first(&node)
                .with_context(|| format!("nothing at '{raw}'"))?
        }
        None => &node,
    };

    print!("{}", render_tree(target, args.depth));
    Ok(())
}

fn load_device(path: &std::path::Path) -> Result<MemoryDevice> {
    MemoryDevice::load(path).with_context(|| format!("failed to load snapshot {}", path.display()))
}

fn parse_kind(raw: &str) -> Result<NodeKind> {
    let kind: NodeKind = raw.parse().map_err(|_| {
        anyhow!(
            "unknown kind '{raw}'; expected one of {}",
            NodeKind::KEYWORDS.join(", ")
        )
    })?;
    if kind.is_device_root() {
        bail!("{kind} is a device, not an object kind");
    }
    Ok(kind)
}

/// Local skeleton for the scope objects are read into: the device root, the
/// device group when one is named, and the rulebase for rules.
fn scope_tree(flavor: DeviceFlavor, scope: &ScopeArgs) -> Result<(ConfigTree, NodeId, NodeKind)> {
    let kind = parse_kind(&scope.kind)?;
    let mut tree = ConfigTree::new();

    let container = match flavor {
        DeviceFlavor::Panorama => {
            if scope.vsys.is_some() {
                bail!("--vsys applies to firewall snapshots; use --device-group for Panorama");
            }
            let root = tree.create(None, Panorama::default());
            match &scope.device_group {
                Some(name) => {
                    let group = tree.create_named(name, DeviceGroup::default());
                    tree.add(root, group)?
                }
                None => root,
            }
        }
        DeviceFlavor::Firewall => {
            if scope.device_group.is_some() {
                bail!("--device-group applies to Panorama snapshots");
            }
            let vsys = scope.vsys.clone().unwrap_or_else(|| "vsys1".to_string());
            tree.create(None, Firewall::default().with_vsys(vsys))
        }
        DeviceFlavor::Unknown => bail!("snapshot is not a device configuration"),
    };

    let parent = if kind == NodeKind::SecurityRule {
        let rulebase = match (flavor, scope.post) {
            (DeviceFlavor::Panorama, false) => NodeKind::PreRulebase,
            (DeviceFlavor::Panorama, true) => NodeKind::PostRulebase,
            _ => NodeKind::Rulebase,
        };
        tree.find_or_create(container, rulebase, None)?
    } else {
        container
    };
    Ok((tree, parent, kind))
}

#[derive(Serialize)]
struct ObjectRow {
    kind: NodeKind,
    name: Option<String>,
    xpath: String,
    params: BTreeMap<String, Option<Value>>,
}

fn run_objects(args: ObjectsArgs, settings: SyncSettings) -> Result<()> {
    let device = load_device(&args.file)?;
    let (mut tree, parent, kind) = scope_tree(device.flavor(), &args.scope)?;
    let mut session = Session::new(device).with_settings(settings);
    let ids = session
        .refreshall(&mut tree, parent, kind, true)
        .with_context(|| format!("failed to read {kind} objects"))?;

    match args.format {
        OutputFormat::Text => {
            let rows = ids
                .iter()
                .map(|id| -> Result<_> { Ok((tree.label(*id), tree.about(*id)?)) })
                .collect::<Result<Vec<_>>>()?;
            println!("{}", render_objects(&rows));
        }
        OutputFormat::Json => {
            let rows = ids
                .iter()
                .map(|id| -> Result<ObjectRow> {
                    Ok(ObjectRow {
                        kind,
                        name: tree.name(*id).map(str::to_string),
                        xpath: tree.xpath(*id)?,
                        params: tree.about(*id)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn run_plan(args: PlanArgs, settings: SyncSettings) -> Result<()> {
    let current = load_device(&args.current)?;
    let desired = load_device(&args.desired)?;
    if current.flavor() != desired.flavor() {
        bail!("snapshots are of different device families");
    }

    let (mut tree, parent, kind) = scope_tree(desired.flavor(), &args.scope)?;
    Session::new(desired)
        .with_settings(settings.clone())
        .refreshall(&mut tree, parent, kind, true)
        .with_context(|| format!("failed to read desired {kind} objects"))?;

    let mut session = Session::new(current).with_settings(settings);
    let planned = session
        .plan_all(&mut tree, parent, kind)
        .context("failed to compare with the current snapshot")?;

    match args.format {
        OutputFormat::Text => println!("{}", render_plan(&planned, args.all)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&planned)?),
    }
    Ok(())
}

fn run_diff(args: DiffArgs) -> Result<()> {
    let left = parse_file(&args.file1)
        .with_context(|| format!("failed to parse {}", args.file1.display()))?;
    let right = parse_file(&args.file2)
        .with_context(|| format!("failed to parse {}", args.file2.display()))?;

    let opts = DiffOptions {
        ignore_tags: args.ignore,
        ..DiffOptions::default()
    };
    let entries = diff_with_options(&left, &right, &opts);

    if args.summary {
        println!("{}", render_summary(&entries));
        return Ok(());
    }
    match args.format {
        OutputFormat::Text => println!("{}", render_text(&entries)),
        OutputFormat::Json => println!("{}", format_json(&entries)?),
    }
    Ok(())
}
