//! Typed firewall configuration trees kept in sync with devices over their
//! XML API.
//!
//! A configuration is modelled as a tree of typed objects (addresses,
//! services, security rules, virtual systems, device groups) below a device
//! root: a standalone or managed firewall, or a Panorama. Every node resolves
//! to the absolute address of its element in the device configuration, and a
//! [`session::Session`] reads and writes those elements through a
//! [`protocol::Transport`].
//!
//! # Architecture
//!
//! ## Model
//!
//! - [`objects`]: Node kinds, their typed parameters and the [`objects::Params`] seam
//! - [`descriptor`]: Static per-kind tables: parameter paths, encodings, defaults
//! - [`value`]: Loosely typed parameter values for name-based access
//! - [`tree`]: Arena tree with structural checks, lookup and deep equality
//! - [`xpath`]: Absolute addresses, vsys and shared scoping
//! - [`version`]: Software versions and parameter visibility
//!
//! ## Wire
//!
//! - [`marshal`]: Typed objects to and from XML elements
//! - [`protocol`]: Requests, responses and the response envelope
//! - [`emulator`]: In-memory device for tests and offline use
//!
//! ## Synchronization
//!
//! - [`session`]: create, apply, delete, refresh, move, rename and bulk variants
//! - [`ha`]: HA pairs with state probing and failover
//! - [`commit`]: Commit jobs and polling
//! - [`plan`]: Pending operations derived by diffing local and remote elements
//! - [`settings`]: Session behavior loaded from TOML
//!
//! ## Reporting
//!
//! - [`detect`]: Device family and version of a configuration snapshot
//! - [`inspect`]: Element tree rendering
//! - [`report`]: Colored plan, diff and object listings
//!
//! # Examples
//!
//! ```
//! use fwcfg_sync::emulator::MemoryDevice;
//! use fwcfg_sync::objects::{AddressObject, Firewall};
//! use fwcfg_sync::session::Session;
//! use fwcfg_sync::tree::ConfigTree;
//!
//! # fn main() -> fwcfg_sync::Result<()> {
//! let mut tree = ConfigTree::new();
//! let fw = tree.create(None, Firewall::new("edge-fw1"));
//! let web = tree.create_named("web1", AddressObject::ip_netmask("10.1.1.10"));
//! tree.add(fw, web)?;
//!
//! let mut session = Session::new(MemoryDevice::firewall("10.1.0"));
//! session.create(&mut tree, web)?;
//! assert!(!session.apply(&mut tree, web)?); // already in sync
//! # Ok(())
//! # }
//! ```
//!
//! # Built on xml-doc-core
//!
//! Parsing, writing, addresses and structural diffs come from
//! `xml-doc-core`. All firewall-specific knowledge lives in this crate.

pub mod commit;
pub mod descriptor;
pub mod detect;
pub mod emulator;
pub mod error;
pub mod ha;
pub mod inspect;
pub mod marshal;
pub mod objects;
pub mod plan;
pub mod protocol;
pub mod report;
pub mod session;
pub mod settings;
pub mod tree;
pub mod value;
pub mod version;
pub mod xpath;

pub use error::{Error, Result};
pub use session::Session;
pub use tree::{ConfigTree, NodeId};
