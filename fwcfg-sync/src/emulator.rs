//! In-memory device speaking the remote configuration protocol.
//!
//! [`MemoryDevice`] keeps a candidate configuration document and answers every
//! [`Action`] the way a firewall or Panorama does: `set` merges, `edit` and
//! `override` replace, `delete` reports code 7 for missing objects, commits
//! become jobs that finish after a configurable number of polls. Every
//! answer goes through the response envelope, so callers see exactly what
//! they would see on the wire.

use std::collections::BTreeMap;
use std::path::Path;

use xml_doc_core::{parse_file, XPath, XmlNode};

use crate::detect::{detect_config, detect_version_info, DeviceFlavor};
use crate::error::{
    Error, Result, CODE_INVALID_OBJECT, CODE_NOT_POSSIBLE, CODE_NOT_PRESENT,
};
use crate::protocol::{Action, Request, Response, Transport, TransportError};
use crate::xpath::DEVICE_PREFIX;

const CODE_NO_CHANGES: &str = "19";
const CODE_BAD_CREDENTIALS: &str = "403";

#[derive(Debug, Clone)]
struct Job {
    /// Polls still answered with `ACT`; `None` never finishes.
    remaining: Option<u32>,
    success: bool,
    description: Option<String>,
}

/// Emulated device. See the module documentation.
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    config: XmlNode,
    flavor: DeviceFlavor,
    sw_version: Option<String>,
    hostname: String,
    requests: Vec<Request>,
    reachable: bool,
    ha_state: Option<String>,
    jobs: BTreeMap<u64, Job>,
    next_job: u64,
    dirty: bool,
    commit_polls: Option<u32>,
    commit_success: bool,
    managed: BTreeMap<String, MemoryDevice>,
    injected: Vec<(Action, Response)>,
    credentials: (String, String),
}

type Handled = std::result::Result<Response, Response>;

impl MemoryDevice {
    fn with_document(config: XmlNode, flavor: DeviceFlavor, sw_version: Option<String>) -> Self {
        let hostname = config
            .get_child("devices")
            .and_then(|d| d.get_children("entry").into_iter().next())
            .and_then(|e| e.get_text(&["deviceconfig", "system", "hostname"]))
            .map(str::to_string)
            .unwrap_or_else(|| match flavor {
                DeviceFlavor::Panorama => "panorama".to_string(),
                _ => "firewall".to_string(),
            });
        Self {
            config,
            flavor,
            sw_version,
            hostname,
            requests: Vec::new(),
            reachable: true,
            ha_state: None,
            jobs: BTreeMap::new(),
            next_job: 1,
            dirty: false,
            commit_polls: Some(1),
            commit_success: true,
            managed: BTreeMap::new(),
            injected: Vec::new(),
            credentials: ("admin".to_string(), "admin".to_string()),
        }
    }

    /// Empty firewall with a single `vsys1`.
    pub fn firewall(version: &str) -> Self {
        let config = XmlNode::new("config")
            .attr("version", version)
            .child(XmlNode::new("shared"))
            .child(XmlNode::new("devices").child(
                XmlNode::entry("localhost.localdomain")
                    .child(XmlNode::new("vsys").child(XmlNode::entry("vsys1"))),
            ));
        Self::with_document(config, DeviceFlavor::Firewall, Some(version.to_string()))
    }

    /// Empty Panorama.
    pub fn panorama(version: &str) -> Self {
        let config = XmlNode::new("config")
            .attr("version", version)
            .child(XmlNode::new("shared"))
            .child(XmlNode::new("devices").child(
                XmlNode::entry("localhost.localdomain").child(XmlNode::new("device-group")),
            ));
        Self::with_document(config, DeviceFlavor::Panorama, Some(version.to_string()))
    }

    /// Device whose candidate configuration is `document`.
    pub fn from_document(document: XmlNode) -> Result<Self> {
        let flavor = detect_config(&document);
        if flavor == DeviceFlavor::Unknown {
            return Err(Error::Document(format!(
                "expected a <config> snapshot, found <{}>",
                document.tag
            )));
        }
        let detected = detect_version_info(&document);
        let sw_version = (detected.value != "unknown").then_some(detected.value);
        Ok(Self::with_document(document, flavor, sw_version))
    }

    /// Device loaded from a configuration snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_document(parse_file(path)?)
    }

    pub fn flavor(&self) -> DeviceFlavor {
        self.flavor
    }

    pub fn config(&self) -> &XmlNode {
        &self.config
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Most recent request with `action`.
    pub fn last_request(&self, action: Action) -> Option<&Request> {
        self.requests.iter().rev().find(|r| r.action == action)
    }

    /// Number of requests that changed or committed the configuration.
    pub fn mutations(&self) -> usize {
        self.requests.iter().filter(|r| r.action.is_mutating()).count()
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    /// Unreachable devices fail every request at the transport level.
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// HA state reported by the state probe; `None` reports HA disabled.
    pub fn set_ha_state(&mut self, state: Option<&str>) {
        self.ha_state = state.map(str::to_string);
    }

    /// Polls a commit job answers `ACT` before `FIN`; `None` never finishes.
    pub fn set_commit_polls(&mut self, polls: Option<u32>) {
        self.commit_polls = polls;
    }

    pub fn set_commit_success(&mut self, success: bool) {
        self.commit_success = success;
    }

    pub fn set_credentials(&mut self, user: &str, password: &str) {
        self.credentials = (user.to_string(), password.to_string());
    }

    /// Register a firewall reachable through this device by `serial`.
    pub fn manage(&mut self, serial: &str, device: MemoryDevice) {
        self.managed.insert(serial.to_string(), device);
    }

    pub fn managed(&self, serial: &str) -> Option<&MemoryDevice> {
        self.managed.get(serial)
    }

    pub fn managed_mut(&mut self, serial: &str) -> Option<&mut MemoryDevice> {
        self.managed.get_mut(serial)
    }

    /// Answer the next request with `action` with an error.
    pub fn fail_next(&mut self, action: Action, code: Option<&str>, message: &str) {
        self.injected.push((action, Response::error(code, message)));
    }

    /// True when the candidate configuration has uncommitted changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Elements selected by `xpath`; an unparsable address selects nothing.
    pub fn select(&self, xpath: &str) -> Vec<&XmlNode> {
        XPath::parse(xpath)
            .map(|x| x.select(&self.config))
            .unwrap_or_default()
    }

    pub fn contains(&self, xpath: &str) -> bool {
        !self.select(xpath).is_empty()
    }

    fn handle(&mut self, request: &Request) -> Handled {
        match request.action {
            Action::Get => self.get(request),
            Action::Set => self.set(request),
            Action::Edit | Action::Override => self.edit(request),
            Action::Delete => self.delete(request),
            Action::Move => self.move_entry(request),
            Action::Rename => self.rename(request),
            Action::Commit => self.commit(request),
            Action::Op => self.op(request),
            Action::Keygen => self.keygen(request),
        }
    }

    fn get(&mut self, request: &Request) -> Handled {
        let xpath = address(request)?;
        let matched: Vec<XmlNode> = xpath.select(&self.config).into_iter().cloned().collect();
        let count = matched.len().to_string();
        let mut result = XmlNode::new("result")
            .attr("total-count", count.as_str())
            .attr("count", count);
        result.children = matched;
        Ok(Response::success(Some(result)))
    }

    fn set(&mut self, request: &Request) -> Handled {
        let xpath = address(request)?;
        let element = payload(request)?;
        let target = xpath
            .ensure_mut(&mut self.config)
            .map_err(|err| Response::error(Some(CODE_NOT_POSSIBLE), err.to_string()))?;
        merge(target, element.clone());
        self.dirty = true;
        Ok(Response::success(None).with_message("command succeeded"))
    }

    fn edit(&mut self, request: &Request) -> Handled {
        let xpath = address(request)?;
        let element = payload(request)?;
        if !xpath.last().is_some_and(|step| step.matches(element)) {
            return Err(Response::error(
                Some(CODE_INVALID_OBJECT),
                format!("{} edit breaks config validity", request.action),
            ));
        }
        match xpath.select_mut(&mut self.config) {
            Some(node) => *node = element.clone(),
            None => {
                let parent = xpath.parent().ok_or_else(|| {
                    Response::error(Some(CODE_NOT_POSSIBLE), "cannot replace the document root")
                })?;
                parent
                    .ensure_mut(&mut self.config)
                    .map_err(|err| Response::error(Some(CODE_NOT_POSSIBLE), err.to_string()))?
                    .children
                    .push(element.clone());
            }
        }
        self.dirty = true;
        Ok(Response::success(None).with_message("command succeeded"))
    }

    fn delete(&mut self, request: &Request) -> Handled {
        let xpath = address(request)?;
        if xpath.remove_all(&mut self.config).is_empty() {
            return Err(Response::error(Some(CODE_NOT_PRESENT), "Object doesn't exist"));
        }
        self.dirty = true;
        Ok(Response::success(None).with_message("command succeeded"))
    }

    fn move_entry(&mut self, request: &Request) -> Handled {
        let xpath = address(request)?;
        let step = xpath.last().cloned().ok_or_else(missing_target)?;
        let position = request.extra.get("where").map(String::as_str).unwrap_or("");
        let dst = request.extra.get("dst");
        let container = xpath
            .parent()
            .and_then(|p| p.select_mut(&mut self.config))
            .ok_or_else(missing_target)?;
        let from = container
            .children
            .iter()
            .position(|c| step.matches(c))
            .ok_or_else(missing_target)?;
        let own_name = container.children[from].name().map(str::to_string);

        let reference = match (position, dst) {
            ("top" | "bottom", _) => None,
            ("before" | "after", Some(dst)) if Some(dst) != own_name.as_ref() => {
                let found = container
                    .children
                    .iter()
                    .any(|c| c.tag == step.tag && c.name() == Some(dst.as_str()));
                if !found {
                    return Err(Response::error(
                        Some(CODE_NOT_POSSIBLE),
                        format!("move failed: {dst} does not exist"),
                    ));
                }
                Some(dst.as_str())
            }
            _ => {
                return Err(Response::error(
                    Some(CODE_NOT_POSSIBLE),
                    format!("move failed: invalid where '{position}'"),
                ))
            }
        };

        let moved = container.children.remove(from);
        let same_tag = |c: &XmlNode| c.tag == moved.tag;
        let named = |c: &XmlNode| same_tag(c) && c.name() == reference;
        let children = &container.children;
        let index = match position {
            "top" => children.iter().position(same_tag).unwrap_or(0),
            "bottom" => children
                .iter()
                .rposition(same_tag)
                .map_or(children.len(), |i| i + 1),
            "before" => children.iter().position(named).unwrap_or(children.len()),
            _ => children
                .iter()
                .position(named)
                .map_or(children.len(), |i| i + 1),
        };
        container.children.insert(index, moved);
        self.dirty = true;
        Ok(Response::success(None).with_message("command succeeded"))
    }

    fn rename(&mut self, request: &Request) -> Handled {
        let xpath = address(request)?;
        let step = xpath.last().cloned().ok_or_else(missing_target)?;
        let new_name = request
            .extra
            .get("newname")
            .ok_or_else(|| Response::error(None, "rename requires newname"))?;
        let container = xpath
            .parent()
            .and_then(|p| p.select_mut(&mut self.config))
            .ok_or_else(missing_target)?;
        if container
            .children
            .iter()
            .any(|c| c.tag == step.tag && c.name() == Some(new_name.as_str()))
        {
            return Err(Response::error(
                Some(CODE_INVALID_OBJECT),
                format!("{new_name} is already in use"),
            ));
        }
        let entry = container
            .children
            .iter_mut()
            .find(|c| step.matches(c))
            .ok_or_else(missing_target)?;
        entry.attributes.insert("name".to_string(), new_name.clone());
        self.dirty = true;
        Ok(Response::success(None).with_message("command succeeded"))
    }

    fn commit(&mut self, request: &Request) -> Handled {
        let cmd = request.element.as_ref();
        let force = cmd.is_some_and(|c| c.get_child("force").is_some());
        if !self.dirty && !force {
            let result = XmlNode::new("result").child(
                XmlNode::new("msg").child(XmlNode::with_text("line", "There are no changes to commit.")),
            );
            let mut response = Response::success(Some(result));
            response.code = Some(CODE_NO_CHANGES.to_string());
            return Ok(response);
        }

        let id = self.next_job;
        self.next_job += 1;
        self.jobs.insert(
            id,
            Job {
                remaining: self.commit_polls,
                success: self.commit_success,
                description: cmd.and_then(|c| c.get_text(&["description"])).map(str::to_string),
            },
        );
        if self.commit_success {
            self.dirty = false;
        }
        let result = XmlNode::new("result")
            .child(XmlNode::new("msg").child(XmlNode::with_text(
                "line",
                format!("Commit job enqueued with jobid {id}"),
            )))
            .child(XmlNode::with_text("job", id.to_string()));
        Ok(Response::success(Some(result)))
    }

    fn op(&mut self, request: &Request) -> Handled {
        let cmd = payload(request)?;
        if cmd.tag == "show" && cmd.descend(&["system", "info"]).is_some() {
            return Ok(self.system_info());
        }
        if cmd.tag == "show" && cmd.descend(&["high-availability", "state"]).is_some() {
            return Ok(self.ha_info());
        }
        if let Some(raw) = cmd.get_text(&["jobs", "id"]).filter(|_| cmd.tag == "show") {
            let id: u64 = raw
                .trim()
                .parse()
                .map_err(|_| Response::error(None, format!("invalid job id '{raw}'")))?;
            return self.poll_job(id);
        }
        Err(Response::error(None, format!("unknown command <{}>", cmd.tag)))
    }

    fn system_info(&self) -> Response {
        let mut system = XmlNode::new("system")
            .child(XmlNode::with_text("hostname", self.hostname.as_str()))
            .child(XmlNode::with_text(
                "model",
                match self.flavor {
                    DeviceFlavor::Panorama => "Panorama",
                    _ => "PA-VM",
                },
            ));
        if let Some(version) = &self.sw_version {
            system = system.child(XmlNode::with_text("sw-version", version.as_str()));
        }
        Response::success(Some(XmlNode::new("result").child(system)))
    }

    fn ha_info(&self) -> Response {
        let result = match &self.ha_state {
            Some(state) => XmlNode::new("result")
                .child(XmlNode::with_text("enabled", "yes"))
                .child(XmlNode::new("group").child(
                    XmlNode::new("local-info").child(XmlNode::with_text("state", state.as_str())),
                )),
            None => XmlNode::new("result").child(XmlNode::with_text("enabled", "no")),
        };
        Response::success(Some(result))
    }

    fn poll_job(&mut self, id: u64) -> Handled {
        let job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| Response::error(Some(CODE_NOT_POSSIBLE), format!("job {id} not found")))?;
        let finished = match &mut job.remaining {
            Some(0) => true,
            Some(n) => {
                *n -= 1;
                false
            }
            None => false,
        };

        let mut details = XmlNode::new("details");
        let (status, outcome) = match (finished, job.success) {
            (false, _) => ("ACT", "PEND"),
            (true, true) => {
                details
                    .children
                    .push(XmlNode::with_text("line", "Configuration committed successfully"));
                ("FIN", "OK")
            }
            (true, false) => {
                details
                    .children
                    .push(XmlNode::with_text("line", "Validation Error:"));
                details
                    .children
                    .push(XmlNode::with_text("line", "rulebase -> security is invalid"));
                ("FIN", "FAIL")
            }
        };
        let mut entry = XmlNode::new("job")
            .child(XmlNode::with_text("id", id.to_string()))
            .child(XmlNode::with_text("type", "Commit"))
            .child(XmlNode::with_text("status", status))
            .child(XmlNode::with_text("result", outcome));
        if let Some(description) = &job.description {
            entry = entry.child(XmlNode::with_text("description", description.as_str()));
        }
        entry = entry.child(details);
        Ok(Response::success(Some(XmlNode::new("result").child(entry))))
    }

    fn keygen(&mut self, request: &Request) -> Handled {
        let user = request.extra.get("user");
        let password = request.extra.get("password");
        if user != Some(&self.credentials.0) || password != Some(&self.credentials.1) {
            return Err(Response::error(Some(CODE_BAD_CREDENTIALS), "Invalid Credential"));
        }
        let key = format!("LUFRPT{}{}", self.credentials.0.len(), self.hostname);
        Ok(Response::success(Some(
            XmlNode::new("result").child(XmlNode::with_text("key", key)),
        )))
    }
}

impl Transport for MemoryDevice {
    fn execute(&mut self, request: &Request) -> std::result::Result<Response, TransportError> {
        if !self.reachable {
            return Err(TransportError::Unreachable(self.hostname.clone()));
        }
        self.requests.push(request.clone());

        if let Some(serial) = request.target() {
            let Some(device) = self.managed.get_mut(serial) else {
                let response = Response::error(None, format!("device {serial} is not connected"));
                return Response::from_envelope(&response.into_envelope());
            };
            let mut forwarded = request.clone();
            forwarded.extra.remove("target");
            return device.execute(&forwarded);
        }

        let response = match self.injected.iter().position(|(a, _)| *a == request.action) {
            Some(pos) => self.injected.remove(pos).1,
            None => match self.handle(request) {
                Ok(response) | Err(response) => response,
            },
        };
        Response::from_envelope(&response.into_envelope())
    }
}

fn address(request: &Request) -> std::result::Result<XPath, Response> {
    let raw = request
        .xpath
        .as_deref()
        .ok_or_else(|| Response::error(None, format!("{} requires an xpath", request.action)))?;
    XPath::parse(raw).map_err(|err| Response::error(None, err.to_string()))
}

fn payload(request: &Request) -> std::result::Result<&XmlNode, Response> {
    request
        .element
        .as_ref()
        .ok_or_else(|| Response::error(None, format!("{} requires an element", request.action)))
}

fn missing_target() -> Response {
    Response::error(Some(CODE_NOT_PRESENT), "No such node")
}

/// Merge `incoming` into `parent` the way `set` does: matching children are
/// merged recursively, everything else is appended.
fn merge(parent: &mut XmlNode, incoming: XmlNode) {
    match parent
        .children
        .iter_mut()
        .find(|c| same_identity(c, &incoming))
    {
        Some(current) => {
            if incoming.text.is_some() {
                current.text = incoming.text;
            }
            for child in incoming.children {
                merge(current, child);
            }
        }
        None => parent.children.push(incoming),
    }
}

fn same_identity(a: &XmlNode, b: &XmlNode) -> bool {
    if a.tag != b.tag {
        return false;
    }
    match (a.name(), b.name()) {
        (Some(x), Some(y)) => x == y,
        (None, None) if a.tag == "member" => a.text == b.text,
        (None, None) => true,
        _ => false,
    }
}

/// Address of the local device entry, for building snapshot paths in tests.
pub fn device_xpath(relative: &str) -> String {
    format!("{DEVICE_PREFIX}/{relative}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use xml_doc_core::XmlNode;

    use super::{device_xpath, MemoryDevice};
    use crate::protocol::{Action, Request, Status, Transport};

    fn entry_request(action: Action, xpath: &str, element: XmlNode) -> Request {
        Request::at(action, xpath).with_element(element)
    }

    fn tags(device: &MemoryDevice) -> Vec<String> {
        device
            .select(&device_xpath("vsys/entry[@name='vsys1']/tag/entry"))
            .into_iter()
            .filter_map(|e| e.name().map(str::to_string))
            .collect()
    }

    fn seed_tags(device: &mut MemoryDevice, names: &[&str]) {
        let mut collection = XmlNode::new("tag");
        collection.children = names.iter().map(|n| XmlNode::entry(*n)).collect();
        let request = entry_request(
            Action::Set,
            &device_xpath("vsys/entry[@name='vsys1']"),
            collection,
        );
        assert!(device.execute(&request).expect("set").is_success());
    }

    #[test]
    fn set_merges_and_edit_replaces() {
        let mut device = MemoryDevice::firewall("10.1.0");
        let base = device_xpath("vsys/entry[@name='vsys1']/address");
        let first = XmlNode::entry("web1")
            .child(XmlNode::with_text("ip-netmask", "10.0.0.1"))
            .child(XmlNode::with_text("description", "old"));
        device
            .execute(&entry_request(Action::Set, &base, first))
            .expect("set");
        let update = XmlNode::entry("web1").child(XmlNode::with_text("description", "new"));
        device
            .execute(&entry_request(Action::Set, &base, update.clone()))
            .expect("merge");
        let entry = format!("{base}/entry[@name='web1']");
        assert!(device.contains(&format!("{entry}/ip-netmask")));
        assert_eq!(
            device.select(&format!("{entry}/description"))[0].text.as_deref(),
            Some("new")
        );

        device
            .execute(&entry_request(Action::Edit, &entry, update))
            .expect("edit");
        assert!(!device.contains(&format!("{entry}/ip-netmask")));
        assert!(device.is_dirty());
    }

    #[test]
    fn delete_of_missing_object_reports_code_7() {
        let mut device = MemoryDevice::firewall("10.1.0");
        let response = device
            .execute(&Request::at(
                Action::Delete,
                device_xpath("vsys/entry[@name='vsys1']/address/entry[@name='ghost']"),
            ))
            .expect("delivered");
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.code.as_deref(), Some("7"));
    }

    #[test]
    fn delete_with_or_predicate_removes_all_named() {
        let mut device = MemoryDevice::firewall("10.1.0");
        seed_tags(&mut device, &["a", "b", "c"]);
        let xpath = device_xpath("vsys/entry[@name='vsys1']/tag/entry[@name='a' or @name='c']");
        device
            .execute(&Request::at(Action::Delete, xpath))
            .expect("delete");
        assert_eq!(tags(&device), ["b"]);
    }

    #[test]
    fn move_and_rename() {
        let mut device = MemoryDevice::firewall("10.1.0");
        seed_tags(&mut device, &["a", "b", "c"]);
        let c = device_xpath("vsys/entry[@name='vsys1']/tag/entry[@name='c']");
        device
            .execute(&Request::at(Action::Move, c.as_str()).with_extra("where", "top"))
            .expect("move");
        assert_eq!(tags(&device), ["c", "a", "b"]);

        let a = device_xpath("vsys/entry[@name='vsys1']/tag/entry[@name='a']");
        let clash = device
            .execute(&Request::at(Action::Rename, a.as_str()).with_extra("newname", "b"))
            .expect("delivered");
        assert_eq!(clash.code.as_deref(), Some("12"));
        device
            .execute(&Request::at(Action::Rename, a.as_str()).with_extra("newname", "z"))
            .expect("rename");
        assert_eq!(tags(&device), ["c", "z", "b"]);
    }

    #[test]
    fn unreachable_device_fails_at_transport() {
        let mut device = MemoryDevice::firewall("10.1.0");
        device.set_reachable(false);
        assert!(device.execute(&Request::at(Action::Get, "/config")).is_err());
        assert!(device.requests().is_empty());
    }

    #[test]
    fn injected_failure_is_returned_once() {
        let mut device = MemoryDevice::firewall("10.1.0");
        device.fail_next(Action::Get, Some("16"), "Unauthorized");
        let first = device
            .execute(&Request::at(Action::Get, "/config/shared"))
            .expect("delivered");
        assert_eq!(first.code.as_deref(), Some("16"));
        let second = device
            .execute(&Request::at(Action::Get, "/config/shared"))
            .expect("delivered");
        assert!(second.is_success());
    }

    #[test]
    fn snapshot_flavor_is_detected() {
        let doc = xml_doc_core::parse_str(
            r#"<config version="10.2.0"><devices><entry name="localhost.localdomain"><device-group/></entry></devices></config>"#,
        )
        .expect("xml");
        let device = MemoryDevice::from_document(doc).expect("device");
        assert_eq!(device.flavor(), crate::detect::DeviceFlavor::Panorama);
        assert!(MemoryDevice::from_document(XmlNode::new("html")).is_err());
    }
}
