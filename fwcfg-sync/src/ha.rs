//! High-availability firewall pairs.
//!
//! [`HaPair`] owns both members' transports and the last known state of each.
//! Before the first mutating request the active member's state is probed; a
//! passive answer moves traffic to the peer. A transport failure marks the
//! member unreachable and the request is retried once on the other member.

use tracing::{info, warn};
use xml_doc_core::XmlNode;

use crate::protocol::{Request, Response, Transport, TransportError};
use crate::settings::SyncSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaState {
    Unknown,
    Active,
    Passive,
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Primary,
    Peer,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Peer,
            Self::Peer => Self::Primary,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Peer => 1,
        }
    }
}

/// Two transports for the members of one HA pair.
#[derive(Debug)]
pub struct HaPair<T> {
    members: [T; 2],
    states: [HaState; 2],
    active: Side,
}

/// `<show><high-availability><state/></high-availability></show>`
pub(crate) fn ha_state_cmd() -> XmlNode {
    XmlNode::new("show").child(XmlNode::new("high-availability").child(XmlNode::new("state")))
}

impl<T: Transport> HaPair<T> {
    pub fn new(primary: T, peer: T) -> Self {
        Self {
            members: [primary, peer],
            states: [HaState::Unknown, HaState::Unknown],
            active: Side::Primary,
        }
    }

    /// Member requests are currently sent to.
    pub fn active(&self) -> Side {
        self.active
    }

    pub fn state(&self, side: Side) -> HaState {
        self.states[side.index()]
    }

    pub fn set_state(&mut self, side: Side, state: HaState) {
        self.states[side.index()] = state;
    }

    pub fn member(&self, side: Side) -> &T {
        &self.members[side.index()]
    }

    pub fn member_mut(&mut self, side: Side) -> &mut T {
        &mut self.members[side.index()]
    }

    /// Ask `side` for its HA state and cache the answer.
    pub fn probe(&mut self, side: Side) -> HaState {
        let request = Request::op(ha_state_cmd());
        let state = match self.member_mut(side).execute(&request) {
            Ok(response) => parse_state(&response),
            Err(err) => {
                warn!(?side, error = %err, "HA state probe failed");
                HaState::Unreachable
            }
        };
        info!(?side, ?state, "HA state discovered");
        self.set_state(side, state);
        state
    }

    fn switch_to(&mut self, side: Side) {
        if self.active != side {
            info!(from = ?self.active, to = ?side, "switching HA member");
            self.active = side;
        }
    }

    /// Execute on the active member with probing and failover per `settings`.
    pub fn execute(
        &mut self,
        request: &Request,
        settings: &SyncSettings,
    ) -> Result<Response, TransportError> {
        if request.action.is_mutating()
            && settings.probe_ha_state
            && self.state(self.active) == HaState::Unknown
        {
            let state = self.probe(self.active);
            let other = self.active.other();
            if matches!(state, HaState::Passive | HaState::Unreachable)
                && self.state(other) != HaState::Unreachable
            {
                self.switch_to(other);
            }
        }

        let side = self.active;
        match self.member_mut(side).execute(request) {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!(?side, error = %err, action = %request.action, "HA member unreachable");
                self.set_state(side, HaState::Unreachable);
                if !settings.ha_failover {
                    return Err(err);
                }
                let other = side.other();
                self.switch_to(other);
                self.member_mut(other).execute(request).inspect_err(|_| {
                    self.set_state(other, HaState::Unreachable);
                })
            }
        }
    }
}

fn parse_state(response: &Response) -> HaState {
    let state = response
        .document
        .as_ref()
        .and_then(|r| r.get_text(&["group", "local-info", "state"]));
    match state {
        Some("active") | Some("active-primary") | Some("active-secondary") => HaState::Active,
        Some("passive") | Some("suspended") | Some("non-functional") => HaState::Passive,
        _ if response.is_success() => HaState::Unknown,
        _ => HaState::Unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::{HaPair, HaState, Side};
    use crate::emulator::MemoryDevice;
    use crate::protocol::{Action, Request, Transport};
    use crate::settings::SyncSettings;

    fn pair(primary_state: &str, peer_state: &str) -> HaPair<MemoryDevice> {
        let mut primary = MemoryDevice::firewall("10.1.0");
        let mut peer = MemoryDevice::firewall("10.1.0");
        primary.set_ha_state(Some(primary_state));
        peer.set_ha_state(Some(peer_state));
        HaPair::new(primary, peer)
    }

    fn edit() -> Request {
        Request::at(Action::Set, "/config/shared").with_element(xml_doc_core::XmlNode::new("tag"))
    }

    #[test]
    fn passive_primary_sends_changes_to_peer() {
        let mut ha = pair("passive", "active");
        ha.execute(&edit(), &SyncSettings::default()).expect("execute");
        assert_eq!(ha.active(), Side::Peer);
        assert_eq!(ha.state(Side::Primary), HaState::Passive);
        assert_eq!(ha.member(Side::Primary).mutations(), 0);
        assert_eq!(ha.member(Side::Peer).mutations(), 1);
    }

    #[test]
    fn active_primary_is_probed_once() {
        let mut ha = pair("active", "passive");
        ha.execute(&edit(), &SyncSettings::default()).expect("first");
        ha.execute(&edit(), &SyncSettings::default()).expect("second");
        let probes = ha
            .member(Side::Primary)
            .requests()
            .iter()
            .filter(|r| r.action == Action::Op)
            .count();
        assert_eq!(probes, 1);
        assert_eq!(ha.state(Side::Primary), HaState::Active);
    }

    #[test]
    fn unreachable_member_fails_over() {
        let mut ha = pair("active", "passive");
        ha.set_state(Side::Primary, HaState::Active);
        ha.member_mut(Side::Primary).set_reachable(false);
        ha.execute(&edit(), &SyncSettings::default()).expect("failover");
        assert_eq!(ha.active(), Side::Peer);
        assert_eq!(ha.state(Side::Primary), HaState::Unreachable);
        assert_eq!(ha.member(Side::Peer).mutations(), 1);
    }

    #[test]
    fn failover_can_be_disabled() {
        let mut ha = pair("active", "passive");
        ha.set_state(Side::Primary, HaState::Active);
        ha.member_mut(Side::Primary).set_reachable(false);
        let settings = SyncSettings {
            ha_failover: false,
            ..SyncSettings::default()
        };
        assert!(ha.execute(&edit(), &settings).is_err());
        assert_eq!(ha.active(), Side::Primary);
    }

    #[test]
    fn both_unreachable_surfaces_error() {
        let mut ha = pair("active", "passive");
        ha.member_mut(Side::Primary).set_reachable(false);
        ha.member_mut(Side::Peer).set_reachable(false);
        assert!(ha.execute(&edit(), &SyncSettings::default()).is_err());
        assert_eq!(ha.state(Side::Peer), HaState::Unreachable);
        assert!(ha.member_mut(Side::Peer).execute(&edit()).is_err());
    }
}
