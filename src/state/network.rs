//! The network view owned by this server.
//!
//! [`Network`] bundles the channel table, the client and server tables and
//! the WHOWAS cache together with this server's identity and the runtime
//! knobs the sync engine reads. It is passed by reference to every handler;
//! there is no ambient global state.

use super::channel::ChannelTable;
use super::client::{Client, ClientTable, LinkId, ServerLink, ServerTable, Uid};
use super::whowas::WhowasCache;
use crate::config::Config;
use tracing::{debug, info};

/// This server's own identity.
#[derive(Debug, Clone)]
pub struct Me {
    pub name: String,
    pub sid: String,
}

/// Knobs re-read on every rehash.
#[derive(Debug, Clone)]
pub struct Settings {
    pub hide_servers: bool,
    pub ignore_bogus_ts: bool,
    pub max_mode_params: usize,
    pub kill_chase_time_limit: i64,
}

impl Settings {
    fn from_config(config: &Config) -> Self {
        Self {
            hide_servers: config.server.hide_servers,
            ignore_bogus_ts: config.general.ignore_bogus_ts,
            max_mode_params: config.limits.max_mode_params.max(1),
            kill_chase_time_limit: config.general.kill_chase_time_limit,
        }
    }
}

#[derive(Debug)]
pub struct Network {
    pub me: Me,
    pub settings: Settings,
    pub channels: ChannelTable,
    pub clients: ClientTable,
    pub servers: ServerTable,
    pub whowas: WhowasCache,
    next_link: u32,
}

impl Network {
    /// Build an empty network view and register the configured links.
    pub fn from_config(config: &Config) -> Self {
        let mut net = Self {
            me: Me {
                name: config.server.name.clone(),
                sid: config.server.sid.clone(),
            },
            settings: Settings::from_config(config),
            channels: ChannelTable::default(),
            clients: ClientTable::default(),
            servers: ServerTable::default(),
            whowas: WhowasCache::new(config.general.whowas_history_length),
            next_link: 0,
        };
        for link in &config.links {
            net.add_link(&link.name, &link.sid, link.hidden);
        }
        net
    }

    /// Re-apply runtime knobs. The WHOWAS cache is trimmed immediately if
    /// its capacity shrank.
    pub fn rehash(&mut self, config: &Config) {
        self.settings = Settings::from_config(config);
        self.whowas
            .set_history_length(config.general.whowas_history_length);
        info!(
            whowas = self.whowas.history_length(),
            ignore_bogus_ts = self.settings.ignore_bogus_ts,
            "Rehashed network settings"
        );
    }

    /// Register a directly connected server on a fresh link.
    pub fn add_link(&mut self, name: &str, sid: &str, hidden: bool) -> LinkId {
        self.next_link += 1;
        let link = LinkId(self.next_link);
        self.servers.insert(ServerLink {
            name: name.to_string(),
            sid: sid.to_string(),
            link,
            hidden,
        });
        debug!(server = %name, sid = %sid, link = link.0, "Registered link");
        link
    }

    /// Add a client introduced by a server or connected locally.
    pub fn introduce_client(&mut self, client: Client) {
        debug!(uid = %client.uid, nick = %client.nick, "Client introduced");
        self.clients.insert(client);
    }

    /// Nick change: the old identity goes to WHOWAS still pointing at the
    /// client, then the nick index moves.
    pub fn nick_change(&mut self, uid: &str, new_nick: &str, now: i64) -> bool {
        let Some(client) = self.clients.get(uid) else {
            return false;
        };
        self.whowas.record(client, true, now);
        self.clients.rename(uid, new_nick)
    }

    /// Client teardown: record the last identity, leave every channel,
    /// detach WHOWAS back-references and drop the client.
    pub fn client_exit(&mut self, uid: &str, now: i64) -> Option<Client> {
        let client = self.clients.get(uid)?;
        self.whowas.record(client, false, now);

        let emptied: Vec<String> = self
            .channels
            .iter_mut()
            .filter_map(|chan| {
                chan.remove_member(uid)?;
                chan.members.is_empty().then(|| chan.name.clone())
            })
            .collect();
        for name in emptied {
            debug!(channel = %name, "Destroying empty channel");
            self.channels.destroy(&name);
        }

        self.whowas.detach(uid);
        self.clients.remove(uid)
    }

    /// Resolve a nick to a live client, following a recent nick change
    /// through WHOWAS if nobody currently holds it.
    pub fn find_chasing(&self, nick: &str, now: i64) -> Option<&Client> {
        if let Some(client) = self.clients.by_nick(nick) {
            return Some(client);
        }
        let uid: &Uid = self
            .whowas
            .lookup(nick, self.settings.kill_chase_time_limit, now)?;
        self.clients.get(uid)
    }
}

/// Current wall-clock time in Unix seconds.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::channel::MemberModes;
    use std::collections::HashSet;

    fn config(whowas: usize) -> Config {
        toml::from_str(&format!(
            r#"
[server]
name = "irc.test"
sid = "00A"

[general]
whowas_history_length = {whowas}

[[link]]
name = "hub.test"
sid = "00B"
"#
        ))
        .unwrap()
    }

    fn client(uid: &str, nick: &str) -> Client {
        Client {
            uid: uid.into(),
            nick: nick.into(),
            user: "u".into(),
            host: "h".into(),
            sockhost: "0".into(),
            account: None,
            realname: "r".into(),
            server: "hub.test".into(),
            server_hidden: false,
            away: None,
            caps: HashSet::new(),
            from: LinkId(1),
        }
    }

    #[test]
    fn from_config_registers_links() {
        let net = Network::from_config(&config(10));
        let hub = net.servers.find("00B").unwrap();
        assert_eq!(hub.link, LinkId(1));
        assert_eq!(net.me.sid, "00A");
        assert_eq!(net.settings.max_mode_params, 6);
    }

    #[test]
    fn nick_change_is_chaseable_until_exit() {
        let mut net = Network::from_config(&config(10));
        net.introduce_client(client("00BAAAAAA", "old"));
        assert!(net.nick_change("00BAAAAAA", "new", 1000));

        let chased = net.find_chasing("old", 1010).map(|c| c.nick.as_str());
        assert_eq!(chased, Some("new"));
        assert!(net.find_chasing("old", 1000 + 91).is_none());

        net.client_exit("00BAAAAAA", 1020);
        assert!(net.find_chasing("old", 1021).is_none());
        assert!(net.clients.is_empty());
        assert_eq!(net.whowas.len(), 2);
    }

    #[test]
    fn exit_destroys_emptied_channels() {
        let mut net = Network::from_config(&config(10));
        net.introduce_client(client("00BAAAAAA", "a"));
        net.introduce_client(client("00BAAAAAB", "b"));
        net.channels
            .make("#solo", 1)
            .add_member("00BAAAAAA", MemberModes::default(), false, 0);
        let shared = net.channels.make("#shared", 1);
        shared.add_member("00BAAAAAA", MemberModes::default(), false, 0);
        shared.add_member("00BAAAAAB", MemberModes::default(), false, 0);

        assert!(net.client_exit("00BAAAAAA", 5).is_some());
        assert!(net.channels.find("#solo").is_none());
        assert_eq!(net.channels.find("#shared").map(|c| c.members.len()), Some(1));
        assert!(net.client_exit("00BAAAAAA", 6).is_none());
    }

    #[test]
    fn rehash_shrinks_whowas() {
        let mut net = Network::from_config(&config(10));
        for i in 0..5 {
            let uid = format!("00BAAAAA{i}");
            net.introduce_client(client(&uid, &format!("n{i}")));
            net.client_exit(&uid, i);
        }
        assert_eq!(net.whowas.len(), 5);
        net.rehash(&config(2));
        assert_eq!(net.whowas.len(), 2);
    }
}
