//! SJOIN timestamp resolution, convergence and re-framing, driven through
//! the command registry.

mod common;

use common::{TestNode, hub_with_two_leaves};
use slircd_tsync::HandlerError;
use slircd_tsync::handlers::server::parse_sjoin;
use slircd_tsync::message::RawMessage;
use slircd_tsync::state::channel::{ListEntry, ListKind, MemberModes};
use slircd_tsync::state::client::caps;
use slircd_tsync::state::mode::ModeFlags;
use slircd_tsync::sync::burst::generate_burst;
use slircd_tsync::sync::frame::LINE_BUDGET;
use slircd_tsync::sync::merge::parse_members;

fn single_link_node() -> TestNode {
    let mut node = TestNode::new("irc.test", "00A", &[("hub.test", "00B")], "");
    node.introduce("00A", "00AAAAAAA", "alice");
    node.introduce("00B", "00BAAAAAA", "bob");
    node
}

#[test]
fn test_older_burst_resets_local_channel() {
    let mut node = single_link_node();
    node.seed_channel("#x", 100, "+n", &[("@", "00AAAAAAA")]);

    let rec = node.feed(":00B SJOIN 50 #x +t :00BAAAAAA");

    let snap = node.snapshot("#x").expect("channel survives");
    assert_eq!(snap.created, 50);
    assert_eq!(snap.mode.flags, ModeFlags::TOPIC_LOCK);
    assert!(snap.members["00AAAAAAA"].is_empty(), "operator flag stripped");
    assert!(snap.members["00BAAAAAA"].is_empty());

    assert_eq!(
        rec.received_by("00AAAAAAA"),
        vec![
            ":hub.test MODE #x -o alice",
            ":irc.test NOTICE #x :*** Notice -- TS for #x changed from 100 to 50",
            ":hub.test MODE #x -n+t",
            ":bob!bob@bob.example.net JOIN :#x",
        ]
    );
    assert_eq!(rec.relayed(), vec![":00B SJOIN 50 #x +t :00BAAAAAA"]);
}

#[test]
fn test_younger_burst_keeps_local_state() {
    let mut node = single_link_node();
    node.seed_channel("#x", 100, "+n", &[("@", "00AAAAAAA")]);

    let rec = node.feed(":00B SJOIN 200 #x +s :@00BAAAAAA");

    let snap = node.snapshot("#x").expect("channel survives");
    assert_eq!(snap.created, 100);
    assert_eq!(snap.mode.flags, ModeFlags::NO_EXTERNAL);
    assert!(snap.members["00AAAAAAA"].op);
    assert!(snap.members["00BAAAAAA"].is_empty(), "losing side gets no status");
    assert_eq!(
        rec.received_by("00AAAAAAA"),
        vec![":bob!bob@bob.example.net JOIN :#x"]
    );
    assert_eq!(rec.relayed(), vec![":00B SJOIN 100 #x 0 :00BAAAAAA"]);
}

#[test]
fn test_equal_ts_merges_modes() {
    let mut node = single_link_node();
    node.seed_channel("#x", 100, "+n", &[("@", "00AAAAAAA")]);
    node.net.channels.find_mut("#x").expect("seeded").mode.limit = 5;

    let rec = node.feed(":00B SJOIN 100 #x +tlk 20 sesame :+00BAAAAAA");

    let snap = node.snapshot("#x").expect("channel survives");
    assert_eq!(snap.created, 100);
    assert!(snap.mode.flags.contains(ModeFlags::NO_EXTERNAL | ModeFlags::TOPIC_LOCK));
    assert_eq!(snap.mode.limit, 20);
    assert_eq!(snap.mode.key, "sesame");
    assert!(snap.members["00AAAAAAA"].op);
    assert!(snap.members["00BAAAAAA"].voice);

    let lines = rec.received_by("00AAAAAAA");
    assert_eq!(lines[0], ":hub.test MODE #x +tlk 20 sesame");
    assert_eq!(lines[2], ":hub.test MODE #x +v bob");
}

fn converge(lines: &[&str]) -> common::ChannelSnapshot {
    let mut hub = hub_with_two_leaves();
    for line in lines {
        hub.feed(line);
    }
    hub.snapshot("#conv").expect("channel exists")
}

#[test]
fn test_convergence_equal_ts_any_order() {
    let from_b = ":00B SJOIN 100 #conv +nlk 10 zeta :@00BAAAAAA";
    let from_c = ":00C SJOIN 100 #conv +tk alpha :+00CAAAAAA";

    let bc = converge(&[from_b, from_c]);
    let cb = converge(&[from_c, from_b]);
    assert_eq!(bc, cb);

    assert_eq!(bc.created, 100);
    assert!(bc.mode.flags.contains(ModeFlags::NO_EXTERNAL | ModeFlags::TOPIC_LOCK));
    assert_eq!(bc.mode.limit, 10);
    assert_eq!(bc.mode.key, "alpha", "smaller non-empty key wins");
    assert!(bc.members["00BAAAAAA"].op);
    assert!(bc.members["00CAAAAAA"].voice);
}

#[test]
fn test_convergence_different_ts_any_order() {
    let from_b = ":00B SJOIN 100 #conv +nl 10 :@00BAAAAAA";
    let from_c = ":00C SJOIN 50 #conv +tk alpha :+00CAAAAAA";

    let bc = converge(&[from_b, from_c]);
    let cb = converge(&[from_c, from_b]);
    assert_eq!(bc, cb);

    assert_eq!(bc.created, 50);
    assert_eq!(bc.mode.flags, ModeFlags::TOPIC_LOCK);
    assert_eq!(bc.mode.limit, 0);
    assert_eq!(bc.mode.key, "alpha");
    assert!(bc.members["00BAAAAAA"].is_empty());
    assert_eq!(bc.members["00CAAAAAA"], MemberModes { voice: true, ..Default::default() });
}

#[test]
fn test_burst_exchange_converges_two_servers() {
    let mut a = TestNode::new("a.test", "00A", &[("b.test", "00B")], "");
    a.introduce("00A", "00AAAAAAA", "ann");
    a.introduce("00B", "00BAAAAAA", "ben");
    let mut b = TestNode::new("b.test", "00B", &[("a.test", "00A")], "");
    b.introduce("00B", "00BAAAAAA", "ben");
    b.introduce("00A", "00AAAAAAA", "ann");

    a.seed_channel("#net", 100, "+n", &[("@", "00AAAAAAA")]);
    a.seed_channel("#only-a", 200, "+s", &[("+", "00AAAAAAA")]);
    b.seed_channel("#net", 50, "+t", &[("@", "00BAAAAAA")]);

    let burst_a = generate_burst(&a.net, a.link("00B"));
    let burst_b = generate_burst(&b.net, b.link("00A"));
    assert_eq!(burst_b, vec![":00B SJOIN 50 #net +t :@00BAAAAAA".to_string()]);

    for line in &burst_a {
        b.feed(line);
    }
    for line in &burst_b {
        a.feed(line);
    }

    let on_a = a.snapshot("#net").expect("#net on a");
    let on_b = b.snapshot("#net").expect("#net on b");
    assert_eq!(on_a, on_b);
    assert_eq!(on_a.created, 50);
    assert!(on_a.members["00AAAAAAA"].is_empty());
    assert!(on_a.members["00BAAAAAA"].op);

    assert_eq!(a.snapshot("#only-a"), b.snapshot("#only-a"));
}

#[test]
fn test_long_member_list_reframes_without_loss() {
    let mut node = single_link_node();
    let mut expected = Vec::new();
    for i in 0..100 {
        let uid = format!("00BAAA{i:03}");
        node.introduce("00B", &uid, &format!("n{i}"));
        let modes = MemberModes {
            op: i % 2 == 0,
            halfop: i % 5 == 0,
            voice: i % 3 == 0,
        };
        expected.push((modes, uid));
    }
    let list: Vec<String> = expected
        .iter()
        .map(|(modes, uid)| format!("{}{uid}", modes.all_prefix_chars()))
        .collect();

    let rec = node.feed(&format!(":00B SJOIN 100 #big +nt :{}", list.join(" ")));
    let relayed = rec.relayed();
    assert!(relayed.len() > 1, "member list must span several lines");

    let mut seen = Vec::new();
    for line in &relayed {
        assert!(line.len() <= LINE_BUDGET, "line too long: {}", line.len());
        let msg: RawMessage = line.parse().expect("relayed line parses");
        let sjoin = parse_sjoin(msg.args()).expect("relayed SJOIN is well formed");
        assert_eq!((sjoin.ts, sjoin.channel.as_str()), (100, "#big"));
        assert_eq!(sjoin.mode_letters, "+nt");
        seen.extend(
            parse_members(&sjoin.members).map(|(modes, uid)| (modes, uid.to_string())),
        );
    }
    assert_eq!(seen, expected);
}

#[test]
fn test_wrong_direction_member_is_skipped() {
    let mut hub = hub_with_two_leaves();
    let rec = hub.feed(":00B SJOIN 100 #x + :@00CAAAAAA 00BAAAAAA");

    let snap = hub.snapshot("#x").expect("channel created");
    assert!(!snap.members.contains_key("00CAAAAAA"));
    assert!(snap.members.contains_key("00BAAAAAA"));
    assert_eq!(rec.relayed(), vec![":00B SJOIN 100 #x + :00BAAAAAA"]);
}

#[test]
fn test_away_joiner_shapes_local_output() {
    let mut node = TestNode::new("irc.test", "00A", &[("hub.test", "00B")], "");
    node.local_with_caps("00AAAAAAA", "plain", &[]);
    node.local_with_caps(
        "00AAAAAAB",
        "fancy",
        &[caps::EXTENDED_JOIN, caps::AWAY_NOTIFY],
    );
    node.introduce("00B", "00BAAAAAA", "bob");
    node.seed_channel("#x", 100, "+", &[("", "00AAAAAAA"), ("", "00AAAAAAB")]);

    node.feed(":00BAAAAAA AWAY :out to lunch");
    let rec = node.feed(":00B SJOIN 100 #x + :00BAAAAAA");

    assert_eq!(
        rec.received_by("00AAAAAAA"),
        vec![":bob!bob@bob.example.net JOIN :#x"]
    );
    assert_eq!(
        rec.received_by("00AAAAAAB"),
        vec![
            ":bob!bob@bob.example.net JOIN #x * :bob real",
            ":bob!bob@bob.example.net AWAY :out to lunch",
        ]
    );
}

#[test]
fn test_malformed_sjoin_is_dropped() {
    let mut hub = hub_with_two_leaves();

    let (result, _) = hub.try_feed(":00BAAAAAA SJOIN 100 #x + :00BAAAAAA");
    assert!(matches!(result, Err(HandlerError::NotAServer(_))));

    let (result, _) = hub.try_feed(":00B SJOIN 100 #x +");
    assert!(matches!(result, Err(HandlerError::NeedMoreParams)));

    let (result, rec) = hub.try_feed(":00B SJOIN 100 nochan + :00BAAAAAA");
    assert!(matches!(result, Err(HandlerError::InvalidChannel(_))));
    assert_eq!(rec.oper_notices().len(), 1);

    let (result, _) = hub.try_feed(":00B PING irc.test");
    assert!(matches!(result, Err(HandlerError::UnknownCommand(_))));

    assert!(hub.net.channels.is_empty());
    assert_eq!(hub.registry.command_count("SJOIN"), 3);
}

#[test]
fn test_formatting_codes_in_channel_name_are_accepted() {
    let mut node = single_link_node();

    let rec = node.feed(":00B SJOIN 100 #col\x03or + :00BAAAAAA");
    assert!(node.snapshot("#col\x03or").is_some());
    assert_eq!(rec.relayed(), vec![":00B SJOIN 100 #col\x03or + :00BAAAAAA"]);

    node.feed(":00B SJOIN 100 #a\x02b + :00BAAAAAA");
    assert!(node.snapshot("#a\x02b").is_some());
}

#[test]
fn test_lost_ts_strips_ops_then_halfops_then_voices() {
    let mut node = single_link_node();
    node.introduce("00A", "00AAAAAAC", "carol");
    node.seed_channel("#x", 100, "+", &[("%", "00AAAAAAA"), ("@%+", "00AAAAAAC")]);

    let rec = node.feed(":00B SJOIN 50 #x + :00BAAAAAA");

    let snap = node.snapshot("#x").expect("channel survives");
    assert!(snap.members.values().all(MemberModes::is_empty));
    assert_eq!(
        rec.received_by("00AAAAAAA")[..4],
        [
            ":hub.test MODE #x -o carol",
            ":hub.test MODE #x -hh alice carol",
            ":hub.test MODE #x -v carol",
            ":irc.test NOTICE #x :*** Notice -- TS for #x changed from 100 to 50",
        ]
    );
}

#[test]
fn test_lost_ts_batches_op_removals_at_max_params() {
    let mut node = single_link_node();
    let mut ops = Vec::new();
    for i in 0..8 {
        let uid = format!("00AAAAAA{i}");
        node.introduce("00A", &uid, &format!("op{i}"));
        ops.push(("@", uid));
    }
    let seeded: Vec<(&str, &str)> = ops.iter().map(|(p, u)| (*p, u.as_str())).collect();
    node.seed_channel("#x", 100, "+n", &seeded);

    let rec = node.feed(":00B SJOIN 50 #x +n :00BAAAAAA");

    let modes: Vec<_> = rec
        .received_by("00AAAAAA0")
        .into_iter()
        .filter(|l| l.contains(" MODE "))
        .collect();
    assert_eq!(
        modes,
        vec![
            ":hub.test MODE #x -oooooo op0 op1 op2 op3 op4 op5",
            ":hub.test MODE #x -oo op6 op7",
        ]
    );
}

#[test]
fn test_hidden_link_announces_under_our_name() {
    let mut node = single_link_node();
    node.net.add_link("hidden.test", "00H", true);
    node.introduce("00H", "00HAAAAAA", "ghost");
    node.seed_channel("#x", 100, "+", &[("@", "00AAAAAAA")]);
    node.net
        .channels
        .find_mut("#x")
        .expect("seeded")
        .add_list_entry(
            ListKind::Ban,
            ListEntry { mask: "bad!*@*".into(), set_by: "alice".into(), set_at: 0 },
        );

    let rec = node.feed(":00H SJOIN 50 #x + :@00HAAAAAA");

    assert_eq!(
        rec.received_by("00AAAAAAA"),
        vec![
            ":irc.test MODE #x -o alice",
            ":hidden.test MODE #x -b bad!*@*",
            ":irc.test NOTICE #x :*** Notice -- TS for #x changed from 100 to 50",
            ":ghost!ghost@ghost.example.net JOIN :#x",
            ":irc.test MODE #x +o ghost",
        ]
    );
    assert!(node.client("00HAAAAAA").server_hidden);
}

#[test]
fn test_overlong_uid_never_reaches_a_burst() {
    let mut node = single_link_node();
    let uid = format!("00B{}", "A".repeat(60));

    let (result, rec) = node.try_feed(&format!(
        ":00B UID mallory 1 100 +i m evil.example 192.0.2.9 {uid} * :x"
    ));
    assert!(matches!(result, Err(HandlerError::InvalidUid(ref u)) if *u == uid));
    assert!(rec.sent.is_empty());
    assert!(node.net.clients.find_person("mallory").is_none());

    let rec = node.feed(&format!(":00B SJOIN 100 #x + :@{uid} 00BAAAAAA"));
    let snap = node.snapshot("#x").expect("channel created");
    assert_eq!(snap.members.keys().collect::<Vec<_>>(), vec!["00BAAAAAA"]);
    assert_eq!(rec.relayed(), vec![":00B SJOIN 100 #x + :00BAAAAAA"]);
}
