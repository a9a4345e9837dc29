//! Offline protocol scenarios against the sans-IO engine.
//!
//! Each test feeds raw server lines and inspects the produced actions
//! and state, exactly the way the session driver would.

use slirc_client::{Engine, EngineAction, Event, ModeClass, Profile};

fn new_engine() -> Engine {
    Engine::new(Profile {
        nickname: "me".to_string(),
        ..Profile::default()
    })
}

fn registered_engine() -> Engine {
    let mut engine = new_engine();
    let _ = engine.feed_line(":server 001 me :Welcome");
    engine
}

/// Feed lines and collect the semantic events they produce.
fn feed(engine: &mut Engine, lines: &[&str]) -> Vec<Event> {
    let mut events = Vec::new();
    for line in lines {
        for action in engine.feed_line(line) {
            if let EngineAction::Emit(event) = action {
                if !matches!(event, Event::Raw(_)) {
                    events.push(event);
                }
            }
        }
    }
    events
}

fn count_channel_events(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Channel { .. }))
        .count()
}

#[test]
fn registered_fires_once_for_welcome_then_motd_end() {
    let mut engine = new_engine();
    let events = feed(
        &mut engine,
        &[":server 001 me :Welcome", ":server 376 me :MOTD end"],
    );
    let registered = events
        .iter()
        .filter(|e| matches!(e, Event::Registered))
        .count();
    assert_eq!(registered, 1);
}

#[test]
fn registered_fires_once_for_no_motd_servers() {
    let mut engine = new_engine();
    let events = feed(
        &mut engine,
        &[":server 422 me :No MOTD", ":server 376 me :MOTD end"],
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, Event::Registered))
            .count(),
        1
    );
}

#[test]
fn privmsg_scenario() {
    let mut engine = registered_engine();
    let events = feed(&mut engine, &[":nick!user@host PRIVMSG #chan :hello"]);

    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Message {
            sender,
            channel,
            text,
        } => {
            assert_eq!(sender.nick, "nick");
            assert_eq!(sender.username, "user");
            assert_eq!(sender.hostname, "host");
            assert_eq!(channel, "#chan");
            assert_eq!(text, "hello");
        }
        other => panic!("expected Message event, got {other:?}"),
    }
}

#[test]
fn names_aggregation_scenario() {
    let mut engine = registered_engine();
    let _ = feed(
        &mut engine,
        &[
            ":me!u@h JOIN #x",
            ":server 353 me = #x :me @bob +carol",
            ":server 366 me #x :End of NAMES",
        ],
    );

    let chan = engine.channel("#x").expect("channel tracked");
    assert_eq!(
        chan.nicks().to_vec(),
        vec!["me".to_string(), "bob".to_string(), "carol".to_string()]
    );
    assert_eq!(chan.user("bob").unwrap().prefix, Some('@'));
    assert_eq!(chan.user("carol").unwrap().prefix, Some('+'));
    assert_eq!(chan.user("me").unwrap().prefix, None);
}

#[test]
fn multi_line_names_burst_appends_then_finalizes() {
    let mut engine = registered_engine();
    let events = feed(
        &mut engine,
        &[
            ":me!u@h JOIN #big",
            ":server 353 me = #big :me a b",
            ":server 353 me = #big :c d",
            ":server 366 me #big :End of NAMES",
        ],
    );

    let chan = engine.channel("#big").unwrap();
    assert_eq!(chan.nicks().len(), 5);
    assert!(!chan.updating_names());
    assert!(events.iter().any(|e| matches!(e, Event::Names { .. })));

    // A later refresh replaces rather than appends.
    let _ = feed(
        &mut engine,
        &[
            ":server 353 me = #big :me a",
            ":server 366 me #big :End of NAMES",
        ],
    );
    assert_eq!(engine.channel("#big").unwrap().nicks().len(), 2);
}

/// All orderings of the four bootstrap fact groups produce exactly one
/// `channel` event, and only once everything has arrived.
#[test]
fn bootstrap_completes_exactly_once_regardless_of_order() {
    let fact_groups: [&[&str]; 4] = [
        &[":server 324 me #x +nt"],
        &[":server 329 me #x 1609459200"],
        &[":server 331 me #x :No topic is set"],
        &[
            ":server 353 me = #x :me @bob",
            ":server 366 me #x :End of NAMES",
        ],
    ];

    let mut orderings: Vec<Vec<usize>> = Vec::new();
    permute(&mut vec![0, 1, 2, 3], 0, &mut orderings);
    assert_eq!(orderings.len(), 24);

    for ordering in orderings {
        let mut engine = registered_engine();
        let mut events = feed(&mut engine, &[":me!u@h JOIN #x"]);
        assert_eq!(count_channel_events(&events), 0);

        for (step, &index) in ordering.iter().enumerate() {
            let step_events = feed(&mut engine, fact_groups[index]);
            let expected = usize::from(step == ordering.len() - 1);
            assert_eq!(
                count_channel_events(&step_events),
                expected,
                "ordering {ordering:?}, step {step}"
            );
            events.extend(step_events);
        }

        assert_eq!(count_channel_events(&events), 1, "ordering {ordering:?}");
        assert!(engine.channel("#x").unwrap().data_loaded());
    }
}

fn permute(items: &mut Vec<usize>, start: usize, out: &mut Vec<Vec<usize>>) {
    if start == items.len() {
        out.push(items.clone());
        return;
    }
    for i in start..items.len() {
        items.swap(start, i);
        permute(items, start + 1, out);
        items.swap(start, i);
    }
}

#[test]
fn topic_reply_variants_complete_bootstrap() {
    for topic_line in [
        ":server 331 me #x :No topic is set",
        ":server 332 me #x :the topic",
    ] {
        let mut engine = registered_engine();
        let events = feed(
            &mut engine,
            &[
                ":me!u@h JOIN #x",
                ":server 324 me #x +nt",
                ":server 329 me #x 1609459200",
                topic_line,
                ":server 353 me = #x :me",
                ":server 366 me #x :End of NAMES",
            ],
        );
        assert_eq!(count_channel_events(&events), 1, "line {topic_line}");
    }
}

#[test]
fn access_delta_round_trip_restores_state() {
    let mut engine = registered_engine();
    let _ = feed(
        &mut engine,
        &[
            ":me!u@h JOIN #x",
            ":server 353 me = #x :me bob",
            ":server 366 me #x :End of NAMES",
        ],
    );
    let before = engine.channel("#x").unwrap().user("bob").unwrap().clone();

    let events = feed(
        &mut engine,
        &[":op!o@h MODE #x +o bob", ":op!o@h MODE #x -o bob"],
    );

    let access: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Access { granted, mode, .. } => Some((*granted, *mode)),
            _ => None,
        })
        .collect();
    assert_eq!(access, vec![(true, 'o'), (false, 'o')]);

    let after = engine.channel("#x").unwrap().user("bob").unwrap().clone();
    assert_eq!(before, after);
}

#[test]
fn mode_values_follow_advertised_classes() {
    let mut engine = registered_engine();
    let _ = feed(
        &mut engine,
        &[
            ":server 005 me PREFIX=(ov)@+ CHANMODES=beI,k,l,imnpst :are supported by this server",
            ":me!u@h JOIN #x",
        ],
    );

    let _ = feed(
        &mut engine,
        &[":op!o@h MODE #x +kl sekrit 50", ":op!o@h MODE #x -k sekrit"],
    );
    let chan = engine.channel("#x").unwrap();
    assert!(!chan.has_mode('k'));
    assert_eq!(chan.modes().get(&'l'), Some(&Some("50".to_string())));

    // List-class modes are not tracked as channel attributes.
    let _ = feed(&mut engine, &[":op!o@h MODE #x +b *!*@spam.example"]);
    assert!(!engine.channel("#x").unwrap().has_mode('b'));
}

#[test]
fn isupport_partitions_prefix_and_classes() {
    let mut engine = new_engine();
    let _ = feed(
        &mut engine,
        &[":server 005 me PREFIX=(qaohv)~&@%+ CHANMODES=beI,k,l,imnpst :are supported by this server"],
    );

    let caps = engine.caps();
    for &(mode, _) in caps.prefix_modes() {
        assert_eq!(caps.classify(mode), ModeClass::Prefix);
    }
    assert_eq!(caps.classify('b'), ModeClass::List);
    assert_eq!(caps.classify('k'), ModeClass::AlwaysParam);
    assert_eq!(caps.classify('l'), ModeClass::ParamWhenSet);
    assert_eq!(caps.classify('i'), ModeClass::NoParam);
}

#[test]
fn whois_restart_does_not_leak_stale_fields() {
    let mut engine = registered_engine();

    engine.begin_whois("bob");
    let _ = feed(
        &mut engine,
        &[
            ":server 311 me bob olduser oldhost * :Old Name",
            ":server 319 me bob :#old",
        ],
    );

    // The first request never finished; start over.
    engine.begin_whois("bob");
    let events = feed(
        &mut engine,
        &[
            ":server 312 me bob irc.example.com :Example server",
            ":server 318 me bob :End of /WHOIS list",
        ],
    );

    let record = events
        .iter()
        .find_map(|e| match e {
            Event::Whois(record) => Some(record),
            _ => None,
        })
        .expect("whois completion event");

    assert_eq!(record.username, None);
    assert!(record.channels.is_empty());
    assert_eq!(record.server.as_deref(), Some("irc.example.com"));
    assert!(!record.is_updating());
    assert!(!engine.whois_record("bob").unwrap().is_updating());
}

#[test]
fn topic_change_emits_and_clears() {
    let mut engine = registered_engine();
    let _ = feed(&mut engine, &[":me!u@h JOIN #x"]);

    let events = feed(&mut engine, &[":bob!b@h TOPIC #x :fresh topic"]);
    match &events[0] {
        Event::Topic {
            changer,
            channel,
            topic,
        } => {
            assert_eq!(changer.as_ref().unwrap().nick, "bob");
            assert_eq!(channel, "#x");
            assert_eq!(topic.as_deref(), Some("fresh topic"));
        }
        other => panic!("expected Topic event, got {other:?}"),
    }
    assert_eq!(
        engine.channel("#x").unwrap().topic.text(),
        Some("fresh topic")
    );

    let events = feed(&mut engine, &[":bob!b@h TOPIC #x :"]);
    match &events[0] {
        Event::Topic { topic, .. } => assert_eq!(topic, &None),
        other => panic!("expected Topic event, got {other:?}"),
    }
    assert_eq!(engine.channel("#x").unwrap().topic.text(), None);
}

#[test]
fn fragmented_command_stream_survives_decode() {
    // The framing codec owns reassembly; the engine just sees two clean
    // lines. This mirrors the transport-level test in src/line.rs.
    let mut engine = registered_engine();
    let events = feed(&mut engine, &[":serv PING :x", ":serv PONG"]);
    assert!(events.is_empty());
}
