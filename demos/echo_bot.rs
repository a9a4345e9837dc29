//! Minimal echo bot
//!
//! Connects to a server, joins a channel once registered, and echoes
//! greetings. Run with:
//!
//! ```text
//! cargo run --example echo_bot
//! ```

use anyhow::Result;
use slirc_client::{Event, Session, SessionConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = SessionConfig {
        server: "irc.libera.chat".to_string(),
        nickname: "slirc_echo".to_string(),
        ..SessionConfig::default()
    };

    let (session, mut events) = Session::connect(config);

    while let Some(event) = events.recv().await {
        match event {
            Event::Registered => {
                println!("✓ Registered as {}", session.my_nick());
                session.join("#slirc-test", None);
            }
            Event::Channel { channel } => {
                let chan = session.channel(&channel).expect("tracked channel");
                println!(
                    "joined {} ({} members, topic: {:?})",
                    channel,
                    chan.nicks().len(),
                    chan.topic.text()
                );
            }
            Event::Message {
                sender,
                channel,
                text,
            } => {
                println!("<{}:{}> {}", channel, sender.nick, text);
                if text.contains("hello") {
                    session.privmsg(&channel, &format!("Hello, {}!", sender.nick));
                }
            }
            Event::Pm { sender, text } => {
                if text == "quit" {
                    session.quit(Some("told to leave"));
                } else {
                    session.privmsg(&sender.nick, "say \"quit\" to stop me");
                }
            }
            Event::Disconnected { error } => {
                println!("disconnected: {error:?}");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
