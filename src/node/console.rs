//! Line-oriented front end for a node.
//!
//! Reads `SUB <topic>` and `PUB <topic> <message>` from any async reader
//! (stdin for the binary). The command word is case-insensitive here;
//! `SUB` also registers a handler that prints deliveries for the topic.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::node::{Node, PrintHandler};
use crate::protocol::frame::split_fields;
use crate::utils::Result;

const USAGE: &str = "Invalid command. Usage: SUB <topic> | PUB <topic> <message>";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Subscribe { topic: &'a str },
    Publish { topic: &'a str, message: &'a str },
}

fn parse_command(line: &str) -> std::result::Result<Command<'_>, String> {
    let fields = split_fields(line);
    let [command, topic, rest @ ..] = fields.as_slice() else {
        return Err(USAGE.to_string());
    };

    match command.to_uppercase().as_str() {
        "SUB" => Ok(Command::Subscribe { topic: *topic }),
        "PUB" => match rest {
            [message] => Ok(Command::Publish {
                topic: *topic,
                message: *message,
            }),
            _ => Err("Publish needs a topic and a message. Usage: PUB <topic> <message>".to_string()),
        },
        other => Err(format!("Unknown command: {other}")),
    }
}

/// Run until `input` is exhausted. Fails only when the broker connection
/// or the console itself fails.
pub async fn run<R, W>(node: &Node, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(b"Type commands: (e.g., 'SUB topic', 'PUB topic message')\n")
        .await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match parse_command(&line) {
            Ok(Command::Subscribe { topic }) => {
                node.register_handler(topic, PrintHandler);
                node.subscribe(topic).await?;
                format!("Subscribed to topic: {topic}")
            }
            Ok(Command::Publish { topic, message }) => {
                node.publish(topic, message).await?;
                continue;
            }
            Err(usage) => usage,
        };

        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    Ok(())
}
