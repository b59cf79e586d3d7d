/// Receives messages delivered to a node for one topic.
///
/// Any `Fn(&str)` closure is a handler; it gets the message body only.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, topic: &str, message: &str);
}

impl<F> MessageHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn handle(&self, _topic: &str, message: &str) {
        self(message)
    }
}

/// Prints every message to stdout as `[topic] Received: message`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintHandler;

impl MessageHandler for PrintHandler {
    fn handle(&self, topic: &str, message: &str) {
        println!("{}", format_delivery(topic, message));
    }
}

pub(crate) fn format_delivery(topic: &str, message: &str) -> String {
    format!("[{topic}] Received: {message}")
}
