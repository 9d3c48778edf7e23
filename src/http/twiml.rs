//! Call-setup documents returned to the carrier's voice webhook

use crate::config::{StreamMode, WebhookConfig};

/// Document instructing the carrier to stream call audio to
/// `wss://{host}{stream_path}`
pub fn stream_document(webhook: &WebhookConfig, host: &str) -> String {
    let url = format!("wss://{}{}", escape_xml(host), escape_xml(&webhook.stream_path));
    let greeting = escape_xml(&webhook.greeting);

    match webhook.mode {
        StreamMode::Connect => format!(
            "<Response>\
             <Say>{greeting}</Say>\
             <Connect><Stream url=\"{url}\" /></Connect>\
             </Response>"
        ),
        StreamMode::Start => format!(
            "<Response>\
             <Start><Stream url=\"{url}\" /></Start>\
             <Say>{greeting}</Say>\
             <Pause length=\"{}\" />\
             </Response>",
            webhook.pause_secs
        ),
    }
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_document() {
        let doc = stream_document(&WebhookConfig::default(), "abc.ngrok.app");
        assert!(doc.contains("<Connect><Stream url=\"wss://abc.ngrok.app/media\" /></Connect>"));
        assert!(doc.contains("<Say>Speak to see your audio transcribed in the console.</Say>"));
        assert!(!doc.contains("<Pause"));
    }

    #[test]
    fn test_start_document_keeps_call_open() {
        let webhook = WebhookConfig {
            mode: StreamMode::Start,
            pause_secs: 30,
            ..Default::default()
        };
        let doc = stream_document(&webhook, "example.com");
        assert!(doc.contains("<Start><Stream url=\"wss://example.com/media\" /></Start>"));
        assert!(doc.contains("<Pause length=\"30\" />"));
    }

    #[test]
    fn test_greeting_is_escaped() {
        let webhook = WebhookConfig {
            greeting: "Tom & Jerry <say>".to_string(),
            ..Default::default()
        };
        let doc = stream_document(&webhook, "example.com");
        assert!(doc.contains("Tom &amp; Jerry &lt;say&gt;"));
    }
}
