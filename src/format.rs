use crate::types::Record;

/// Escape text for Telegram's HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render the notification for one newly seen OTP.
///
/// Every upstream-provided field is escaped; `country` comes from the
/// static lookup table and `footer` is trusted markup from configuration.
#[must_use]
pub fn render_otp_message(
    record: &Record,
    otp: &str,
    country: &str,
    footer: Option<&str>,
) -> String {
    let mut text = format!(
        "✨ <b>OTP Received</b> ✨\n\n\
         ⏰ <b>Time:</b> {time}\n\
         📞 <b>Number:</b> {number}\n\
         🌍 <b>Country:</b> {country}\n\
         🔧 <b>Service:</b> {service}\n\
         🔐 <b>OTP Code:</b> <code>{otp}</code>\n\
         📝 <b>Msg:</b> <i>{message}</i>",
        time = escape_html(&record.timestamp),
        number = escape_html(&record.source_number),
        service = escape_html(&record.service),
        otp = escape_html(otp),
        message = escape_html(&record.message_body),
    );

    if let Some(footer) = footer.filter(|f| !f.is_empty()) {
        text.push_str("\n\n");
        text.push_str(footer);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            timestamp: "2025-05-01 10:00:00".into(),
            source_number: "8801712345678".into(),
            service: "<Acme & Co>".into(),
            message_body: "Your code is 123-456".into(),
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn message_contains_all_fields() {
        let text = render_otp_message(&record(), "123-456", "🇧🇩 Bangladesh", None);

        assert!(text.starts_with("✨ <b>OTP Received</b> ✨"));
        assert!(text.contains("<b>Number:</b> 8801712345678"));
        assert!(text.contains("<b>Country:</b> 🇧🇩 Bangladesh"));
        assert!(text.contains("<b>Service:</b> &lt;Acme &amp; Co&gt;"));
        assert!(text.contains("<code>123-456</code>"));
        assert!(text.ends_with("<i>Your code is 123-456</i>"));
    }

    #[test]
    fn footer_is_appended() {
        let text = render_otp_message(&record(), "123-456", "x", Some("<b>Relay</b>"));
        assert!(text.ends_with("</i>\n\n<b>Relay</b>"));
    }

    #[test]
    fn empty_footer_is_ignored() {
        let text = render_otp_message(&record(), "123-456", "x", Some(""));
        assert!(text.ends_with("</i>"));
    }
}
