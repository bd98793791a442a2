//! Rendering of the sign-in message that carries a magic link.

use chrono::Duration;
use serde::Serialize;

/// Subject line of the sign-in message.
pub const MAGIC_LINK_SUBJECT: &str = "Your Login Link";

/// A message ready to hand to a delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    /// Subject line.
    pub subject: String,

    /// The link itself, for channels that only carry a URL (SMS, push).
    pub link: String,

    /// Plain text body.
    pub text: String,

    /// HTML body.
    pub html: String,
}

/// Render the sign-in message for `link`, valid for `ttl`.
#[must_use]
pub fn render_magic_link(link: &str, ttl: Duration) -> RenderedMessage {
    let minutes = ttl.num_minutes();

    let text = format!(
        "Welcome back!\n\n\
         Open the link below to sign in to your account:\n\n\
         {link}\n\n\
         This link will expire in {minutes} minutes.\n\
         This link can only be used once for security reasons.\n\n\
         If you didn't request this email, you can safely ignore it."
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{MAGIC_LINK_SUBJECT}</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background-color: #f8f9fa; border-radius: 10px; padding: 30px;">
        <h1 style="color: #2A75CF; margin: 0 0 20px 0; font-size: 24px;">Welcome Back!</h1>
        <p>Click the button below to sign in to your account:</p>
        <div style="text-align: center; margin: 30px 0;">
            <a href="{href}" style="display: inline-block; background-color: #2A75CF; color: #ffffff; padding: 14px 28px; text-decoration: none; border-radius: 8px; font-weight: 600;">Sign In to Your Account</a>
        </div>
        <p style="font-size: 14px; color: #666;">On a computer? Copy this link to your mobile device:</p>
        <p style="font-size: 12px; color: #666; word-break: break-all; font-family: monospace;">{href}</p>
        <p style="font-size: 14px; color: #666;"><strong>This link will expire in {minutes} minutes</strong></p>
        <p style="font-size: 14px; color: #666;">This link can only be used once for security reasons</p>
    </div>
    <p style="text-align: center; color: #999; font-size: 12px;">If you didn't request this email, you can safely ignore it.</p>
</body>
</html>
"#,
        href = escape_html(link),
    );

    RenderedMessage {
        subject: MAGIC_LINK_SUBJECT.to_string(),
        link: link.to_string(),
        text,
        html,
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_link_and_expiry() {
        let link = "onboardingapp://auth/verify?token=abc123";
        let message = render_magic_link(link, Duration::minutes(15));

        assert_eq!(message.subject, "Your Login Link");
        assert_eq!(message.link, link);
        assert!(message.text.contains(link));
        assert!(message.text.contains("expire in 15 minutes"));
        assert!(message.html.contains("href=\"onboardingapp://auth/verify?token=abc123\""));
        assert!(message.html.contains("only be used once"));
    }

    #[test]
    fn test_html_escapes_link() {
        let message = render_magic_link("https://x.test/?a=1&b=\"2\"", Duration::minutes(5));
        assert!(message.html.contains("a=1&amp;b=&quot;2&quot;"));
        assert!(!message.html.contains("b=\"2\""));
    }
}
