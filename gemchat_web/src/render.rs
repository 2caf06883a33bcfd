use gemchat_core::util::escape_html;
use gemchat_core::{ChatView, MessageEntry};
use std::fmt::Write;

const STYLE: &str = r"
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
.message { padding: 0.6rem 0.9rem; margin: 0.4rem 0; border-radius: 0.5rem; white-space: pre-wrap; }
.user { background: #dbeafe; margin-left: 4rem; }
.bot { background: #f3f4f6; margin-right: 4rem; }
.error { background: #fee2e2; color: #991b1b; padding: 0.6rem 0.9rem; border-radius: 0.5rem; }
form { display: flex; gap: 0.5rem; margin-top: 1rem; }
form.chat input[type=text] { flex: 1; padding: 0.5rem; }
";

/// Render the chat page for `view`.
///
/// Questions are stored already escaped and are emitted as-is; answers are
/// escaped here.
#[must_use]
pub fn render_page(view: &ChatView) -> String {
    let mut html = String::with_capacity(1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>Gemini Chat</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<h1>Gemini Chat</h1>\n<div id=\"messages\">\n");

    for entry in &view.messages {
        // Writing to a String cannot fail.
        let _ = match entry {
            MessageEntry::Question { question } => writeln!(
                html,
                "<div class=\"message user\"><strong>You:</strong> {question}</div>"
            ),
            MessageEntry::Answer { answer } => writeln!(
                html,
                "<div class=\"message bot\"><strong>Gemini:</strong> {}</div>",
                escape_html(answer)
            ),
        };
    }
    html.push_str("</div>\n");

    if let Some(error) = &view.error {
        let _ = writeln!(html, "<p class=\"error\">{}</p>", escape_html(error));
    }

    html.push_str(
        "<form class=\"chat\" method=\"post\" action=\"/\">\n\
         <input type=\"text\" name=\"message\" placeholder=\"Type your message\" autofocus>\n\
         <button type=\"submit\">Send</button>\n</form>\n\
         <form method=\"post\" action=\"/reset\">\n\
         <button type=\"submit\">Clear conversation</button>\n</form>\n\
         </body>\n</html>\n",
    );
    html
}
