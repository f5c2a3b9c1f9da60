//! Browser widget page.
//!
//! The page is self-contained (no CDN assets): markup, stylesheet and script
//! are inlined. The script mirrors [`crate::widget`]: the same fixed failure
//! texts are injected from the Rust constants, the typing indicator is a
//! single element keyed by id, and requests go to the same-origin
//! `/api/chat` and `/api/upload` routes served by [`crate::server`].

use serde::Serialize;

use crate::config::{DEFAULT_CHAT_PATH, DEFAULT_UPLOAD_PATH, WidgetConfig};
use crate::widget::{CHAT_ERROR_MESSAGE, CONNECTION_ERROR_MESSAGE, UPLOAD_ERROR_MESSAGE};

/// Values handed to the page script as `window.CHAT_WIDGET`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptConfig<'a> {
    chat_url: &'a str,
    upload_url: &'a str,
    max_entries: usize,
    messages: ScriptMessages<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptMessages<'a> {
    chat_error: &'a str,
    connection_error: &'a str,
    upload_error: &'a str,
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn script_config(config: &WidgetConfig) -> String {
    let value = ScriptConfig {
        chat_url: DEFAULT_CHAT_PATH,
        upload_url: DEFAULT_UPLOAD_PATH,
        max_entries: config.max_entries.unwrap_or(0),
        messages: ScriptMessages {
            chat_error: CHAT_ERROR_MESSAGE,
            connection_error: CONNECTION_ERROR_MESSAGE,
            upload_error: UPLOAD_ERROR_MESSAGE,
        },
    };
    // Serializing plain strings and integers cannot fail.
    serde_json::to_string(&value)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/")
}

/// Render the full widget page.
pub fn render_page(config: &WidgetConfig) -> String {
    let title = escape_html(&config.title);
    let greeting = config
        .greeting()
        .map(|g| format!(r#"<div class="message bot-message">{}</div>"#, escape_html(g)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>{WIDGET_STYLE}</style>
</head>
<body>
    <div class="chat-container">
        <header class="chat-header">{title}</header>
        <div class="chat-messages" id="chat-messages">{greeting}</div>
        <div class="chat-input">
            <input type="text" id="message-input" placeholder="Type your message here..." autocomplete="off">
            <button id="send-button" type="button">Send</button>
            <button id="upload-button" type="button" class="upload-button">Upload File</button>
            <input type="file" id="file-input">
        </div>
    </div>
    <script>window.CHAT_WIDGET = {config};</script>
    <script>{WIDGET_SCRIPT}</script>
</body>
</html>"#,
        config = script_config(config),
    )
}

const WIDGET_STYLE: &str = r"
:root {
    --accent: #1f3a5f;
    --accent-hover: #15283f;
    --upload: #2d7dd2;
    --bubble-user: #dcebfb;
    --bubble-bot: #ffffff;
    --surface: #f4f6f9;
}
* { box-sizing: border-box; }
body {
    margin: 0;
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
    background: var(--surface);
    color: #222;
}
.chat-container {
    display: flex;
    flex-direction: column;
    max-width: 760px;
    height: 82vh;
    margin: 24px auto;
    background: #fff;
    border-radius: 12px;
    box-shadow: 0 6px 20px rgba(0, 0, 0, 0.08);
    overflow: hidden;
}
.chat-header {
    padding: 14px 20px;
    background: var(--accent);
    color: #fff;
    font-size: 1.1rem;
    font-weight: 600;
}
.chat-messages {
    flex: 1;
    overflow-y: auto;
    padding: 18px;
    background: #fafbfc;
}
.message {
    max-width: 72%;
    margin-bottom: 12px;
    padding: 10px 14px;
    border-radius: 16px;
    line-height: 1.45;
    white-space: pre-wrap;
    word-wrap: break-word;
}
.user-message {
    margin-left: auto;
    background: var(--bubble-user);
    border-bottom-right-radius: 4px;
}
.bot-message {
    margin-right: auto;
    background: var(--bubble-bot);
    border-bottom-left-radius: 4px;
    box-shadow: 0 1px 4px rgba(0, 0, 0, 0.06);
}
.typing-indicator {
    display: inline-block;
    margin-bottom: 12px;
    padding: 10px 14px;
    background: var(--bubble-bot);
    border-radius: 16px;
}
.typing-dot {
    display: inline-block;
    width: 7px;
    height: 7px;
    margin: 0 2px;
    border-radius: 50%;
    background: #9aa3ad;
    animation: typing-bounce 1.2s infinite ease-in-out;
}
.typing-dot:nth-child(2) { animation-delay: 0.15s; }
.typing-dot:nth-child(3) { animation-delay: 0.3s; }
@keyframes typing-bounce {
    0%, 60%, 100% { transform: translateY(0); }
    30% { transform: translateY(-4px); }
}
.chat-input {
    display: flex;
    gap: 8px;
    padding: 12px;
    border-top: 1px solid #eceff3;
}
#message-input {
    flex: 1;
    padding: 10px 14px;
    border: 1px solid #d5dae0;
    border-radius: 20px;
    font-size: 0.95rem;
    outline: none;
}
#message-input:focus { border-color: var(--accent); }
.chat-input button {
    padding: 0 18px;
    border: none;
    border-radius: 20px;
    background: var(--accent);
    color: #fff;
    cursor: pointer;
}
.chat-input button:hover { background: var(--accent-hover); }
.chat-input .upload-button { background: var(--upload); }
#file-input { display: none; }
";

const WIDGET_SCRIPT: &str = r"
(function () {
    const cfg = window.CHAT_WIDGET;
    const chatMessages = document.getElementById('chat-messages');
    const messageInput = document.getElementById('message-input');
    const sendButton = document.getElementById('send-button');
    const uploadButton = document.getElementById('upload-button');
    const fileInput = document.getElementById('file-input');

    function randomBase36(length) {
        let out = '';
        const bytes = new Uint8Array(length * 2);
        while (out.length < length) {
            crypto.getRandomValues(bytes);
            for (const b of bytes) {
                // 252 is the largest multiple of 36 below 256.
                if (b < 252 && out.length < length) {
                    out += (b % 36).toString(36);
                }
            }
        }
        return out;
    }

    const userId = 'user_' + randomBase36(9);

    function scrollToLatest() {
        chatMessages.scrollTop = chatMessages.scrollHeight;
    }

    function appendEntry(text, origin) {
        const entry = document.createElement('div');
        entry.className = 'message ' + origin + '-message';
        entry.textContent = text;
        // Keep the typing indicator below the newest entry.
        chatMessages.insertBefore(entry, document.getElementById('typing-indicator'));
        if (cfg.maxEntries > 0) {
            const entries = chatMessages.querySelectorAll('.message');
            for (let i = 0; i < entries.length - cfg.maxEntries; i++) {
                entries[i].remove();
            }
        }
        scrollToLatest();
    }

    function showPendingIndicator() {
        if (document.getElementById('typing-indicator')) {
            return;
        }
        const indicator = document.createElement('div');
        indicator.id = 'typing-indicator';
        indicator.className = 'typing-indicator';
        for (let i = 0; i < 3; i++) {
            const dot = document.createElement('span');
            dot.className = 'typing-dot';
            indicator.appendChild(dot);
        }
        chatMessages.appendChild(indicator);
        scrollToLatest();
    }

    function hidePendingIndicator() {
        const indicator = document.getElementById('typing-indicator');
        if (indicator) {
            indicator.remove();
        }
    }

    async function sendMessage() {
        const message = messageInput.value.trim();
        if (!message) {
            return;
        }
        appendEntry(message, 'user');
        messageInput.value = '';
        showPendingIndicator();

        try {
            const response = await fetch(cfg.chatUrl, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ user_id: userId, message: message }),
            });
            const data = await response.json();
            hidePendingIndicator();
            if (data.status === 'success') {
                appendEntry(data.response ?? '', 'bot');
            } else {
                console.error('Chat endpoint reported status:', data.status);
                appendEntry(cfg.messages.chatError, 'bot');
            }
        } catch (error) {
            console.error('Chat request failed:', error);
            hidePendingIndicator();
            appendEntry(cfg.messages.connectionError, 'bot');
        }
    }

    async function uploadFile(file) {
        appendEntry('Uploading ' + file.name + '...', 'user');
        showPendingIndicator();

        const form = new FormData();
        form.append('file', file);
        form.append('user_id', userId);

        try {
            const response = await fetch(cfg.uploadUrl, { method: 'POST', body: form });
            const data = await response.json();
            hidePendingIndicator();
            if (data.message) {
                appendEntry(data.message, 'bot');
            } else if (data.error) {
                appendEntry(data.error, 'bot');
            } else {
                console.error('Upload reply carried neither message nor error:', data);
                appendEntry(cfg.messages.uploadError, 'bot');
            }
        } catch (error) {
            console.error('Upload failed:', error);
            hidePendingIndicator();
            appendEntry(cfg.messages.uploadError, 'bot');
        }
    }

    sendButton.addEventListener('click', sendMessage);
    messageInput.addEventListener('keydown', (event) => {
        if (event.key === 'Enter' && !event.shiftKey) {
            event.preventDefault();
            sendMessage();
        }
    });
    uploadButton.addEventListener('click', () => fileInput.click());
    fileInput.addEventListener('change', () => {
        if (fileInput.files.length > 0) {
            uploadFile(fileInput.files[0]);
        }
        fileInput.value = '';
    });
})();
";
