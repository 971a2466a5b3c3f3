use crate::domain::ports::{ListRow, Messenger, ReplyButton};
use crate::domain::text::truncate;
use tracing::warn;

pub const LIST_HEADER_MAX: usize = 60;
pub const BODY_MAX: usize = 1024;
pub const LIST_BUTTON_MAX: usize = 20;
pub const ROW_TITLE_MAX: usize = 24;
pub const ROW_DESCRIPTION_MAX: usize = 72;
pub const BUTTON_TITLE_MAX: usize = 20;
pub const MAX_LIST_ROWS: usize = 10;
pub const MAX_BUTTONS: usize = 3;

/// One outbound message, already cut to the channel's limits.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    List {
        header: String,
        body: String,
        button_label: String,
        rows: Vec<ListRow>,
    },
    Buttons {
        body: String,
        buttons: Vec<ReplyButton>,
    },
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Reply::Text(body.into())
    }

    pub fn list(header: &str, body: &str, button_label: &str, rows: Vec<ListRow>) -> Self {
        Reply::List {
            header: truncate(header, LIST_HEADER_MAX),
            body: truncate(body, BODY_MAX),
            button_label: truncate(button_label, LIST_BUTTON_MAX),
            rows: rows
                .into_iter()
                .take(MAX_LIST_ROWS)
                .map(|r| ListRow {
                    id: r.id,
                    title: truncate(&r.title, ROW_TITLE_MAX),
                    description: truncate(&r.description, ROW_DESCRIPTION_MAX),
                })
                .collect(),
        }
    }

    pub fn buttons(body: &str, buttons: Vec<ReplyButton>) -> Self {
        Reply::Buttons {
            body: truncate(body, BODY_MAX),
            buttons: buttons
                .into_iter()
                .take(MAX_BUTTONS)
                .map(|b| ReplyButton {
                    id: b.id,
                    title: truncate(&b.title, BUTTON_TITLE_MAX),
                })
                .collect(),
        }
    }

    /// Sends through the messenger; failures are logged and reported as `false`.
    pub async fn send(&self, messenger: &dyn Messenger, to: &str) -> bool {
        let ok = match self {
            Reply::Text(body) => messenger.send_text(to, body).await,
            Reply::List {
                header,
                body,
                button_label,
                rows,
            } => {
                if rows.is_empty() {
                    false
                } else {
                    messenger
                        .send_list(to, header, body, button_label, rows)
                        .await
                }
            }
            Reply::Buttons { body, buttons } => {
                if buttons.is_empty() {
                    false
                } else {
                    messenger.send_buttons(to, body, buttons).await
                }
            }
        };
        if !ok {
            warn!(identity = %to, "Outbound message was not delivered");
        }
        ok
    }
}

pub fn row(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> ListRow {
    ListRow {
        id: id.into(),
        title: title.into(),
        description: description.into(),
    }
}

pub fn button(id: impl Into<String>, title: impl Into<String>) -> ReplyButton {
    ReplyButton {
        id: id.into(),
        title: title.into(),
    }
}
