//! Map grammers tl types to domain entities.
//!
//! Extracts MessageRecord (text + full keyboard grids), BotInfo and
//! CallbackAck from raw responses. Grid order is preserved exactly as sent.

use crate::domain::{
    BotInfo, ButtonAction, ButtonRef, CallbackAck, MediaKind, MessageRecord, RegisteredCommand,
};
use chrono::{TimeZone, Utc};
use grammers_client::tl;

/// Map a raw message to a MessageRecord. Empty and service messages carry no
/// explorable surface and map to None.
pub fn message_to_record(msg: &tl::enums::Message) -> Option<MessageRecord> {
    let m = match msg {
        tl::enums::Message::Message(m) => m,
        tl::enums::Message::Empty(_) | tl::enums::Message::Service(_) => return None,
    };

    let (inline_grid, reply_grid) = match m.reply_markup.as_ref() {
        Some(tl::enums::ReplyMarkup::ReplyInlineMarkup(mk)) => (grid(&mk.rows), Vec::new()),
        Some(tl::enums::ReplyMarkup::ReplyKeyboardMarkup(mk)) => (Vec::new(), grid(&mk.rows)),
        _ => (Vec::new(), Vec::new()),
    };

    let media_kind = m.media.as_ref().map(media_kind);

    Some(MessageRecord {
        id: m.id,
        text: m.message.clone(),
        timestamp: Utc.timestamp_opt(m.date as i64, 0).single(),
        inline_grid,
        reply_grid,
        has_media: media_kind.is_some(),
        media_kind,
        edited: m.edit_date.is_some(),
        outgoing: m.out,
    })
}

fn grid(rows: &[tl::enums::KeyboardButtonRow]) -> Vec<Vec<ButtonRef>> {
    rows.iter()
        .map(|tl::enums::KeyboardButtonRow::Row(row)| {
            row.buttons.iter().map(button_to_ref).collect()
        })
        .collect()
}

/// Classify one keyboard button. Types this tool cannot drive are kept in the
/// blueprint as Unrecognized with their constructor name.
fn button_to_ref(button: &tl::enums::KeyboardButton) -> ButtonRef {
    use tl::enums::KeyboardButton as Kb;
    match button {
        Kb::Callback(b) => ButtonRef {
            label: b.text.clone(),
            action: ButtonAction::Callback {
                data: String::from_utf8_lossy(&b.data).into_owned(),
            },
        },
        Kb::Url(b) => ButtonRef {
            label: b.text.clone(),
            action: ButtonAction::Url { url: b.url.clone() },
        },
        Kb::SwitchInline(b) => ButtonRef {
            label: b.text.clone(),
            action: ButtonAction::SwitchInline {
                query: b.query.clone(),
            },
        },
        Kb::RequestPhone(b) => ButtonRef {
            label: b.text.clone(),
            action: ButtonAction::SharePhone,
        },
        Kb::RequestGeoLocation(b) => ButtonRef {
            label: b.text.clone(),
            action: ButtonAction::ShareGeo,
        },
        Kb::Button(b) => ButtonRef {
            label: b.text.clone(),
            action: ButtonAction::Text,
        },
        other => ButtonRef {
            label: button_text(other).to_string(),
            action: ButtonAction::Unrecognized {
                type_name: constructor_name(other),
            },
        },
    }
}

/// Label of the less common button constructors.
fn button_text(button: &tl::enums::KeyboardButton) -> &str {
    use tl::enums::KeyboardButton as Kb;
    match button {
        Kb::Game(b) => &b.text,
        Kb::Buy(b) => &b.text,
        Kb::UrlAuth(b) => &b.text,
        Kb::RequestPoll(b) => &b.text,
        Kb::UserProfile(b) => &b.text,
        Kb::WebView(b) => &b.text,
        Kb::SimpleWebView(b) => &b.text,
        Kb::RequestPeer(b) => &b.text,
        Kb::Copy(b) => &b.text,
        _ => "",
    }
}

/// Constructor name from the Debug rendering, e.g. "Game" for a game button.
fn constructor_name(button: &tl::enums::KeyboardButton) -> String {
    let debug = format!("{:?}", button);
    debug
        .split(|c: char| c == '(' || c == '{' || c.is_whitespace())
        .next()
        .unwrap_or("Unknown")
        .to_string()
}

fn media_kind(media: &tl::enums::MessageMedia) -> MediaKind {
    use tl::enums::MessageMedia as Mm;
    match media {
        Mm::Photo(_) => MediaKind::Photo,
        Mm::Document(_) => MediaKind::Document,
        Mm::WebPage(_) => MediaKind::WebPage,
        Mm::Contact(_) => MediaKind::Contact,
        Mm::Geo(_) | Mm::GeoLive(_) => MediaKind::Geo,
        Mm::Poll(_) => MediaKind::Poll,
        Mm::Dice(_) => MediaKind::Dice,
        Mm::Venue(_) => MediaKind::Venue,
        Mm::Game(_) => MediaKind::Game,
        Mm::Invoice(_) => MediaKind::Invoice,
        _ => MediaKind::Unsupported,
    }
}

/// Build BotInfo out of a users.getFullUser response. Registered commands are
/// normalized to carry their leading slash.
pub fn full_user_to_bot_info(full: &tl::types::users::UserFull) -> BotInfo {
    let mut info = BotInfo::default();

    for user in &full.users {
        if let tl::enums::User::User(u) = user {
            info.id = u.id;
            info.is_bot = u.bot;
            info.first_name = u.first_name.clone().unwrap_or_default();
            info.username = u.username.clone().unwrap_or_default();
        }
    }

    let tl::enums::UserFull::Full(fu) = &full.full_user;
    info.description = fu.about.clone().unwrap_or_default();
    if let Some(tl::enums::BotInfo::Info(bi)) = fu.bot_info.as_ref() {
        if info.description.is_empty() {
            info.description = bi.description.clone().unwrap_or_default();
        }
        if let Some(commands) = bi.commands.as_ref() {
            info.registered_commands = commands
                .iter()
                .map(|tl::enums::BotCommand::Command(c)| RegisteredCommand {
                    command: normalize_command(&c.command),
                    description: c.description.clone(),
                })
                .collect();
        }
    }
    info
}

/// Command strings come off the wire without the slash.
fn normalize_command(command: &str) -> String {
    if command.starts_with('/') {
        command.to_string()
    } else {
        format!("/{}", command)
    }
}

/// Map a callback-answer response to the domain ack.
pub fn callback_answer_to_ack(answer: &tl::enums::messages::BotCallbackAnswer) -> CallbackAck {
    let tl::enums::messages::BotCallbackAnswer::Answer(a) = answer;
    CallbackAck {
        message: a.message.clone(),
        alert: a.alert,
        url: a.url.clone(),
    }
}
