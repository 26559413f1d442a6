//! Reply and push texts, English followed by Japanese.

use crate::db::types::RoomTypes;
use ur_client::RoomListing;

pub fn welcome() -> String {
    "Thank you for following us!\n\n\
     To subscribe to UR property notifications, send me the exact name of the property \
     you're interested in. I will notify you when vacancies become available. \
     You can subscribe to one property at a time.\n\
     Send \"help\" to see all commands.\n\n\
     ご利用ありがとうございます！\n\n\
     UR物件の空室通知を受け取るには、ご希望の物件の正確な名称を送信してください。\
     空室が発生した際にお知らせいたします。一度に1物件のみの通知が可能です。\n\
     「ヘルプ」と送信するとコマンド一覧を表示します。"
        .to_string()
}

pub fn help() -> String {
    "Available commands:\n\
     • <name>: subscribe to a property\n\
     • <name>:2LDK&3LDK: subscribe to selected room types only\n\
     • -<name>: unsubscribe\n\
     • list: show your subscriptions\n\
     • help: show this message\n\n\
     コマンド一覧:\n\
     • 物件名: 物件の空室通知を登録\n\
     • 物件名:2LDK&3LDK: 指定した間取りのみ通知\n\
     • -物件名: 登録を解除\n\
     • 確認 / リスト: 登録中の物件を表示\n\
     • ヘルプ: このメッセージを表示"
        .to_string()
}

pub fn subscribe_success(unit_name: &str, room_types: &RoomTypes) -> String {
    if room_types.is_empty() {
        format!(
            "You have successfully subscribed to UR {unit_name}. \
             You will receive notifications when vacancies become available.\n\n\
             UR{unit_name}への登録が完了しました。空室が発生した際にお知らせいたします。"
        )
    } else {
        format!(
            "You have successfully subscribed to UR {unit_name} (room types: {room_types}). \
             You will receive notifications when these room types become available.\n\n\
             UR{unit_name}（間取り: {room_types}）への登録が完了しました。\
             該当する空室が発生した際にお知らせいたします。"
        )
    }
}

pub fn unsubscribe_success(unit_name: &str) -> String {
    format!(
        "You have successfully unsubscribed from UR {unit_name}. \
         You will no longer receive notifications for this property.\n\n\
         UR{unit_name}の通知登録を解除しました。これ以降、この物件の空室通知は送信されません。"
    )
}

pub fn not_subscribed(unit_name: &str) -> String {
    format!(
        "You are not subscribed to UR {unit_name}.\n\n\
         UR{unit_name}は登録されていません。"
    )
}

pub fn invalid_unit_name() -> String {
    "Invalid unit name. Please check the unit name and try again.\n\n\
     物件名が正しくありません。正確な物件名を確認の上、再度送信してください。"
        .to_string()
}

pub fn limit_reached() -> String {
    "You can only subscribe to one property at a time. \
     Unsubscribe first by sending \"-<name>\".\n\n\
     一度に登録できる物件は1件のみです。「-物件名」を送信して現在の登録を解除してください。"
        .to_string()
}

pub fn database_error() -> String {
    "An error occurred while processing your request. Please try again later.\n\n\
     処理中にエラーが発生しました。しばらくしてから再度お試しください。"
        .to_string()
}

pub fn unknown_command() -> String {
    "I don't understand that command. Type \"help\" to see available commands.\n\n\
     コマンドが認識できませんでした。「ヘルプ」と送信してください。"
        .to_string()
}

/// List of active subscriptions as `(unit name, room types)`
pub fn subscription_list(entries: &[(String, RoomTypes)]) -> String {
    if entries.is_empty() {
        return "You have no active subscriptions.\n\n現在登録中の物件はありません。".to_string();
    }

    let mut lines = String::from("Your subscriptions / 登録中の物件:\n");
    for (unit_name, room_types) in entries {
        if room_types.is_empty() {
            lines.push_str(&format!("• {unit_name}\n"));
        } else {
            lines.push_str(&format!("• {unit_name} ({room_types})\n"));
        }
    }
    lines.trim_end().to_string()
}

/// One-shot vacancy push. `rooms` are the listed rooms the subscriber
/// cares about; the summary-shaped response has none.
pub fn vacancy_notification(
    unit_name: &str,
    count: u32,
    room_types: &[&str],
    rooms: &[&RoomListing],
    url: Option<&str>,
) -> String {
    let mut text = format!("🔔 UR {unit_name}: {count} vacancies available!\n");
    if !room_types.is_empty() {
        text.push_str(&format!("Room types: {}\n", room_types.join(", ")));
    }
    if !rooms.is_empty() {
        text.push('\n');
        for room in rooms {
            text.push_str(&room_line(room));
        }
    }
    if let Some(url) = url {
        text.push_str(&format!("{url}\n"));
    }
    text.push_str(
        "Vacancies are first-come-first-served, please apply immediately. \
         Your subscription has been removed; send the name again to keep watching.\n\n",
    );

    text.push_str(&format!("🔔 UR{unit_name}に{count}件の空室があります！\n"));
    if !room_types.is_empty() {
        text.push_str(&format!("間取り: {}\n", room_types.join("、")));
    }
    text.push_str(
        "空室は先着順です。お早めにお申し込みください。\
         通知登録は解除されました。引き続き通知を希望する場合は物件名を再送信してください。",
    );
    text
}

fn room_line(room: &RoomListing) -> String {
    let mut line = format!(
        "🏠 {} {} / 🏢 {} / 💰 {}\n",
        room.name, room.room_type, room.floor, room.rent_normal
    );
    if !room.detail_link.is_empty() {
        line.push_str(&format!("🔗 {}\n", room.detail_link));
    }
    line.push('\n');
    line
}
