// Conversation Tests - ordering and the loading placeholder

use crate::conversation::*;
use crate::Error;

#[test]
fn test_messages_keep_insertion_order() {
    let mut conversation = Conversation::new();
    conversation.push_bot("Hi, how can I help you?");
    conversation.push_user("Hello").unwrap();

    let senders: Vec<Sender> = conversation.messages().iter().map(|m| m.sender).collect();
    assert_eq!(senders, vec![Sender::Bot, Sender::User]);
}

#[test]
fn test_reply_fills_placeholder_in_place() {
    let mut conversation = Conversation::new();
    conversation.push_user("Hello").unwrap();
    let index = conversation.begin_reply().unwrap();

    assert!(conversation.has_pending_reply());
    assert!(conversation.messages()[index].is_loading);

    assert_eq!(conversation.complete_reply("Hi there!"), Some(index));
    assert!(!conversation.has_pending_reply());
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.messages()[index].content, "Hi there!");
    assert_eq!(conversation.messages()[index].sender, Sender::Bot);
}

#[test]
fn test_failed_reply_removes_placeholder() {
    let mut conversation = Conversation::new();
    conversation.push_user("Hello").unwrap();
    conversation.begin_reply().unwrap();

    assert_eq!(conversation.fail_reply(), Some(1));
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation.fail_reply(), None);
}

#[test]
fn test_only_one_placeholder_at_a_time() {
    let mut conversation = Conversation::new();
    conversation.push_user("Hello").unwrap();
    conversation.begin_reply().unwrap();

    assert!(matches!(conversation.begin_reply(), Err(Error::SendInProgress)));
    assert!(matches!(conversation.push_user("Again"), Err(Error::SendInProgress)));
    assert!(matches!(
        conversation.inject_history(&[HistoryEntry::new("user", "old")]),
        Err(Error::SendInProgress)
    ));
    assert_eq!(conversation.len(), 2);
}

#[test]
fn test_history_maps_senders_and_skips_junk() {
    let mut conversation = Conversation::new();
    let added = conversation
        .inject_history(&[
            HistoryEntry::new("user", "Hi"),
            HistoryEntry::new("ai", "Hello!"),
            HistoryEntry::new("system", "internal note"),
            HistoryEntry::new("bot", "   "),
            HistoryEntry::new("assistant", "Anything else?"),
        ])
        .unwrap();

    assert_eq!(added, vec![0, 1, 2]);
    let senders: Vec<Sender> = conversation.messages().iter().map(|m| m.sender).collect();
    assert_eq!(senders, vec![Sender::User, Sender::Bot, Sender::Bot]);
}
