use kaiwa_cli::app::restored_attachment;
use kaiwa_core::{Message, Session};

#[test]
fn test_loaded_context_is_reported() {
    let session = Session::with_messages(vec![
        Message::system("You are a data analysis assistant.\n\n---\nrows\n---"),
        Message::user("How many rows?"),
        Message::assistant("One."),
    ]);
    assert!(restored_attachment(&session).is_some());
}

#[test]
fn test_plain_transcript_has_no_attachment() {
    let session = Session::with_messages(vec![Message::user("Hi"), Message::assistant("Hello")]);
    assert_eq!(restored_attachment(&session), None);
}
