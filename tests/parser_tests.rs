//! Integration tests for MIME decoding, reply-chain reconstruction, and batch decoding.

use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;

use quotechain::batch;
use quotechain::config::Config;
use quotechain::model::message::DECODE_FAILURE_SENTINEL;
use quotechain::parser::content::{decode_base64, decode_quoted_printable};
use quotechain::parser::header::decode_raw_bytes;
use quotechain::parser::signature::strip_signature;
use quotechain::thread::assemble_thread;
use quotechain::{clean_chat_markup, decode_mime_body, parse_quote_chain, ParsedEmailMessage};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_fixture(name: &str) -> String {
    let bytes = std::fs::read(fixture(name)).unwrap();
    decode_raw_bytes(&bytes)
}

// ─── Test 1: HTML-only alternative → stripped text ──────────────────

#[test]
fn test_html_only_fixture() {
    let body = decode_mime_body(&read_fixture("html_only.eml"));
    assert_eq!(body.as_str(), "Hello\n\nWorld");
    assert!(!body.as_str().contains("margin"));
}

// ─── Test 2: Undeclared multipart is recovered from the body ────────

#[test]
fn test_sniffed_boundary_fixture() {
    let body = decode_mime_body(&read_fixture("sniffed_boundary.eml"));
    assert_eq!(body.as_str(), "Recovered plain part.");
}

// ─── Test 3: ISO-2022-JP body and encoded-word headers ──────────────

#[test]
fn test_iso2022jp_fixture() {
    let thread = assemble_thread(&read_fixture("iso2022jp_base64.eml"), &Config::default());
    assert_eq!(
        thread.body.as_str(),
        "お世話になっております。\n会議は明日の10時からです。"
    );
    assert_eq!(thread.envelope.subject, "会議の件");
    assert_eq!(thread.envelope.from.display_name, "田中");
    assert_eq!(thread.envelope.from.address, "tanaka@example.jp");

    assert_eq!(thread.messages.len(), 1);
    let latest = thread.latest().unwrap();
    assert_eq!(latest.sender, "田中");
    assert!(latest.is_latest);
}

// ─── Test 4: Nested multipart picks the plain part ──────────────────

#[test]
fn test_nested_mixed_fixture() {
    let raw = read_fixture("nested_mixed.eml");
    let body = decode_mime_body(&raw);
    assert!(
        body.as_str()
            .starts_with("Please see the attached report.\nThe numbers look good—finally."),
        "unexpected body: {body}"
    );
    assert!(!body.as_str().contains("<div>"));
    assert!(!body.as_str().contains("JVBERi0"));

    let thread = assemble_thread(&raw, &Config::default());
    assert_eq!(thread.envelope.subject, "Monthly report");
    assert_eq!(thread.messages.len(), 2);
    assert_eq!(thread.messages[0].sender, "Boss");
    assert_eq!(thread.messages[0].email_address, "boss@example.com");
    assert_eq!(thread.messages[0].body, "Where is the report?");
    assert_eq!(thread.messages[1].sender, "Reporter");
    assert_eq!(
        thread.messages[1].body,
        "Please see the attached report.\nThe numbers look good—finally."
    );
}

// ─── Test 5: Quoted-printable Japanese thread, four messages ────────

#[test]
fn test_japanese_thread_fixture() {
    let thread = assemble_thread(&read_fixture("japanese_thread_qp.eml"), &Config::default());
    assert_eq!(thread.envelope.subject, "Re: 資料の件");

    let senders: Vec<&str> = thread.messages.iter().map(|m| m.sender.as_str()).collect();
    assert_eq!(senders, ["佐藤一郎", "鈴木花子", "田中太郎", "山田花子"]);

    let oldest = &thread.messages[0];
    assert_eq!(
        oldest.body,
        "佐藤です。\n資料の送付をお願いします。\n期限は金曜日です。"
    );
    assert_eq!(
        oldest.timestamp.unwrap().to_rfc3339(),
        "2026-02-17T00:30:00+00:00"
    );

    assert_eq!(thread.messages[1].body, "資料を添付しました。\nご確認ください。");
    assert_eq!(
        thread.messages[1].timestamp.unwrap().to_rfc3339(),
        "2026-02-18T01:00:00+00:00"
    );
    assert_eq!(thread.messages[2].body, "承知しました。確認します。");
    assert_eq!(thread.messages[2].email_address, "tanaka@example.com");

    let latest = &thread.messages[3];
    assert!(latest.is_latest);
    assert_eq!(latest.email_address, "yamada@example.com");
    assert_eq!(latest.body, "最新の返信です。\nよろしくお願いします。");
    assert_eq!(
        latest.timestamp.unwrap().to_rfc3339(),
        "2026-02-19T09:00:00+00:00"
    );
}

// ─── Test 6: Single attribution header, exact output ────────────────

#[test]
fn test_quote_chain_single_header() {
    let input = "Thanks!\n2026年2月19日(木) 15:47 田中太郎 <tanaka@example.com>:\n> Please confirm.\n";
    let messages = parse_quote_chain(input);
    assert_eq!(
        messages,
        vec![
            ParsedEmailMessage {
                sender: "田中太郎".into(),
                email_address: "tanaka@example.com".into(),
                date_str: "2026年2月19日(木) 15:47".into(),
                body: "Please confirm.".into(),
            },
            ParsedEmailMessage::unattributed("Thanks!"),
        ]
    );
}

// ─── Test 7: English prose attribution ──────────────────────────────

#[test]
fn test_quote_chain_english_prose() {
    let input = "Sounds good.\n\nOn Thu, Feb 19, 2026 at 3:47 PM, Alice Smith <alice@example.com> wrote:\n> Shall we meet at noon?\n";
    let messages = parse_quote_chain(input);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, "Alice Smith");
    assert_eq!(messages[0].email_address, "alice@example.com");
    assert_eq!(messages[0].body, "Shall we meet at noon?");
    assert_eq!(messages[1].body, "Sounds good.");
}

// ─── Test 8: Transfer decoding ──────────────────────────────────────

#[test]
fn test_transfer_decoding() {
    assert_eq!(decode_base64("SGVsbG8s\r\nIHdvcmxk").unwrap(), b"Hello, world");
    assert!(decode_base64("not base64 at all!").is_err());

    // Soft line break inside a multi-byte sequence
    let bytes = decode_quoted_printable("=E6=97=\n=A5=E6=9C=AC");
    assert_eq!(String::from_utf8(bytes).unwrap(), "日本");
}

#[test]
fn test_undecodable_base64_is_sentinel() {
    let raw = "Content-Type: text/plain\nContent-Transfer-Encoding: base64\n\n@@@@\n";
    assert_eq!(decode_mime_body(raw).as_str(), DECODE_FAILURE_SENTINEL);
}

// ─── Test 9: Signature removal ──────────────────────────────────────

#[test]
fn test_signature_removal() {
    let text = "Hello,\nThe files are ready.\nPlease review them today.\n\n-----\nTaro Tanaka\nSales Dept.\nExample Inc.\n";
    let stripped = strip_signature(text);
    assert_eq!(stripped, "Hello,\nThe files are ready.\nPlease review them today.");
    assert_eq!(strip_signature(&stripped), stripped);

    // A short body keeps a delimiter near the top
    assert_eq!(strip_signature("ok\n-----\nbye"), "ok\n-----\nbye");
}

// ─── Test 10: Chat markup ───────────────────────────────────────────

#[test]
fn test_chat_markup_cleaning() {
    let input = "[To:123]山田さん\n[qt][qtmeta aid=1 time=2]前回の件[/qt]\n了解です。[hr]以上";
    assert_eq!(clean_chat_markup(input), "前回の件\n\n了解です。\n以上");
}

// ─── Test 11: Batch over a directory with one unreadable entry ──────

#[test]
fn test_batch_directory_continues_past_errors() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("a_html.eml")
        .write_file(&fixture("html_only.eml"))
        .unwrap();
    temp.child("c_thread.eml")
        .write_file(&fixture("japanese_thread_qp.eml"))
        .unwrap();
    temp.child("notes.txt").write_str("not an email").unwrap();
    // A directory with an .eml name cannot be read as a file
    temp.child("b_broken.eml").create_dir_all().unwrap();

    let items = batch::decode_directory(temp.path(), &Config::default(), None).unwrap();
    assert_eq!(items.len(), 3);

    let names: Vec<String> = items
        .iter()
        .map(|item| item.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a_html.eml", "b_broken.eml", "c_thread.eml"]);

    assert!(items[0].is_ok());
    assert!(!items[1].is_ok());
    let thread = items[2].result.as_ref().unwrap();
    assert_eq!(thread.messages.len(), 4);

    let rendered = serde_json::to_string(thread).unwrap();
    assert!(predicate::str::contains("佐藤一郎").eval(&rendered));
    assert!(predicate::str::contains("\"is_latest\":true").eval(&rendered));

    temp.close().unwrap();
}

// ─── Test 12: Shared across threads ─────────────────────────────────

#[test]
fn test_types_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<quotechain::DecodedBody>();
    assert_send_sync::<ParsedEmailMessage>();
    assert_send_sync::<quotechain::model::thread::Thread>();
    assert_send_sync::<Config>();
}
