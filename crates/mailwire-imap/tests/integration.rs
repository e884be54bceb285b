//! Integration tests for body part retrieval.
//!
//! Most tests drive the retriever through an in-memory [`Protocol`] that
//! serves section contents from a map and records every command. The last
//! tests run the real IMAP command channel over a scripted mock stream.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use bytes::Bytes;
use tokio_test::io::Builder;

use mailwire_imap::parser::{FetchItem, Response};
use mailwire_imap::{
    BodyData, BodyPart, BodyStructure, ByteRange, Capability, Error, FetchConfig, ImapProtocol,
    MessageHandle, Protocol, Result, SeqNum, Session,
};
use mailwire_mime::Part;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Server state shared between the fake connection and the test.
#[derive(Default)]
struct Mailbox {
    sections: HashMap<String, Bytes>,
    commands: StdMutex<Vec<String>>,
    expunged: AtomicBool,
    expunge_on_noop: AtomicBool,
    expunge_on_drop: AtomicBool,
    drop_connection: AtomicBool,
}

impl Mailbox {
    fn with_sections(sections: &[(&str, &[u8])]) -> Arc<Self> {
        Arc::new(Self {
            sections: sections
                .iter()
                .map(|(name, data)| ((*name).to_string(), Bytes::copy_from_slice(data)))
                .collect(),
            ..Self::default()
        })
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }
}

struct FakeServer {
    capabilities: Vec<Capability>,
    mailbox: Arc<Mailbox>,
}

impl FakeServer {
    fn check_connection(&self) -> Result<()> {
        if self.mailbox.drop_connection.load(Ordering::SeqCst) {
            if self.mailbox.expunge_on_drop.load(Ordering::SeqCst) {
                self.mailbox.expunged.store(true, Ordering::SeqCst);
            }
            Err(Error::SessionClosed("connection reset by peer".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Protocol for FakeServer {
    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    async fn fetch_body(
        &mut self,
        _sequence: SeqNum,
        section: &str,
        peek: bool,
    ) -> Result<Option<BodyData>> {
        self.mailbox.record(format!("BODY{}[{section}]", if peek { ".PEEK" } else { "" }));
        self.check_connection()?;
        Ok(self.mailbox.sections.get(section).map(|data| BodyData {
            section: section.to_string(),
            origin: None,
            data: Some(data.clone()),
        }))
    }

    async fn fetch_body_range(
        &mut self,
        _sequence: SeqNum,
        section: &str,
        range: ByteRange,
        _peek: bool,
    ) -> Result<Option<BodyData>> {
        self.mailbox
            .record(format!("BODY[{section}]<{}.{}>", range.origin, range.length));
        self.check_connection()?;
        Ok(self.mailbox.sections.get(section).map(|data| {
            let start = (range.origin as usize).min(data.len());
            let end = (start + range.length as usize).min(data.len());
            BodyData {
                section: section.to_string(),
                origin: Some(range.origin),
                data: Some(data.slice(start..end)),
            }
        }))
    }

    async fn noop(&mut self) -> Result<()> {
        self.mailbox.record("NOOP".to_string());
        self.check_connection()?;
        if self.mailbox.expunge_on_noop.load(Ordering::SeqCst) {
            self.mailbox.expunged.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct TestMessage<P> {
    session: Session<P>,
    sequence: SeqNum,
    expunged: Arc<Mailbox>,
}

impl<P: Protocol> MessageHandle for TestMessage<P> {
    type Protocol = P;

    fn session(&self) -> Result<&Session<P>> {
        Ok(&self.session)
    }

    fn sequence_number(&self) -> Result<SeqNum> {
        Ok(self.sequence)
    }

    fn check_expunged(&self) -> Result<()> {
        if self.expunged.expunged.load(Ordering::SeqCst) {
            Err(Error::MessageRemoved)
        } else {
            Ok(())
        }
    }
}

fn message(mailbox: &Arc<Mailbox>, rev1: bool, config: FetchConfig) -> TestMessage<FakeServer> {
    let capabilities = if rev1 {
        vec![Capability::Imap4Rev1]
    } else {
        Vec::new()
    };
    let server = FakeServer {
        capabilities,
        mailbox: Arc::clone(mailbox),
    };
    TestMessage {
        session: Session::new(server, config),
        sequence: SeqNum::new(1).unwrap(),
        expunged: Arc::clone(mailbox),
    }
}

fn structure(raw: &str) -> BodyStructure {
    let line = format!("* 1 FETCH (BODYSTRUCTURE {raw})\r\n");
    let mut response = Response::parse(line.into_bytes()).unwrap();
    match FetchItem::parse_all(&mut response).unwrap().remove(0) {
        FetchItem::BodyStructure(body) => *body,
        other => panic!("expected BODYSTRUCTURE, got {other:?}"),
    }
}

const TWO_PARTS: &str = concat!(
    r#"(("TEXT" "PLAIN" ("charset" "us-ascii") NIL NIL "7BIT" 5 1 NIL NIL NIL NIL)"#,
    r#"("APPLICATION" "PDF" ("name" "report.pdf") "<pdf@x>" "Quarterly" "BASE64" 8 NIL"#,
    r#" ("ATTACHMENT" ("filename" "report.pdf")) NIL NIL) "MIXED" ("boundary" "b1") NIL NIL NIL)"#,
);

#[tokio::test]
async fn test_multipart_parts_and_metadata() {
    init_tracing();
    let mailbox = Mailbox::with_sections(&[("1", b"hello"), ("2", b"aGVsbG8=")]);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(TWO_PARTS);

    let parts = BodyPart::for_message(&message, &body);
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].section(), "1");
    assert_eq!(parts[1].section(), "2");

    let text = &parts[0];
    assert_eq!(text.content_type(), "text/plain; charset=us-ascii");
    assert_eq!(text.encoding(), Some("7BIT"));
    assert_eq!(text.size(), Some(5));
    assert_eq!(text.line_count(), Some(1));
    assert_eq!(text.disposition(), None);
    assert!(text.children().unwrap().is_empty());

    let pdf = &parts[1];
    assert_eq!(pdf.disposition(), Some("attachment"));
    assert_eq!(pdf.content_id(), Some("<pdf@x>"));
    assert_eq!(pdf.description(), Some("Quarterly"));
    assert_eq!(pdf.file_name().unwrap().as_deref(), Some("report.pdf"));

    // Metadata comes from the structure alone.
    assert!(mailbox.commands().is_empty());

    let content = text.content_stream().await.unwrap().read_to_end().await.unwrap();
    assert_eq!(&content[..], b"hello");
    assert_eq!(mailbox.commands(), vec!["BODY[1]<0.5>"]);

    assert_eq!(pdf.decoded_content().await.unwrap(), b"hello");
    assert_eq!(mailbox.commands(), vec!["BODY[1]<0.5>", "BODY[2]<0.8>"]);
}

#[tokio::test]
async fn test_single_part_message_is_part_one() {
    let mailbox = Mailbox::with_sections(&[("1", b"plain body")]);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(r#"("TEXT" "PLAIN" NIL NIL NIL "7BIT" 10 1)"#);

    let parts = BodyPart::for_message(&message, &body);
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].section(), "1");

    let content = parts[0].content_stream().await.unwrap().read_to_end().await.unwrap();
    assert_eq!(&content[..], b"plain body");
}

#[tokio::test]
async fn test_headers_load_once() {
    init_tracing();
    let mailbox = Mailbox::with_sections(&[(
        "1.MIME",
        b"Content-Type: text/plain\r\nContent-Language: en\r\nContent-Language: fr\r\n\r\n",
    )]);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(TWO_PARTS);
    let parts = BodyPart::for_message(&message, &body);
    let part = &parts[0];

    let (first, second) = tokio::join!(part.load_headers(), part.load_headers());
    assert_eq!(first.unwrap().len(), 3);
    assert_eq!(second.unwrap().len(), 3);

    assert_eq!(part.header("content-language").await.unwrap(), vec!["en", "fr"]);
    assert_eq!(
        part.matching_header_lines(&["Content-Type"]).await.unwrap(),
        vec!["Content-Type: text/plain"]
    );
    assert_eq!(
        part.non_matching_headers(&["content-language"])
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(part.all_header_lines().await.unwrap().len(), 3);

    // One header fetch, always in peek mode.
    assert_eq!(mailbox.commands(), vec!["BODY.PEEK[1.MIME]"]);
}

#[tokio::test]
async fn test_header_and_mime_streams() {
    let mailbox = Mailbox::with_sections(&[
        ("1.MIME", b"Content-Type: text/plain\r\n\r\n"),
        ("1", b"hello"),
    ]);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(TWO_PARTS);
    let parts = BodyPart::for_message(&message, &body);

    let mime = parts[0].mime_stream().await.unwrap().read_to_end().await.unwrap();
    assert_eq!(&mime[..], b"Content-Type: text/plain\r\n\r\nhello");
}

#[tokio::test]
async fn test_legacy_server_synthesizes_headers() {
    let mailbox = Mailbox::with_sections(&[("2", b"aGVsbG8=")]);
    let message = message(&mailbox, false, FetchConfig::default());
    let body = structure(TWO_PARTS);
    let parts = BodyPart::for_message(&message, &body);
    let pdf = &parts[1];

    let headers = pdf.load_headers().await.unwrap();
    assert_eq!(
        headers.get("Content-Type"),
        Some("application/pdf; name=report.pdf")
    );
    assert_eq!(headers.get("Content-Transfer-Encoding"), Some("BASE64"));
    assert_eq!(headers.get("Content-Description"), Some("Quarterly"));
    assert_eq!(headers.get("Content-ID"), Some("<pdf@x>"));
    assert_eq!(headers.get("Content-MD5"), None);
    assert!(mailbox.commands().is_empty());

    let header_block = pdf.header_stream().await.unwrap().read_to_end().await.unwrap();
    assert!(header_block.ends_with(b"\r\n\r\n"));

    let bare = structure(r#"("TEXT" "PLAIN" NIL NIL NIL NIL 5 1)"#);
    let bare_parts = BodyPart::for_message(&message, &bare);
    let headers = bare_parts[0].load_headers().await.unwrap();
    assert_eq!(headers.get("Content-Transfer-Encoding"), Some("7BIT"));
    assert_eq!(headers.len(), 2);

    // Legacy servers get one whole-section fetch instead of blocks.
    assert_eq!(pdf.decoded_content().await.unwrap(), b"hello");
    assert_eq!(mailbox.commands(), vec!["BODY[2]"]);
}

#[tokio::test]
async fn test_nested_message_children() {
    let raw = concat!(
        r#"(("TEXT" "PLAIN" NIL NIL NIL "7BIT" 3 1)("MESSAGE" "RFC822" NIL NIL NIL "7BIT" 342"#,
        r#" ("date" "inner" NIL NIL NIL NIL NIL NIL NIL NIL)"#,
        r#" (("TEXT" "PLAIN" NIL NIL NIL "7BIT" 20 2)("TEXT" "HTML" NIL NIL NIL "7BIT" 40 3) "ALTERNATIVE")"#,
        r#" 12) "MIXED")"#,
    );
    let body = structure(raw);

    let mailbox = Mailbox::with_sections(&[]);
    let rev1 = message(&mailbox, true, FetchConfig::default());
    let parts = BodyPart::for_message(&rev1, &body);
    let nested = parts[1].children().unwrap();
    let sections: Vec<_> = nested.iter().map(BodyPart::section).collect();
    assert_eq!(sections, vec!["2.1", "2.2"]);
    assert_eq!(nested[1].content_type(), "text/html");

    let legacy = message(&mailbox, false, FetchConfig::default());
    let parts = BodyPart::for_message(&legacy, &body);
    assert!(parts[1].children().unwrap().is_empty());
}

#[tokio::test]
async fn test_block_streaming_stops_at_declared_size() {
    let mailbox = Mailbox::with_sections(&[("1", b"abcdefghij")]);
    let config = FetchConfig::builder().fetch_block_size(4).build();
    let message = message(&mailbox, true, config);
    let body = structure(r#"("TEXT" "PLAIN" NIL NIL NIL "7BIT" 10 1)"#);
    let parts = BodyPart::for_message(&message, &body);

    let mut stream = parts[0].content_stream().await.unwrap();
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next_chunk().await.unwrap() {
        chunks.push(chunk);
    }

    assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    assert_eq!(
        mailbox.commands(),
        vec!["BODY[1]<0.4>", "BODY[1]<4.4>", "BODY[1]<8.2>"]
    );
}

#[tokio::test]
async fn test_block_streaming_without_trusted_size() {
    let mailbox = Mailbox::with_sections(&[("1", b"abcdefghij")]);
    let config = FetchConfig::builder()
        .fetch_block_size(4)
        .ignore_body_structure_size(true)
        .build();
    let message = message(&mailbox, true, config);
    // Declared size is wrong; the short third block ends the stream.
    let body = structure(r#"("TEXT" "PLAIN" NIL NIL NIL "7BIT" 6 1)"#);
    let parts = BodyPart::for_message(&message, &body);

    let content = parts[0].content_stream().await.unwrap().read_to_end().await.unwrap();
    assert_eq!(&content[..], b"abcdefghij");
    assert_eq!(
        mailbox.commands(),
        vec!["BODY[1]<0.4>", "BODY[1]<4.4>", "BODY[1]<8.4>"]
    );
}

#[tokio::test]
async fn test_block_size_toggle_between_calls() {
    let mailbox = Mailbox::with_sections(&[("1", b"hello")]);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(r#"("TEXT" "PLAIN" NIL NIL NIL "7BIT" 5 1)"#);
    let parts = BodyPart::for_message(&message, &body);

    message.session.set_fetch_block_size(None);
    parts[0].content_stream().await.unwrap().read_to_end().await.unwrap();
    message
        .session
        .set_fetch_block_size(std::num::NonZeroU32::new(1024));
    parts[0].content_stream().await.unwrap().read_to_end().await.unwrap();

    assert_eq!(mailbox.commands(), vec!["BODY[1]", "BODY[1]<0.5>"]);
}

#[tokio::test]
async fn test_peek_mode_is_passed_through() {
    let mailbox = Mailbox::with_sections(&[("1", b"hello")]);
    let config = FetchConfig::builder().fetch_block_size(0).peek(true).build();
    let message = message(&mailbox, true, config);
    let body = structure(r#"("TEXT" "PLAIN" NIL NIL NIL "7BIT" 5 1)"#);
    let parts = BodyPart::for_message(&message, &body);

    parts[0].content_stream().await.unwrap().read_to_end().await.unwrap();
    assert_eq!(mailbox.commands(), vec!["BODY.PEEK[1]"]);
}

#[tokio::test]
async fn test_empty_fetch_on_expunged_message() {
    let mailbox = Mailbox::with_sections(&[]);
    mailbox.expunge_on_noop.store(true, Ordering::SeqCst);
    let config = FetchConfig::builder().fetch_block_size(0).build();
    let message = message(&mailbox, true, config);
    let body = structure(r#"("TEXT" "PLAIN" NIL NIL NIL "7BIT" 5 1)"#);
    let parts = BodyPart::for_message(&message, &body);

    let err = parts[0].content_stream().await.unwrap_err();
    assert!(matches!(err, Error::MessageRemoved));
    assert_eq!(mailbox.commands(), vec!["BODY[1]", "NOOP"]);
}

#[tokio::test]
async fn test_empty_fetch_on_live_message_is_empty_stream() {
    let mailbox = Mailbox::with_sections(&[]);
    let config = FetchConfig::builder().fetch_block_size(0).build();
    let message = message(&mailbox, true, config);
    let body = structure(r#"("TEXT" "PLAIN" NIL NIL NIL "7BIT" 5 1)"#);
    let parts = BodyPart::for_message(&message, &body);

    let content = parts[0].content_stream().await.unwrap().read_to_end().await.unwrap();
    assert!(content.is_empty());
    assert_eq!(mailbox.commands(), vec!["BODY[1]", "NOOP"]);
}

#[tokio::test]
async fn test_empty_block_on_expunged_message() {
    let mailbox = Mailbox::with_sections(&[]);
    mailbox.expunge_on_noop.store(true, Ordering::SeqCst);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(r#"("TEXT" "PLAIN" NIL NIL NIL "7BIT" 5 1)"#);
    let parts = BodyPart::for_message(&message, &body);

    let mut stream = parts[0].content_stream().await.unwrap();
    assert!(matches!(stream.next_chunk().await, Err(Error::MessageRemoved)));
}

#[tokio::test]
async fn test_missing_headers_fail_fetch() {
    let mailbox = Mailbox::with_sections(&[]);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(TWO_PARTS);
    let parts = BodyPart::for_message(&message, &body);

    let err = parts[0].load_headers().await.unwrap_err();
    assert!(matches!(err, Error::FetchFailed(_)));

    // The failed load is not cached.
    mailbox.expunged.store(true, Ordering::SeqCst);
    let err = parts[0].load_headers().await.unwrap_err();
    assert!(matches!(err, Error::MessageRemoved));
}

#[tokio::test]
async fn test_closed_session() {
    let mailbox = Mailbox::with_sections(&[("1.MIME", b"Content-Type: text/plain\r\n\r\n")]);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(TWO_PARTS);
    let parts = BodyPart::for_message(&message, &body);

    message.session.close();
    assert!(matches!(
        parts[0].load_headers().await,
        Err(Error::SessionClosed(_))
    ));
    assert!(mailbox.commands().is_empty());
}

#[tokio::test]
async fn test_connection_loss_closes_session() {
    let mailbox = Mailbox::with_sections(&[("1", b"hello")]);
    mailbox.drop_connection.store(true, Ordering::SeqCst);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(TWO_PARTS);
    let parts = BodyPart::for_message(&message, &body);

    let mut stream = parts[0].content_stream().await.unwrap();
    assert!(matches!(stream.next_chunk().await, Err(Error::SessionClosed(_))));
    assert!(message.session.is_closed());
}

#[tokio::test]
async fn test_connection_loss_after_expunge() {
    let mailbox = Mailbox::with_sections(&[("1", b"hello")]);
    mailbox.drop_connection.store(true, Ordering::SeqCst);
    mailbox.expunge_on_drop.store(true, Ordering::SeqCst);
    let message = message(&mailbox, true, FetchConfig::default());
    let body = structure(TWO_PARTS);
    let parts = BodyPart::for_message(&message, &body);

    let mut stream = parts[0].content_stream().await.unwrap();
    assert!(matches!(stream.next_chunk().await, Err(Error::MessageRemoved)));
    assert!(message.session.is_closed());
}

#[tokio::test]
async fn test_known_expunged_message_sends_no_commands() {
    init_tracing();
    let mailbox = Mailbox::with_sections(&[
        ("1", b"hello"),
        ("1.MIME", b"Content-Type: text/plain\r\n\r\n"),
    ]);
    mailbox.expunged.store(true, Ordering::SeqCst);
    let body = structure(TWO_PARTS);

    let config = FetchConfig::builder().fetch_block_size(0).build();
    let rev1 = message(&mailbox, true, config);
    let parts = BodyPart::for_message(&rev1, &body);
    assert!(matches!(parts[0].content_stream().await, Err(Error::MessageRemoved)));
    assert!(matches!(parts[0].load_headers().await, Err(Error::MessageRemoved)));
    assert!(matches!(parts[0].header_stream().await, Err(Error::MessageRemoved)));
    assert!(matches!(parts[0].mime_stream().await, Err(Error::MessageRemoved)));

    let legacy = message(&mailbox, false, FetchConfig::default());
    let parts = BodyPart::for_message(&legacy, &body);
    assert!(matches!(parts[0].load_headers().await, Err(Error::MessageRemoved)));
    assert!(matches!(parts[0].header_stream().await, Err(Error::MessageRemoved)));

    assert!(mailbox.commands().is_empty());
}

#[tokio::test]
async fn test_expunge_between_blocks_stops_stream() {
    let mailbox = Mailbox::with_sections(&[("1", b"hello world")]);
    let config = FetchConfig::builder()
        .fetch_block_size(4)
        .ignore_body_structure_size(true)
        .build();
    let message = message(&mailbox, true, config);
    let body = structure(r#"("TEXT" "PLAIN" NIL NIL NIL "7BIT" 11 1)"#);
    let parts = BodyPart::for_message(&message, &body);

    let mut stream = parts[0].content_stream().await.unwrap();
    assert_eq!(&stream.next_chunk().await.unwrap().unwrap()[..], b"hell");
    mailbox.expunged.store(true, Ordering::SeqCst);
    assert!(matches!(stream.next_chunk().await, Err(Error::MessageRemoved)));
    assert_eq!(mailbox.commands(), vec!["BODY[1]<0.4>"]);
}

#[tokio::test]
async fn test_file_name_decoding() {
    let raw = r#"("APPLICATION" "PDF" ("name" "=?utf-8?Q?r=C3=A9sum=C3=A9.pdf?=") NIL "=?utf-8?Q?Caf=C3=A9_menu?=" "BASE64" 8 NIL NIL NIL NIL)"#;
    let body = structure(raw);
    let mailbox = Mailbox::with_sections(&[]);

    let plain = message(&mailbox, true, FetchConfig::default());
    let part = &BodyPart::for_message(&plain, &body)[0];
    assert_eq!(
        part.file_name().unwrap().as_deref(),
        Some("=?utf-8?Q?r=C3=A9sum=C3=A9.pdf?=")
    );
    assert_eq!(part.description(), Some("Café menu"));

    let config = FetchConfig::builder().decode_file_name(true).build();
    let decoding = message(&mailbox, true, config);
    let part = &BodyPart::for_message(&decoding, &body)[0];
    assert_eq!(part.file_name().unwrap().as_deref(), Some("résumé.pdf"));
}

#[tokio::test]
async fn test_over_imap_protocol() {
    init_tracing();
    let mock = Builder::new()
        .write(b"A0001 FETCH 3 (BODY.PEEK[2.MIME])\r\n")
        .read(b"* 3 FETCH (BODY[2.MIME] {42}\r\n")
        .read(b"Content-Type: application/pdf\r\nX-Id: 7\r\n\r\n)\r\n")
        .read(b"A0001 OK FETCH completed\r\n")
        .write(b"A0002 FETCH 3 (BODY[2]<0.8>)\r\n")
        .read(b"* 3 FETCH (BODY[2]<0> {8}\r\naGVsbG8=)\r\n")
        .read(b"A0002 OK FETCH completed\r\n")
        .build();
    let protocol = ImapProtocol::new(mock, vec![Capability::Imap4Rev1]);
    let message = TestMessage {
        session: Session::new(protocol, FetchConfig::default()),
        sequence: SeqNum::new(3).unwrap(),
        expunged: Mailbox::with_sections(&[]),
    };
    let body = structure(TWO_PARTS);
    let parts = BodyPart::for_message(&message, &body);

    let headers = parts[1].load_headers().await.unwrap();
    assert_eq!(headers.get("x-id"), Some("7"));
    assert_eq!(parts[1].decoded_content().await.unwrap(), b"hello");
}

#[tokio::test]
async fn test_over_imap_protocol_expunged() {
    let mock = Builder::new()
        .write(b"A0001 FETCH 3 (BODY.PEEK[1.MIME])\r\n")
        .read(b"* 3 EXPUNGE\r\n")
        .read(b"A0001 OK FETCH completed\r\n")
        .write(b"A0002 NOOP\r\n")
        .read(b"A0002 OK NOOP completed\r\n")
        .build();
    let protocol = ImapProtocol::new(mock, vec![Capability::Imap4Rev1]);
    let mailbox = Mailbox::with_sections(&[]);
    let message = TestMessage {
        session: Session::new(protocol, FetchConfig::default()),
        sequence: SeqNum::new(3).unwrap(),
        expunged: Arc::clone(&mailbox),
    };
    let body = structure(TWO_PARTS);
    let parts = BodyPart::for_message(&message, &body);

    // The mailbox layer has not drained the expunge yet, so the empty
    // fetch is not explained and the load fails.
    assert!(matches!(
        parts[0].load_headers().await,
        Err(Error::FetchFailed(_))
    ));

    // Once it records the expunge seen on the connection, no further
    // commands are sent for the message.
    let expunged = message.session.lock().await.unwrap().take_expunged();
    assert_eq!(expunged, vec![SeqNum::new(3).unwrap()]);
    mailbox.expunged.store(true, Ordering::SeqCst);
    assert!(matches!(
        parts[0].load_headers().await,
        Err(Error::MessageRemoved)
    ));
}
