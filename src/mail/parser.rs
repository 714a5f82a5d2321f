//! Raw MIME bytes to [`ParsedMessage`].
//!
//! Parsing is lenient: a message without a `To` header still parses, the
//! recipient resolver reports `NoRecipient` for it.

use crate::{
    error::{IngestError, IngestResult},
    models::email::{EmailAddress, ParsedAttachment, ParsedMessage},
};
use chrono::{DateTime, Utc};
use mailparse::{DispositionType, MailAddr, MailHeaderMap, ParsedMail, addrparse_header, parse_mail};

pub fn parse_message(raw: &[u8]) -> IngestResult<ParsedMessage> {
    let parsed = parse_mail(raw).map_err(|e| IngestError::MalformedMessage(e.to_string()))?;
    if parsed.headers.is_empty() {
        return Err(IngestError::MalformedMessage("no header section".into()));
    }

    let (text_body, html_body) = extract_bodies(&parsed, false);
    let mut attachments = Vec::new();
    collect_attachments(&parsed, false, &mut attachments);

    Ok(ParsedMessage {
        from: address_list(&parsed, "From"),
        to: address_list(&parsed, "To"),
        cc: address_list(&parsed, "Cc"),
        bcc: address_list(&parsed, "Bcc"),
        subject: parsed
            .headers
            .get_first_value("Subject")
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        date: parsed
            .headers
            .get_first_value("Date")
            .and_then(|d| mailparse::dateparse(&d).ok())
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_default(),
        text_body: text_body.unwrap_or_default(),
        html_body: html_body.unwrap_or_default(),
        attachments,
    })
}

/// Addresses of every occurrence of `header`; groups are flattened.
fn address_list(parsed: &ParsedMail<'_>, header: &str) -> Vec<EmailAddress> {
    let mut out = Vec::new();
    for h in parsed.headers.get_all_headers(header) {
        match addrparse_header(h) {
            Ok(list) => {
                for addr in list.iter() {
                    match addr {
                        MailAddr::Single(info) => {
                            push_address(&mut out, info.display_name.clone(), &info.addr)
                        }
                        MailAddr::Group(group) => {
                            for info in &group.addrs {
                                push_address(&mut out, info.display_name.clone(), &info.addr);
                            }
                        }
                    }
                }
            }
            // fall back to anything that looks like an address
            Err(_) => {
                for token in h.get_value().split([',', ';', ' ']) {
                    let token = token.trim_matches(|c: char| matches!(c, '<' | '>' | '"' | '\''));
                    if token.contains('@') {
                        push_address(&mut out, None, token);
                    }
                }
            }
        }
    }
    out
}

fn push_address(out: &mut Vec<EmailAddress>, name: Option<String>, addr: &str) {
    let addr = addr.trim();
    if addr.is_empty() {
        return;
    }
    out.push(EmailAddress::new(name, addr.to_string()));
}

fn is_attachment(part: &ParsedMail<'_>) -> bool {
    matches!(
        part.get_content_disposition().disposition,
        DispositionType::Attachment
    )
}

/// Inside a multipart the line break before the next boundary belongs to the
/// delimiter (RFC 2046 5.1.1). Base64 decoding drops it already.
fn ends_with_delimiter_break(part: &ParsedMail<'_>, in_multipart: bool) -> bool {
    in_multipart
        && !part
            .headers
            .get_first_value("Content-Transfer-Encoding")
            .is_some_and(|e| e.trim().eq_ignore_ascii_case("base64"))
}

fn strip_line_break(data: &mut Vec<u8>) {
    if data.ends_with(b"\r\n") {
        data.truncate(data.len() - 2);
    } else if data.ends_with(b"\n") {
        data.pop();
    }
}

fn strip_line_break_str(text: &mut String) {
    if text.ends_with("\r\n") {
        text.truncate(text.len() - 2);
    } else if text.ends_with('\n') {
        text.pop();
    }
}

/// Extract first text and HTML bodies from a MIME tree.
fn extract_bodies(parsed: &ParsedMail<'_>, in_multipart: bool) -> (Option<String>, Option<String>) {
    if parsed.subparts.is_empty() {
        if is_attachment(parsed) {
            return (None, None);
        }
        let data = || {
            parsed.get_body().ok().map(|mut body| {
                if ends_with_delimiter_break(parsed, in_multipart) {
                    strip_line_break_str(&mut body);
                }
                body
            })
        };
        match parsed.ctype.mimetype.as_str() {
            "text/html" => (None, data()),
            "text/plain" => (data(), None),
            _ => (None, None),
        }
    } else {
        let mut text = None;
        let mut html = None;
        for part in &parsed.subparts {
            let (t, h) = extract_bodies(part, true);
            if text.is_none() && t.is_some() {
                text = t;
            }
            if html.is_none() && h.is_some() {
                html = h;
            }
        }
        (text, html)
    }
}

/// Traverse MIME parts and collect attachment candidates.
fn collect_attachments(parsed: &ParsedMail<'_>, in_multipart: bool, out: &mut Vec<ParsedAttachment>) {
    if !parsed.subparts.is_empty() {
        for part in &parsed.subparts {
            collect_attachments(part, true, out);
        }
        return;
    }

    let disposition = parsed.get_content_disposition();
    let filename = disposition
        .params
        .get("filename")
        .or_else(|| parsed.ctype.params.get("name"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let ctype = parsed.ctype.mimetype.as_str();
    let is_text = ctype == "text/plain" || ctype == "text/html";
    let looks_attachment = matches!(disposition.disposition, DispositionType::Attachment)
        || filename.is_some()
        || !is_text;
    // an empty multipart container has nothing to relocate
    if !looks_attachment || ctype.starts_with("multipart/") {
        return;
    }
    if let Ok(mut data) = parsed.get_body_raw() {
        if ends_with_delimiter_break(parsed, in_multipart) {
            strip_line_break(&mut data);
        }
        out.push(ParsedAttachment {
            filename,
            content_type: parsed.ctype.mimetype.clone(),
            data,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTIPART: &str = concat!(
        "From: \"Dev Team\" <dev@example.test>\r\n",
        "To: you@example.test, Other <other@example.test>\r\n",
        "Cc: cc@example.test\r\n",
        "Subject: Hello Raw\r\n",
        "Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed; boundary=BOUND\r\n",
        "\r\n",
        "--BOUND\r\n",
        "Content-Type: multipart/alternative; boundary=ALT\r\n\r\n",
        "--ALT\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "Hi text\r\n",
        "--ALT\r\n",
        "Content-Type: text/html\r\n\r\n",
        "<p>Hi <b>html</b></p>\r\n",
        "--ALT--\r\n",
        "--BOUND\r\n",
        "Content-Type: application/octet-stream\r\n",
        "Content-Disposition: attachment; filename=\"a.txt\"\r\n\r\n",
        "ABC123\r\n",
        "--BOUND--\r\n",
    );

    #[test]
    fn parses_envelope_bodies_and_attachments() {
        let msg = parse_message(MULTIPART.as_bytes()).unwrap();
        assert_eq!(msg.subject, "Hello Raw");
        assert_eq!(msg.from[0].name, "Dev Team");
        assert_eq!(msg.from[0].address, "dev@example.test");
        assert_eq!(msg.to.len(), 2);
        assert_eq!(msg.to[0].name, "you");
        assert_eq!(msg.to[1].name, "Other");
        assert_eq!(msg.cc[0].address, "cc@example.test");
        assert!(msg.bcc.is_empty());
        assert_eq!(msg.date.timestamp(), 1057049557);
        assert_eq!(msg.text_body, "Hi text");
        assert_eq!(msg.html_body, "<p>Hi <b>html</b></p>");
        assert_eq!(msg.full_body(), msg.html_body);
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].filename.as_deref(), Some("a.txt"));
        assert_eq!(msg.attachments[0].data, b"ABC123");
    }

    #[test]
    fn base64_attachments_keep_their_exact_bytes() {
        let raw = concat!(
            "From: a@b.test\r\n",
            "To: c@d.test\r\n",
            "Content-Type: multipart/mixed; boundary=B\r\n",
            "\r\n",
            "--B\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "line one\r\n",
            "\r\n",
            "--B\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "Content-Disposition: attachment; filename=\"b.bin\"\r\n\r\n",
            "QUJDDQo=\r\n",
            "--B\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Disposition: attachment; filename=\"c.bin\"\r\n\r\n",
            "line\nbreak\n\r\n",
            "--B--\r\n",
        );
        let msg = parse_message(raw.as_bytes()).unwrap();
        // only the delimiter's own line break is removed
        assert_eq!(msg.text_body, "line one\r\n");
        assert_eq!(msg.attachments[0].data, b"ABC\r\n");
        assert_eq!(msg.attachments[1].data, b"line\nbreak\n");
    }

    #[test]
    fn single_part_body_is_untouched() {
        let msg = parse_message(b"From: a@b.test\r\nTo: c@d.test\r\n\r\nbody\r\n").unwrap();
        assert_eq!(msg.text_body, "body\r\n");
    }

    #[test]
    fn missing_date_and_recipient_are_lenient() {
        let msg = parse_message(b"From: a@b.test\r\nSubject: x\r\n\r\nbody").unwrap();
        assert!(msg.to.is_empty());
        assert!(msg.primary_recipient().is_none());
        assert_eq!(msg.date, DateTime::<Utc>::default());
        assert_eq!(msg.text_body.trim(), "body");
        assert!(msg.attachments.is_empty());
    }

    #[test]
    fn headerless_bytes_are_malformed() {
        let err = parse_message(b"\r\n\r\njust some bytes").unwrap_err();
        assert!(matches!(err, IngestError::MalformedMessage(_)));
    }
}
