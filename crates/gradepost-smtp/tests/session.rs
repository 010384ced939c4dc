//! Session tests against a loopback SMTP server.
//!
//! The server speaks just enough SMTP to accept mail and records every
//! line it receives so the tests can inspect the dialogue.

#![allow(clippy::unwrap_used)]

use gradepost_smtp::connection::connect;
use gradepost_smtp::{Address, Client};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Starts a one-connection server. Recipients at `reject.example`
/// are refused with 550.
async fn spawn_server() -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = socket.into_split();
        let mut reader = BufReader::new(read_half);
        let mut transcript = Vec::new();
        let mut in_data = false;

        write_half.write_all(b"220 fake.test ESMTP\r\n").await.unwrap();

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            transcript.push(line.clone());

            if in_data {
                if line == "." {
                    in_data = false;
                    write_half.write_all(b"250 Queued\r\n").await.unwrap();
                }
                continue;
            }

            let reply: &[u8] = match line.split_whitespace().next().unwrap_or_default() {
                "EHLO" => b"250-fake.test\r\n250-SIZE 1000000\r\n250 AUTH PLAIN LOGIN\r\n",
                "AUTH" => b"235 Authenticated\r\n",
                "MAIL" => b"250 Sender OK\r\n",
                "RCPT" if line.contains("reject.example") => b"550 No such user\r\n",
                "RCPT" => b"250 Recipient OK\r\n",
                "DATA" => {
                    in_data = true;
                    b"354 Go ahead\r\n"
                }
                "RSET" => b"250 Reset\r\n",
                "QUIT" => {
                    write_half.write_all(b"221 Bye\r\n").await.unwrap();
                    break;
                }
                _ => b"502 Unknown command\r\n",
            };
            write_half.write_all(reply).await.unwrap();
        }

        transcript
    });

    (port, handle)
}

#[tokio::test]
async fn sends_two_messages_over_one_session() {
    let (port, server) = spawn_server().await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.ehlo("localhost").await.unwrap();
    let mut client = client.authenticate("tutor@tum.de", "secret").await.unwrap();

    let from = Address::new("tutor@tum.de").unwrap();
    for to in ["jane@x.com", "john@x.com"] {
        let to = Address::new(to).unwrap();
        client
            .send_mail(&from, &to, b"Subject: Feedback\r\n\r\nSee attachment.\r\n")
            .await
            .unwrap();
    }
    client.quit().await.unwrap();

    let transcript = server.await.unwrap();
    let rcpts: Vec<_> = transcript
        .iter()
        .filter(|l| l.starts_with("RCPT TO:"))
        .collect();
    assert_eq!(rcpts, ["RCPT TO:<jane@x.com>", "RCPT TO:<john@x.com>"]);
    assert_eq!(transcript.iter().filter(|l| *l == "See attachment.").count(), 2);
    assert_eq!(transcript.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn session_survives_rejected_recipient() {
    let (port, server) = spawn_server().await;

    let stream = connect("127.0.0.1", port).await.unwrap();
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.ehlo("localhost").await.unwrap();
    let mut client = client.authenticate("tutor@tum.de", "secret").await.unwrap();

    let from = Address::new("tutor@tum.de").unwrap();
    let refused = Address::new("ghost@reject.example").unwrap();
    let err = client
        .send_mail(&from, &refused, b"Subject: x\r\n\r\nbody\r\n")
        .await
        .unwrap_err();
    assert!(matches!(err, gradepost_smtp::Error::SmtpError { code: 550, .. }));

    let accepted = Address::new("jane@x.com").unwrap();
    client
        .send_mail(&from, &accepted, b"Subject: x\r\n\r\nbody\r\n")
        .await
        .unwrap();
    client.quit().await.unwrap();

    let transcript = server.await.unwrap();
    assert!(transcript.iter().any(|l| l == "RSET"));
    assert_eq!(transcript.iter().filter(|l| *l == "DATA").count(), 1);
}
