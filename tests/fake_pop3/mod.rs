//! In-process fake POP3 server for integration testing.
//!
//! Speaks the RFC 1939 subset the client uses: greeting, USER/PASS, STAT,
//! LIST, UIDL, RETR, DELE, NOOP, RSET and QUIT. Connections are served one
//! after another on a background thread. Deletions are marked per session
//! and only committed on QUIT, like a real maildrop.


pub use self::mailbox::Mailbox;

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

pub const USER: &str = "testuser";
pub const PASS: &str = "testpass";

struct Shared {
    mailbox: Mailbox,
    /// Commands received, one list per connection.
    sessions: Vec<Vec<String>>,
    /// Drop the first connection right after answering RETR of this number.
    hang_up_after_retr: Option<u32>,
}

pub struct FakePop3Server {
    port: u16,
    shared: Arc<Mutex<Shared>>,
}

impl FakePop3Server {
    pub fn start(mailbox: Mailbox) -> FakePop3Server {
        FakePop3Server::start_with(mailbox, None)
    }

    /// Like `start`, but the first session is cut off right after the
    /// server answered `RETR <number>`.
    pub fn start_hanging_up_after(mailbox: Mailbox, number: u32) -> FakePop3Server {
        FakePop3Server::start_with(mailbox, Some(number))
    }

    fn start_with(mailbox: Mailbox, hang_up_after_retr: Option<u32>) -> FakePop3Server {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Mutex::new(Shared {
            mailbox,
            sessions: Vec::new(),
            hang_up_after_retr,
        }));

        let server_shared = shared.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => serve(stream, &server_shared),
                    Err(_) => break,
                }
            }
        });

        FakePop3Server { port, shared }
    }

    pub fn addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Commands received so far, one list per connection.
    pub fn sessions(&self) -> Vec<Vec<String>> {
        self.shared.lock().unwrap().sessions.clone()
    }

    /// UIDs still in the maildrop after committed deletions.
    pub fn remaining_uids(&self) -> Vec<String> {
        self.shared.lock().unwrap().mailbox.uids()
    }
}

fn reply(stream: &mut TcpStream, line: &str) {
    let _ = stream.write_all(format!("{}\r\n", line).as_bytes());
}

fn arg(args: &[&str]) -> Option<u32> {
    args.first().and_then(|a| a.parse().ok())
}

fn serve(stream: TcpStream, shared: &Arc<Mutex<Shared>>) {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);
    let session = {
        let mut guard = shared.lock().unwrap();
        guard.sessions.push(Vec::new());
        guard.sessions.len() - 1
    };

    let mut user_ok = false;
    let mut logged_in = false;
    let mut marked: BTreeSet<u32> = BTreeSet::new();
    reply(&mut writer, "+OK fake POP3 server ready");

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n').to_string();
        let mut guard = shared.lock().unwrap();
        guard.sessions[session].push(line.clone());

        let mut words = line.split(' ');
        let verb = words.next().unwrap_or("").to_uppercase();
        let args: Vec<&str> = words.collect();
        let live = |n: u32, marked: &BTreeSet<u32>, mailbox: &Mailbox| {
            n >= 1 && (n as usize) <= mailbox.len() && !marked.contains(&n)
        };

        match verb.as_str() {
            "USER" if !logged_in => {
                user_ok = args.first() == Some(&USER);
                if user_ok {
                    reply(&mut writer, "+OK send your password");
                } else {
                    reply(&mut writer, "-ERR unknown mailbox");
                }
            }
            "PASS" if !logged_in => {
                if user_ok && args.first() == Some(&PASS) {
                    logged_in = true;
                    reply(&mut writer, "+OK maildrop locked and ready");
                } else {
                    reply(&mut writer, "-ERR invalid password");
                }
            }
            "QUIT" => {
                if logged_in {
                    guard.mailbox.remove(&marked);
                }
                reply(&mut writer, "+OK bye");
                let _ = writer.shutdown(Shutdown::Both);
                return;
            }
            _ if !logged_in => reply(&mut writer, "-ERR not logged in"),
            "STAT" => {
                let (count, size) = guard.mailbox.totals(&marked);
                reply(&mut writer, &format!("+OK {} {}", count, size));
            }
            "LIST" | "UIDL" => {
                let describe = |n: u32, mailbox: &Mailbox| {
                    if verb == "LIST" {
                        format!("{} {}", n, mailbox.size(n))
                    } else {
                        format!("{} {}", n, mailbox.uid(n))
                    }
                };
                match arg(&args) {
                    Some(n) if live(n, &marked, &guard.mailbox) => {
                        reply(&mut writer, &format!("+OK {}", describe(n, &guard.mailbox)))
                    }
                    Some(_) => reply(&mut writer, "-ERR no such message"),
                    None => {
                        reply(&mut writer, "+OK listing follows");
                        for n in 1..=guard.mailbox.len() as u32 {
                            if !marked.contains(&n) {
                                reply(&mut writer, &describe(n, &guard.mailbox));
                            }
                        }
                        reply(&mut writer, ".");
                    }
                }
            }
            "RETR" => match arg(&args) {
                Some(n) if live(n, &marked, &guard.mailbox) => {
                    reply(&mut writer, &format!("+OK {} octets", guard.mailbox.size(n)));
                    for body_line in guard.mailbox.body(n).split("\r\n") {
                        if body_line.starts_with('.') {
                            reply(&mut writer, &format!(".{}", body_line));
                        } else {
                            reply(&mut writer, body_line);
                        }
                    }
                    reply(&mut writer, ".");
                    if guard.hang_up_after_retr == Some(n) {
                        guard.hang_up_after_retr = None;
                        let _ = writer.shutdown(Shutdown::Both);
                        return;
                    }
                }
                _ => reply(&mut writer, "-ERR no such message"),
            },
            "DELE" => match arg(&args) {
                Some(n) if live(n, &marked, &guard.mailbox) => {
                    marked.insert(n);
                    reply(&mut writer, &format!("+OK message {} deleted", n));
                }
                Some(n) if marked.contains(&n) => {
                    reply(&mut writer, &format!("-ERR message {} already deleted", n))
                }
                _ => reply(&mut writer, "-ERR no such message"),
            },
            "NOOP" => reply(&mut writer, "+OK"),
            "RSET" => {
                marked.clear();
                reply(&mut writer, "+OK maildrop reset");
            }
            _ => reply(&mut writer, "-ERR unknown command"),
        }
    }
}
