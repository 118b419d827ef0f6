//! mapkv Interactive Client
//!
//! A stdin REPL over TCP: reads commands from the terminal, sends each as
//! one protocol line, and prints the server's response line.
//!
//! ## Connection Handling
//!
//! Uses a single TCP stream for sequential write-then-read, the same
//! pattern as Redis clients (redis-cli, mini-redis). The stream is cloned
//! only to wrap the read side in a BufReader; each command is fully written
//! and flushed before the response is read.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use clap::Parser;

/// mapkv interactive client
#[derive(Parser, Debug)]
#[command(name = "mapkv-cli")]
#[command(about = "Interactive client for the mapkv key-value store")]
#[command(version)]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Connection timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout: u64,
}

fn main() {
    let args = Args::parse();

    let addr = match args.server.parse() {
        Ok(addr) => addr,
        Err(_) => {
            eprintln!("Invalid server address: {}", args.server);
            std::process::exit(1);
        }
    };

    let mut stream = match TcpStream::connect_timeout(&addr, Duration::from_millis(args.timeout)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    // Responses should arrive promptly once a command is sent
    let _ = stream.set_read_timeout(Some(Duration::from_millis(args.timeout)));
    let _ = stream.set_write_timeout(Some(Duration::from_millis(args.timeout)));

    // Disable Nagle's algorithm for immediate sends (avoid buffering delays)
    let _ = stream.set_nodelay(true);

    let mut responses = match stream.try_clone() {
        Ok(clone) => BufReader::new(clone),
        Err(e) => {
            eprintln!("Failed to set up connection: {}", e);
            std::process::exit(1);
        }
    };

    println!("Connected to {}. Type commands (QUIT to exit):", args.server);

    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        input.clear();
        match stdin.lock().read_line(&mut input) {
            // EOF on stdin
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                std::process::exit(1);
            }
        }

        let line = input.trim_end_matches(['\r', '\n']);
        if line.eq_ignore_ascii_case("quit") {
            break;
        }

        if let Err(e) = stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
            .and_then(|_| stream.flush())
        {
            eprintln!("Failed to send command: {}", e);
            std::process::exit(1);
        }

        let mut response = String::new();
        match responses.read_line(&mut response) {
            Ok(0) => {
                eprintln!("Server closed the connection");
                std::process::exit(1);
            }
            Ok(_) => print!("{}", response),
            Err(e) => {
                eprintln!("Failed to read response: {}", e);
                std::process::exit(1);
            }
        }
    }
}
