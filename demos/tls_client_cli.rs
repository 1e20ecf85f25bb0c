use std::env;
use std::io::Write;
use std::thread;
use std::time::Duration;
use tls13_client::{ConnectionState, Result, TcpTransport, TlsClientConnection, TlsClientParams};

fn main() -> Result<()> {
    tls13_client::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("TLS 1.3 Client CLI");
        println!("==================\n");
        println!("Usage:");
        println!("  {} <host> [port] [--small-records]", args[0]);
        println!("\nExample:");
        println!("  {} example.com 443", args[0]);
        return Ok(());
    }

    let host = args[1].clone();
    let port = args
        .get(2)
        .filter(|arg| !arg.starts_with("--"))
        .map(|p| p.as_str())
        .unwrap_or("443");
    let small_records = args.iter().any(|arg| arg == "--small-records");

    let params = TlsClientParams {
        server_name: Some(host.clone()),
        request_max_fragment_length: small_records,
        ..TlsClientParams::default()
    };
    let transport = TcpTransport::new(format!("{}:{}", host, port));
    let mut connection = TlsClientConnection::new(transport, params);

    println!("Connecting to {}:{}...", host, port);
    while connection.state() == ConnectionState::Handshake || connection.state() == ConnectionState::Initial {
        thread::sleep(Duration::from_millis(10));
    }

    if connection.state() != ConnectionState::Established {
        println!("Handshake failed");
        if let Some(message) = connection.error_message() {
            println!("  Error: {}", message);
        }
        if let Some(alert) = connection.alert_received() {
            println!("  Alert received: {}", alert);
        }
        return Ok(());
    }

    println!("Handshake completed");
    for (i, cert) in connection.server_certificates().iter().enumerate() {
        println!("Certificate {}: Subject: {}", i, cert.summary.subject);
        println!("Certificate {}: Issuer: {}", i, cert.summary.issuer);
    }
    println!();

    let request = format!(
        "GET / HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nUser-Agent: tls13_client/{}\r\n\r\n",
        host,
        tls13_client::VERSION
    );
    connection.send_application_data(request.as_bytes())?;

    let mut stdout = std::io::stdout();
    let mut buf = [0u8; 4096];
    loop {
        let n = connection.receive_application_data(&mut buf);
        if n > 0 {
            stdout.write_all(&buf[..n])?;
            continue;
        }
        if !connection.can_receive() {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    stdout.flush()?;

    connection.close();
    println!("\n\nConnection closed ({:?})", connection.state());
    if let Some(message) = connection.error_message() {
        println!("  {}", message);
    }
    Ok(())
}
