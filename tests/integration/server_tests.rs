use fhashd::scanner::{Algorithm, Hasher, PermissiveEligibility, Walker};
use fhashd::server;
use fhashd::store::HashStore;
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

fn get(addr: SocketAddr, target: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    write!(
        stream,
        "GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    let status = response[9..12].parse().unwrap();
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}

#[test]
fn test_query_scanned_tree() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "hello").unwrap();

    let store = Arc::new(HashStore::new());
    Walker::new(
        dir.path(),
        Arc::new(PermissiveEligibility),
        Hasher::new(Algorithm::Sha256),
    )
    .scan_into(&store);

    let shutdown = Arc::new(AtomicBool::new(false));
    let handle = server::spawn(
        "127.0.0.1:0".parse().unwrap(),
        Arc::clone(&store),
        Arc::clone(&shutdown),
    )
    .unwrap();
    let addr = handle.addr();

    let (code, body) = get(addr, &format!("/fhash?fl={}", file.display()));
    assert_eq!(code, 200);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value, serde_json::json!([HELLO_SHA256, "sha256"]));

    let (code, body) = get(addr, "/fhash?fl=/missing");
    assert_eq!(code, 200);
    assert_eq!(serde_json::from_str::<serde_json::Value>(&body).unwrap(), "");

    let (code, body) = get(addr, "/status");
    assert_eq!(code, 200);
    let status: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status["ttl_hashed"], 1);
    assert_eq!(status["ttl_handld"], 1);
    assert_eq!(status["unhashable"], 0);
    assert_eq!(status["ttl_stater"], 0);
    assert_eq!(status["ttl_noregf"], 0);

    let (code, _) = get(addr, "/unknown");
    assert_eq!(code, 404);

    shutdown.store(true, Ordering::SeqCst);
    handle.join().unwrap();
}

#[test]
fn test_reads_during_concurrent_writes() {
    let store = Arc::new(HashStore::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let handle = server::spawn(
        "127.0.0.1:0".parse().unwrap(),
        Arc::clone(&store),
        Arc::clone(&shutdown),
    )
    .unwrap();
    let addr = handle.addr();

    let writer = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for i in 0..500u32 {
                let (algorithm, prefix) = if i % 2 == 0 {
                    (Algorithm::Sha256, "a")
                } else {
                    (Algorithm::Blake3, "b")
                };
                store.put(
                    "/hot",
                    fhashd::scanner::DigestValue::Hex(format!("{prefix}{i}")),
                    algorithm,
                );
            }
        })
    };

    for _ in 0..20 {
        let (code, body) = get(addr, "/fhash?fl=/hot");
        assert_eq!(code, 200);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        if let Some(pair) = value.as_array() {
            let digest = pair[0].as_str().unwrap();
            let algorithm = pair[1].as_str().unwrap();
            match algorithm {
                "sha256" => assert!(digest.starts_with('a')),
                "blake3" => assert!(digest.starts_with('b')),
                other => panic!("unexpected algorithm {other}"),
            }
        }
    }

    writer.join().unwrap();
    shutdown.store(true, Ordering::SeqCst);
    handle.join().unwrap();
}
