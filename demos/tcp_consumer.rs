//! Expresses one interest against the local forwarder and prints the
//! content of the reply.
//!
//! Usage: tcp_consumer [name-uri] [forwarder-addr]

use nodo::{
    name::Name,
    node::{InertMetrics, Node},
    packet::Interest,
    platform::{clock::MonotonicClock, tcp::TcpTransport},
};

fn main() {
    env_logger::init();

    let uri = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/example/hello".into());
    let addr = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "127.0.0.1:6363".into());

    let Some(name) = Name::from_uri(&uri) else {
        eprintln!("invalid name {uri}");
        std::process::exit(2);
    };

    let mut node = Node::new(MonotonicClock::new(), TcpTransport::new(addr), InertMetrics);

    let mut interest = Interest::new(name);
    interest.lifetime_ms = Some(4000);

    let outcome = node.express_interest(
        interest,
        Some(Box::new(|node, _interest, data| {
            match &data.content {
                Some(content) => println!("{}", String::from_utf8_lossy(content)),
                None => println!("(no content)"),
            }
            node.shutdown();
        })),
        Some(Box::new(|node, interest| {
            eprintln!("timed out waiting for {}", interest.name);
            node.shutdown();
        })),
    );
    if let Err(err) = outcome {
        eprintln!("failed to express interest: {err}");
        std::process::exit(1);
    }

    if let Err(err) = node.process_events() {
        eprintln!("event loop stopped: {err}");
        std::process::exit(1);
    }
}
