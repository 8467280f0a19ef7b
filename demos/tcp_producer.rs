//! Registers a prefix with the local forwarder and answers every
//! interest under it with a digest-signed data packet.
//!
//! Usage: tcp_producer [prefix-uri] [forwarder-addr]

use nodo::{
    name::Name,
    node::{InertMetrics, Node},
    packet::{Data, ForwardingFlags, MetaInfo},
    platform::{clock::MonotonicClock, sha::Sha256Signer, tcp::TcpTransport},
};

fn main() {
    env_logger::init();

    let uri = std::env::args().nth(1).unwrap_or_else(|| "/example".into());
    let addr = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "127.0.0.1:6363".into());

    let Some(prefix) = Name::from_uri(&uri) else {
        eprintln!("invalid prefix {uri}");
        std::process::exit(2);
    };

    let mut node = Node::new(MonotonicClock::new(), TcpTransport::new(addr), InertMetrics);

    let outcome = node.register_prefix(
        prefix,
        Box::new(|node, _prefix, interest, _id| {
            println!("answering {}", interest.name);
            let mut reply = Data::new(interest.name.clone());
            reply.meta_info = Some(MetaInfo {
                freshness_period_ms: Some(1000),
                ..MetaInfo::default()
            });
            reply.content = Some(Box::from(b"hello from nodo".as_slice()));
            reply.sign_with(&mut Sha256Signer::new(), b"");
            if let Err(err) = node.send_data(&reply) {
                eprintln!("failed to send reply: {err}");
            }
        }),
        Some(Box::new(|node, prefix| {
            eprintln!("registration failed for {prefix}");
            node.shutdown();
        })),
        ForwardingFlags::default(),
    );
    if let Err(err) = outcome {
        eprintln!("failed to register prefix: {err}");
        std::process::exit(1);
    }

    println!("serving {uri}; press ctrl-c to stop");
    if let Err(err) = node.process_events() {
        eprintln!("event loop stopped: {err}");
        std::process::exit(1);
    }
}
