//! Full-stack tests: resolver engine, hickory codec and UDP transport
//! against a scripted local DNS server.

mod helpers;

use fleet_dns_domain::ResolverConfig;
use fleet_dns_infrastructure::udp_resolver;
use helpers::{MockDnsServer, Mode};
use std::net::IpAddr;
use std::time::Duration;

fn fast_config(max_tries: u32, enable_ipv6: bool) -> ResolverConfig {
    ResolverConfig {
        max_tries,
        retry_timeout_ms: 100,
        enable_ipv6,
        ..ResolverConfig::default()
    }
}

#[tokio::test]
async fn resolves_both_families_end_to_end() {
    let server = MockDnsServer::start(Mode::Answer).await.unwrap();
    let resolver = udp_resolver(fast_config(1, true)).unwrap();
    resolver.add_server(&server.endpoint()).unwrap();

    let res = resolver.resolve("example.com").await;
    assert_eq!(res.code(), 0, "resolution failed: {res:?}");
    assert_eq!(res.ttl, Some(60));
    assert_eq!(res.server.as_deref(), Some(server.endpoint().as_str()));

    let addrs = res.ip_addrs();
    assert_eq!(addrs.len(), 2);
    assert!(addrs.contains(&"192.0.2.10".parse::<IpAddr>().unwrap()));
    assert!(addrs.contains(&"2001:db8::10".parse::<IpAddr>().unwrap()));
    assert_eq!(server.received(), 2, "one datagram per family");
}

#[tokio::test]
async fn ipv4_only_mode_sends_a_single_query() {
    let server = MockDnsServer::start(Mode::Answer).await.unwrap();
    let resolver = udp_resolver(fast_config(1, false)).unwrap();
    resolver.add_server(&server.endpoint()).unwrap();

    let res = resolver.resolve("example.com").await;
    assert_eq!(res.code(), 0);
    assert_eq!(
        res.ip_addrs(),
        vec!["192.0.2.10".parse::<IpAddr>().unwrap()]
    );
    assert_eq!(server.received(), 1);
}

#[tokio::test]
async fn upstream_rcode_is_surfaced() {
    let server = MockDnsServer::start(Mode::Rcode(3)).await.unwrap();
    let resolver = udp_resolver(fast_config(1, true)).unwrap();
    resolver.add_server(&server.endpoint()).unwrap();

    let res = resolver.resolve("nxdomain.example.com").await;
    assert_eq!(res.code(), 3);
    assert!(res.addresses.is_empty());
}

#[tokio::test]
async fn silent_server_exhausts_the_retry_budget() {
    let server = MockDnsServer::start(Mode::Silent).await.unwrap();
    let resolver = udp_resolver(fast_config(2, false)).unwrap();
    resolver.add_server(&server.endpoint()).unwrap();

    let res = resolver.resolve("dead.example.com").await;
    assert_eq!(res.code(), -1);
    assert!(res.addresses.is_empty());
    assert_eq!(server.received(), 2, "one send per allowed try");
}

#[tokio::test]
async fn concurrent_identical_requests_share_one_exchange() {
    let server = MockDnsServer::start(Mode::Silent).await.unwrap();
    let resolver = udp_resolver(fast_config(1, false)).unwrap();
    resolver.add_server(&server.endpoint()).unwrap();

    let first = resolver.start_resolve("shared.example.com");
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = resolver.start_resolve("shared.example.com");

    let res1 = first.outcome().await;
    let res2 = second.outcome().await;
    assert_eq!(res1.code(), -1);
    assert_eq!(res2.code(), -1);
    assert_eq!(server.received(), 1, "second request attached to the first");
}

#[tokio::test]
async fn queries_rotate_across_servers() {
    let mut servers = Vec::new();
    let resolver = udp_resolver(fast_config(1, false)).unwrap();
    for _ in 0..3 {
        let server = MockDnsServer::start(Mode::Answer).await.unwrap();
        resolver.add_server(&server.endpoint()).unwrap();
        servers.push(server);
    }

    for host in ["a.example.com", "b.example.com", "c.example.com"] {
        let res = resolver.resolve(host).await;
        assert_eq!(res.code(), 0);
    }

    for server in &servers {
        assert_eq!(server.received(), 1, "each upstream saw exactly one query");
    }

    let stats = resolver.server_stats().await.unwrap();
    assert!(stats.iter().all(|s| s.queries_sent == 1));
}
