// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `rfc2136.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        build_cname_record, build_delete_record, is_retryable_response_code, Rfc2136Provider,
        ZoneCatalogue,
    };
    use crate::errors::ProviderError;
    use crate::provider::{DnsProvider, RecordType};
    use crate::zones::HostedZone;
    use hickory_client::op::ResponseCode;
    use hickory_client::rr::{DNSClass, RData, RecordType as DnsRecordType};
    use hickory_proto::op::{Message, MessageType, OpCode};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::UdpSocket;
    use tokio::sync::mpsc;

    /// Answer every DNS message with `rcode` and hand the decoded request to the test.
    async fn spawn_responder(rcode: ResponseCode) -> (SocketAddr, mpsc::UnboundedReceiver<Message>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                let Ok(request) = Message::from_vec(&buf[..len]) else {
                    continue;
                };

                let mut response = Message::new();
                response
                    .set_id(request.id())
                    .set_message_type(MessageType::Response)
                    .set_op_code(request.op_code())
                    .set_response_code(rcode);
                response.add_queries(request.queries().to_vec());

                let bytes = response.to_vec().unwrap();
                socket.send_to(&bytes, peer).await.unwrap();
                if tx.send(request).is_err() {
                    break;
                }
            }
        });

        (addr, rx)
    }

    fn provider_for(server: SocketAddr) -> Rfc2136Provider {
        Rfc2136Provider::new(server, None, ZoneCatalogue::from_names(&["example.com"]))
            .with_timeout(Duration::from_secs(2))
    }

    fn unreachable_provider() -> Rfc2136Provider {
        Rfc2136Provider::new(
            "127.0.0.1:9".parse().unwrap(),
            None,
            ZoneCatalogue::from_names(&["example.com"]),
        )
        .with_timeout(Duration::from_millis(200))
    }

    #[test]
    fn test_build_cname_record() {
        let record = build_cname_record("Web.Example.com", "lb.cloud.net", 300).unwrap();

        assert_eq!(record.name().to_string(), "web.example.com.");
        assert_eq!(record.ttl(), 300);
        assert_eq!(record.record_type(), DnsRecordType::CNAME);
        assert_eq!(record.dns_class(), DNSClass::IN);
        match record.data() {
            Some(RData::CNAME(target)) => assert_eq!(target.0.to_string(), "lb.cloud.net."),
            other => panic!("unexpected rdata: {other:?}"),
        }
    }

    #[test]
    fn test_build_cname_record_rejects_long_label() {
        let domain = format!("{}.example.com", "a".repeat(64));
        let err = build_cname_record(&domain, "lb.cloud.net", 300).unwrap_err();

        assert!(matches!(err, ProviderError::InvalidRecord { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_build_delete_record() {
        let record = build_delete_record("web.example.com", DnsRecordType::CNAME).unwrap();

        assert_eq!(record.name().to_string(), "web.example.com.");
        assert_eq!(record.record_type(), DnsRecordType::CNAME);
        assert_eq!(record.ttl(), 0);
    }

    #[test]
    fn test_only_servfail_is_retryable() {
        assert!(is_retryable_response_code(ResponseCode::ServFail));
        assert!(!is_retryable_response_code(ResponseCode::Refused));
        assert!(!is_retryable_response_code(ResponseCode::NotAuth));
        assert!(!is_retryable_response_code(ResponseCode::NotZone));
    }

    #[test]
    fn test_static_catalogue_is_normalized_sorted_and_deduplicated() {
        let catalogue = ZoneCatalogue::from_names(&["sub.example.com", "Example.com.", "example.com"]);

        match catalogue {
            ZoneCatalogue::Static(zones) => assert_eq!(
                zones,
                vec![
                    HostedZone {
                        id: "example.com.".to_string(),
                        name: "example.com.".to_string()
                    },
                    HostedZone {
                        id: "sub.example.com.".to_string(),
                        name: "sub.example.com.".to_string()
                    },
                ]
            ),
            ZoneCatalogue::Api(_) => panic!("expected a static catalogue"),
        }
    }

    #[tokio::test]
    async fn test_list_hosted_zones_from_static_catalogue() {
        let provider = unreachable_provider();
        let zones = provider.list_hosted_zones().await.unwrap();

        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "example.com.");
        assert_eq!(provider.name(), "rfc2136");
    }

    #[tokio::test]
    async fn test_invalid_domain_fails_before_sending() {
        let provider = unreachable_provider();
        let domain = format!("{}.example.com", "b".repeat(64));

        let err = provider
            .upsert_record("example.com.", &domain, RecordType::Cname, "lb.cloud.net", 300)
            .await
            .unwrap_err();

        assert_eq!(err.reason(), "InvalidRecord");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let provider = unreachable_provider();

        let err = provider
            .delete_record("example.com.", "web.example.com", RecordType::Cname)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Transport { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_upsert_sends_update_for_zone() {
        let (addr, mut requests) = spawn_responder(ResponseCode::NoError).await;
        let provider = provider_for(addr);

        provider
            .upsert_record(
                "example.com.",
                "web.example.com",
                RecordType::Cname,
                "lb.cloud.net",
                300,
            )
            .await
            .unwrap();

        let request = requests.recv().await.unwrap();
        assert_eq!(request.op_code(), OpCode::Update);

        let zone = &request.queries()[0];
        assert_eq!(zone.name().to_string(), "example.com.");
        assert_eq!(zone.query_type(), DnsRecordType::SOA);

        let update = &request.name_servers()[0];
        assert_eq!(update.name().to_string(), "web.example.com.");
        assert_eq!(update.record_type(), DnsRecordType::CNAME);
        assert_eq!(update.ttl(), 300);
        match update.data() {
            Some(RData::CNAME(target)) => assert_eq!(target.0.to_string(), "lb.cloud.net."),
            other => panic!("unexpected rdata: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_targets_resolved_zone() {
        let (addr, mut requests) = spawn_responder(ResponseCode::NoError).await;
        let provider = provider_for(addr);

        provider
            .delete_record("sub.example.com.", "a.sub.example.com", RecordType::Cname)
            .await
            .unwrap();

        let request = requests.recv().await.unwrap();
        assert_eq!(request.queries()[0].name().to_string(), "sub.example.com.");

        let update = &request.name_servers()[0];
        assert_eq!(update.name().to_string(), "a.sub.example.com.");
        assert_eq!(update.record_type(), DnsRecordType::CNAME);
    }

    #[tokio::test]
    async fn test_refused_and_notauth_are_permanent() {
        for rcode in [ResponseCode::Refused, ResponseCode::NotAuth] {
            let (addr, _requests) = spawn_responder(rcode).await;
            let provider = provider_for(addr);

            let err = provider
                .delete_record("example.com.", "web.example.com", RecordType::Cname)
                .await
                .unwrap_err();

            match &err {
                ProviderError::UpdateRejected {
                    zone,
                    rcode: code,
                    retryable,
                    ..
                } => {
                    assert_eq!(zone, "example.com.");
                    assert_eq!(code, &format!("{rcode:?}"));
                    assert!(!retryable);
                }
                other => panic!("expected UpdateRejected, got {other:?}"),
            }
            assert!(!err.is_retryable());
        }
    }

    #[tokio::test]
    async fn test_servfail_is_retryable_rejection() {
        let (addr, _requests) = spawn_responder(ResponseCode::ServFail).await;
        let provider = provider_for(addr);

        let err = provider
            .upsert_record(
                "example.com.",
                "web.example.com",
                RecordType::Cname,
                "lb.cloud.net",
                300,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProviderError::UpdateRejected {
                retryable: true,
                ..
            }
        ));
        assert!(err.is_retryable());
    }
}
