pub(crate) mod mock;

use dwh::network::{enable_access, revoke_access};
use dwh::{ClusterStatus, Error, ErrorClass};
use mock::{available_cluster, MockControlPlane};

const CIDR: &str = "203.0.113.0/24";

#[tokio::test]
async fn enable_access_opens_port_on_first_security_group() {
    let mut cluster = available_cluster();
    cluster.security_group_ids.push("sg-ffff0000".to_string());
    let client = MockControlPlane::new().with_cluster(cluster);

    let rule = enable_access(&client, "dwhCluster", CIDR, 5439)
        .await
        .unwrap();

    assert_eq!(rule.group_id, "sg-0123abcd");
    assert_eq!(rule.cidr, CIDR);
    assert_eq!(rule.port, 5439);
    assert!(client.has_ingress("sg-0123abcd", CIDR, 5439));
    assert!(!client.has_ingress("sg-ffff0000", CIDR, 5439));
}

#[tokio::test]
async fn enable_access_twice_succeeds() {
    let client = MockControlPlane::new().with_cluster(available_cluster());

    enable_access(&client, "dwhCluster", CIDR, 5439)
        .await
        .unwrap();
    let rule = enable_access(&client, "dwhCluster", CIDR, 5439)
        .await
        .unwrap();

    assert_eq!(rule.group_id, "sg-0123abcd");
    assert_eq!(client.calls("authorize_ingress"), 2);
    assert!(client.has_ingress("sg-0123abcd", CIDR, 5439));
}

#[tokio::test]
async fn enable_access_requires_available_cluster() {
    let mut cluster = available_cluster();
    cluster.status = ClusterStatus::Creating;
    let client = MockControlPlane::new().with_cluster(cluster);

    let err = enable_access(&client, "dwhCluster", CIDR, 5439)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidState { .. }));
    assert_eq!(err.class(), ErrorClass::Validation);
    assert_eq!(client.calls("authorize_ingress"), 0);
}

#[tokio::test]
async fn enable_access_without_security_group() {
    let mut cluster = available_cluster();
    cluster.security_group_ids.clear();
    let client = MockControlPlane::new().with_cluster(cluster);

    let err = enable_access(&client, "dwhCluster", CIDR, 5439)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoSecurityGroup { .. }));
}

#[tokio::test]
async fn enable_access_to_missing_cluster() {
    let client = MockControlPlane::new();
    let err = enable_access(&client, "dwhCluster", CIDR, 5439)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn revoke_access_closes_rule() {
    let client = MockControlPlane::new().with_cluster(available_cluster());
    enable_access(&client, "dwhCluster", CIDR, 5439)
        .await
        .unwrap();

    revoke_access(&client, "dwhCluster", CIDR, 5439)
        .await
        .unwrap();

    assert!(!client.has_ingress("sg-0123abcd", CIDR, 5439));
}

#[tokio::test]
async fn revoke_access_of_missing_rule_succeeds() {
    let mut cluster = available_cluster();
    cluster.status = ClusterStatus::Modifying;
    let client = MockControlPlane::new().with_cluster(cluster);

    let rule = revoke_access(&client, "dwhCluster", CIDR, 5439)
        .await
        .unwrap();

    assert_eq!(rule.group_id, "sg-0123abcd");
    assert_eq!(client.calls("revoke_ingress"), 1);
}
