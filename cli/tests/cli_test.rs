use assert_cmd::Command;
use std::io::Write;
use tempfile::NamedTempFile;

const COMPLETE: &str = r#"
[AWS]
KEY = "AKIAEXAMPLE"
SECRET = "example-secret"

[DWH]
DWH_CLUSTER_TYPE = "multi-node"
DWH_NUM_NODES = 4
DWH_NODE_TYPE = "dc2.large"
DWH_CLUSTER_IDENTIFIER = "dwhCluster"
DWH_DB = "dwh"
DWH_DB_USER = "dwhuser"
DWH_DB_PASSWORD = "Passw0rd"
DWH_PORT = 5439
DWH_IAM_ROLE_NAME = "dwhRole"
"#;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn dwhctl() -> Command {
    let mut cmd = Command::cargo_bin("dwhctl").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn no_mode_is_a_usage_error() {
    dwhctl().assert().code(2);
}

#[test]
fn status_and_action_conflict() {
    dwhctl().args(&["--status", "--action", "2"]).assert().code(2);
}

#[test]
fn unknown_action_is_a_usage_error() {
    dwhctl().args(&["--action", "9"]).assert().code(2);
}

#[test]
fn json_requires_status() {
    dwhctl().args(&["--action", "1", "--json"]).assert().code(2);
}

#[test]
fn missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.cfg");
    let output = dwhctl()
        .args(&["--status", "--config", path.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("(os error 2)").count(), 1, "stderr: {}", stderr);
}

#[test]
fn original_ini_config_is_accepted() {
    let file = config_file(
        "[AWS]\nKEY=AKIAEXAMPLE\nSECRET=example-secret\n\n[DWH]\n\
        DWH_CLUSTER_TYPE=multi-node\nDWH_NUM_NODES=4\nDWH_NODE_TYPE=dc2.large\n\
        DWH_CLUSTER_IDENTIFIER=dwhCluster\nDWH_DB=dwh\nDWH_DB_USER=dwhuser\n\
        DWH_DB_PASSWORD=Passw0rd\nDWH_PORT=5439\nDWH_IAM_ROLE_NAME=dwhRole\n",
    );
    // Loading succeeds, so the only thing missing for enable-access is the CIDR.
    let output = dwhctl()
        .args(&["--action", "3", "--config", file.path().to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DWH_INGRESS_CIDR"), "stderr: {}", stderr);
}

#[test]
fn missing_key_is_named() {
    let contents = COMPLETE.replace("DWH_NODE_TYPE = \"dc2.large\"\n", "");
    let file = config_file(&contents);

    let output = dwhctl()
        .args(&["--action", "launch", "--config", file.path().to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DWH_NODE_TYPE"), "stderr: {}", stderr);
}

#[test]
fn malformed_port() {
    let contents = COMPLETE.replace("DWH_PORT = 5439", "DWH_PORT = \"not-a-port\"");
    let file = config_file(&contents);
    dwhctl()
        .args(&["--status", "--config", file.path().to_str().unwrap()])
        .assert()
        .code(3);
}

#[test]
fn network_actions_need_ingress_cidr() {
    let file = config_file(COMPLETE);
    for action in ["3", "disable-access"] {
        let output = dwhctl()
            .args(&["--action", action, "--config", file.path().to_str().unwrap()])
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(3));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("DWH_INGRESS_CIDR"), "stderr: {}", stderr);
    }
}
