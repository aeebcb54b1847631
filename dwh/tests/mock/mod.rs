/*!

A mock implementation of [`ControlPlane`] that keeps the provider's state in memory so that the
provisioning, lifecycle, network and status components can be tested without an AWS account.

Successive `describe_cluster` results can be scripted to simulate a cluster moving through its
statuses, and any operation can be told to fail with a given [`FailureKind`].

!*/
#![allow(dead_code)]

use dwh::config::{ClusterType, MasterCredentials};
use dwh::control_plane::{ApiError, ApiResult, Endpoint, FailureKind};
use dwh::{AccessRole, ClusterSpec, ClusterState, ClusterStatus, ControlPlane};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

pub(crate) const ACCOUNT_ID: &str = "123456789012";

/// What a scripted `describe_cluster` call returns.
#[derive(Clone, Debug)]
pub(crate) enum Described {
    Status(ClusterStatus),
    Missing,
    Fail(FailureKind),
}

#[derive(Default)]
struct State {
    roles: BTreeMap<String, AccessRole>,
    cluster: Option<ClusterState>,
    describe_script: VecDeque<Described>,
    failures: BTreeMap<&'static str, VecDeque<FailureKind>>,
    calls: BTreeMap<&'static str, u32>,
    ingress: BTreeSet<(String, String, u16)>,
    cluster_role_arn: Option<String>,
    final_snapshot: Option<Option<String>>,
    create_role_race: bool,
}

#[derive(Default)]
pub(crate) struct MockControlPlane {
    state: Mutex<State>,
}

impl MockControlPlane {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start with a cluster that already exists.
    pub(crate) fn with_cluster(self, cluster: ClusterState) -> Self {
        self.state.lock().unwrap().cluster = Some(cluster);
        self
    }

    pub(crate) fn with_role(self, role_name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(role_name.to_string(), role(role_name));
        self
    }

    /// The next `create_role` finds that someone else created the role first.
    pub(crate) fn with_create_role_race(self) -> Self {
        self.state.lock().unwrap().create_role_race = true;
        self
    }

    /// The results of the next `describe_cluster` calls, in order. Once the script runs out,
    /// the cluster is described as it is.
    pub(crate) fn script_describe<I>(self, script: I) -> Self
    where
        I: IntoIterator<Item = Described>,
    {
        self.state.lock().unwrap().describe_script.extend(script);
        self
    }

    /// Make the next call to `operation` fail with `kind`.
    pub(crate) fn fail_next(self, operation: &'static str, kind: FailureKind) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(kind);
        self
    }

    pub(crate) fn calls(&self, operation: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn has_ingress(&self, group_id: &str, cidr: &str, port: u16) -> bool {
        self.state.lock().unwrap().ingress.contains(&(
            group_id.to_string(),
            cidr.to_string(),
            port,
        ))
    }

    pub(crate) fn cluster_role_arn(&self) -> Option<String> {
        self.state.lock().unwrap().cluster_role_arn.clone()
    }

    /// `None` if the cluster was never deleted, otherwise the snapshot requested on delete.
    pub(crate) fn final_snapshot(&self) -> Option<Option<String>> {
        self.state.lock().unwrap().final_snapshot.clone()
    }

    /// Count the call and pop a scripted failure for `operation`, if there is one.
    fn begin(&self, operation: &'static str) -> ApiResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(operation).or_default() += 1;
        let failure = state
            .failures
            .get_mut(operation)
            .and_then(|failures| failures.pop_front());
        match failure {
            Some(kind) => Err(ApiError::new_with_context(
                kind,
                format!("mock '{}' failure", operation),
            )),
            None => Ok(state),
        }
    }
}

#[async_trait::async_trait]
impl ControlPlane for MockControlPlane {
    async fn get_role(&self, role_name: &str) -> ApiResult<AccessRole> {
        let state = self.begin("get_role")?;
        state.roles.get(role_name).cloned().ok_or_else(|| {
            ApiError::new_with_context(FailureKind::NotFound, format!("no role '{}'", role_name))
        })
    }

    async fn create_role(
        &self,
        role_name: &str,
        _description: &str,
        _trust_policy: &str,
    ) -> ApiResult<AccessRole> {
        let mut state = self.begin("create_role")?;
        if std::mem::take(&mut state.create_role_race) {
            state
                .roles
                .insert(role_name.to_string(), role(role_name));
        }
        if state.roles.contains_key(role_name) {
            return Err(ApiError::new_with_context(
                FailureKind::AlreadyExists,
                format!("role '{}' exists", role_name),
            ));
        }
        let created = role(role_name);
        state.roles.insert(role_name.to_string(), created.clone());
        Ok(created)
    }

    async fn attached_role_policies(&self, role_name: &str) -> ApiResult<BTreeSet<String>> {
        let state = self.begin("attached_role_policies")?;
        state
            .roles
            .get(role_name)
            .map(|role| role.attached_policies.clone())
            .ok_or_else(|| ApiError::new_with_context(FailureKind::NotFound, "no role"))
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ApiResult<()> {
        let mut state = self.begin("attach_role_policy")?;
        let role = state
            .roles
            .get_mut(role_name)
            .ok_or_else(|| ApiError::new_with_context(FailureKind::NotFound, "no role"))?;
        role.attached_policies.insert(policy_arn.to_string());
        Ok(())
    }

    async fn create_cluster(&self, spec: &ClusterSpec, role_arn: &str) -> ApiResult<ClusterState> {
        let mut state = self.begin("create_cluster")?;
        if state.cluster.is_some() {
            return Err(ApiError::new_with_context(
                FailureKind::AlreadyExists,
                format!("cluster '{}' exists", spec.identifier),
            ));
        }
        let mut cluster = ClusterState::new(&spec.identifier, ClusterStatus::Creating);
        cluster.node_type = Some(spec.node_type.clone());
        cluster.number_of_nodes = Some(spec.node_count);
        cluster.master_username = Some(spec.master.username.clone());
        cluster.db_name = Some(spec.db_name.clone());
        cluster.iam_role_arns = vec![role_arn.to_string()];
        state.cluster_role_arn = Some(role_arn.to_string());
        state.cluster = Some(cluster.clone());
        Ok(cluster)
    }

    async fn describe_cluster(&self, cluster_id: &str) -> ApiResult<ClusterState> {
        let mut state = self.begin("describe_cluster")?;
        let not_found = || {
            ApiError::new_with_context(
                FailureKind::NotFound,
                format!("no cluster '{}'", cluster_id),
            )
        };
        match state.describe_script.pop_front() {
            Some(Described::Fail(kind)) => Err(ApiError::new_with_context(kind, "mock describe")),
            Some(Described::Missing) => {
                state.cluster = None;
                Err(not_found())
            }
            Some(Described::Status(status)) => {
                let cluster = state
                    .cluster
                    .get_or_insert_with(|| ClusterState::new(cluster_id, status.clone()));
                cluster.status = status;
                Ok(cluster.clone())
            }
            None => state
                .cluster
                .clone()
                .filter(|cluster| cluster.identifier == cluster_id)
                .ok_or_else(not_found),
        }
    }

    async fn delete_cluster(
        &self,
        cluster_id: &str,
        final_snapshot: Option<&str>,
    ) -> ApiResult<ClusterState> {
        let mut state = self.begin("delete_cluster")?;
        state.final_snapshot = Some(final_snapshot.map(|s| s.to_string()));
        match state.cluster.as_mut() {
            Some(cluster) if cluster.identifier == cluster_id => {
                cluster.status = ClusterStatus::Deleting;
                Ok(cluster.clone())
            }
            _ => Err(ApiError::new_with_context(
                FailureKind::NotFound,
                format!("no cluster '{}'", cluster_id),
            )),
        }
    }

    async fn authorize_ingress(&self, group_id: &str, cidr: &str, port: u16) -> ApiResult<()> {
        let mut state = self.begin("authorize_ingress")?;
        if state
            .ingress
            .insert((group_id.to_string(), cidr.to_string(), port))
        {
            Ok(())
        } else {
            Err(ApiError::new_with_context(
                FailureKind::AlreadyExists,
                "InvalidPermission.Duplicate",
            ))
        }
    }

    async fn revoke_ingress(&self, group_id: &str, cidr: &str, port: u16) -> ApiResult<()> {
        let mut state = self.begin("revoke_ingress")?;
        if state
            .ingress
            .remove(&(group_id.to_string(), cidr.to_string(), port))
        {
            Ok(())
        } else {
            Err(ApiError::new_with_context(
                FailureKind::NotFound,
                "InvalidPermission.NotFound",
            ))
        }
    }
}

pub(crate) fn role(role_name: &str) -> AccessRole {
    AccessRole {
        name: role_name.to_string(),
        arn: format!("arn:aws:iam::{}:role/{}", ACCOUNT_ID, role_name),
        attached_policies: BTreeSet::new(),
    }
}

pub(crate) fn cluster_spec() -> ClusterSpec {
    ClusterSpec {
        identifier: "dwhCluster".to_string(),
        cluster_type: ClusterType::MultiNode,
        node_type: "dc2.large".to_string(),
        node_count: 4,
        db_name: "dwh".to_string(),
        master: MasterCredentials {
            username: "dwhuser".to_string(),
            password: "Passw0rd".to_string(),
        },
        port: 5439,
        role_name: "dwhRole".to_string(),
    }
}

/// An available cluster with everything the provider reports once it is up.
pub(crate) fn available_cluster() -> ClusterState {
    let mut cluster = ClusterState::new("dwhCluster", ClusterStatus::Available);
    cluster.node_type = Some("dc2.large".to_string());
    cluster.number_of_nodes = Some(4);
    cluster.master_username = Some("dwhuser".to_string());
    cluster.db_name = Some("dwh".to_string());
    cluster.endpoint = Some(Endpoint {
        address: "dwhcluster.abc123.us-west-2.redshift.amazonaws.com".to_string(),
        port: Some(5439),
    });
    cluster.vpc_id = Some("vpc-0a1b2c3d".to_string());
    cluster.security_group_ids = vec!["sg-0123abcd".to_string()];
    cluster
}
