/*!

Loads the `[AWS]` and `[DWH]` sections of the configuration file into [`Settings`]. Every cluster
parameter is mandatory. A missing or malformed key is reported by name.

The file is read as TOML, or failing that as an INI file of `KEY=value` lines. INI keys are
matched case-insensitively and all INI values are strings.

!*/

use crate::constants::DEFAULT_REGION;
use crate::error::{self, Result};
use ini::Ini;
use log::debug;
use snafu::{OptionExt, ResultExt};
use std::fmt::{Debug, Display, Formatter};
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use toml::value::Table;
use toml::Value;

const AWS_SECTION: &str = "AWS";
const DWH_SECTION: &str = "DWH";

const KEY: &str = "KEY";
const SECRET: &str = "SECRET";
const REGION: &str = "REGION";

const CLUSTER_TYPE: &str = "DWH_CLUSTER_TYPE";
const NUM_NODES: &str = "DWH_NUM_NODES";
const NODE_TYPE: &str = "DWH_NODE_TYPE";
const CLUSTER_IDENTIFIER: &str = "DWH_CLUSTER_IDENTIFIER";
const DB: &str = "DWH_DB";
const DB_USER: &str = "DWH_DB_USER";
const DB_PASSWORD: &str = "DWH_DB_PASSWORD";
const PORT: &str = "DWH_PORT";
const IAM_ROLE_NAME: &str = "DWH_IAM_ROLE_NAME";
const INGRESS_CIDR: &str = "DWH_INGRESS_CIDR";

/// Everything read from the configuration file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub credentials: AwsCredentials,
    pub region: String,
    pub cluster: ClusterSpec,
    ingress_cidr: Option<String>,
}

impl Settings {
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        debug!("Reading configuration from '{}'", path.display());
        let contents = std::fs::read_to_string(path).context(error::ReadConfigSnafu { path })?;
        let value = match toml::from_str::<Value>(&contents) {
            Ok(value) => value,
            Err(toml_error) => {
                debug!("'{}' is not TOML, reading it as INI", path.display());
                let ini = Ini::load_from_str(&contents)
                    .context(error::ParseConfigSnafu { path, toml_error })?;
                ini_value(&ini)
            }
        };
        Self::from_value(&value)
    }

    fn from_value(value: &Value) -> Result<Self> {
        let aws = Section::new(value, AWS_SECTION)?;
        let dwh = Section::new(value, DWH_SECTION)?;

        let credentials = AwsCredentials {
            access_key_id: aws.string(KEY)?,
            secret_access_key: aws.string(SECRET)?,
        };
        let region = aws
            .optional_string(REGION)?
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let cluster = ClusterSpec {
            identifier: dwh.string(CLUSTER_IDENTIFIER)?,
            cluster_type: dwh.parse(CLUSTER_TYPE)?,
            node_type: dwh.string(NODE_TYPE)?,
            node_count: dwh.integer(NUM_NODES, 1)?,
            db_name: dwh.string(DB)?,
            master: MasterCredentials {
                username: dwh.string(DB_USER)?,
                password: dwh.string(DB_PASSWORD)?,
            },
            port: dwh.integer(PORT, 1)?,
            role_name: dwh.string(IAM_ROLE_NAME)?,
        };

        let ingress_cidr = dwh.optional_string(INGRESS_CIDR)?;
        if let Some(cidr) = &ingress_cidr {
            validate_cidr(cidr).map_err(|reason| dwh.malformed(INGRESS_CIDR, reason))?;
        }

        Ok(Self {
            credentials,
            region,
            cluster,
            ingress_cidr,
        })
    }

    /// The source CIDR for the cluster's ingress rule. Only the network actions need it, so its
    /// absence is not reported until it is asked for.
    pub fn ingress_cidr(&self) -> Result<&str> {
        self.ingress_cidr
            .as_deref()
            .context(error::MissingKeySnafu {
                section: DWH_SECTION,
                key: INGRESS_CIDR,
            })
    }
}

/// The access key pair used for all control-plane calls.
#[derive(Clone, Eq, PartialEq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Debug for AwsCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// The parameters the cluster is launched with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterSpec {
    pub identifier: String,
    pub cluster_type: ClusterType,
    pub node_type: String,
    pub node_count: u32,
    pub db_name: String,
    pub master: MasterCredentials,
    pub port: u16,
    /// The IAM role the cluster assumes to read from S3.
    pub role_name: String,
}

#[derive(Clone, Eq, PartialEq)]
pub struct MasterCredentials {
    pub username: String,
    pub password: String,
}

impl Debug for MasterCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClusterType {
    SingleNode,
    MultiNode,
}

impl ClusterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterType::SingleNode => "single-node",
            ClusterType::MultiNode => "multi-node",
        }
    }
}

impl FromStr for ClusterType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "single-node" => Ok(ClusterType::SingleNode),
            "multi-node" => Ok(ClusterType::MultiNode),
            other => Err(format!(
                "expected 'single-node' or 'multi-node', got '{}'",
                other
            )),
        }
    }
}

impl Display for ClusterType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.as_str(), f)
    }
}

/// One table of the configuration file and its name, for error reporting.
struct Section<'a> {
    name: &'static str,
    table: &'a Table,
}

impl<'a> Section<'a> {
    fn new(value: &'a Value, name: &'static str) -> Result<Self> {
        let table = value
            .get(name)
            .and_then(Value::as_table)
            .context(error::MissingSectionSnafu { section: name })?;
        Ok(Self { name, table })
    }

    fn optional_string(&self, key: &str) -> Result<Option<String>> {
        let value = match self.table.get(key) {
            None => return Ok(None),
            Some(value) => value,
        };
        let s = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Integer(i) => i.to_string(),
            other => {
                return Err(self.malformed(
                    key,
                    format!("expected a string, got a {}", other.type_str()),
                ))
            }
        };
        if s.is_empty() {
            return Err(self.malformed(key, "value is empty"));
        }
        Ok(Some(s))
    }

    fn string(&self, key: &str) -> Result<String> {
        self.optional_string(key)?.context(error::MissingKeySnafu {
            section: self.name,
            key,
        })
    }

    fn parse<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr<Err = String>,
    {
        self.string(key)?
            .parse()
            .map_err(|reason| self.malformed(key, reason))
    }

    /// Integers may be written bare or quoted. Values below `min` or out of range for `T` are
    /// malformed.
    fn integer<T>(&self, key: &str, min: i64) -> Result<T>
    where
        T: TryFrom<i64>,
    {
        let value = self.table.get(key).context(error::MissingKeySnafu {
            section: self.name,
            key,
        })?;
        let n = match value {
            Value::Integer(i) => *i,
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| self.malformed(key, format!("'{}' is not an integer: {}", s, e)))?,
            other => {
                return Err(self.malformed(
                    key,
                    format!("expected an integer, got a {}", other.type_str()),
                ))
            }
        };
        if n < min {
            return Err(self.malformed(key, format!("{} is less than {}", n, min)));
        }
        T::try_from(n).map_err(|_| self.malformed(key, format!("{} is out of range", n)))
    }

    fn malformed<S>(&self, key: &str, reason: S) -> error::Error
    where
        S: Into<String>,
    {
        error::Error::MalformedKey {
            section: self.name.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// The INI sections as TOML tables of strings, with upper-cased keys. Keys outside of a section
/// are ignored.
fn ini_value(ini: &Ini) -> Value {
    let mut root = Table::new();
    for (name, properties) in ini.iter() {
        let name = match name {
            Some(name) => name,
            None => continue,
        };
        let mut table = match root.remove(name) {
            Some(Value::Table(table)) => table,
            _ => Table::new(),
        };
        for (key, value) in properties.iter() {
            table.insert(key.to_uppercase(), Value::String(value.to_string()));
        }
        root.insert(name.to_string(), Value::Table(table));
    }
    Value::Table(root)
}

fn validate_cidr(cidr: &str) -> std::result::Result<(), String> {
    let (address, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| format!("'{}' is not in a.b.c.d/n form", cidr))?;
    address
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("'{}' is not an IPv4 address: {}", address, e))?;
    match prefix.parse::<u8>() {
        Ok(n) if n <= 32 => Ok(()),
        _ => Err(format!("'{}' is not a prefix length between 0 and 32", prefix)),
    }
}
