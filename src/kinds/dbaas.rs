//! Database system kind.
//!
//! Missing database options are filled with defaults and written back to
//! the effective configuration, so a generated admin password is stable for
//! the rest of the attempt and visible in [`crate::LaunchOutcome::config`].

use crate::client::{DatabaseApi, NetworkApi};
use crate::config::LifecycleConfig;
use crate::driver_config::DriverConfig;
use crate::error::ProvisionError;
use crate::files;
use crate::lifecycle::{KindFuture, PollPolicy, ResourceKind, StatusSet};
use crate::network::{self, NetworkResolver};
use crate::pipeline::{BuilderStep, LaunchContext, Pipeline, shared_steps};
use crate::request::{CreateDatabaseDetails, CreateDbHomeDetails, DbBackupConfig, LaunchDbSystemDetails};
use crate::secrets::{DB_ADMIN_SPECIAL_CHARS, SecretGenerator};
use crate::state::{HOSTNAME, StateRecord};

const LABEL: &str = "dbaas";

/// Maximum length of a database node hostname.
pub const DB_HOSTNAME_LIMIT: usize = 16;

/// Maximum length of a database cluster name.
pub const CLUSTER_NAME_LIMIT: usize = 11;

const LONG_HOSTNAME_BUDGET: usize = 25;
const TRIMMED_PREFIX_LENGTH: usize = 12;
const HOSTNAME_TAIL_LENGTH: usize = 3;
const CLUSTER_SUFFIX_BUDGET: usize = 10;

/// Defaults written back when the configuration leaves them unset.
pub mod defaults {
    /// CPU cores.
    pub const CPU_CORE_COUNT: u32 = 2;
    /// Initial data storage in gigabytes.
    pub const INITIAL_DATA_STORAGE_SIZE_IN_GB: u32 = 256;
    /// License model.
    pub const LICENSE_MODEL: &str = "BRING_YOUR_OWN_LICENSE";
    /// Database edition.
    pub const DATABASE_EDITION: &str = "ENTERPRISE_EDITION";
    /// Database name.
    pub const DB_NAME: &str = "dbaas1";
    /// Pluggable database name.
    pub const PDB_NAME: &str = "pdb001";
    /// Character set.
    pub const CHARACTER_SET: &str = "AL32UTF8";
    /// National character set.
    pub const NCHARACTER_SET: &str = "AL16UTF16";
    /// Workload type.
    pub const DB_WORKLOAD: &str = "OLTP";
    /// Node count.
    pub const NODE_COUNT: u32 = 1;
}

/// Status vocabulary of database systems.
pub const DB_SYSTEM_STATUSES: StatusSet = StatusSet {
    ready: &["AVAILABLE"],
    gone: &["TERMINATING", "TERMINATED"],
    launch_failure: &["FAILED", "TERMINATING", "TERMINATED"],
};

/// Database systems with a single node and one database home.
#[derive(Debug)]
pub struct DbaasKind<C> {
    client: C,
}

impl<C> DbaasKind<C> {
    /// Creates the kind around a client that speaks both database and
    /// network APIs.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self { client }
    }
}

/// Database-specific steps, in order.
#[must_use]
pub fn dbaas_steps() -> Vec<BuilderStep<LaunchDbSystemDetails>> {
    vec![
        BuilderStep::new("hostname", hostname),
        BuilderStep::new("display_name", display_name),
        BuilderStep::new("cluster_name", cluster_name),
        BuilderStep::new("cpu_core_count", cpu_core_count),
        BuilderStep::new("db_home", db_home),
        BuilderStep::new("database_edition", database_edition),
        BuilderStep::new("subnet_id", subnet_id),
        BuilderStep::new("nsg_ids", nsg_ids),
        BuilderStep::new("pubkey", pubkey),
        BuilderStep::new("initial_data_storage_size_in_gb", initial_data_storage_size_in_gb),
        BuilderStep::new("node_count", node_count),
        BuilderStep::new("license_model", license_model),
    ]
}

fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-")
}

/// Derives a node hostname of at most 16 characters.
///
/// The long form `<prefix>-<random>-<3 random>` is used when it fits;
/// otherwise the prefix is cut to 12 characters and given a 3-character
/// random tail.
pub fn db_hostname(prefix: &str, secrets: &mut SecretGenerator) -> String {
    let filler =
        secrets.random_string(LONG_HOSTNAME_BUDGET.saturating_sub(prefix.chars().count()));
    let tail = secrets.random_string(HOSTNAME_TAIL_LENGTH);
    let long_name = join_segments(&[prefix, &filler, &tail]);
    if long_name.chars().count() <= DB_HOSTNAME_LIMIT {
        return long_name;
    }
    let trimmed: String = prefix.chars().take(TRIMMED_PREFIX_LENGTH).collect();
    let short_tail = secrets.random_string(HOSTNAME_TAIL_LENGTH);
    join_segments(&[&trimmed, &short_tail])
}

/// Derives a cluster name of at most 11 characters from the first
/// dash-separated segment of the prefix.
pub fn cluster_name_for(prefix: &str, secrets: &mut SecretGenerator) -> String {
    let head = prefix.split('-').next().unwrap_or_default();
    if head.chars().count() >= CLUSTER_NAME_LIMIT {
        return head.chars().take(CLUSTER_NAME_LIMIT).collect();
    }
    let filler =
        secrets.random_string(CLUSTER_SUFFIX_BUDGET.saturating_sub(head.chars().count()));
    join_segments(&[head, &filler])
}

fn hostname(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    let prefix = ctx.config.require_hostname_prefix()?.to_owned();
    request.hostname = Some(db_hostname(&prefix, &mut ctx.secrets));
    Ok(())
}

fn display_name(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    let prefix = ctx.config.require_hostname_prefix()?.to_owned();
    let letters = ctx.secrets.random_string(4);
    let digits = ctx.secrets.random_number(2);
    request.display_name = Some(join_segments(&[&prefix, &letters, &digits]));
    Ok(())
}

fn cluster_name(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    let prefix = ctx.config.require_hostname_prefix()?.to_owned();
    request.cluster_name = Some(cluster_name_for(&prefix, &mut ctx.secrets));
    Ok(())
}

fn cpu_core_count(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    let cores = *ctx
        .config
        .dbaas
        .cpu_core_count
        .get_or_insert(defaults::CPU_CORE_COUNT);
    request.cpu_core_count = Some(cores);
    Ok(())
}

fn default_text(slot: &mut Option<String>, fallback: &str) -> String {
    slot.get_or_insert_with(|| fallback.to_owned()).clone()
}

fn db_home(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    let db_version = DriverConfig::require(ctx.config.dbaas.db_version.as_deref(), "db_version")?
        .to_owned();
    let display_name = format!("dbhome{}", ctx.secrets.random_number(10));

    let options = &mut ctx.config.dbaas;
    let admin_password = match options.admin_password.as_ref() {
        Some(password) => password.clone(),
        None => {
            let generated = ctx.secrets.random_password(DB_ADMIN_SPECIAL_CHARS);
            options.admin_password = Some(generated.clone());
            generated
        }
    };
    let database = CreateDatabaseDetails {
        db_name: default_text(&mut options.db_name, defaults::DB_NAME),
        pdb_name: default_text(&mut options.pdb_name, defaults::PDB_NAME),
        admin_password,
        character_set: default_text(&mut options.character_set, defaults::CHARACTER_SET),
        ncharacter_set: default_text(&mut options.ncharacter_set, defaults::NCHARACTER_SET),
        db_workload: default_text(&mut options.db_workload, defaults::DB_WORKLOAD),
        db_backup_config: DbBackupConfig {
            auto_backup_enabled: false,
        },
    };
    request.db_home = Some(CreateDbHomeDetails {
        db_version,
        display_name,
        database,
    });
    Ok(())
}

fn database_edition(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    request.database_edition = Some(default_text(
        &mut ctx.config.dbaas.database_edition,
        defaults::DATABASE_EDITION,
    ));
    Ok(())
}

fn subnet_id(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    request.subnet_id = Some(ctx.config.require_subnet_id()?.to_owned());
    Ok(())
}

fn nsg_ids(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    request.nsg_ids.clone_from(&ctx.config.nsg_ids);
    Ok(())
}

fn pubkey(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    let keypath = ctx
        .config
        .ssh_keypath
        .as_deref()
        .ok_or_else(|| ProvisionError::missing("ssh_keypath"))?;
    request.ssh_public_keys = vec![files::read_first_line(keypath)?];
    Ok(())
}

fn initial_data_storage_size_in_gb(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    let size = *ctx
        .config
        .dbaas
        .initial_data_storage_size_in_gb
        .get_or_insert(defaults::INITIAL_DATA_STORAGE_SIZE_IN_GB);
    request.initial_data_storage_size_in_gb = Some(size);
    Ok(())
}

fn node_count(
    _ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    request.node_count = Some(defaults::NODE_COUNT);
    Ok(())
}

fn license_model(
    ctx: &mut LaunchContext,
    request: &mut LaunchDbSystemDetails,
) -> Result<(), ProvisionError> {
    request.license_model = Some(default_text(
        &mut ctx.config.dbaas.license_model,
        defaults::LICENSE_MODEL,
    ));
    Ok(())
}

impl<C> ResourceKind for DbaasKind<C>
where
    C: DatabaseApi + NetworkApi,
{
    type Request = LaunchDbSystemDetails;

    fn label(&self) -> &'static str {
        LABEL
    }

    fn default_poll_policy(&self) -> PollPolicy {
        PollPolicy::DATABASE
    }

    fn configured_poll_policy(&self, settings: &LifecycleConfig) -> PollPolicy {
        settings.dbaas_policy()
    }

    fn statuses(&self) -> StatusSet {
        DB_SYSTEM_STATUSES
    }

    fn pipeline(&self) -> Pipeline<LaunchDbSystemDetails> {
        Pipeline::new(shared_steps()).then(dbaas_steps())
    }

    fn prepare<'a>(
        &'a self,
        ctx: &'a mut LaunchContext,
        _state: &'a StateRecord,
    ) -> KindFuture<'a, ()> {
        Box::pin(async move {
            let subnet_id = ctx.config.require_subnet_id()?.to_owned();
            ctx.public_ip_allowed = network::public_ip_allowed(&self.client, &subnet_id).await?;
            Ok(())
        })
    }

    fn submit<'a>(&'a self, request: &'a LaunchDbSystemDetails) -> KindFuture<'a, String> {
        Box::pin(async move {
            self.client
                .launch_db_system(request)
                .await
                .map(|system| system.id)
                .map_err(|err| ProvisionError::submission(LABEL, &err))
        })
    }

    fn status<'a>(&'a self, resource_id: &'a str) -> KindFuture<'a, Option<String>> {
        Box::pin(async move {
            let system = self.client.get_db_system(resource_id).await?;
            Ok(system.map(|found| found.lifecycle_state))
        })
    }

    fn resolve_state<'a>(
        &'a self,
        ctx: &'a LaunchContext,
        resource_id: &'a str,
        state: &'a mut StateRecord,
    ) -> KindFuture<'a, ()> {
        Box::pin(async move {
            let compartment_id = ctx.config.require_compartment_id()?;
            let resolver = NetworkResolver::new(&self.client, ctx.public_ip_allowed);
            let address = resolver
                .db_system_address(&self.client, compartment_id, resource_id)
                .await?;
            state.insert(HOSTNAME, address.to_string());
            Ok(())
        })
    }

    fn terminate<'a>(&'a self, resource_id: &'a str) -> KindFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .terminate_db_system(resource_id)
                .await
                .map_err(|err| ProvisionError::submission(LABEL, &err))
        })
    }
}
