//! Reachable-address resolution for launched resources.
//!
//! Whether a subnet permits public addresses is looked up once per run and
//! carried in [`NetworkResolver`]. The address policy itself lives in
//! [`select_address`] so it can be exercised without a client.

use std::net::IpAddr;

use tracing::debug;

use crate::client::{ComputeApi, DatabaseApi, NetworkApi, Vnic};
use crate::error::ProvisionError;

/// Queries whether interfaces in `subnet_id` may receive public addresses.
///
/// # Errors
///
/// Returns [`ProvisionError::Client`] when the subnet cannot be fetched.
pub async fn public_ip_allowed<N>(network: &N, subnet_id: &str) -> Result<bool, ProvisionError>
where
    N: NetworkApi + ?Sized,
{
    let subnet = network.get_subnet(subnet_id).await?;
    debug!(
        subnet_id,
        prohibit_public_ip_on_vnic = subnet.prohibit_public_ip_on_vnic,
        "resolved subnet public IP policy"
    );
    Ok(!subnet.prohibit_public_ip_on_vnic)
}

/// Resolves addresses for one provisioning run.
#[derive(Debug)]
pub struct NetworkResolver<'a, N: ?Sized> {
    network: &'a N,
    public_ip_allowed: bool,
}

impl<'a, N> NetworkResolver<'a, N>
where
    N: NetworkApi + ?Sized,
{
    /// Creates a resolver for a subnet whose policy is already known.
    #[must_use]
    pub const fn new(network: &'a N, public_ip_allowed: bool) -> Self {
        Self {
            network,
            public_ip_allowed,
        }
    }

    /// Whether the subnet permits public addresses.
    #[must_use]
    pub const fn public_ip_allowed(&self) -> bool {
        self.public_ip_allowed
    }

    /// Returns the address of a compute instance's primary interface.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::NoAttachmentsFound`] when the instance has
    /// no interface attachments, [`ProvisionError::NoPrimaryInterface`] when
    /// none of them is primary and [`ProvisionError::MissingAddress`] when
    /// the selected address is absent or malformed.
    pub async fn instance_address<C>(
        &self,
        compute: &C,
        compartment_id: &str,
        instance_id: &str,
        use_private_ip: bool,
    ) -> Result<IpAddr, ProvisionError>
    where
        C: ComputeApi + ?Sized,
    {
        let attachments = compute
            .list_vnic_attachments(compartment_id, instance_id)
            .await?;
        if attachments.is_empty() {
            return Err(ProvisionError::NoAttachmentsFound {
                resource_id: instance_id.to_owned(),
            });
        }

        for vnic_id in attachments.iter().filter_map(|a| a.vnic_id.as_deref()) {
            let vnic = self.network.get_vnic(vnic_id).await?;
            if vnic.is_primary {
                return select_address(instance_id, &vnic, self.public_ip_allowed, use_private_ip);
            }
        }
        Err(ProvisionError::NoPrimaryInterface {
            resource_id: instance_id.to_owned(),
        })
    }

    /// Returns the address of a database system's first node.
    ///
    /// The private-address override does not apply to database systems.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::NoAttachmentsFound`] when no node has an
    /// interface yet and [`ProvisionError::MissingAddress`] when the
    /// selected address is absent or malformed.
    pub async fn db_system_address<D>(
        &self,
        database: &D,
        compartment_id: &str,
        db_system_id: &str,
    ) -> Result<IpAddr, ProvisionError>
    where
        D: DatabaseApi + ?Sized,
    {
        let nodes = database.list_db_nodes(compartment_id, db_system_id).await?;
        let vnic_id = nodes
            .iter()
            .find_map(|node| node.vnic_id.as_deref())
            .ok_or_else(|| ProvisionError::NoAttachmentsFound {
                resource_id: db_system_id.to_owned(),
            })?;
        let vnic = self.network.get_vnic(vnic_id).await?;
        select_address(db_system_id, &vnic, self.public_ip_allowed, false)
    }
}

/// Picks the public or private address of `vnic`.
///
/// When the subnet permits public addresses the public one is returned
/// unless `use_private_ip` is set. Otherwise the private address is always
/// returned.
///
/// # Errors
///
/// Returns [`ProvisionError::MissingAddress`] when the chosen address is
/// absent or does not parse.
pub fn select_address(
    resource_id: &str,
    vnic: &Vnic,
    public_ip_allowed: bool,
    use_private_ip: bool,
) -> Result<IpAddr, ProvisionError> {
    let (visibility, candidate) = if public_ip_allowed && !use_private_ip {
        ("public", vnic.public_ip.as_deref())
    } else {
        ("private", vnic.private_ip.as_deref())
    };
    candidate
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| ProvisionError::MissingAddress {
            resource_id: resource_id.to_owned(),
            vnic_id: vnic.id.clone(),
            visibility: visibility.to_owned(),
        })
}
