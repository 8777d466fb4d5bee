//! Deployment of the Allowlist behind its firewall and proxy firewall

use crate::{
    chain::Chain,
    constants::{
        ALLOWLIST, ALLOWLIST_CONTRACT, ALLOWLIST_FIREWALL, ALLOWLIST_PROXY_FIREWALL,
        IMPLEMENTATION_VERSION,
    },
    deployer::{DeployContext, ProxiedDeployment},
    errors::ScriptError,
    solidity::{initAllowlistV1Call, pauseCall, selector, EncodedCall},
};

use super::deploy_firewall;

/// Deploy the Allowlist firewalls for the predicted Allowlist address, then
/// the Allowlist administered and allowed by its firewall
pub(super) async fn run<C: Chain>(ctx: &DeployContext<C>) -> Result<(), ScriptError> {
    let governor = ctx.accounts.governor()?;
    let proxy_administrator = ctx.accounts.proxy_administrator()?;

    let mut plan = ctx.plan().await?;
    plan.contract(ALLOWLIST_FIREWALL, None);
    plan.contract(ALLOWLIST_PROXY_FIREWALL, None);
    let future_allowlist = plan.proxied(
        ALLOWLIST,
        Some("initAllowlistV1"),
        ctx.implementation_reusable(ALLOWLIST_CONTRACT, IMPLEMENTATION_VERSION)?,
    );

    let firewall = deploy_firewall(
        ctx,
        &plan,
        ALLOWLIST_FIREWALL,
        governor,
        future_allowlist,
        vec![],
    )
    .await?;
    let proxy_firewall = deploy_firewall(
        ctx,
        &plan,
        ALLOWLIST_PROXY_FIREWALL,
        proxy_administrator,
        future_allowlist,
        vec![selector::<pauseCall>()],
    )
    .await?;

    let allowlist = ctx
        .deploy_proxied(ProxiedDeployment {
            name: ALLOWLIST,
            contract: ALLOWLIST_CONTRACT,
            version: IMPLEMENTATION_VERSION,
            owner: proxy_firewall,
            initializer: Some(EncodedCall::new(
                initAllowlistV1Call {
                    admin: firewall,
                    allower: firewall,
                },
                vec![firewall.to_string(), firewall.to_string()],
            )),
        })
        .await?;

    plan.assert_deployed(ALLOWLIST, allowlist.address)
}
