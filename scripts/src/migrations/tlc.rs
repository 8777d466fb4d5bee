//! Deployment of the TLC token behind its proxy firewall

use crate::{
    chain::Chain,
    constants::{TLC, TLC_CONTRACT, TLC_IMPLEMENTATION_VERSION, TLC_PROXY_FIREWALL},
    deployer::{DeployContext, ProxiedDeployment},
    errors::ScriptError,
    solidity::{initTLCV1Call, pauseCall, selector, EncodedCall},
};

use super::deploy_firewall;

/// Deploy the TLC proxy firewall for the predicted TLC address, then TLC,
/// minting the initial supply to the TLC mint account
pub(super) async fn run<C: Chain>(ctx: &DeployContext<C>) -> Result<(), ScriptError> {
    let proxy_administrator = ctx.accounts.proxy_administrator()?;
    let mint_account = ctx.accounts.tlc_mint_account()?;

    let mut plan = ctx.plan().await?;
    plan.contract(TLC_PROXY_FIREWALL, None);
    let future_tlc = plan.proxied(
        TLC,
        Some("initTLCV1"),
        ctx.implementation_reusable(TLC_CONTRACT, TLC_IMPLEMENTATION_VERSION)?,
    );

    let proxy_firewall = deploy_firewall(
        ctx,
        &plan,
        TLC_PROXY_FIREWALL,
        proxy_administrator,
        future_tlc,
        vec![selector::<pauseCall>()],
    )
    .await?;

    let tlc = ctx
        .deploy_proxied(ProxiedDeployment {
            name: TLC,
            contract: TLC_CONTRACT,
            version: TLC_IMPLEMENTATION_VERSION,
            owner: proxy_firewall,
            initializer: Some(EncodedCall::new(
                initTLCV1Call {
                    account: mint_account,
                },
                vec![mint_account.to_string()],
            )),
        })
        .await?;

    plan.assert_deployed(TLC, tlc.address)
}
