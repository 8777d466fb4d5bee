//! Deployment of the Withdraw contract.
//!
//! Withdraw is deployed without initializer: its withdrawal credentials are
//! read by River on initialization, and it is pointed at River by the core step.

use crate::{
    chain::Chain,
    constants::{IMPLEMENTATION_VERSION, WITHDRAW, WITHDRAW_CONTRACT},
    deployer::{DeployContext, ProxiedDeployment},
    errors::ScriptError,
};

/// Deploy the Withdraw proxy, administered by the proxy administrator
pub(super) async fn run<C: Chain>(ctx: &DeployContext<C>) -> Result<(), ScriptError> {
    ctx.deploy_proxied(ProxiedDeployment {
        name: WITHDRAW,
        contract: WITHDRAW_CONTRACT,
        version: IMPLEMENTATION_VERSION,
        owner: ctx.accounts.proxy_administrator()?,
        initializer: None,
    })
    .await?;

    Ok(())
}
