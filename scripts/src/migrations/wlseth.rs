//! Deployment of the wrapped LsETH token. Never deployed on mainnet, where
//! it already exists.

use crate::{
    chain::Chain,
    constants::{IMPLEMENTATION_VERSION, RIVER, WLSETH, WLSETH_CONTRACT},
    deployer::{DeployContext, ProxiedDeployment},
    errors::ScriptError,
    solidity::{initWLSETHV1Call, EncodedCall},
};

/// Deploy the WLSETH proxy wrapping the deployed River
pub(super) async fn run<C: Chain>(ctx: &DeployContext<C>) -> Result<(), ScriptError> {
    let river = ctx.store.require(RIVER)?.address;

    ctx.deploy_proxied(ProxiedDeployment {
        name: WLSETH,
        contract: WLSETH_CONTRACT,
        version: IMPLEMENTATION_VERSION,
        owner: ctx.accounts.proxy_administrator()?,
        initializer: Some(EncodedCall::new(
            initWLSETHV1Call { river },
            vec![river.to_string()],
        )),
    })
    .await?;

    Ok(())
}
