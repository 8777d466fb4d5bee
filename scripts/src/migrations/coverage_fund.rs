//! Deployment of the CoverageFund

use crate::{
    chain::Chain,
    constants::{COVERAGE_FUND, COVERAGE_FUND_CONTRACT, IMPLEMENTATION_VERSION, RIVER},
    deployer::{DeployContext, ProxiedDeployment},
    errors::ScriptError,
    solidity::{initCoverageFundV1Call, EncodedCall},
};

/// Deploy the CoverageFund proxy, initialized with the deployed River
pub(super) async fn run<C: Chain>(ctx: &DeployContext<C>) -> Result<(), ScriptError> {
    let river = ctx.store.require(RIVER)?.address;

    ctx.deploy_proxied(ProxiedDeployment {
        name: COVERAGE_FUND,
        contract: COVERAGE_FUND_CONTRACT,
        version: IMPLEMENTATION_VERSION,
        owner: ctx.accounts.proxy_administrator()?,
        initializer: Some(EncodedCall::new(
            initCoverageFundV1Call {
                riverAddress: river,
            },
            vec![river.to_string()],
        )),
    })
    .await?;

    Ok(())
}
