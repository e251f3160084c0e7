pub mod abi;
pub mod evm;
#[cfg(test)]
pub mod memory;
pub mod rpc;
pub mod traits;

pub use evm::EvmCampaignContract;
pub use rpc::RpcClient;
pub use traits::{CampaignReader, CampaignWriter, DonorNftReader, TxOutcome, WalletProvider};
