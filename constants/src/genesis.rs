//! Genesis parameters for the built-in network presets.
//!
//! These are inputs to origin-block construction, not on-wire data: the
//! genesis block itself is built and hashed like any other block once a
//! preset's fields are filled in.

/// Parameters that seed a fresh chain's genesis/origin block.
#[derive(Debug, Clone, Copy)]
pub struct GenesisParams {
    /// Unix timestamp stamped on the genesis block.
    pub genesis_timestamp: u32,
    /// Initial supply minted directly by the genesis block, if any.
    pub initial_supply: i64,
    /// Per-block mint reward before the first reward-schedule bracket.
    pub initial_mint_reward: i64,
    /// Minimum `TOKEN` transaction fee for this fork.
    pub min_tx_fee: i64,
    /// Initial PoW `bits` for the primary chain.
    pub initial_bits: u32,
    /// Human-readable fork name.
    pub name: &'static str,
    /// Ticker symbol.
    pub symbol: &'static str,
}

/// Mainnet genesis preset.
pub const MAINNET: GenesisParams = GenesisParams {
    genesis_timestamp: 1_700_000_000,
    initial_supply: 0,
    initial_mint_reward: 384 * crate::money::COIN,
    min_tx_fee: crate::tx::MIN_TX_FEE,
    initial_bits: crate::pow::MAINNET_INITIAL_BITS,
    name: "mainnet",
    symbol: "MAIN",
};

/// Testnet genesis preset: eases initial PoW difficulty for local chains.
pub const TESTNET: GenesisParams = GenesisParams {
    genesis_timestamp: 1_700_000_000,
    initial_supply: 0,
    initial_mint_reward: 384 * crate::money::COIN,
    min_tx_fee: crate::tx::MIN_TX_FEE,
    initial_bits: crate::pow::TESTNET_INITIAL_BITS,
    name: "testnet",
    symbol: "TEST",
};
