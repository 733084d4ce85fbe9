//! Chain-wide configuration the [`crate::chain::Chain`] façade is built
//! with (§6's genesis inputs and mainnet/testnet presets), and the
//! `ChainParams` struct §9's "Shared mutable global state" design note
//! asks for in place of hard-fork-style process globals.

use chain_constants::genesis::GenesisParams;
use chain_types::{Destination, Hash256, TemplateKind};

/// Parameters fixed for the lifetime of a `Chain`: the genesis preset it
/// was initialized with, plus the owner key the primary fork's origin
/// block is signed by.
#[derive(Debug, Clone, Copy)]
pub struct ChainParams {
    pub genesis: GenesisParams,
    pub owner_pubkey: Hash256,
}

impl ChainParams {
    /// Mainnet preset, with an explicit owner key (the spec leaves key
    /// material out of the preset tables themselves).
    #[must_use]
    pub const fn mainnet(owner_pubkey: Hash256) -> Self {
        Self { genesis: chain_constants::genesis::MAINNET, owner_pubkey }
    }

    /// Testnet preset.
    #[must_use]
    pub const fn testnet(owner_pubkey: Hash256) -> Self {
        Self { genesis: chain_constants::genesis::TESTNET, owner_pubkey }
    }

    /// The `DelegateMint` template kind the genesis block's mint
    /// transaction embeds in `data` (per [`crate::template`]'s
    /// leading-template convention), naming `owner_pubkey` so the
    /// primary fork starts under its owner's delegate control.
    #[must_use]
    pub fn genesis_mint_template(&self) -> TemplateKind {
        TemplateKind::DelegateMint { delegate_pubkey: self.owner_pubkey }
    }

    /// The mint destination the genesis block's sole transaction pays
    /// to: the [`Destination::Template`] id of [`Self::genesis_mint_template`].
    #[must_use]
    pub fn genesis_mint_destination(&self) -> Destination {
        Destination::Template(self.genesis_mint_template().template_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_and_testnet_differ_in_initial_bits() {
        let owner = Hash256::hash(b"owner");
        let mainnet = ChainParams::mainnet(owner);
        let testnet = ChainParams::testnet(owner);
        assert_ne!(mainnet.genesis.initial_bits, testnet.genesis.initial_bits);
    }
}
