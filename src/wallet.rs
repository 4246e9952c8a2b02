use bip39::{Language, Mnemonic};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::util::bip32::ExtendedPrivKey;
use bitcoin::{Address, Network};
use thiserror::Error;

/// Per-phrase derivation failures. Deterministic (a phrase that fails once
/// fails always) and handled by skipping the phrase, never by stopping the
/// pool.
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("invalid mnemonic phrase: {0}")]
    Mnemonic(#[from] bip39::Error),

    #[error("master key derivation failed: {0}")]
    MasterKey(#[from] bitcoin::util::bip32::Error),
}

/// Derives the BIP32 master key for a phrase and encodes its public half as
/// a mainnet P2PKH address.
pub struct AddressDeriver {
    secp: Secp256k1<bitcoin::secp256k1::All>,
}

impl AddressDeriver {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Phrase → empty-passphrase seed → BIP32 master key.
    pub fn master_key(&self, phrase: &str) -> Result<ExtendedPrivKey, DeriveError> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)?;
        let seed = mnemonic.to_seed("");
        let master = ExtendedPrivKey::new_master(Network::Bitcoin, &seed)?;
        Ok(master)
    }

    /// Mainnet P2PKH address of the master public key.
    pub fn p2pkh_address(&self, master: &ExtendedPrivKey) -> Address {
        let pubkey = master.to_priv().public_key(&self.secp);
        Address::p2pkh(&pubkey, Network::Bitcoin)
    }
}

impl Default for AddressDeriver {
    fn default() -> Self {
        Self::new()
    }
}
