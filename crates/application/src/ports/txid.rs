/// Source of DNS transaction identifiers.
///
/// Production adapters must be non-predictable (spoofing resistance);
/// tests substitute a deterministic sequence.
pub trait TxidSource: Send + Sync {
    fn next_txid(&self) -> u16;
}
