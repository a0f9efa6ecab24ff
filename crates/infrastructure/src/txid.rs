use fleet_dns_application::ports::TxidSource;

/// Transaction ids from the thread-local `fastrand` generator.
pub struct RandomTxids;

impl TxidSource for RandomTxids {
    fn next_txid(&self) -> u16 {
        fastrand::u16(..)
    }
}
